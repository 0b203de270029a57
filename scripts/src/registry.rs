//! The registry of contract addresses resolved during a deployment run, and
//! its JSON and Solidity exports

use std::{collections::BTreeMap, path::Path};

use alloy::primitives::Address;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    constants::{CHAIN_ID_KEY, EXPLORER_LINK_KEY, PROVIDER_URL_KEY},
    errors::ExportError,
    utils::{read_file, write_file},
};

/// A mapping from logical contract names to deployed addresses
///
/// An entry holding `None` is a contract whose deployment failed. Lookups of
/// unknown names also return `None`, so dependency checks never fail outright
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressRegistry {
    /// The entries, keyed by logical name
    entries: BTreeMap<String, Option<Address>>,
}

impl AddressRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a name as absent unless it already holds an entry
    pub fn declare(&mut self, name: &str) {
        self.entries.entry(name.to_string()).or_insert(None);
    }

    /// Record the outcome of a deployment
    pub fn set(&mut self, name: &str, address: Option<Address>) {
        match address {
            Some(addr) => info!(contract = name, address = %addr, "registered contract address"),
            None => warn!(contract = name, "registered contract as absent"),
        }

        self.entries.insert(name.to_string(), address);
    }

    /// Look up the address of a contract
    pub fn get(&self, name: &str) -> Option<Address> {
        self.entries.get(name).copied().flatten()
    }

    /// Whether the contract has a resolved address
    pub fn is_resolved(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether every named contract has a resolved address
    pub fn all_resolved<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|n| self.is_resolved(n.as_ref()))
    }

    /// The names that are absent from the registry
    pub fn missing<'a, S: AsRef<str>>(&self, names: &'a [S]) -> Vec<&'a str> {
        names.iter().map(AsRef::as_ref).filter(|n| !self.is_resolved(n)).collect()
    }

    /// Iterate over every entry, resolved or not, in name order
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<Address>)> {
        self.entries.iter().map(|(name, addr)| (name.as_str(), *addr))
    }

    /// Iterate over the resolved entries in name order
    pub fn resolved(&self) -> impl Iterator<Item = (&str, Address)> {
        self.entries().filter_map(|(name, addr)| addr.map(|a| (name, a)))
    }

    /// The number of entries, resolved or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ----------
    // | Export |
    // ----------

    /// Render the registry as a flat JSON object
    ///
    /// Absent contracts are omitted, addresses are checksummed
    pub fn to_json(&self, metadata: &RegistryMetadata) -> Value {
        let mut object = Map::new();
        object.insert(CHAIN_ID_KEY.to_string(), Value::from(metadata.chain_id));
        object.insert(PROVIDER_URL_KEY.to_string(), Value::from(metadata.provider_url.clone()));
        if let Some(link) = &metadata.explorer_link {
            object.insert(EXPLORER_LINK_KEY.to_string(), Value::from(link.clone()));
        }

        let deployed = self.resolved().filter(|(name, _)| !metadata.is_external(name));
        let addresses = metadata.external.iter().map(|(k, v)| (k.as_str(), *v)).chain(deployed);
        for (name, address) in addresses {
            object.insert(name.to_string(), Value::from(address.to_checksum(None)));
        }

        Value::Object(object)
    }

    /// Render the registry as a Solidity library of constants
    ///
    /// Absent contracts are listed as comments so they remain visible. Names
    /// imported from an earlier export that are external addresses are only
    /// declared once
    pub fn to_solidity(&self, metadata: &RegistryMetadata) -> String {
        let mut lines = vec![
            "// SPDX-License-Identifier: UNLICENSED".to_string(),
            "pragma solidity 0.8.19;".to_string(),
            String::new(),
            "library DeployedAddresses {".to_string(),
            format!("    uint constant {CHAIN_ID_KEY} = {};", metadata.chain_id),
            format!("    string constant {PROVIDER_URL_KEY} = {:?};", metadata.provider_url),
        ];
        if let Some(link) = &metadata.explorer_link {
            lines.push(format!("    string constant {EXPLORER_LINK_KEY} = {link:?};"));
        }

        let external = metadata.external.iter().map(|(name, addr)| (name.as_str(), Some(*addr)));
        let deployed = self.entries().filter(|(name, _)| !metadata.is_external(name));
        lines.extend(external.chain(deployed).map(|(name, address)| match address {
            Some(addr) => format!("    address constant {name} = {};", addr.to_checksum(None)),
            None => format!("    // {name} was not deployed"),
        }));

        lines.push("}\n".to_string());
        lines.join("\n")
    }

    /// Write the JSON export to the given path
    pub fn write_json(&self, metadata: &RegistryMetadata, path: &Path) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(&self.to_json(metadata))
            .map_err(|e| ExportError::Serde(e.to_string()))?;
        write_file(path, &json)
    }

    /// Write the Solidity export to the given path
    pub fn write_solidity(&self, metadata: &RegistryMetadata, path: &Path) -> Result<(), ExportError> {
        write_file(path, &self.to_solidity(metadata))
    }

    // ----------
    // | Import |
    // ----------

    /// Build a registry from a JSON export
    ///
    /// Metadata entries and values that are not addresses are ignored
    pub fn from_json(value: &Value) -> Result<Self, ExportError> {
        let object = value
            .as_object()
            .ok_or_else(|| ExportError::Serde("deployments file is not a JSON object".to_string()))?;

        let mut registry = Self::new();
        for (name, value) in object {
            if [CHAIN_ID_KEY, PROVIDER_URL_KEY, EXPLORER_LINK_KEY].contains(&name.as_str()) {
                continue;
            }

            if let Some(address) = value.as_str().and_then(|s| s.parse::<Address>().ok()) {
                registry.entries.insert(name.clone(), Some(address));
            }
        }

        Ok(registry)
    }

    /// Load a registry from a JSON export on disk
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let contents = read_file(path)?;
        let value: Value = serde_json::from_str(&contents).map_err(|e| ExportError::Serde(e.to_string()))?;
        Self::from_json(&value)
    }
}

/// Network metadata and externally owned addresses written alongside the
/// registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryMetadata {
    /// The chain id of the network
    pub chain_id: u64,
    /// The RPC URL used for the run
    pub provider_url: String,
    /// The block explorer of the network
    pub explorer_link: Option<String>,
    /// Addresses not deployed by the run, in output order
    pub external: Vec<(String, Address)>,
}

impl RegistryMetadata {
    /// Whether the name is one of the external addresses
    pub fn is_external(&self, name: &str) -> bool {
        self.external.iter().any(|(external, _)| external == name)
    }
}
