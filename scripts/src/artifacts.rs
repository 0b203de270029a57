//! Lookup of compiled contract artifacts and assembly of deployment init-code

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::{
    constants::BYTECODE_DIR,
    encoder::{constructor_types, encode_constructor_args},
    errors::{EncodingError, ExportError},
    utils::{read_file, write_json},
};

/// Directories under the artifacts root that never hold deployable contracts
const SKIPPED_DIRS: &[&str] = &["interfaces", "build-info"];

/// The suffix of Hardhat debug files sitting next to each artifact
const DEBUG_SUFFIX: &str = ".dbg.json";

/// A compiled contract: its ABI and creation bytecode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    /// The name of the contract in its source file
    pub contract_name: String,
    /// The contract ABI
    pub abi: JsonAbi,
    /// The creation bytecode
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// The Solidity types of the constructor parameters
    pub fn constructor_types(&self) -> Result<Vec<DynSolType>, EncodingError> {
        constructor_types(self.abi.constructor())
    }

    /// The deployment init-code: creation bytecode followed by the encoded
    /// constructor arguments
    pub fn init_code(&self, args: &[DynSolValue]) -> Result<Bytes, EncodingError> {
        let encoded_args = encode_constructor_args(self.abi.constructor(), args)?;

        let mut code = Vec::with_capacity(self.bytecode.len() + encoded_args.len());
        code.extend_from_slice(&self.bytecode);
        code.extend_from_slice(&encoded_args);
        Ok(code.into())
    }
}

/// An index of contract artifacts by contract name
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    /// The indexed artifacts
    artifacts: BTreeMap<String, ContractArtifact>,
}

impl ArtifactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every artifact found recursively under `root`
    ///
    /// Files that fail to parse as an artifact are skipped, so build info and
    /// other compiler output may live in the same tree
    pub fn load(root: &Path) -> Result<Self, ExportError> {
        let mut store = Self::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for path in read_dir_sorted(&dir)? {
                if path.is_dir() {
                    let skipped = path.file_name().and_then(|n| n.to_str()).is_some_and(|n| SKIPPED_DIRS.contains(&n));
                    if !skipped {
                        pending.push(path);
                    }
                    continue;
                }

                if !is_artifact_file(&path) {
                    continue;
                }

                match serde_json::from_str::<ContractArtifact>(&read_file(&path)?) {
                    Ok(artifact) => store.insert(artifact),
                    Err(e) => debug!(path = %path.display(), "skipping non-artifact file: {e}"),
                }
            }
        }

        debug!(count = store.len(), root = %root.display(), "indexed contract artifacts");
        Ok(store)
    }

    /// Add an artifact to the store, replacing one of the same name
    pub fn insert(&mut self, artifact: ContractArtifact) {
        self.artifacts.insert(artifact.contract_name.clone(), artifact);
    }

    /// Look up an artifact by contract name
    pub fn get(&self, name: &str) -> Option<&ContractArtifact> {
        self.artifacts.get(name)
    }

    /// The number of indexed artifacts
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Write `<Name>.json` holding the ABI, and `bytecode/<Name>.bytecode.json`
    /// holding the creation bytecode, for every indexed artifact
    pub fn export(&self, out_dir: &Path) -> Result<usize, ExportError> {
        for (name, artifact) in &self.artifacts {
            write_json(&out_dir.join(format!("{name}.json")), &artifact.abi)?;

            let bytecode_path = out_dir.join(BYTECODE_DIR).join(format!("{name}.bytecode.json"));
            write_json(&bytecode_path, &json!({ "bytecode": artifact.bytecode }))?;
        }

        Ok(self.artifacts.len())
    }
}

/// Whether the path names a Hardhat artifact rather than a debug file
fn is_artifact_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    name.ends_with(".json") && !name.ends_with(DEBUG_SUFFIX)
}

/// List a directory in a deterministic order
fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    let read_err = |e: std::io::Error| ExportError::Read { path: dir.to_path_buf(), reason: e.to_string() };

    let mut paths = fs::read_dir(dir)
        .map_err(read_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use alloy::{
        dyn_abi::{DynSolType, DynSolValue},
        primitives::{address, U256},
    };
    use serde_json::json;

    use super::ArtifactStore;

    /// A minimal Hardhat artifact with a two-argument constructor
    fn artifact_json(name: &str) -> serde_json::Value {
        json!({
            "_format": "hh-sol-artifact-1",
            "contractName": name,
            "sourceName": format!("contracts/{name}.sol"),
            "abi": [{
                "type": "constructor",
                "stateMutability": "nonpayable",
                "inputs": [
                    { "name": "admin_", "type": "address", "internalType": "address" },
                    { "name": "delay_", "type": "uint256", "internalType": "uint256" }
                ]
            }],
            "bytecode": "0x6080604052",
            "deployedBytecode": "0x6080"
        })
    }

    #[test]
    fn test_load_skips_interfaces_and_debug_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("contracts/Executor.sol")).unwrap();
        fs::create_dir_all(root.join("contracts/interfaces/IExecutor.sol")).unwrap();
        fs::create_dir_all(root.join("build-info")).unwrap();

        let write = |path: &str, value: serde_json::Value| fs::write(root.join(path), value.to_string()).unwrap();
        write("contracts/Executor.sol/GovernorExecutor.json", artifact_json("GovernorExecutor"));
        write("contracts/Executor.sol/GovernorExecutor.dbg.json", json!({ "_format": "hh-sol-dbg-1" }));
        write("contracts/interfaces/IExecutor.sol/IExecutor.json", artifact_json("IExecutor"));
        write("build-info/abc.json", json!({ "id": "abc" }));

        let store = ArtifactStore::load(root).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("GovernorExecutor").is_some());
        assert!(store.get("IExecutor").is_none());
    }

    #[test]
    fn test_init_code_appends_constructor_args() {
        let mut store = ArtifactStore::new();
        store.insert(serde_json::from_value(artifact_json("GovernorExecutor")).unwrap());
        let artifact = store.get("GovernorExecutor").unwrap();

        assert_eq!(artifact.constructor_types().unwrap(), vec![DynSolType::Address, DynSolType::Uint(256)]);

        let admin = address!("96f67a852f8D3Bc05464C4F91F97aACE060e247A");
        let args = [DynSolValue::Address(admin), DynSolValue::Uint(U256::from(3600), 256)];
        let code = artifact.init_code(&args).unwrap();

        assert_eq!(code.len(), 5 + 64);
        assert_eq!(&code[..5], &[0x60, 0x80, 0x60, 0x40, 0x52]);
        assert_eq!(&code[5 + 12..5 + 32], admin.as_slice());
        assert!(artifact.init_code(&[]).is_err());
    }

    #[test]
    fn test_export_writes_abi_and_bytecode() {
        let mut store = ArtifactStore::new();
        store.insert(serde_json::from_value(artifact_json("Don")).unwrap());

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store.export(dir.path()).unwrap(), 1);

        let abi: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("Don.json")).unwrap()).unwrap();
        assert_eq!(abi[0]["type"], "constructor");

        let bytecode: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("bytecode/Don.bytecode.json")).unwrap()).unwrap();
        assert_eq!(bytecode["bytecode"], "0x6080604052");
    }
}
