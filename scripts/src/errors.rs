//! Definitions of errors that can occur during the execution of the deployment scripts

use std::path::PathBuf;

use alloy::primitives::{Address, TxHash};
use thiserror::Error;

use crate::types::Network;

/// Errors that can occur during the execution of the deployment scripts
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The run was misconfigured, raised before any on-chain action
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    /// The contract catalogue failed static validation
    #[error("invalid contract catalogue: {0}")]
    Catalogue(#[from] CatalogueError),
    /// The transaction plan could not be built
    #[error("error building transaction plan: {0}")]
    Plan(#[from] PlanError),
    /// An artifact could not be rendered or persisted
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    /// The chain client could not be set up or failed outright
    #[error("chain client error: {0}")]
    Chain(#[from] ChainError),
    /// Two exported artifacts disagree with each other
    #[error("artifacts have drifted: {0}")]
    ArtifactDrift(String),
    /// Direct execution was stopped after a failed transaction
    #[error("execution aborted at transaction {index}")]
    ExecutionAborted {
        /// The zero-based index of the failed transaction
        index: usize,
    },
}

/// Fatal configuration errors, all raised before any on-chain action
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `--network` was given
    #[error("no network selected, pass --network")]
    MissingNetwork,
    /// The command signs transactions but no private key was supplied
    #[error("no signing key, set DEPLOYER_PRIVATE_KEY or pass --priv-key")]
    MissingPrivateKey,
    /// The output root directory does not exist
    #[error("output root {0} does not exist")]
    MissingRoot(PathBuf),
    /// The configuration file has no section for the selected network
    #[error("no configuration for network {0}")]
    UnknownNetwork(Network),
    /// The configuration file was written for a different schema version
    #[error("unsupported config version {found}, expected {expected}")]
    UnsupportedVersion {
        /// The version found in the file
        found: u32,
        /// The version this build understands
        expected: u32,
    },
    /// The configuration file could not be read
    #[error("error reading config {path}: {reason}")]
    Read {
        /// The path of the configuration file
        path: PathBuf,
        /// The underlying error message
        reason: String,
    },
    /// A configuration value is malformed
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// The offending field
        field: String,
        /// Why the value was rejected
        reason: String,
    },
}

/// Static validation failures of a contract catalogue
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogueError {
    /// Two specs share a logical name
    #[error("duplicate contract name `{0}`")]
    DuplicateName(String),
    /// A spec references a name no spec declares
    #[error("`{contract}` references unknown contract `{dependency}`")]
    UnknownDependency {
        /// The referencing spec
        contract: String,
        /// The unknown reference
        dependency: String,
    },
    /// A spec references a spec in the same or a later wave
    #[error(
        "`{contract}` (wave {wave}) references `{dependency}` (wave {dependency_wave}), \
         dependencies must live in a strictly earlier wave"
    )]
    ForwardReference {
        /// The referencing spec
        contract: String,
        /// The wave of the referencing spec
        wave: usize,
        /// The referenced spec
        dependency: String,
        /// The wave of the referenced spec
        dependency_wave: usize,
    },
}

/// Per-step deployment failures, recoverable at the run level
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeploymentError {
    /// A dependency resolved to absent, so the step was never attempted
    #[error("dependency `{0}` is not deployed")]
    MissingDependency(String),
    /// No compiled artifact exists for the contract
    #[error("no artifact for contract `{0}`")]
    MissingArtifact(String),
    /// The constructor arguments could not be encoded
    #[error("error encoding constructor arguments: {0}")]
    Encoding(#[from] EncodingError),
    /// The chain client rejected an operation
    #[error(transparent)]
    Chain(#[from] ChainError),
    /// The deploy transaction was mined but reverted
    #[error("deploy transaction {0} reverted")]
    Reverted(TxHash),
    /// The receipt carries no contract address
    #[error("deploy transaction {0} created no contract")]
    NoContractAddress(TxHash),
}

/// Errors producing call-data, fatal only to the rule being encoded
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// The function signature could not be parsed
    #[error("invalid function signature `{signature}`: {reason}")]
    InvalidSignature {
        /// The signature as given
        signature: String,
        /// The parser's message
        reason: String,
    },
    /// The number of arguments does not match the number of parameters
    #[error("`{signature}` takes {expected} arguments, got {actual}")]
    ArgumentCount {
        /// The signature being encoded
        signature: String,
        /// The declared parameter count
        expected: usize,
        /// The supplied argument count
        actual: usize,
    },
    /// An address argument is not a 20-byte hex value
    #[error("`{0}` is not a valid 20-byte address")]
    InvalidAddress(String),
    /// An argument does not match its parameter type
    #[error("argument {index} does not match parameter type `{expected}`: {reason}")]
    ArgumentType {
        /// The zero-based argument position
        index: usize,
        /// The declared parameter type
        expected: String,
        /// Why the argument was rejected
        reason: String,
    },
    /// A string is too long to be packed into a `bytes32`
    #[error("`{0}` does not fit in bytes32")]
    Bytes32Overflow(String),
}

/// Block explorer verification failures, logged and never fatal
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// The verifier could not be launched
    #[error("error launching verifier: {0}")]
    Launch(String),
    /// The verifier ran and reported a failure
    #[error("verification of {address} failed: {reason}")]
    Rejected {
        /// The contract being verified
        address: Address,
        /// The verifier's message
        reason: String,
    },
}

/// Failures reported by the chain client capability
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The client could not be constructed
    #[error("error initializing client: {0}")]
    ClientInitialization(String),
    /// Fetching the nonce of the sender failed
    #[error("error fetching nonce: {0}")]
    NonceFetching(String),
    /// Fetching the gas price failed
    #[error("error fetching gas price: {0}")]
    GasPrice(String),
    /// Gas estimation failed
    #[error("error estimating gas: {0}")]
    GasEstimation(String),
    /// Broadcasting the transaction failed
    #[error("error sending transaction: {0}")]
    Submission(String),
    /// Waiting for the confirmations failed or timed out
    #[error("error awaiting confirmation of {hash}: {reason}")]
    Confirmation {
        /// The transaction being awaited
        hash: TxHash,
        /// The underlying error message
        reason: String,
    },
    /// A mined transaction reverted
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
}

/// Errors constructing a transaction plan
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    /// Two rules share an id
    #[error("duplicate rule id `{0}`")]
    DuplicateRule(String),
    /// A rule orders itself relative to an unknown rule
    #[error("rule `{rule}` must precede unknown rule `{reference}`")]
    UnknownRule {
        /// The annotated rule
        rule: String,
        /// The unknown rule id
        reference: String,
    },
    /// The ordering annotations contain a cycle
    #[error("ordering cycle between rules: {}", .0.join(", "))]
    OrderingCycle(Vec<String>),
    /// An on-chain invariant would be violated by the ordered sequence
    #[error("invariant violated: {0}")]
    Invariant(String),
    /// A governance parameter cannot be turned into a call
    #[error("invalid parameter `{param}` for `{contract}`: {reason}")]
    InvalidParameter {
        /// The governor being reconfigured
        contract: String,
        /// The parameter name
        param: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Errors rendering or persisting an artifact
#[derive(Debug, Error)]
pub enum ExportError {
    /// The plan carries a record that cannot be executed
    #[error("malformed plan, record {index}: {reason}")]
    MalformedPlan {
        /// The zero-based record index
        index: usize,
        /// What is wrong with the record
        reason: String,
    },
    /// Writing a file failed
    #[error("error writing {path}: {reason}")]
    Write {
        /// The destination path
        path: PathBuf,
        /// The underlying error message
        reason: String,
    },
    /// Reading a file failed
    #[error("error reading {path}: {reason}")]
    Read {
        /// The source path
        path: PathBuf,
        /// The underlying error message
        reason: String,
    },
    /// Serializing or parsing JSON failed
    #[error("error de/serializing artifact: {0}")]
    Serde(String),
}
