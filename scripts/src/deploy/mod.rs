//! Wave-ordered deployment of a contract catalogue
//!
//! A catalogue is a list of [`ContractSpec`]s, each assigned to a wave. A spec
//! may only reference specs in strictly earlier waves, so every spec of one
//! wave can be deployed concurrently once the previous wave has settled

use std::{collections::HashMap, time::Duration};

use crate::{
    constants::{DEFAULT_MAX_CONCURRENCY, DEFAULT_VERIFY_DELAY_SECS, NUM_DEPLOY_CONFIRMATIONS},
    errors::CatalogueError,
};

mod scheduler;
mod step;

pub use scheduler::{DeploymentReport, StepReport, WaveScheduler};
pub use step::{DeployedContract, Deployer, DeploymentStep, PreparedDeployment, StepState};

/// One constructor argument of a [`ContractSpec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgTemplate {
    /// A literal, coerced against the constructor parameter type
    Literal(String),
    /// The address another spec resolved to
    Contract(String),
}

impl ArgTemplate {
    /// A literal argument
    pub fn literal(value: impl ToString) -> Self {
        ArgTemplate::Literal(value.to_string())
    }

    /// A reference to another spec's address
    pub fn contract(name: impl Into<String>) -> Self {
        ArgTemplate::Contract(name.into())
    }
}

/// The static description of one contract to deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSpec {
    /// The logical name, the key in the address registry
    pub name: String,
    /// The name of the compiled artifact to deploy
    pub artifact: String,
    /// The constructor arguments
    pub args: Vec<ArgTemplate>,
    /// The wave the spec is deployed in
    pub wave: usize,
}

impl ContractSpec {
    /// Create a spec
    pub fn new(name: impl Into<String>, artifact: impl Into<String>, wave: usize, args: Vec<ArgTemplate>) -> Self {
        Self { name: name.into(), artifact: artifact.into(), args, wave }
    }

    /// The logical names this spec references
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|arg| match arg {
            ArgTemplate::Contract(name) => Some(name.as_str()),
            ArgTemplate::Literal(_) => None,
        })
    }
}

/// Check that names are unique and that every reference points at a spec in a
/// strictly earlier wave
pub fn validate_catalogue(specs: &[ContractSpec]) -> Result<(), CatalogueError> {
    let mut waves: HashMap<&str, usize> = HashMap::with_capacity(specs.len());
    for spec in specs {
        if waves.insert(spec.name.as_str(), spec.wave).is_some() {
            return Err(CatalogueError::DuplicateName(spec.name.clone()));
        }
    }

    for spec in specs {
        for dependency in spec.dependencies() {
            let dependency_wave = *waves.get(dependency).ok_or_else(|| CatalogueError::UnknownDependency {
                contract: spec.name.clone(),
                dependency: dependency.to_string(),
            })?;

            if dependency_wave >= spec.wave {
                return Err(CatalogueError::ForwardReference {
                    contract: spec.name.clone(),
                    wave: spec.wave,
                    dependency: dependency.to_string(),
                    dependency_wave,
                });
            }
        }
    }

    Ok(())
}

/// Tunables of a deployment run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    /// Confirmations to wait for each deployment
    pub confirmations: u64,
    /// The maximum number of deployments in flight within a wave
    pub max_concurrency: usize,
    /// Whether to verify sources with the block explorer
    pub verify: bool,
    /// How long to let the explorer index a contract before verifying it
    pub verify_delay: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            confirmations: NUM_DEPLOY_CONFIRMATIONS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            verify: false,
            verify_delay: Duration::from_secs(DEFAULT_VERIFY_DELAY_SECS),
        }
    }
}


#[cfg(test)]
mod tests {
    use crate::errors::CatalogueError;

    use super::{validate_catalogue, ArgTemplate, ContractSpec};

    fn spec(name: &str, wave: usize, deps: &[&str]) -> ContractSpec {
        let args = deps.iter().map(|d| ArgTemplate::contract(*d)).collect();
        ContractSpec::new(name, "Artifact", wave, args)
    }

    #[test]
    fn test_valid_catalogue() {
        let specs = vec![spec("a", 0, &[]), spec("b", 1, &["a"]), spec("c", 2, &["a", "b"])];
        assert_eq!(validate_catalogue(&specs), Ok(()));
    }

    #[test]
    fn test_same_wave_reference_rejected() {
        let specs = vec![spec("a", 0, &[]), spec("b", 1, &["a"]), spec("c", 1, &["b"])];
        assert_eq!(
            validate_catalogue(&specs),
            Err(CatalogueError::ForwardReference {
                contract: "c".to_string(),
                wave: 1,
                dependency: "b".to_string(),
                dependency_wave: 1,
            })
        );
    }

    #[test]
    fn test_forward_reference_rejected() {
        let specs = vec![spec("a", 0, &["b"]), spec("b", 1, &[])];
        assert!(matches!(validate_catalogue(&specs), Err(CatalogueError::ForwardReference { .. })));
    }

    #[test]
    fn test_unknown_and_duplicate_names_rejected() {
        let specs = vec![spec("a", 0, &[]), spec("b", 1, &["ghost"])];
        assert_eq!(
            validate_catalogue(&specs),
            Err(CatalogueError::UnknownDependency { contract: "b".to_string(), dependency: "ghost".to_string() })
        );

        let specs = vec![spec("a", 0, &[]), spec("a", 1, &[])];
        assert_eq!(validate_catalogue(&specs), Err(CatalogueError::DuplicateName("a".to_string())));
    }

    #[test]
    fn test_literals_are_not_dependencies() {
        let spec = ContractSpec::new(
            "governorExecutor",
            "GovernorExecutor",
            2,
            vec![ArgTemplate::literal("0x96f67a852f8D3Bc05464C4F91F97aACE060e247A"), ArgTemplate::contract("govOps")],
        );
        assert_eq!(spec.dependencies().collect::<Vec<_>>(), vec!["govOps"]);
    }
}
