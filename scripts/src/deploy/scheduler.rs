//! Wave-by-wave scheduling of deployment steps

use std::collections::BTreeMap;

use futures::{stream, StreamExt};
use itertools::Itertools;
use tracing::{error, info};

use crate::{
    chain::ChainClient,
    errors::{CatalogueError, DeploymentError},
    registry::AddressRegistry,
};

use super::{validate_catalogue, ContractSpec, DeployedContract, Deployer, DeploymentStep, StepState};

/// Orders a validated catalogue into waves and drives their deployment
#[derive(Debug, Clone)]
pub struct WaveScheduler {
    /// The specs of each wave, in catalogue order within a wave
    waves: BTreeMap<usize, Vec<ContractSpec>>,
}

impl WaveScheduler {
    /// Validate a catalogue and group it into waves
    pub fn new(specs: Vec<ContractSpec>) -> Result<Self, CatalogueError> {
        validate_catalogue(&specs)?;
        let waves = specs.into_iter().into_group_map_by(|s| s.wave).into_iter().collect();
        Ok(Self { waves })
    }

    /// The waves in execution order
    pub fn waves(&self) -> impl Iterator<Item = (usize, &[ContractSpec])> {
        self.waves.iter().map(|(wave, specs)| (*wave, specs.as_slice()))
    }

    /// The logical names of every spec
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.waves.values().flatten().map(|s| s.name.as_str())
    }

    /// Deploy every wave in ascending order, recording outcomes in `registry`
    ///
    /// Names already resolved in the registry are reused rather than
    /// redeployed. A step whose dependency is absent fails without being
    /// submitted, and the failure of one step never stops its siblings.
    /// Nothing is verified here, see [`Deployer::verify_all`]
    pub async fn run<C: ChainClient>(
        &self,
        deployer: &Deployer<'_, C>,
        registry: &mut AddressRegistry,
    ) -> DeploymentReport {
        for name in self.names() {
            registry.declare(name);
        }

        let max_concurrency = deployer.options().max_concurrency.max(1);
        let mut report = DeploymentReport::default();

        for (wave, specs) in self.waves() {
            info!(wave, contracts = specs.len(), "starting deployment wave");
            let mut steps: Vec<DeploymentStep> = specs.iter().cloned().map(DeploymentStep::new).collect();

            // Resolve every step against the registry as it stood at the end
            // of the previous wave
            let mut prepared = Vec::new();
            for (index, step) in steps.iter_mut().enumerate() {
                if let Some(address) = registry.get(&step.spec.name) {
                    step.reuse(address);
                    continue;
                }

                match deployer.prepare(&step.spec, registry) {
                    Ok(p) => {
                        step.begin();
                        prepared.push((index, p));
                    },
                    Err(e) => step.finish(Err(e)),
                }
            }

            // `buffered` yields in submission order, so results line up with
            // `prepared`
            let results: Vec<Result<_, DeploymentError>> = stream::iter(prepared.iter())
                .map(|(_, p)| deployer.deploy(p))
                .buffered(max_concurrency)
                .collect()
                .await;

            for ((index, prepared), result) in prepared.into_iter().zip(results) {
                if let Ok(address) = &result {
                    report.deployed.push(DeployedContract { prepared, address: *address });
                }
                steps[index].finish(result);
            }

            // Every step of the wave is terminal here, publish before the next
            // wave resolves its dependencies
            for step in steps {
                if !matches!(step.state, StepState::Reused(_)) {
                    registry.set(&step.spec.name, step.state.address());
                }
                report.steps.push(StepReport { name: step.spec.name, wave, state: step.state });
            }
        }

        report.log_summary();
        report
    }
}

/// The outcome of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// The logical name of the contract
    pub name: String,
    /// The wave the step ran in
    pub wave: usize,
    /// The terminal state
    pub state: StepState,
}

/// The outcome of a deployment run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentReport {
    /// Every step in execution order
    pub steps: Vec<StepReport>,
    /// The contracts this run deployed, awaiting source verification
    pub deployed: Vec<DeployedContract>,
}

impl DeploymentReport {
    /// The number of contracts deployed by this run
    pub fn confirmed(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s.state, StepState::Confirmed(_))).count()
    }

    /// The number of contracts reused from an earlier run
    pub fn reused(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s.state, StepState::Reused(_))).count()
    }

    /// The failed steps and their causes
    pub fn failures(&self) -> impl Iterator<Item = (&str, &DeploymentError)> {
        self.steps.iter().filter_map(|s| match &s.state {
            StepState::Failed(e) => Some((s.name.as_str(), e)),
            _ => None,
        })
    }

    /// The number of failed steps
    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    /// The state of a named step
    pub fn state(&self, name: &str) -> Option<&StepState> {
        self.steps.iter().find(|s| s.name == name).map(|s| &s.state)
    }

    /// Log the counts and every failure
    pub fn log_summary(&self) {
        info!(
            confirmed = self.confirmed(),
            reused = self.reused(),
            failed = self.failed(),
            "deployment run finished"
        );
        for (name, e) in self.failures() {
            error!(contract = name, "not deployed: {e}");
        }
    }
}
