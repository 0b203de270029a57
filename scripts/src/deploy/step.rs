//! Execution of a single deployment step

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes},
};
use futures::{stream, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    artifacts::ArtifactStore,
    chain::{ChainClient, TransactionSender, TxParams},
    constants::DEPLOY_FALLBACK_GAS,
    encoder::{coerce_arg, encode_constructor_args},
    errors::{DeploymentError, EncodingError},
    registry::AddressRegistry,
};

use super::{ArgTemplate, ContractSpec, DeployOptions};

/// The lifecycle of one deployment step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepState {
    /// Waiting for its wave
    Pending,
    /// Submitted, awaiting confirmation
    Deploying,
    /// Deployed at the given address
    Confirmed(Address),
    /// Already deployed by an earlier run
    Reused(Address),
    /// Not deployed, with the cause
    Failed(DeploymentError),
}

impl StepState {
    /// The resolved address, if any
    pub fn address(&self) -> Option<Address> {
        match self {
            StepState::Confirmed(addr) | StepState::Reused(addr) => Some(*addr),
            _ => None,
        }
    }
}

/// A spec paired with its state in the current run
#[derive(Debug, Clone)]
pub struct DeploymentStep {
    /// The spec being deployed
    pub spec: ContractSpec,
    /// The current state
    pub state: StepState,
}

impl DeploymentStep {
    /// A pending step
    pub fn new(spec: ContractSpec) -> Self {
        Self { spec, state: StepState::Pending }
    }

    /// Move to `Deploying`
    pub fn begin(&mut self) {
        debug!(contract = %self.spec.name, wave = self.spec.wave, "deploying");
        self.state = StepState::Deploying;
    }

    /// Move to a terminal state
    pub fn finish(&mut self, result: Result<Address, DeploymentError>) {
        self.state = match result {
            Ok(address) => StepState::Confirmed(address),
            Err(e) => {
                warn!(contract = %self.spec.name, wave = self.spec.wave, "deployment failed: {e}");
                StepState::Failed(e)
            },
        };
    }

    /// Mark the step as satisfied by an address from an earlier run
    pub fn reuse(&mut self, address: Address) {
        info!(contract = %self.spec.name, %address, "reusing existing deployment");
        self.state = StepState::Reused(address);
    }
}

/// A deployment whose dependencies are resolved and whose init-code is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDeployment {
    /// The logical name of the contract
    pub name: String,
    /// The artifact the init-code came from
    pub artifact: String,
    /// Creation bytecode followed by the constructor arguments
    pub init_code: Bytes,
    /// The encoded constructor arguments alone, for verification
    pub constructor_args: Vec<u8>,
}

/// Deploys contracts from an artifact store through a single signing key
pub struct Deployer<'a, C> {
    /// Serialises submissions from the key
    sender: TransactionSender<'a, C>,
    /// Compiled contracts
    artifacts: &'a ArtifactStore,
    /// Run tunables
    options: DeployOptions,
}

impl<'a, C: ChainClient> Deployer<'a, C> {
    /// Create a deployer
    pub fn new(client: &'a C, artifacts: &'a ArtifactStore, options: DeployOptions) -> Self {
        Self { sender: TransactionSender::new(client), artifacts, options }
    }

    /// The run tunables
    pub fn options(&self) -> &DeployOptions {
        &self.options
    }

    /// Resolve a spec's arguments against the registry and build its init-code
    ///
    /// Fails without touching the chain if a dependency is absent
    pub fn prepare(
        &self,
        spec: &ContractSpec,
        registry: &AddressRegistry,
    ) -> Result<PreparedDeployment, DeploymentError> {
        let dependencies: Vec<&str> = spec.dependencies().collect();
        if let Some(missing) = registry.missing(&dependencies).first() {
            return Err(DeploymentError::MissingDependency(missing.to_string()));
        }

        let artifact =
            self.artifacts.get(&spec.artifact).ok_or_else(|| DeploymentError::MissingArtifact(spec.artifact.clone()))?;
        let types = artifact.constructor_types()?;
        if types.len() != spec.args.len() {
            return Err(EncodingError::ArgumentCount {
                signature: format!("{} constructor", spec.artifact),
                expected: types.len(),
                actual: spec.args.len(),
            }
            .into());
        }

        let values = spec
            .args
            .iter()
            .zip(&types)
            .enumerate()
            .map(|(index, (arg, ty))| match arg {
                ArgTemplate::Literal(text) => coerce_arg(index, ty, text).map_err(DeploymentError::from),
                ArgTemplate::Contract(name) => registry
                    .get(name)
                    .map(DynSolValue::Address)
                    .ok_or_else(|| DeploymentError::MissingDependency(name.clone())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let constructor_args = encode_constructor_args(artifact.abi.constructor(), &values)?;
        let init_code = artifact.init_code(&values)?;

        Ok(PreparedDeployment { name: spec.name.clone(), artifact: spec.artifact.clone(), init_code, constructor_args })
    }

    /// Submit a prepared deployment and wait for its confirmations
    pub async fn deploy(&self, prepared: &PreparedDeployment) -> Result<Address, DeploymentError> {
        let (hash, gas) =
            self.sender.submit(TxParams::deploy(prepared.init_code.clone()), DEPLOY_FALLBACK_GAS).await?;
        info!(contract = %prepared.name, %hash, gas_limit = gas.with_margin(), "deploy transaction sent");

        let receipt = self.sender.client().wait_for_confirmations(hash, self.options.confirmations).await?;
        if !receipt.success {
            return Err(DeploymentError::Reverted(hash));
        }

        let address = receipt.contract_address.ok_or(DeploymentError::NoContractAddress(hash))?;
        info!(contract = %prepared.name, %address, gas_used = receipt.gas_used, "contract deployed");
        Ok(address)
    }

    /// Verify the sources of deployed contracts with the block explorer
    ///
    /// Runs once every wave has settled. Failures are logged rather than
    /// propagated, returns the number of contracts verified
    pub async fn verify_all(&self, deployed: &[DeployedContract]) -> usize {
        if !self.options.verify || deployed.is_empty() {
            return 0;
        }

        if !self.options.verify_delay.is_zero() {
            info!(contracts = deployed.len(), delay = ?self.options.verify_delay, "waiting for explorer to index");
            tokio::time::sleep(self.options.verify_delay).await;
        }

        let results: Vec<bool> = stream::iter(deployed)
            .map(|d| self.verify(d))
            .buffer_unordered(self.options.max_concurrency.max(1))
            .collect()
            .await;
        results.into_iter().filter(|verified| *verified).count()
    }

    /// Verify one deployed contract
    async fn verify(&self, deployed: &DeployedContract) -> bool {
        let DeployedContract { prepared, address } = deployed;
        match self.sender.client().verify_source(*address, &prepared.artifact, &prepared.constructor_args).await {
            Ok(()) => {
                info!(contract = %prepared.name, %address, "source verified");
                true
            },
            Err(e) => {
                warn!(contract = %prepared.name, %address, "verification failed: {e}");
                false
            },
        }
    }
}

/// A contract deployed by this run, kept for source verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    /// The deployment that produced it
    pub prepared: PreparedDeployment,
    /// Where it was deployed
    pub address: Address,
}
