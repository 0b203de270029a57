//! Implementations of the various governance scripts

use std::{path::PathBuf, time::Duration};

use tracing::{info, warn};

use crate::{
    artifacts::ArtifactStore,
    catalogue::{
        governance_contracts, wiring_rules, GOV_PARAMS_PLAN_DESCRIPTION, GOV_PARAMS_PLAN_NAME,
        WIRING_PLAN_DESCRIPTION, WIRING_PLAN_NAME,
    },
    chain::{AlloyChainClient, ChainClient},
    cli::{CheckArgs, DeployArgs, ExecuteArgs, GlobalArgs, PlanArgs},
    config::{require_private_key, DeployConfig, RunContext},
    constants::{
        deployments_file, ABI_DIR, EOA_SCRIPT_FILE, GOV_PARAMS_EOA_SCRIPT_FILE, GOV_PARAMS_SAFE_BATCH_FILE,
        NUM_CALL_CONFIRMATIONS, SAFE_BATCH_FILE, SOLIDITY_ADDRESSES_FILE,
    },
    deploy::{DeployOptions, Deployer, WaveScheduler},
    errors::{ConfigError, ScriptError},
    executor::{FailurePolicy, FixedPolicy, PlanExecutor, PromptPolicy},
    export::{check_consistency, render_eoa_script, render_safe_batch, SafeBatch},
    plan::{governance_rules, PlanMetadata, TransactionPlan, TransactionPlanBuilder, WiringRule},
    registry::AddressRegistry,
    utils::{now_millis, read_file, write_file},
};

/// Deploy every contract, export the registry, and write the wiring batch
pub async fn deploy(args: DeployArgs, global: &GlobalArgs) -> Result<(), ScriptError> {
    let ctx = run_context(global)?;
    let priv_key = require_private_key(global.priv_key.clone())?;

    let scheduler = WaveScheduler::new(governance_contracts(&ctx.config))?;
    let artifacts = ArtifactStore::load(&args.artifacts)?;
    info!(artifacts = artifacts.len(), "loaded contract artifacts");
    if args.export_abis {
        let exported = artifacts.export(&ctx.out_path(ABI_DIR))?;
        info!(exported, "exported ABIs and bytecode");
    }

    let deployments_path = ctx.out_path(deployments_file(ctx.network));
    let mut registry = if args.resume && deployments_path.exists() {
        let registry = AddressRegistry::load(&deployments_path)?;
        info!(resolved = registry.resolved().count(), "resuming from {}", deployments_path.display());
        registry
    } else {
        AddressRegistry::new()
    };

    let client = connect(&ctx, &priv_key, global).await?;
    let verify = !args.no_verify && !ctx.network.skips_verification();
    let options = DeployOptions {
        confirmations: args.confirmations,
        max_concurrency: args.max_concurrency,
        verify,
        verify_delay: Duration::from_secs(args.verify_delay),
    };
    let deployer = Deployer::new(&client, &artifacts, options);

    let report = scheduler.run(&deployer, &mut registry).await;
    if report.failed() > 0 {
        warn!(failed = report.failed(), "some contracts were not deployed, their wiring calls will be skipped");
    }

    let metadata = ctx.registry_metadata();
    registry.write_json(&metadata, &deployments_path)?;
    registry.write_solidity(&metadata, &ctx.out_path(SOLIDITY_ADDRESSES_FILE))?;
    info!("wrote deployments to {}", deployments_path.display());

    let plan = wiring_plan(&ctx, &registry)?;
    write_plan(&ctx, &plan, SAFE_BATCH_FILE, EOA_SCRIPT_FILE)?;

    let verified = deployer.verify_all(&report.deployed).await;
    if verify {
        info!(verified, deployed = report.deployed.len(), "source verification finished");
    }
    Ok(())
}

/// Rebuild the wiring batch from a deployments file
pub fn plan(args: PlanArgs, global: &GlobalArgs) -> Result<(), ScriptError> {
    let ctx = run_context(global)?;
    let registry = load_registry(&ctx, args.deployments)?;

    let plan = wiring_plan(&ctx, &registry)?;
    write_plan(&ctx, &plan, SAFE_BATCH_FILE, EOA_SCRIPT_FILE)
}

/// Build the governance parameter batch from the configuration
pub fn gov_params(args: PlanArgs, global: &GlobalArgs) -> Result<(), ScriptError> {
    let ctx = run_context(global)?;
    if ctx.config.governance.is_empty() {
        warn!(network = %ctx.network, "no governance parameter changes configured");
        return Ok(());
    }

    let registry = load_registry(&ctx, args.deployments)?;
    let rules = governance_rules(&ctx.config.governance)?;
    let plan = build_plan(&ctx, &registry, &rules, GOV_PARAMS_PLAN_NAME, GOV_PARAMS_PLAN_DESCRIPTION)?;
    write_plan(&ctx, &plan, GOV_PARAMS_SAFE_BATCH_FILE, GOV_PARAMS_EOA_SCRIPT_FILE)
}

/// Execute a Safe batch from the deployer key
pub async fn execute(args: ExecuteArgs, global: &GlobalArgs) -> Result<(), ScriptError> {
    let ctx = run_context(global)?;
    let priv_key = require_private_key(global.priv_key.clone())?;

    let batch_path = args.batch.unwrap_or_else(|| ctx.out_path(SAFE_BATCH_FILE));
    let batch = SafeBatch::load(&batch_path)?;
    if !batch.checksum_matches() {
        return Err(ScriptError::ArtifactDrift(format!(
            "checksum of {} does not match its transactions",
            batch_path.display()
        )));
    }
    if batch.chain_id != ctx.network.chain_id() {
        return Err(ConfigError::InvalidValue {
            field: "chainId".to_string(),
            reason: format!(
                "batch targets chain {}, network {} is chain {}",
                batch.chain_id,
                ctx.network,
                ctx.network.chain_id()
            ),
        }
        .into());
    }

    let client = connect(&ctx, &priv_key, global).await?;
    let executor = PlanExecutor::new(&client, NUM_CALL_CONFIRMATIONS);

    let mut policy: Box<dyn FailurePolicy> = match args.on_failure.fixed() {
        Some(answer) => Box::new(FixedPolicy(answer)),
        None => Box::new(PromptPolicy),
    };
    info!(transactions = batch.transactions.len(), "executing {}", batch.meta.name);
    let report = executor.execute(&batch.transactions, policy.as_mut()).await?;

    match report.aborted_at() {
        Some(index) => Err(ScriptError::ExecutionAborted { index }),
        None => Ok(()),
    }
}

/// Check that a Safe batch and an EOA script carry the same calls
pub fn check(args: CheckArgs, global: &GlobalArgs) -> Result<(), ScriptError> {
    let batch_path = args.batch.unwrap_or_else(|| global.out_dir.join(SAFE_BATCH_FILE));
    let script_path = args.script.unwrap_or_else(|| global.out_dir.join(EOA_SCRIPT_FILE));

    let batch = SafeBatch::load(&batch_path)?;
    let script = read_file(&script_path)?;
    check_consistency(&batch, &script)?;

    info!(
        transactions = batch.transactions.len(),
        checksum = %batch.checksum,
        "{} and {} are consistent",
        batch_path.display(),
        script_path.display()
    );
    Ok(())
}

// -----------
// | Helpers |
// -----------

/// Load the configuration and resolve the run context
fn run_context(global: &GlobalArgs) -> Result<RunContext, ScriptError> {
    let network = global.network.ok_or(ConfigError::MissingNetwork)?;
    let config = DeployConfig::load(&global.config)?;
    let ctx = RunContext::new(Some(network), &config, global.rpc_url.clone(), global.out_dir.clone())?;
    Ok(ctx)
}

/// Connect to the network, checking that the node serves the selected chain
async fn connect(ctx: &RunContext, priv_key: &str, global: &GlobalArgs) -> Result<AlloyChainClient, ScriptError> {
    let client = AlloyChainClient::connect(&ctx.rpc_url, priv_key, global.etherscan_api_key.clone()).await?;

    let chain_id = client.chain_id().await?;
    if chain_id != ctx.network.chain_id() {
        return Err(ConfigError::InvalidValue {
            field: "rpcUrl".to_string(),
            reason: format!("{} serves chain {chain_id}, expected {}", ctx.rpc_url, ctx.network.chain_id()),
        }
        .into());
    }

    Ok(client)
}

/// Load the registry of a previous run
fn load_registry(ctx: &RunContext, path: Option<PathBuf>) -> Result<AddressRegistry, ScriptError> {
    let path = path.unwrap_or_else(|| ctx.out_path(deployments_file(ctx.network)));
    let registry = AddressRegistry::load(&path)?;
    info!(resolved = registry.resolved().count(), "loaded deployments from {}", path.display());
    Ok(registry)
}

/// The wiring plan over a registry
fn wiring_plan(ctx: &RunContext, registry: &AddressRegistry) -> Result<TransactionPlan, ScriptError> {
    build_plan(ctx, registry, &wiring_rules(), WIRING_PLAN_NAME, WIRING_PLAN_DESCRIPTION)
}

/// Build a plan with the run's metadata
fn build_plan(
    ctx: &RunContext,
    registry: &AddressRegistry,
    rules: &[WiringRule],
    name: &str,
    description: &str,
) -> Result<TransactionPlan, ScriptError> {
    let metadata = PlanMetadata {
        chain_id: ctx.network.chain_id(),
        created_at: now_millis(),
        name: name.to_string(),
        description: description.to_string(),
        safe_address: ctx.config.safe_address(),
    };

    Ok(TransactionPlanBuilder::new(registry).build(rules, metadata)?)
}

/// Render a plan as a Safe batch and an EOA script and write both
fn write_plan(ctx: &RunContext, plan: &TransactionPlan, safe_file: &str, script_file: &str) -> Result<(), ScriptError> {
    if plan.is_empty() {
        warn!("transaction plan is empty");
    }

    let batch = render_safe_batch(plan)?;
    let script = render_eoa_script(plan)?;
    check_consistency(&batch, &script)?;

    let batch_path = ctx.out_path(safe_file);
    let script_path = ctx.out_path(script_file);
    batch.write(&batch_path)?;
    write_file(&script_path, &script)?;

    info!(
        transactions = plan.records().len(),
        skipped = plan.skipped().len(),
        checksum = %plan.checksum(),
        "wrote {} and {}",
        batch_path.display(),
        script_path.display()
    );
    Ok(())
}
