use crate::config::{AptosConfig, ConfigurationResolver};
use crate::lifecycle::{validate_transition, BuildStage};
use crate::process::build_process_types;
use crate::provision::{ToolchainLayer, ToolchainProvisioner};
use crate::{Context, CoreError};
use movepack_runtime::{Environment, Executor};
use movepack_schema::{BuildpackDescriptor, BuildpackPlan, PLAN_ENTRY_APTOS};
use movepack_store::{DependencyCache, LaunchConfig, LayersLayout, ProcessDescriptor};
use std::path::PathBuf;
use tracing::{debug, info};

/// Everything the host hands to a build invocation.
pub struct BuildContext {
    pub app_dir: PathBuf,
    pub layers_dir: PathBuf,
    pub platform_dir: Option<PathBuf>,
    pub descriptor: BuildpackDescriptor,
    pub plan: BuildpackPlan,
    pub env: Environment,
    pub cache: DependencyCache,
}

/// Layers and process types contributed by a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    pub layers: Vec<ToolchainLayer>,
    pub processes: Vec<ProcessDescriptor>,
}

impl BuildResult {
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.processes.is_empty()
    }

    /// Write `launch.toml` when there are process types to declare.
    pub fn persist(&self, layout: &LayersLayout) -> Result<(), CoreError> {
        if self.processes.is_empty() {
            return Ok(());
        }
        LaunchConfig::new(self.processes.clone()).write(layout)?;
        debug!("wrote {}", layout.launch_file().display());
        Ok(())
    }
}

fn advance(stage: &mut BuildStage, next: BuildStage) -> Result<(), CoreError> {
    validate_transition(*stage, next)?;
    debug!("build stage: {stage} -> {next}");
    *stage = next;
    Ok(())
}

/// Run the build phase. Does nothing unless the plan requests `aptos`.
pub fn build(ctx: &BuildContext, executor: &dyn Executor) -> Result<BuildResult, CoreError> {
    let mut stage = BuildStage::ResolvingPlan;

    let Some(entry) = ctx.plan.resolve(PLAN_ENTRY_APTOS) else {
        info!("no {PLAN_ENTRY_APTOS} plan entry, nothing to contribute");
        advance(&mut stage, BuildStage::Done)?;
        return Ok(BuildResult::default());
    };
    debug!("resolved plan entry {} {:?}", entry.name, entry.metadata);

    advance(&mut stage, BuildStage::Configuring)?;
    let resolver =
        ConfigurationResolver::new(&ctx.descriptor, &ctx.env, ctx.platform_dir.as_deref())
            .context(|| "unable to create configuration resolver".to_owned())?;
    resolver.log_configuration();
    let config = AptosConfig::resolve(&resolver)
        .context(|| "unable to resolve configuration".to_owned())?;
    let dependency = ctx
        .descriptor
        .resolve_dependency(PLAN_ENTRY_APTOS, &config.version)
        .context(|| "unable to find dependency".to_owned())?;

    advance(&mut stage, BuildStage::Provisioning)?;
    let layout = LayersLayout::new(&ctx.layers_dir);
    layout.initialize().context(|| {
        format!(
            "unable to create layers directory {}",
            ctx.layers_dir.display()
        )
    })?;
    let layer = ToolchainProvisioner::new(
        dependency,
        &ctx.cache,
        executor,
        &config,
        &ctx.app_dir,
        ctx.env.clone(),
    )
    .contribute(&layout)?;

    advance(&mut stage, BuildStage::EmittingProcesses)?;
    let processes = build_process_types(&config);
    for p in &processes {
        info!("process type '{}': {} {}", p.process_type, p.command, p.args.join(" "));
    }

    advance(&mut stage, BuildStage::Done)?;
    Ok(BuildResult {
        layers: vec![layer],
        processes,
    })
}
