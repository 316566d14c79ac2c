use crate::config::AptosConfig;
use crate::{Context, CoreError};
use movepack_runtime::{
    initialize_wallet, Environment, Executor, Toolchain, ToolchainVersion, WalletInitResult,
    TOOLCHAIN_BINARY,
};
use movepack_schema::DependencyDescriptor;
use movepack_store::{
    extract, DependencyCache, EnvMutation, LayerMetadata, LayerStore, LayerTypes, LayersLayout,
};
use sha2::{Digest, Sha256};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the toolchain layer under the layers root.
pub const LAYER_NAME: &str = "aptos";

const EXECUTABLE_MODE: u32 = 0o755;

/// The toolchain layer as contributed (or reused) by a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainLayer {
    pub name: String,
    pub path: PathBuf,
    pub bin_dir: PathBuf,
    pub move_home: PathBuf,
    pub types: LayerTypes,
    pub environment_mutations: Vec<EnvMutation>,
    /// `None` when the layer was reused.
    pub version: Option<ToolchainVersion>,
    pub wallet: Option<WalletInitResult>,
    pub reused: bool,
}

/// Installs the `aptos` CLI into its layer, compiles the application, and
/// optionally bootstraps a deployment wallet.
pub struct ToolchainProvisioner<'a> {
    dependency: DependencyDescriptor,
    cache: &'a DependencyCache,
    executor: &'a dyn Executor,
    config: &'a AptosConfig,
    app_dir: &'a Path,
    env: Environment,
}

impl<'a> ToolchainProvisioner<'a> {
    pub fn new(
        dependency: DependencyDescriptor,
        cache: &'a DependencyCache,
        executor: &'a dyn Executor,
        config: &'a AptosConfig,
        app_dir: &'a Path,
        env: Environment,
    ) -> Self {
        Self {
            dependency,
            cache,
            executor,
            config,
            app_dir,
            env,
        }
    }

    /// Contribute the layer under `layout`.
    ///
    /// A layer whose persisted metadata matches this dependency and build
    /// settings is reused as-is: nothing is fetched or executed.
    pub fn contribute(&self, layout: &LayersLayout) -> Result<ToolchainLayer, CoreError> {
        let store = LayerStore::new(layout.clone());
        let layer_dir = layout.layer_dir(LAYER_NAME);
        let bin_dir = layer_dir.join("bin");
        let move_home = self.config.move_home.path(self.app_dir, &layer_dir);
        let expected = self
            .layer_metadata()
            .context(|| "unable to compute layer metadata".to_owned())?;

        let mut layer = ToolchainLayer {
            name: LAYER_NAME.to_owned(),
            path: layer_dir.clone(),
            bin_dir: bin_dir.clone(),
            move_home: move_home.clone(),
            types: LayerTypes::all(),
            environment_mutations: launch_mutations(&bin_dir, &move_home),
            version: None,
            wallet: None,
            reused: false,
        };

        let existing = store
            .read_metadata(LAYER_NAME)
            .context(|| format!("unable to read {LAYER_NAME} layer metadata"))?;
        if let Some(existing) = existing {
            if existing.metadata == expected && layer_dir.is_dir() {
                info!("{LAYER_NAME}: reusing cached layer");
                layer.environment_mutations = store
                    .read_launch_env(LAYER_NAME)
                    .context(|| format!("unable to read {LAYER_NAME} launch environment"))?;
                layer.reused = true;
                return Ok(layer);
            }
            debug!("{LAYER_NAME}: layer metadata changed");
        }

        info!(
            "{LAYER_NAME}: contributing {} {} to layer",
            self.dependency.id, self.dependency.version
        );
        store
            .reset(LAYER_NAME)
            .context(|| format!("unable to reset layer {}", layer_dir.display()))?;
        let mut env = self.env.clone();

        let artifact = self.cache.artifact(&self.dependency).context(|| {
            format!(
                "unable to fetch {} {}",
                self.dependency.id, self.dependency.version
            )
        })?;

        info!("expanding {} to {}", artifact.display(), bin_dir.display());
        extract(&artifact, &bin_dir, 0)
            .context(|| format!("unable to expand {}", artifact.display()))?;

        let binary = bin_dir.join(TOOLCHAIN_BINARY);
        info!("setting {} as executable", binary.display());
        fs::set_permissions(&binary, fs::Permissions::from_mode(EXECUTABLE_MODE))
            .context(|| format!("unable to chmod {}", binary.display()))?;

        info!("setting {} in PATH", bin_dir.display());
        env.prepend("PATH", ":", &bin_dir.to_string_lossy());

        let version = Toolchain::new(self.executor, &env, self.app_dir)
            .version()
            .context(|| format!("unable to get {TOOLCHAIN_BINARY} version"))?;
        info!("checking {TOOLCHAIN_BINARY} version: {version}");

        if !move_home.exists() {
            fs::create_dir_all(&move_home)
                .context(|| format!("unable to create {}", move_home.display()))?;
        }
        info!("setting MOVE_HOME = {}", move_home.display());
        env.set("MOVE_HOME", move_home.to_string_lossy());

        let toolchain = Toolchain::new(self.executor, &env, self.app_dir);
        toolchain
            .compile()
            .context(|| "unable to compile contract".to_owned())?;

        if let Some(deployment) = &self.config.deployment {
            let result = initialize_wallet(&toolchain, deployment)
                .context(|| format!("unable to initialize wallet on {}", deployment.network()))?;
            layer.wallet = Some(result);
        }

        store
            .write_launch_env(LAYER_NAME, &layer.environment_mutations)
            .context(|| format!("unable to write {LAYER_NAME} launch environment"))?;
        store
            .write_metadata(
                LAYER_NAME,
                &LayerMetadata {
                    types: layer.types,
                    metadata: expected,
                },
            )
            .context(|| format!("unable to write {LAYER_NAME} layer metadata"))?;

        layer.version = Some(version);
        Ok(layer)
    }

    /// `[metadata]` persisted with the layer; any change invalidates it.
    fn layer_metadata(&self) -> Result<toml::Table, CoreError> {
        let mut build = toml::Table::new();
        build.insert(
            "move-home".to_owned(),
            self.config.move_home.to_string().into(),
        );
        build.insert(
            "deploy".to_owned(),
            self.config.deployment.is_some().into(),
        );
        build.insert("network".to_owned(), self.config.network.clone().into());
        if let Some(deployment) = &self.config.deployment {
            build.insert(
                "private-key-sha256".to_owned(),
                hex::encode(Sha256::digest(deployment.private_key())).into(),
            );
        }

        let mut metadata = toml::Table::new();
        metadata.insert(
            "dependency".to_owned(),
            toml::Value::try_from(&self.dependency)?,
        );
        metadata.insert("build".to_owned(), build.into());
        Ok(metadata)
    }
}

fn launch_mutations(bin_dir: &Path, move_home: &Path) -> Vec<EnvMutation> {
    vec![
        EnvMutation::append("PATH", ":", bin_dir.to_string_lossy()),
        EnvMutation::default_value("MOVE_HOME", move_home.to_string_lossy()),
    ]
}
