use crate::CoreError;
use movepack_runtime::{Deployment, Environment, DEVNET};
use movepack_schema::BuildpackDescriptor;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const BP_APTOS_VERSION: &str = "BP_APTOS_VERSION";
pub const BP_ENABLE_APTOS_PROCESS: &str = "BP_ENABLE_APTOS_PROCESS";
pub const BP_ENABLE_APTOS_DEPLOY: &str = "BP_ENABLE_APTOS_DEPLOY";
pub const BP_APTOS_PRIVATE_KEY: &str = "BP_APTOS_PRIVATE_KEY";
pub const BP_APTOS_NETWORK: &str = "BP_APTOS_NETWORK";
pub const BP_APTOS_MOVE_HOME: &str = "BP_APTOS_MOVE_HOME";
pub const BP_LOG_LEVEL: &str = "BP_LOG_LEVEL";

const SECRET_KEYS: [&str; 1] = [BP_APTOS_PRIVATE_KEY];
const BOOL_VALUES: &str = "one of [1, t, T, TRUE, true, True, 0, f, F, FALSE, false, False]";

/// Parse a boolean the way the lifecycle tooling writes them.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Resolves configuration keys from, in order: the build environment,
/// `<platform>/env/<NAME>` files, and `buildpack.toml` defaults.
#[derive(Debug, Clone)]
pub struct ConfigurationResolver {
    env: BTreeMap<String, String>,
    platform: BTreeMap<String, String>,
    defaults: BTreeMap<String, (String, String)>,
}

impl ConfigurationResolver {
    pub fn new(
        descriptor: &BuildpackDescriptor,
        env: &Environment,
        platform_dir: Option<&Path>,
    ) -> Result<Self, CoreError> {
        let defaults = descriptor
            .metadata
            .configurations
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    (c.default.clone().unwrap_or_default(), c.description.clone()),
                )
            })
            .collect();

        let platform = match platform_dir {
            Some(dir) => read_platform_env(&dir.join("env"))?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            env: env
                .iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            platform,
            defaults,
        })
    }

    /// The value of `name` and whether it was explicitly set.
    pub fn resolve(&self, name: &str) -> (String, bool) {
        if let Some(v) = self.env.get(name).or_else(|| self.platform.get(name)) {
            return (v.clone(), true);
        }
        let default = self
            .defaults
            .get(name)
            .map(|(d, _)| d.clone())
            .unwrap_or_default();
        (default, false)
    }

    /// Resolve a boolean key. Unset or empty is `false`.
    pub fn resolve_bool(&self, name: &str) -> Result<bool, CoreError> {
        let (value, _) = self.resolve(name);
        if value.is_empty() {
            return Ok(false);
        }
        parse_bool(&value).ok_or_else(|| CoreError::InvalidConfiguration {
            name: name.to_owned(),
            value,
            expected: BOOL_VALUES.to_owned(),
        })
    }

    /// Log every declared key with its effective value.
    pub fn log_configuration(&self) {
        if self.defaults.is_empty() {
            return;
        }
        let width = self.defaults.keys().map(String::len).max().unwrap_or(0) + 1;
        info!("Build Configuration:");
        for (name, (_, description)) in &self.defaults {
            let (value, _) = self.resolve(name);
            let shown = if SECRET_KEYS.contains(&name.as_str()) && !value.is_empty() {
                "<redacted>".to_owned()
            } else {
                value
            };
            info!("  ${name:<width$} {shown:<12} {description}");
        }
    }
}

fn read_platform_env(dir: &Path) -> Result<BTreeMap<String, String>, CoreError> {
    let mut vars = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(vars);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let value = fs::read_to_string(entry.path())?;
        debug!("platform env {name}");
        vars.insert(name, value.trim_end_matches(['\r', '\n']).to_owned());
    }
    Ok(vars)
}

/// Where `MOVE_HOME` points during the build and at launch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MoveHomePlacement {
    /// The application directory.
    #[default]
    Workspace,
    /// `<layer>/move`, cached with the toolchain.
    Layer,
}

impl MoveHomePlacement {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim() {
            "" | "workspace" => Ok(Self::Workspace),
            "layer" => Ok(Self::Layer),
            other => Err(CoreError::InvalidConfiguration {
                name: BP_APTOS_MOVE_HOME.to_owned(),
                value: other.to_owned(),
                expected: "'workspace' or 'layer'".to_owned(),
            }),
        }
    }

    pub fn path(self, app_dir: &Path, layer_dir: &Path) -> PathBuf {
        match self {
            Self::Workspace => app_dir.to_path_buf(),
            Self::Layer => layer_dir.join("move"),
        }
    }
}

impl fmt::Display for MoveHomePlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Workspace => "workspace",
            Self::Layer => "layer",
        })
    }
}

/// Validated build settings for the `aptos` layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptosConfig {
    pub version: String,
    pub enable_process: bool,
    pub deployment: Option<Deployment>,
    pub network: String,
    pub move_home: MoveHomePlacement,
}

impl AptosConfig {
    /// Resolve and validate all keys.
    ///
    /// A private key must be configured when either the publish process or
    /// build-time deployment is enabled.
    pub fn resolve(resolver: &ConfigurationResolver) -> Result<Self, CoreError> {
        let (mut version, _) = resolver.resolve(BP_APTOS_VERSION);
        if version.trim().is_empty() {
            version = "*".to_owned();
        }
        let enable_process = resolver.resolve_bool(BP_ENABLE_APTOS_PROCESS)?;
        let enable_deploy = resolver.resolve_bool(BP_ENABLE_APTOS_DEPLOY)?;

        let (mut network, _) = resolver.resolve(BP_APTOS_NETWORK);
        if network.trim().is_empty() {
            network = DEVNET.to_owned();
        }

        let (private_key, _) = resolver.resolve(BP_APTOS_PRIVATE_KEY);
        if (enable_process || enable_deploy) && private_key.trim().is_empty() {
            return Err(CoreError::MissingConfiguration {
                name: BP_APTOS_PRIVATE_KEY.to_owned(),
                reason: format!(
                    "required when {BP_ENABLE_APTOS_PROCESS} or {BP_ENABLE_APTOS_DEPLOY} is enabled"
                ),
            });
        }

        let deployment = if enable_deploy {
            Some(Deployment::new(&private_key, &network)?)
        } else {
            None
        };

        let move_home = MoveHomePlacement::parse(&resolver.resolve(BP_APTOS_MOVE_HOME).0)?;

        Ok(Self {
            version,
            enable_process,
            deployment,
            network,
            move_home,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movepack_schema::parse_descriptor_str;

    const DESCRIPTOR: &str = r#"
api = "0.8"
[buildpack]
id = "amp-buildpacks/aptos"
version = "0.1.0"

[[metadata.configurations]]
name = "BP_APTOS_VERSION"
default = "2.*"
description = "the Aptos CLI version"
build = true

[[metadata.configurations]]
name = "BP_APTOS_NETWORK"
default = "devnet"
build = true

[[metadata.configurations]]
name = "BP_ENABLE_APTOS_PROCESS"
default = "false"
launch = true
"#;

    fn resolver(vars: &[(&str, &str)]) -> ConfigurationResolver {
        let descriptor = parse_descriptor_str(DESCRIPTOR).unwrap();
        let env = Environment::from_vars(vars.iter().copied());
        ConfigurationResolver::new(&descriptor, &env, None).unwrap()
    }

    #[test]
    fn parse_bool_accepts_lifecycle_forms() {
        for v in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool("tRuE"), None);
    }

    #[test]
    fn defaults_come_from_the_descriptor() {
        let r = resolver(&[]);
        assert_eq!(r.resolve(BP_APTOS_VERSION), ("2.*".to_owned(), false));
        assert_eq!(r.resolve("BP_UNDECLARED"), (String::new(), false));
    }

    #[test]
    fn environment_overrides_defaults() {
        let r = resolver(&[(BP_APTOS_VERSION, "2.0.2")]);
        assert_eq!(r.resolve(BP_APTOS_VERSION), ("2.0.2".to_owned(), true));
    }

    #[test]
    fn platform_env_files_are_read() {
        let platform = tempfile::tempdir().unwrap();
        fs::create_dir_all(platform.path().join("env")).unwrap();
        fs::write(platform.path().join("env/BP_APTOS_NETWORK"), "testnet\n").unwrap();
        fs::write(platform.path().join("env/BP_APTOS_VERSION"), "1.0.0").unwrap();

        let descriptor = parse_descriptor_str(DESCRIPTOR).unwrap();
        let env = Environment::from_vars([(BP_APTOS_VERSION, "2.0.2")]);
        let r = ConfigurationResolver::new(&descriptor, &env, Some(platform.path())).unwrap();

        assert_eq!(r.resolve(BP_APTOS_NETWORK).0, "testnet");
        assert_eq!(r.resolve(BP_APTOS_VERSION).0, "2.0.2");
    }

    #[test]
    fn invalid_bool_is_an_error() {
        let r = resolver(&[(BP_ENABLE_APTOS_PROCESS, "yes")]);
        assert!(matches!(
            r.resolve_bool(BP_ENABLE_APTOS_PROCESS),
            Err(CoreError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn empty_bool_is_false() {
        let r = resolver(&[(BP_ENABLE_APTOS_DEPLOY, "")]);
        assert!(!r.resolve_bool(BP_ENABLE_APTOS_DEPLOY).unwrap());
    }

    #[test]
    fn aptos_config_defaults() {
        let config = AptosConfig::resolve(&resolver(&[])).unwrap();
        assert_eq!(config.version, "2.*");
        assert!(!config.enable_process);
        assert!(config.deployment.is_none());
        assert_eq!(config.network, DEVNET);
        assert_eq!(config.move_home, MoveHomePlacement::Workspace);
    }

    #[test]
    fn version_falls_back_to_any() {
        let descriptor = parse_descriptor_str(
            "[buildpack]\nid = \"amp-buildpacks/aptos\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        let r = ConfigurationResolver::new(&descriptor, &Environment::new(), None).unwrap();
        assert_eq!(AptosConfig::resolve(&r).unwrap().version, "*");
    }

    #[test]
    fn process_flag_requires_private_key() {
        let err = AptosConfig::resolve(&resolver(&[(BP_ENABLE_APTOS_PROCESS, "true")]))
            .unwrap_err();
        match err {
            CoreError::MissingConfiguration { name, .. } => assert_eq!(name, BP_APTOS_PRIVATE_KEY),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn deploy_flag_requires_private_key() {
        assert!(matches!(
            AptosConfig::resolve(&resolver(&[(BP_ENABLE_APTOS_DEPLOY, "1")])),
            Err(CoreError::MissingConfiguration { .. })
        ));
    }

    #[test]
    fn deploy_with_key_builds_deployment() {
        let config = AptosConfig::resolve(&resolver(&[
            (BP_ENABLE_APTOS_DEPLOY, "true"),
            (BP_APTOS_PRIVATE_KEY, "0xabc"),
            (BP_APTOS_NETWORK, "testnet"),
        ]))
        .unwrap();
        let deployment = config.deployment.unwrap();
        assert_eq!(deployment.network(), "testnet");
        assert_eq!(deployment.private_key(), "0xabc");
    }

    #[test]
    fn process_without_deploy_has_no_deployment() {
        let config = AptosConfig::resolve(&resolver(&[
            (BP_ENABLE_APTOS_PROCESS, "true"),
            (BP_APTOS_PRIVATE_KEY, "0xabc"),
        ]))
        .unwrap();
        assert!(config.enable_process);
        assert!(config.deployment.is_none());
    }

    #[test]
    fn move_home_placement() {
        assert_eq!(
            MoveHomePlacement::parse("layer").unwrap(),
            MoveHomePlacement::Layer
        );
        assert!(MoveHomePlacement::parse("home").is_err());
        assert_eq!(
            MoveHomePlacement::Workspace.path(Path::new("/workspace"), Path::new("/layers/aptos")),
            PathBuf::from("/workspace")
        );
        assert_eq!(
            MoveHomePlacement::Layer.path(Path::new("/workspace"), Path::new("/layers/aptos")),
            PathBuf::from("/layers/aptos/move")
        );
    }
}
