//! Detect and build phases of the movepack buildpack.
//!
//! This crate ties together schema parsing, layer storage, and toolchain
//! execution: configuration resolution (`ConfigurationResolver`,
//! `AptosConfig`), the `ToolchainProvisioner` that contributes the `aptos`
//! layer, process type emission, and the `detect`/`build` entry points with
//! their stage validation.

pub mod build;
pub mod config;
pub mod detect;
pub mod lifecycle;
pub mod process;
pub mod provision;

pub use build::{build, BuildContext, BuildResult};
pub use config::{
    parse_bool, AptosConfig, ConfigurationResolver, MoveHomePlacement, BP_APTOS_MOVE_HOME,
    BP_APTOS_NETWORK, BP_APTOS_PRIVATE_KEY, BP_APTOS_VERSION, BP_ENABLE_APTOS_DEPLOY,
    BP_ENABLE_APTOS_PROCESS, BP_LOG_LEVEL,
};
pub use detect::detect;
pub use lifecycle::{validate_transition, BuildStage};
pub use process::build_process_types;
pub use provision::{ToolchainLayer, ToolchainProvisioner, LAYER_NAME};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] movepack_schema::ManifestError),
    #[error("descriptor error: {0}")]
    Descriptor(#[from] movepack_schema::DescriptorError),
    #[error("plan error: {0}")]
    Plan(#[from] movepack_schema::PlanError),
    #[error("store error: {0}")]
    Store(#[from] movepack_store::StoreError),
    #[error("runtime error: {0}")]
    Runtime(#[from] movepack_runtime::RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),
    #[error("missing configuration {name}: {reason}")]
    MissingConfiguration { name: String, reason: String },
    #[error("invalid value '{value}' for {name}: expected {expected}")]
    InvalidConfiguration {
        name: String,
        value: String,
        expected: String,
    },
    #[error("invalid build stage transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("{action}\n{source}")]
    Context {
        action: String,
        source: Box<CoreError>,
    },
}

/// Attach a one-line description of the failed step to an error.
pub trait Context<T> {
    fn context<F>(self, action: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> String;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: Into<CoreError>,
{
    fn context<F>(self, action: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| CoreError::Context {
            action: action(),
            source: Box::new(e.into()),
        })
    }
}
