//! Process execution and toolchain invocation for movepack.
//!
//! This crate implements the execution layer: an explicit `Environment`
//! threaded through build steps, the `Executor` trait with a
//! `std::process::Command` backend and a recording mock, typed invocations of
//! the `aptos` toolchain, and the wallet bootstrap used for deployment.

pub mod environment;
pub mod executor;
pub mod mock;
pub mod toolchain;
pub mod wallet;

pub use environment::Environment;
pub use executor::{CommandExecutor, Execution, Executor};
pub use mock::MockExecutor;
pub use toolchain::{Toolchain, ToolchainVersion, PUBLISH_ARGS, TOOLCHAIN_BINARY};
pub use wallet::{initialize_wallet, Deployment, WalletInitResult, DEVNET};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("'{command}' failed ({status}):\n{output}")]
    ExecFailed {
        command: String,
        status: String,
        output: String,
    },
    #[error("unable to parse output of '{command}': {output:?}")]
    UnparseableOutput { command: String, output: String },
    #[error("a private key is required for deployment")]
    MissingPrivateKey,
    #[error("mock executor: {0}")]
    Mock(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_failure_shows_output() {
        let e = RuntimeError::ExecFailed {
            command: "aptos move compile".to_owned(),
            status: "exit status: 1".to_owned(),
            output: "error: unbound module".to_owned(),
        };
        let msg = e.to_string();
        assert!(msg.contains("aptos move compile"));
        assert!(msg.contains("unbound module"));
    }
}
