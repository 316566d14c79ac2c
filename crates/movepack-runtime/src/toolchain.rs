use crate::environment::Environment;
use crate::executor::{Execution, Executor};
use crate::RuntimeError;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Name of the toolchain executable inside the layer's `bin` directory.
pub const TOOLCHAIN_BINARY: &str = "aptos";

/// Arguments of the launch-time publish process.
pub const PUBLISH_ARGS: [&str; 4] = [
    "move",
    "publish",
    "--skip-fetch-latest-git-deps",
    "--assume-yes",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainVersion(String);

impl ToolchainVersion {
    /// Parse `aptos --version` output: the second whitespace-separated token.
    pub fn parse(output: &str) -> Result<Self, RuntimeError> {
        output
            .split_whitespace()
            .nth(1)
            .map(|v| Self(v.to_owned()))
            .ok_or_else(|| RuntimeError::UnparseableOutput {
                command: format!("{TOOLCHAIN_BINARY} --version"),
                output: output.to_owned(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolchainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Invokes the toolchain from the application directory with an explicit
/// environment.
pub struct Toolchain<'a> {
    executor: &'a dyn Executor,
    env: &'a Environment,
    app_dir: &'a Path,
}

impl<'a> Toolchain<'a> {
    pub fn new(executor: &'a dyn Executor, env: &'a Environment, app_dir: &'a Path) -> Self {
        Self {
            executor,
            env,
            app_dir,
        }
    }

    pub fn run(&self, args: &[&str]) -> Result<String, RuntimeError> {
        self.run_redacted(args, &[])
    }

    /// Like `run`, but the arguments at `secret` indices are never rendered.
    pub fn run_redacted(&self, args: &[&str], secret: &[usize]) -> Result<String, RuntimeError> {
        let execution = secret.iter().fold(
            Execution::new(TOOLCHAIN_BINARY, args.iter().copied())
                .in_dir(self.app_dir)
                .with_env(self.env),
            |execution, &index| execution.redact_arg(index),
        );
        self.executor.execute(&execution)
    }

    pub fn version(&self) -> Result<ToolchainVersion, RuntimeError> {
        let output = self.run(&["--version"])?;
        ToolchainVersion::parse(&output)
    }

    pub fn compile(&self) -> Result<String, RuntimeError> {
        info!("compiling contracts with '{TOOLCHAIN_BINARY} move compile'");
        self.run(&["move", "compile"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;

    #[test]
    fn version_is_second_token() {
        assert_eq!(ToolchainVersion::parse("aptos 2.0.2").unwrap().as_str(), "2.0.2");
        assert_eq!(
            ToolchainVersion::parse("  aptos   1.0.13 (abc)\n").unwrap().as_str(),
            "1.0.13"
        );
    }

    #[test]
    fn single_token_output_is_unparseable() {
        assert!(matches!(
            ToolchainVersion::parse("aptos"),
            Err(RuntimeError::UnparseableOutput { .. })
        ));
        assert!(ToolchainVersion::parse("").is_err());
    }

    #[test]
    fn runs_in_app_dir_with_given_env() {
        let mock = MockExecutor::new().respond("aptos --version", "aptos 2.0.2\n");
        let env = Environment::from_vars([("PATH", "/layers/aptos/bin")]);
        let app = Path::new("/workspace");
        let toolchain = Toolchain::new(&mock, &env, app);

        assert_eq!(toolchain.version().unwrap().as_str(), "2.0.2");
        toolchain.compile().unwrap();

        let executions = mock.executions();
        assert_eq!(mock.command_lines(), vec!["aptos --version", "aptos move compile"]);
        assert!(executions.iter().all(|e| e.dir.as_deref() == Some(app)));
        assert_eq!(executions[1].env.get("PATH"), Some("/layers/aptos/bin"));
    }

    #[test]
    fn compile_failure_propagates() {
        let mock = MockExecutor::new().fail("aptos move compile", "error[E01001]");
        let env = Environment::new();
        let err = Toolchain::new(&mock, &env, Path::new("/workspace"))
            .compile()
            .unwrap_err();
        assert!(err.to_string().contains("E01001"));
    }
}
