use crate::environment::Environment;
use crate::RuntimeError;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Placeholder shown instead of secret arguments.
pub const REDACTED: &str = "<redacted>";

/// A single external command invocation.
///
/// `Display` and `Debug` never show arguments marked with `redact_arg`; only
/// the spawned process receives them.
#[derive(Clone, PartialEq, Eq)]
pub struct Execution {
    pub command: String,
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
    pub env: Environment,
    secret_args: Vec<usize>,
}

impl Execution {
    pub fn new<I, S>(command: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            env: Environment::new(),
            secret_args: Vec::new(),
        }
    }

    /// Hide the argument at `index` from every rendering of this execution.
    #[must_use]
    pub fn redact_arg(mut self, index: usize) -> Self {
        self.secret_args.push(index);
        self
    }

    /// Arguments as they may appear in logs and error messages.
    pub fn display_args(&self) -> impl Iterator<Item = &str> {
        self.args.iter().enumerate().map(move |(i, arg)| {
            if self.secret_args.contains(&i) {
                REDACTED
            } else {
                arg.as_str()
            }
        })
    }

    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: &Environment) -> Self {
        self.env = env.clone();
        self
    }
}

impl fmt::Display for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for arg in self.display_args() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("command", &self.command)
            .field("args", &self.display_args().collect::<Vec<_>>())
            .field("dir", &self.dir)
            .field("env", &self.env)
            .finish()
    }
}

/// Runs external commands to completion.
///
/// Returns the combined stdout and stderr text on success. A non-zero exit
/// becomes `RuntimeError::ExecFailed` carrying the same combined output.
pub trait Executor {
    fn execute(&self, execution: &Execution) -> Result<String, RuntimeError>;
}

/// Executor backed by `std::process::Command`.
///
/// The child sees only `execution.env`, and the program is looked up on that
/// environment's `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for CommandExecutor {
    fn execute(&self, execution: &Execution) -> Result<String, RuntimeError> {
        let program = execution
            .env
            .which(&execution.command)
            .unwrap_or_else(|| PathBuf::from(&execution.command));
        debug!("exec: {execution}");

        let mut cmd = Command::new(&program);
        cmd.args(&execution.args).env_clear().envs(execution.env.iter());
        if let Some(dir) = &execution.dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|source| RuntimeError::Spawn {
            command: execution.command.clone(),
            source,
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(combined)
        } else {
            Err(RuntimeError::ExecFailed {
                command: execution.to_string(),
                status: output.status.to_string(),
                output: combined,
            })
        }
    }
}
