use crate::executor::{Execution, Executor};
use crate::RuntimeError;
use std::sync::Mutex;

enum Scripted {
    Output(String),
    Failure(String),
}

/// Executor that records invocations instead of running them.
///
/// Responses are matched by command-line prefix, most recently scripted
/// first. Unmatched invocations succeed with empty output.
#[derive(Default)]
pub struct MockExecutor {
    scripted: Vec<(String, Scripted)>,
    executions: Mutex<Vec<Execution>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with `output` for command lines starting with `prefix`.
    #[must_use]
    pub fn respond(mut self, prefix: &str, output: &str) -> Self {
        self.scripted
            .push((prefix.to_owned(), Scripted::Output(output.to_owned())));
        self
    }

    /// Fail with `output` for command lines starting with `prefix`.
    #[must_use]
    pub fn fail(mut self, prefix: &str, output: &str) -> Self {
        self.scripted
            .push((prefix.to_owned(), Scripted::Failure(output.to_owned())));
        self
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.executions
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Recorded command lines, e.g. `aptos move compile`.
    pub fn command_lines(&self) -> Vec<String> {
        self.executions().iter().map(ToString::to_string).collect()
    }
}

impl Executor for MockExecutor {
    fn execute(&self, execution: &Execution) -> Result<String, RuntimeError> {
        self.executions
            .lock()
            .map_err(|e| RuntimeError::Mock(format!("mutex poisoned: {e}")))?
            .push(execution.clone());

        let line = execution.to_string();
        let scripted = self
            .scripted
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()));
        match scripted {
            Some((_, Scripted::Output(output))) => Ok(output.clone()),
            Some((_, Scripted::Failure(output))) => Err(RuntimeError::ExecFailed {
                command: line,
                status: "exit status: 1".to_owned(),
                output: output.clone(),
            }),
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_every_invocation() {
        let mock = MockExecutor::new();
        mock.execute(&Execution::new("aptos", ["--version"])).unwrap();
        mock.execute(&Execution::new("aptos", ["move", "compile"]))
            .unwrap();
        assert_eq!(
            mock.command_lines(),
            vec!["aptos --version", "aptos move compile"]
        );
    }

    #[test]
    fn scripted_output_matches_by_prefix() {
        let mock = MockExecutor::new().respond("aptos --version", "aptos 2.0.2\n");
        let out = mock.execute(&Execution::new("aptos", ["--version"])).unwrap();
        assert_eq!(out, "aptos 2.0.2\n");
        let out = mock
            .execute(&Execution::new("aptos", ["move", "compile"]))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn later_scripts_take_precedence() {
        let mock = MockExecutor::new()
            .respond("aptos", "generic")
            .fail("aptos init", "invalid key");
        let err = mock
            .execute(&Execution::new("aptos", ["init", "--private-key", "x"]))
            .unwrap_err();
        assert!(err.to_string().contains("invalid key"));
        assert_eq!(
            mock.execute(&Execution::new("aptos", ["--version"])).unwrap(),
            "generic"
        );
    }
}
