use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment handed to child processes.
///
/// Build steps thread one of these through instead of mutating the
/// process-global environment, so each step sees exactly what earlier
/// steps contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `value` followed by the previous content, joined with `delim`.
    pub fn prepend(&mut self, name: &str, delim: &str, value: &str) {
        let joined = match self.get(name) {
            Some(current) if !current.is_empty() => format!("{value}{delim}{current}"),
            _ => value.to_owned(),
        };
        self.set(name, joined);
    }

    /// Locate `program` on this environment's `PATH`.
    ///
    /// Names containing a path separator are returned unchanged when they
    /// point at a file.
    pub fn which(&self, program: &str) -> Option<PathBuf> {
        if program.contains('/') {
            let path = PathBuf::from(program);
            return path.is_file().then_some(path);
        }
        self.get("PATH")?
            .split(':')
            .filter(|dir| !dir.is_empty())
            .map(|dir| Path::new(dir).join(program))
            .find(|candidate| candidate.is_file())
    }
}
