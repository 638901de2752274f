use std::fmt;
use std::str::FromStr;

use crate::error::MiddlewareConfigError;

/// Parsed form of a `Capability::action[:arg1[:arg2...]]` middleware spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MiddlewareSpec {
    /// Registered capability name (the part before `::`)
    pub capability: String,
    /// Action on the capability
    pub action: String,
    /// Positional string arguments, in written order
    pub args: Vec<String>,
}

impl MiddlewareSpec {
    pub fn new(capability: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            action: action.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Parse every spec in `raw`, stopping at the first malformed one.
    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Self>, MiddlewareConfigError> {
        raw.iter().map(|s| s.as_ref().parse()).collect()
    }
}

impl FromStr for MiddlewareSpec {
    type Err = MiddlewareConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || MiddlewareConfigError::MalformedSpec(raw.to_string());

        let (capability, rest) = raw.split_once("::").ok_or_else(malformed)?;
        // anything after a second `::` is not part of the action
        let rest = rest.split("::").next().unwrap_or_default();

        let mut parts = rest.split(':');
        let action = parts.next().unwrap_or_default();
        if capability.is_empty() || action.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            capability: capability.to_string(),
            action: action.to_string(),
            args: parts.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for MiddlewareSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.capability, self.action)?;
        for arg in &self.args {
            write!(f, ":{arg}")?;
        }
        Ok(())
    }
}
