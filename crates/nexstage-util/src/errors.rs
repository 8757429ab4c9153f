use std::fmt::Write as _;

use miette::Diagnostic;
use thiserror::Error;

/// A single failed staging rule and the messages the server reported for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub rule: String,
    pub messages: Vec<String>,
}

/// All rule failures reported for one staging repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRuleFailures {
    pub repository_id: String,
    pub failures: Vec<RuleFailure>,
}

/// Unified error type for all nexstage operations.
#[derive(Debug, Error, Diagnostic)]
pub enum NexstageError {
    /// I/O operation failed (local copy or transfer).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or contradictory configuration. Raised before any network call.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the [staging] section of Nexstage.toml or the command-line flags"))]
    Configuration { message: String },

    /// Invalid or malformed build description (Nexstage.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Nexstage.toml for syntax errors"))]
    Manifest { message: String },

    /// The repository manager could not be reached or is not usable.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The server evaluated staging rules on close or release and some failed.
    #[error("Staging rules failed on {}", repository_list(.0))]
    #[diagnostic(help("Fix the reported rule violations and stage again"))]
    RuleFailure(Vec<RepositoryRuleFailures>),

    /// Non-2xx or malformed response from the repository manager.
    #[error("Remote error{}: {message}", status_suffix(.status))]
    RemoteProtocol { status: Option<u16>, message: String },

    /// Coordination between reactor modules failed.
    #[error("Reactor error: {message}")]
    Reactor { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl NexstageError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RemoteProtocol {
            status,
            message: message.into(),
        }
    }

    /// Whether a staging run hitting this error must roll back the
    /// repositories it opened (subject to the keep policies).
    pub fn requires_compensation(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::RemoteProtocol { .. } | Self::RuleFailure(_)
        )
    }

    pub fn is_rule_failure(&self) -> bool {
        matches!(self, Self::RuleFailure(_))
    }

    /// Multi-line `repository -> rule -> message` report for rule failures.
    ///
    /// Returns `None` for every other kind of error.
    pub fn rule_failure_report(&self) -> Option<String> {
        let Self::RuleFailure(repos) = self else {
            return None;
        };
        let mut out = String::new();
        for repo in repos {
            let _ = writeln!(out, "Repository \"{}\" failures", repo.repository_id);
            for failure in &repo.failures {
                let _ = writeln!(out, "  Rule \"{}\" failures", failure.rule);
                for message in &failure.messages {
                    let _ = writeln!(out, "    * {message}");
                }
            }
        }
        Some(out)
    }
}

fn repository_list(repos: &[RepositoryRuleFailures]) -> String {
    repos
        .iter()
        .map(|r| r.repository_id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Result alias for the library layers, where callers match on error kinds.
pub type NexstageResult<T> = Result<T, NexstageError>;

/// Convenience alias for `miette::Result<T>` used at the goal boundary.
pub type GoalResult<T> = miette::Result<T>;
