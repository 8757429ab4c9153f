//! Staging profile and staging repository identities.

use std::fmt;

/// A server-side policy bucket that staging repositories are created under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingProfile {
    pub id: String,
    pub name: String,
}

/// A staging repository this build uploads into.
///
/// `managed` repositories were opened by this build, which owns their
/// lifecycle. Unmanaged ones were supplied by the user and are never closed,
/// released or dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingRepository {
    pub profile_id: String,
    pub repository_id: String,
    pub url: String,
    pub managed: bool,
}

impl StagingRepository {
    pub fn managed(profile_id: &str, repository_id: &str, url: &str) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            repository_id: repository_id.to_string(),
            url: url.to_string(),
            managed: true,
        }
    }

    pub fn unmanaged(profile_id: &str, repository_id: &str, url: &str) -> Self {
        Self {
            managed: false,
            ..Self::managed(profile_id, repository_id, url)
        }
    }
}

/// Server-reported state of a staging repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryState {
    Open,
    Closed,
    Released,
    NotFound,
}

impl RepositoryState {
    /// Parse the `type` field the server reports for a staging repository.
    pub fn from_server(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "open" => Self::Open,
            "closed" => Self::Closed,
            "released" => Self::Released,
            _ => Self::NotFound,
        }
    }
}

impl fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Released => "released",
            Self::NotFound => "not found",
        };
        f.write_str(s)
    }
}

/// A staging repository as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingRepositoryInfo {
    pub repository_id: String,
    pub profile_id: String,
    pub profile_name: String,
    pub state: RepositoryState,
    pub transitioning: bool,
    pub url: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_from_server_is_case_insensitive() {
        assert_eq!(RepositoryState::from_server("OPEN"), RepositoryState::Open);
        assert_eq!(RepositoryState::from_server("closed"), RepositoryState::Closed);
        assert_eq!(RepositoryState::from_server("released"), RepositoryState::Released);
        assert_eq!(RepositoryState::from_server("dropped"), RepositoryState::NotFound);
    }

    #[test]
    fn unmanaged_keeps_identity() {
        let repo = StagingRepository::unmanaged("p1", "repo-1", "http://x/repo-1");
        assert!(!repo.managed);
        assert_eq!(repo.repository_id, "repo-1");
    }
}
