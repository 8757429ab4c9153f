//! Maven artifact coordinates and the repository layout derived from them.

use std::fmt;
use std::path::PathBuf;

/// Suffix marking a snapshot version.
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Identity of a single deployable file in Maven terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl Coordinates {
    pub fn new(group_id: &str, artifact_id: &str, version: &str, extension: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            classifier: None,
            extension: extension.to_string(),
        }
    }

    pub fn with_classifier(mut self, classifier: &str) -> Self {
        self.classifier = Some(classifier.to_string());
        self
    }

    pub fn is_snapshot(&self) -> bool {
        is_snapshot_version(&self.version)
    }

    /// `group:artifact:version`, the form used for profile matching and
    /// default staging descriptions.
    pub fn gav(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// Directory of this coordinate within a Maven layout.
    ///
    /// `org.example.staging:staging-client:2.3.1` becomes
    /// `org/example/staging/staging-client/2.3.1`
    pub fn directory(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version
        )
    }

    /// File name of this coordinate, e.g. `core-1.0-sources.jar`.
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{c}.{}", self.artifact_id, self.version, self.extension),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        }
    }

    /// Path of this coordinate relative to a repository root, `/` separated.
    pub fn repository_path(&self) -> String {
        format!("{}/{}", self.directory(), self.file_name())
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{c}")?;
        }
        write!(f, ":{}", self.version)
    }
}

/// Whether a version string denotes a snapshot.
pub fn is_snapshot_version(version: &str) -> bool {
    version.ends_with(SNAPSHOT_SUFFIX)
}

/// A built file paired with its identity. Produced per module and consumed by
/// a deploy strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployableArtifact {
    pub file: PathBuf,
    pub coordinates: Coordinates,
}

impl DeployableArtifact {
    pub fn new(file: impl Into<PathBuf>, coordinates: Coordinates) -> Self {
        Self {
            file: file.into(),
            coordinates,
        }
    }
}
