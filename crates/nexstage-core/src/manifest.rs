use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use nexstage_util::errors::{NexstageError, NexstageResult};

use crate::coordinate::{Coordinates, DeployableArtifact};

/// The parsed representation of a `Nexstage.toml` file: staging settings
/// plus the reactor, an ordered list of modules and the files each one
/// produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub staging: StagingConfig,

    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleEntry>,
}

/// How release artifacts leave the build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// Gather locally, then drive a server-side staging repository.
    #[default]
    Staging,
    /// Gather locally, then upload in bulk to a fixed URL.
    Deferred,
    /// Upload each module's files immediately.
    Direct,
}

/// Settings from the `[staging]` section. Every field is optional so that
/// command-line flags can be layered on top before [`crate::parameters::Parameters`]
/// fills in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StagingConfig {
    #[serde(default)]
    pub nexus_url: Option<String>,
    #[serde(default)]
    pub server_id: Option<String>,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub repository_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mode: Option<DeployMode>,
    #[serde(default)]
    pub snapshot_url: Option<String>,
    #[serde(default)]
    pub deferred_url: Option<String>,
    #[serde(default)]
    pub release_url: Option<String>,
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    #[serde(default)]
    pub keep_on_failure: Option<bool>,
    #[serde(default)]
    pub keep_on_rule_failure: Option<bool>,
    #[serde(default)]
    pub skip_close: Option<bool>,
    #[serde(default)]
    pub skip_remote: Option<bool>,
    #[serde(default)]
    pub auto_release: Option<bool>,
    #[serde(default)]
    pub auto_drop_after_release: Option<bool>,
    #[serde(default)]
    pub detect_build_failures: Option<bool>,
    #[serde(default)]
    pub require_tls: Option<bool>,
    #[serde(default)]
    pub ssl_insecure: Option<bool>,
    #[serde(default)]
    pub ssl_allow_all: Option<bool>,
    #[serde(default)]
    pub extra_checksums: Option<bool>,
    #[serde(default)]
    pub progress_timeout_minutes: Option<u64>,
    #[serde(default)]
    pub progress_pause_seconds: Option<u64>,
    #[serde(default)]
    pub reactor_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// One reactor module from a `[[module]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    pub group: String,
    pub artifact: String,
    pub version: String,
    /// `false` builds the module without deploying it. It still reports to
    /// the reactor gate but never finalizes.
    #[serde(default = "default_deploy")]
    pub deploy: bool,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

fn default_deploy() -> bool {
    true
}

/// A produced file. The extension defaults to the file's own extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
}

impl Manifest {
    /// Load and validate a `Nexstage.toml` file.
    pub fn from_path(path: &Path) -> NexstageResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| NexstageError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse_toml(&content)
    }

    /// Parse and validate manifest content.
    pub fn parse_toml(content: &str) -> NexstageResult<Self> {
        let manifest: Manifest = toml::from_str(content).map_err(|e| NexstageError::Manifest {
            message: e.to_string(),
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> NexstageResult<()> {
        let mut seen = BTreeSet::new();
        for module in &self.modules {
            if module.name.trim().is_empty() {
                return Err(NexstageError::Manifest {
                    message: "Module name must not be empty".to_string(),
                });
            }
            if !seen.insert(module.name.as_str()) {
                return Err(NexstageError::Manifest {
                    message: format!("Duplicate module name '{}'", module.name),
                });
            }
            for field in [&module.group, &module.artifact, &module.version] {
                if field.trim().is_empty() {
                    return Err(NexstageError::Manifest {
                        message: format!(
                            "Module '{}' needs non-empty group, artifact and version",
                            module.name
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Module names in reactor order.
    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name.clone()).collect()
    }

    /// Names of the modules that deploy, in reactor order.
    pub fn deploying_module_names(&self) -> Vec<String> {
        self.deploying_modules().map(|m| m.name.clone()).collect()
    }

    pub fn deploying_modules(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.modules.iter().filter(|m| m.deploy)
    }
}

impl ModuleEntry {
    pub fn is_snapshot(&self) -> bool {
        crate::coordinate::is_snapshot_version(&self.version)
    }

    /// Resolve this module's files against `project_root` into deployable
    /// artifacts. Missing files are an error for this module only.
    pub fn artifacts(&self, project_root: &Path) -> NexstageResult<Vec<DeployableArtifact>> {
        self.files
            .iter()
            .map(|entry| {
                let file = if entry.path.is_absolute() {
                    entry.path.clone()
                } else {
                    project_root.join(&entry.path)
                };
                if !file.is_file() {
                    return Err(NexstageError::Manifest {
                        message: format!(
                            "Module '{}': file {} does not exist",
                            self.name,
                            file.display()
                        ),
                    });
                }
                let extension = entry
                    .extension
                    .clone()
                    .or_else(|| {
                        file.extension()
                            .and_then(|e| e.to_str())
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| "jar".to_string());
                let mut coordinates =
                    Coordinates::new(&self.group, &self.artifact, &self.version, &extension);
                coordinates.classifier = entry.classifier.clone();
                Ok(DeployableArtifact::new(file, coordinates))
            })
            .collect()
    }
}
