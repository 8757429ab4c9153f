//! Loading the project, parameters and remote handles for one goal.

use std::path::{Path, PathBuf};

use nexstage_core::config::GlobalConfig;
use nexstage_core::manifest::Manifest;
use nexstage_core::parameters::Parameters;
use nexstage_core::properties::load_env_file;
use nexstage_core::{ENV_FILE, MANIFEST_FILE};
use nexstage_maven::client::NexusClient;
use nexstage_maven::connection;
use nexstage_maven::upload::RepositoryUploader;
use nexstage_util::errors::{NexstageError, NexstageResult};
use nexstage_util::fs::find_ancestor_with;

/// A project directory and its parsed `Nexstage.toml`.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub manifest: Manifest,
}

impl Project {
    /// Find `Nexstage.toml` in `start` or a parent directory and load it.
    pub fn discover(start: &Path) -> NexstageResult<Self> {
        let manifest_path =
            find_ancestor_with(start, MANIFEST_FILE).ok_or_else(|| NexstageError::Manifest {
                message: format!(
                    "Could not find {MANIFEST_FILE} in {} or any parent directory",
                    start.display()
                ),
            })?;
        Self::load(&manifest_path)
    }

    /// Load an explicit manifest file.
    pub fn load(manifest_path: &Path) -> NexstageResult<Self> {
        let manifest = Manifest::from_path(manifest_path)?;
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self { root, manifest })
    }

    /// Like [`Self::discover`], but falls back to an empty manifest rooted
    /// at `start` for goals that only need command-line settings.
    pub fn discover_or_standalone(start: &Path) -> NexstageResult<Self> {
        match find_ancestor_with(start, MANIFEST_FILE) {
            Some(path) => Self::load(&path),
            None => Ok(Self {
                root: start.to_path_buf(),
                manifest: Manifest::default(),
            }),
        }
    }

    /// Parameters from the `[staging]` section, before any overrides.
    pub fn parameters(&self) -> Parameters {
        Parameters::from_config(&self.manifest.staging, &self.root)
    }
}

/// Resolve the credentials `params.server_id` refers to, with secrets from
/// the project's `.nexstage.env`.
pub fn attach_credentials(params: Parameters, project_root: &Path) -> NexstageResult<Parameters> {
    let Some(server_id) = params.server_id.clone() else {
        return Ok(params);
    };
    let env = load_env_file(&project_root.join(ENV_FILE))?;
    let credentials = GlobalConfig::load()?.credentials_for(&server_id, &env)?;
    tracing::debug!("Using credentials of server '{server_id}'");
    Ok(params.with_credentials(Some(credentials)))
}

/// Connect to the configured repository manager.
pub fn connect(params: &Parameters) -> NexstageResult<NexusClient> {
    let sp = nexstage_util::progress::spinner("Connecting to repository manager...");
    let client = connection::connect(params);
    sp.finish_and_clear();
    client
}

/// Uploader for plain repository URLs, configured like a staging session.
pub fn uploader(params: &Parameters) -> NexstageResult<RepositoryUploader> {
    let http = connection::build_http_client(params, params.credentials.as_ref())?;
    Ok(RepositoryUploader::new(http, params.credentials.clone()))
}
