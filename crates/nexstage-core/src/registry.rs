//! On-disk records of the staging repositories a build uploaded into.
//!
//! Each staged profile gets one `<profileId>.properties` file next to its
//! content directory under the staging root. A record is written only after
//! the profile's upload finished, so its presence is the success signal for
//! later goals (`finish`, `deploy-staged`) run in a separate process.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use nexstage_util::errors::{NexstageError, NexstageResult};
use nexstage_util::fs::ensure_dir;

use crate::properties::{parse_key_values, render_key_values};
use crate::staging::StagingRepository;

const RECORD_EXTENSION: &str = "properties";

const KEY_ID: &str = "stagingRepository.id";
const KEY_PROFILE_ID: &str = "stagingRepository.profileId";
const KEY_URL: &str = "stagingRepository.url";
const KEY_MANAGED: &str = "stagingRepository.managed";

/// Registry of staging repository records rooted at a local staging area.
#[derive(Debug, Clone)]
pub struct StagingRepositoryRegistry {
    root: PathBuf,
}

impl StagingRepositoryRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record for `profile_id`.
    pub fn record_path(&self, profile_id: &str) -> PathBuf {
        self.root.join(format!("{profile_id}.{RECORD_EXTENSION}"))
    }

    /// Persist `repo` as the record of `profile_id` (the name of the local
    /// directory it was staged from), replacing any earlier record for that
    /// profile. The write goes through a temp file so a
    /// reader never observes a half-written record.
    pub fn record_created(&self, profile_id: &str, repo: &StagingRepository) -> NexstageResult<()> {
        ensure_dir(&self.root)?;

        let mut values = BTreeMap::new();
        values.insert(KEY_ID.to_string(), repo.repository_id.clone());
        values.insert(KEY_PROFILE_ID.to_string(), repo.profile_id.clone());
        values.insert(KEY_URL.to_string(), repo.url.clone());
        values.insert(KEY_MANAGED.to_string(), repo.managed.to_string());
        let content = render_key_values(Some("nexstage staging repository record"), &values);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(self.record_path(profile_id))
            .map_err(|e| NexstageError::Io(e.error))?;

        tracing::debug!(
            "Recorded staging repository {} for profile {profile_id}",
            repo.repository_id
        );
        Ok(())
    }

    /// Every record found under the root, in directory-listing order.
    ///
    /// Yields nothing when the root does not exist. Unreadable or malformed
    /// records are skipped with a warning.
    pub fn read_all(&self) -> impl Iterator<Item = StagingRepository> {
        self.entries().map(|(_, repo)| repo)
    }

    /// Like [`Self::read_all`], paired with the key each record is stored
    /// under.
    pub fn entries(&self) -> impl Iterator<Item = (String, StagingRepository)> {
        std::fs::read_dir(&self.root)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let is_record = path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION);
                if !is_record {
                    return None;
                }
                let key = path.file_stem()?.to_str()?.to_string();
                match read_record(&path) {
                    Ok(repo) => Some((key, repo)),
                    Err(e) => {
                        tracing::warn!("Skipping staging record {}: {e}", path.display());
                        None
                    }
                }
            })
    }

    /// The record of `profile_id`, if one exists.
    pub fn read(&self, profile_id: &str) -> NexstageResult<Option<StagingRepository>> {
        let path = self.record_path(profile_id);
        if !path.is_file() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }

    /// Delete the record of `profile_id`. Returns whether a record existed.
    pub fn remove(&self, profile_id: &str) -> NexstageResult<bool> {
        let path = self.record_path(profile_id);
        if path.is_file() {
            std::fs::remove_file(&path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

fn read_record(path: &Path) -> NexstageResult<StagingRepository> {
    let content = std::fs::read_to_string(path)?;
    let values = parse_key_values(&content);
    let get = |key: &str| {
        values.get(key).cloned().ok_or_else(|| NexstageError::Generic {
            message: format!("missing key '{key}'"),
        })
    };
    let managed = match get(KEY_MANAGED)?.as_str() {
        "true" => true,
        "false" => false,
        other => {
            return Err(NexstageError::Generic {
                message: format!("invalid managed flag '{other}'"),
            })
        }
    };
    Ok(StagingRepository {
        profile_id: get(KEY_PROFILE_ID)?,
        repository_id: get(KEY_ID)?,
        url: get(KEY_URL)?,
        managed,
    })
}
