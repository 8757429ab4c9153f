//! Local staging areas laid out as Maven repositories.
//!
//! Per-module deploy steps copy artifacts (plus checksum sidecars) into an
//! area; the finalizing step later walks the area and uploads every file
//! under its layout path.

use std::path::{Path, PathBuf};

use nexstage_core::coordinate::{Coordinates, DeployableArtifact};
use nexstage_maven::checksum::write_sidecars;
use nexstage_util::errors::{NexstageError, NexstageResult};
use nexstage_util::fs::{copy_file, relative_slash_path, walk_files};
use nexstage_util::hash::ChecksumAlgorithm;

/// A file waiting in a local area, with its `/` separated layout path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: String,
    pub file: PathBuf,
}

/// Copy `artifacts` into `root` under their repository paths and write
/// checksum sidecars next to each copy. Returns the copied artifact paths.
pub fn stage_artifacts(
    root: &Path,
    artifacts: &[DeployableArtifact],
    strong_checksums: bool,
) -> NexstageResult<Vec<PathBuf>> {
    let mut staged = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let dest = root.join(artifact.coordinates.repository_path());
        copy_file(&artifact.file, &dest)?;
        write_sidecars(&dest, strong_checksums)?;
        tracing::debug!("Staged {} -> {}", artifact.coordinates, dest.display());
        staged.push(dest);
    }
    Ok(staged)
}

/// Every file below `root`, ordered by layout path. Empty when `root` does
/// not exist.
pub fn area_files(root: &Path) -> NexstageResult<Vec<StagedFile>> {
    let mut files: Vec<StagedFile> = walk_files(root)?
        .into_iter()
        .filter_map(|file| {
            relative_slash_path(root, &file).map(|path| StagedFile { path, file })
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Upload every file of the area at `root` through `put`, one at a time,
/// showing a progress bar. Returns the number of files sent.
pub fn upload_area<F>(root: &Path, label: &str, mut put: F) -> NexstageResult<usize>
where
    F: FnMut(&StagedFile) -> NexstageResult<()>,
{
    let files = area_files(root)?;
    let bar = nexstage_util::progress::upload_bar(files.len() as u64, label);
    for staged in &files {
        bar.set_message(format!("{label} {}", staged.path));
        if let Err(e) = put(staged) {
            bar.abandon();
            return Err(e);
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(files.len())
}

/// Sub-directories of a staging root, one per profile, in name order.
pub fn profile_directories(root: &Path) -> NexstageResult<Vec<(String, PathBuf)>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            dirs.push((name.to_string(), path.clone()));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

/// Recover coordinates from a layout path such as
/// `com/example/core/1.0/core-1.0.jar`. Classifiers are not recovered.
pub fn coordinates_from_path(path: &str) -> Option<Coordinates> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 4 {
        return None;
    }
    let n = segments.len();
    let file_name = segments[n - 1];
    let version = segments[n - 2];
    let artifact = segments[n - 3];
    let group = segments[..n - 3].join(".");
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext)?;
    Some(Coordinates::new(&group, artifact, version, extension))
}

/// Coordinates of the first non-sidecar file of a prepared area, used to
/// match a staging profile for it.
pub fn first_coordinates(root: &Path) -> NexstageResult<Coordinates> {
    area_files(root)?
        .iter()
        .filter(|f| !ChecksumAlgorithm::is_sidecar(&f.file))
        .find_map(|f| coordinates_from_path(&f.path))
        .ok_or_else(|| NexstageError::Manifest {
            message: format!(
                "No artifacts in repository layout found under {}",
                root.display()
            ),
        })
}
