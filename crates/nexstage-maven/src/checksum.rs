//! Checksum sidecar generation for locally staged files.

use std::path::{Path, PathBuf};

use nexstage_util::errors::NexstageResult;
use nexstage_util::hash::{file_digest, ChecksumAlgorithm};

/// Sidecars every repository expects.
const STANDARD: [ChecksumAlgorithm; 2] = [ChecksumAlgorithm::Md5, ChecksumAlgorithm::Sha1];

/// Additional sidecars written when strong checksums are requested.
const STRONG: [ChecksumAlgorithm; 2] = [ChecksumAlgorithm::Sha256, ChecksumAlgorithm::Sha512];

/// Write checksum sidecars next to `file` and return their paths.
///
/// Sidecars and signatures are not checksummed themselves.
pub fn write_sidecars(file: &Path, strong: bool) -> NexstageResult<Vec<PathBuf>> {
    if ChecksumAlgorithm::is_sidecar(file) {
        return Ok(Vec::new());
    }
    let mut written = Vec::new();
    for algo in algorithms(strong) {
        let digest = file_digest(file, algo)?;
        let sidecar = sidecar_path(file, algo);
        std::fs::write(&sidecar, digest)?;
        written.push(sidecar);
    }
    Ok(written)
}

/// Sidecar algorithms to produce, strongest last.
pub fn algorithms(strong: bool) -> Vec<ChecksumAlgorithm> {
    let extra: &[ChecksumAlgorithm] = if strong { &STRONG } else { &[] };
    STANDARD.iter().chain(extra).copied().collect()
}

/// Path of the `algo` sidecar of `file`, e.g. `core-1.0.jar.sha1`.
pub fn sidecar_path(file: &Path, algo: ChecksumAlgorithm) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".");
    name.push(algo.extension());
    PathBuf::from(name)
}
