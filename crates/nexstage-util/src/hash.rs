use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::io::Read;
use std::path::Path;

/// Checksum algorithms used for Maven repository sidecar files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    /// File extension of the sidecar, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Whether `path` is itself a checksum sidecar of any known algorithm.
    pub fn is_sidecar(path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        matches!(ext, "md5" | "sha1" | "sha256" | "sha512" | "asc")
    }
}

/// Compute the hex digest of a file for the given algorithm.
pub fn file_digest(path: &Path, algorithm: ChecksumAlgorithm) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    match algorithm {
        ChecksumAlgorithm::Md5 => stream_digest::<Md5>(file),
        ChecksumAlgorithm::Sha1 => stream_digest::<Sha1>(file),
        ChecksumAlgorithm::Sha256 => stream_digest::<Sha256>(file),
        ChecksumAlgorithm::Sha512 => stream_digest::<Sha512>(file),
    }
}

fn stream_digest<D: Digest>(mut file: std::fs::File) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex(&hasher.finalize()))
}

/// Compute the hex digest of a byte slice for the given algorithm.
pub fn bytes_digest(data: &[u8], algorithm: ChecksumAlgorithm) -> String {
    match algorithm {
        ChecksumAlgorithm::Md5 => hex(&Md5::digest(data)),
        ChecksumAlgorithm::Sha1 => hex(&Sha1::digest(data)),
        ChecksumAlgorithm::Sha256 => hex(&Sha256::digest(data)),
        ChecksumAlgorithm::Sha512 => hex(&Sha512::digest(data)),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
