//! Streaming integrity verification.
//!
//! One read pass drives MD5 and SHA-256 together so a multi-hundred-
//! megabyte body is never read twice.  Digests are compared as hex
//! strings, case-insensitively.

use md5::{Digest, Md5};
use sha2::Sha256;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::DecryptError;

const READ_BUF_LEN: usize = 64 * 1024;

/// Which pipeline pass a verification failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityPhase {
    /// Sealed body, before decryption.
    Pre,
    /// Recovered plaintext, after decryption.
    Post,
}

impl fmt::Display for IntegrityPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityPhase::Pre => f.write_str("pre-decryption"),
            IntegrityPhase::Post => f.write_str("post-decryption"),
        }
    }
}

/// Which of the two digests mismatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Md5,
    Sha256,
    Both,
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestKind::Md5 => f.write_str("md5"),
            DigestKind::Sha256 => f.write_str("sha256"),
            DigestKind::Both => f.write_str("md5 and sha256"),
        }
    }
}

/// Two hash accumulators fed from a single stream.
pub struct DualDigest {
    md5: Md5,
    sha256: Sha256,
}

impl DualDigest {
    pub fn new() -> Self {
        Self {
            md5: Md5::new(),
            sha256: Sha256::new(),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.md5.update(bytes);
        self.sha256.update(bytes);
    }

    /// Finish both digests, rendered as lowercase hex.
    pub fn finalize(self) -> (String, String) {
        (
            hex::encode(self.md5.finalize()),
            hex::encode(self.sha256.finalize()),
        )
    }
}

impl Default for DualDigest {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream the inclusive byte range `[start, end]` of `path` through both
/// digests and compare against the expected hex values.
///
/// The range is clamped to the end of the file, so a caller may pass an
/// `end` beyond EOF to mean "through the last byte".  Performs no
/// transformation of the data in transit.
pub fn verify_range(
    path: &Path,
    start: u64,
    end: u64,
    expected_md5: &str,
    expected_sha256: &str,
    phase: IntegrityPhase,
) -> Result<(), DecryptError> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(start))?;

    let span = end.saturating_add(1).saturating_sub(start);
    let mut remaining = span.min(len.saturating_sub(start));

    let mut digest = DualDigest::new();
    let mut buf = vec![0u8; READ_BUF_LEN];
    while remaining > 0 {
        let take = remaining.min(buf.len() as u64) as usize;
        reader.read_exact(&mut buf[..take])?;
        digest.update(&buf[..take]);
        remaining -= take as u64;
    }

    let (md5_hex, sha256_hex) = digest.finalize();
    let md5_ok = md5_hex.eq_ignore_ascii_case(expected_md5);
    let sha256_ok = sha256_hex.eq_ignore_ascii_case(expected_sha256);
    match (md5_ok, sha256_ok) {
        (true, true) => Ok(()),
        (false, true) => Err(DecryptError::Integrity {
            phase,
            digest: DigestKind::Md5,
        }),
        (true, false) => Err(DecryptError::Integrity {
            phase,
            digest: DigestKind::Sha256,
        }),
        (false, false) => Err(DecryptError::Integrity {
            phase,
            digest: DigestKind::Both,
        }),
    }
}
