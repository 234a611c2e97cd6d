use crate::integrity::{DigestKind, IntegrityPhase};
use std::io;
use thiserror::Error;

/// The error type for all container decoding operations.
#[derive(Error, Debug)]
pub enum DecryptError {
    /// The file is too small to hold a header and a footer.
    #[error("container too small: {size} bytes (need at least {min})")]
    TooSmall { size: u64, min: u64 },

    /// The header names a cipher other than the single supported one.
    #[error("unsupported cipher method: {desc}")]
    UnsupportedCipher { desc: String },

    #[error("invalid key length: expected 32 bytes, got {actual}")]
    InvalidKeyLength { actual: usize },

    #[error("invalid IV length: expected 16 bytes, got {actual}")]
    InvalidIvLength { actual: usize },

    /// A digest pass over the sealed body or the recovered plaintext
    /// did not match the digests recorded in the container.
    #[error("{phase} integrity check failed ({digest} mismatch)")]
    Integrity {
        phase: IntegrityPhase,
        digest: DigestKind,
    },

    /// Block-cipher failure: malformed ciphertext length or bad
    /// PKCS#7 padding in the final block.
    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
