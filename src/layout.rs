//! Frozen container layout: field tables + format configuration.
//!
//! # Identity rules
//! Every header/footer field is identified by a fixed `(offset, length)`
//! pair inside its 1024-byte record.  These values are permanent — they
//! are the wire contract any reimplementation must match byte-for-byte
//! to interoperate with existing containers.
//!
//! # Endianness
//! All multi-byte integers on disk are little-endian.  No runtime
//! negotiation is ever performed.

use byteorder::{ByteOrder, LittleEndian};

/// Byte length of the container header record.
pub const HEADER_SIZE: usize = 1024;
/// Byte length of the container footer record.
pub const FOOTER_SIZE: usize = 1024;

/// Fixed, format-wide CBC initialization vector.
/// Hex form: `31323334353637383837363534333231`.
pub const FIXED_IV: [u8; 16] = *b"1234567887654321";

/// Numeric identifier of AES-256 in CBC mode — the only supported cipher.
pub const AES_256_CBC_ID: u32 = 0x8d;

// ── Field ────────────────────────────────────────────────────────────────────

/// One fixed-position field inside a header or footer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub len: usize,
}

impl Field {
    pub const fn new(name: &'static str, offset: usize, len: usize) -> Self {
        Self { name, offset, len }
    }

    /// Raw bytes of this field within `record`.
    pub fn bytes<'a>(&self, record: &'a [u8]) -> &'a [u8] {
        &record[self.offset..self.offset + self.len]
    }

    /// Lowercase hex rendering (digest and opaque-byte fields).
    pub fn hex(&self, record: &[u8]) -> String {
        hex::encode(self.bytes(record))
    }

    pub fn u32_le(&self, record: &[u8]) -> u32 {
        LittleEndian::read_u32(self.bytes(record))
    }

    pub fn i64_le(&self, record: &[u8]) -> i64 {
        LittleEndian::read_i64(self.bytes(record))
    }

    /// Text field: stops at the first NUL byte (or the field end) and is
    /// trimmed of surrounding whitespace.
    pub fn text(&self, record: &[u8]) -> String {
        let bytes = self.bytes(record);
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).trim().to_string()
    }
}

// ── Header layout ────────────────────────────────────────────────────────────

pub mod header {
    use super::{Field, HEADER_SIZE};

    pub const MAGIC: Field = Field::new("magic", 0, 64);
    pub const HEAD_VERSION: Field = Field::new("head_version", 64, 4);
    /// Stored obfuscated on disk; see `metadata::deobfuscate_header`.
    pub const BODY_VERSION: Field = Field::new("body_version", 68, 4);
    pub const SOURCE_MD5: Field = Field::new("source_md5", 72, 16);
    pub const SOURCE_SHA256: Field = Field::new("source_sha256", 88, 32);
    pub const CREATE_TIME: Field = Field::new("create_time", 204, 8);
    pub const FILE_METHOD: Field = Field::new("file_method", 208, 4);
    pub const CIPHER_ID: Field = Field::new("cipher_id", 212, 4);
    pub const CIPHER_DESC: Field = Field::new("cipher_desc", 216, HEADER_SIZE - 216);

    pub const FIELDS: &[Field] = &[
        MAGIC,
        HEAD_VERSION,
        BODY_VERSION,
        SOURCE_MD5,
        SOURCE_SHA256,
        CREATE_TIME,
        FILE_METHOD,
        CIPHER_ID,
        CIPHER_DESC,
    ];
}

// ── Footer layout ────────────────────────────────────────────────────────────

pub mod footer {
    use super::{Field, FOOTER_SIZE};

    pub const TAIL_VERSION: Field = Field::new("tail_version", 0, 4);
    pub const DESTINATION_MD5: Field = Field::new("destination_md5", 132, 16);
    pub const DESTINATION_SHA256: Field = Field::new("destination_sha256", 148, 32);
    pub const UPDATE_TIME: Field = Field::new("update_time", 264, 8);
    pub const COPYRIGHT: Field = Field::new("copyright", 832, FOOTER_SIZE - 832);
    pub const TERMINAL_MARKER: Field = Field::new("terminal_marker", 960, 16);

    pub const FIELDS: &[Field] = &[
        TAIL_VERSION,
        DESTINATION_MD5,
        DESTINATION_SHA256,
        UPDATE_TIME,
        COPYRIGHT,
        TERMINAL_MARKER,
    ];
}

// ── FormatConfig ─────────────────────────────────────────────────────────────

/// Format constants threaded explicitly through the pipeline instead of
/// living as process-wide state.
#[derive(Debug, Clone)]
pub struct FormatConfig {
    pub header_size: usize,
    pub footer_size: usize,
    pub fixed_iv: Vec<u8>,
    pub supported_cipher_id: u32,
}

impl FormatConfig {
    /// Smallest file that can hold a header and a footer.
    pub fn min_container_size(&self) -> u64 {
        (self.header_size + self.footer_size) as u64
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            header_size: HEADER_SIZE,
            footer_size: FOOTER_SIZE,
            fixed_iv: FIXED_IV.to_vec(),
            supported_cipher_id: AES_256_CBC_ID,
        }
    }
}
