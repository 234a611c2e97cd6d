//! Container metadata extraction.
//!
//! A wrapped container is `[header (1024 B) | body | footer (1024 B)]`.
//! Only the first and last kilobyte are read here; the body is streamed
//! separately by the integrity and cipher passes.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::DecryptError;
use crate::layout::{footer, header, FormatConfig};

/// Parsed header record.  Digest and opaque-byte fields are rendered as
/// lowercase hex; timestamps are raw epoch seconds (see the accessors).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub magic: String,
    pub head_version: u32,
    pub body_version: u32,
    pub source_md5: String,
    pub source_sha256: String,
    pub create_time: i64,
    pub file_method: u32,
    pub cipher_id: u32,
    pub cipher_desc: String,
}

impl HeaderRecord {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.create_time, 0)
    }
}

/// Parsed footer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FooterRecord {
    pub tail_version: u32,
    pub destination_md5: String,
    pub destination_sha256: String,
    pub update_time: i64,
    pub copyright: String,
    pub terminal_marker: String,
}

impl FooterRecord {
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.update_time, 0)
    }
}

/// Inclusive byte span of the encrypted body within the container.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DataRange {
    pub header_size: u64,
    pub footer_size: u64,
    pub data_start: u64,
    pub data_end: u64,
    pub total_size: u64,
}

impl DataRange {
    /// Length of the encrypted body in bytes.
    pub fn body_len(&self) -> u64 {
        self.total_size
            .saturating_sub(self.header_size + self.footer_size)
    }
}

/// Aggregate metadata for one container, produced once per extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub header: HeaderRecord,
    pub footer: FooterRecord,
    pub data_range: DataRange,
}

/// Parse the header and footer records out of the container at `path`.
///
/// Fails with [`DecryptError::TooSmall`] before any parsing if the file
/// cannot hold both records.
pub fn extract_metadata(path: &Path, config: &FormatConfig) -> Result<PdfMetadata, DecryptError> {
    let mut file = File::open(path)?;
    let total_size = file.metadata()?.len();
    let min = config.min_container_size();
    if total_size < min {
        return Err(DecryptError::TooSmall {
            size: total_size,
            min,
        });
    }

    let mut raw_header = vec![0u8; config.header_size];
    file.read_exact(&mut raw_header)?;

    file.seek(SeekFrom::End(-(config.footer_size as i64)))?;
    let mut raw_footer = vec![0u8; config.footer_size];
    file.read_exact(&mut raw_footer)?;

    deobfuscate_header(&mut raw_header);

    Ok(PdfMetadata {
        header: parse_header(&raw_header),
        footer: parse_footer(&raw_footer),
        data_range: DataRange {
            header_size: config.header_size as u64,
            footer_size: config.footer_size as u64,
            data_start: config.header_size as u64,
            data_end: total_size - config.footer_size as u64 - 1,
            total_size,
        },
    })
}

/// Reverse the byte scrambling applied to the stored `body_version` word.
///
/// The original little-endian u32 is stored with its byte 0 at offset 68,
/// byte 2 at offset 70 and byte 3 at offset 71.  Byte 1 is not present in
/// the scrambled form and is pinned to zero — the transform is lossy and
/// is reproduced here exactly for compatibility.
pub(crate) fn deobfuscate_header(raw: &mut [u8]) {
    let off = header::BODY_VERSION.offset;
    let v = LittleEndian::read_u32(&raw[off..off + 4]);
    raw[off] = (v & 0xff) as u8;
    raw[off + 1] = 0;
    raw[off + 2] = ((v >> 16) & 0xff) as u8;
    raw[off + 3] = ((v >> 24) & 0xff) as u8;
}

fn parse_header(record: &[u8]) -> HeaderRecord {
    HeaderRecord {
        magic: header::MAGIC.hex(record),
        head_version: header::HEAD_VERSION.u32_le(record),
        body_version: header::BODY_VERSION.u32_le(record),
        source_md5: header::SOURCE_MD5.hex(record),
        source_sha256: header::SOURCE_SHA256.hex(record),
        create_time: header::CREATE_TIME.i64_le(record),
        file_method: header::FILE_METHOD.u32_le(record),
        cipher_id: header::CIPHER_ID.u32_le(record),
        cipher_desc: header::CIPHER_DESC.text(record),
    }
}

fn parse_footer(record: &[u8]) -> FooterRecord {
    FooterRecord {
        tail_version: footer::TAIL_VERSION.u32_le(record),
        destination_md5: footer::DESTINATION_MD5.hex(record),
        destination_sha256: footer::DESTINATION_SHA256.hex(record),
        update_time: footer::UPDATE_TIME.i64_le(record),
        copyright: footer::COPYRIGHT.text(record),
        terminal_marker: footer::TERMINAL_MARKER.hex(record),
    }
}
