//! AES-256-CBC streaming body decryption.
//!
//! The body is decrypted block-by-block through a bounded buffer, so
//! memory use is independent of body size.  PKCS#7 unpadding is applied
//! to the final block by the cipher primitive; a padding failure is
//! surfaced as a decryption error, never ignored.

use aes::cipher::block_padding::{Padding, Pkcs7};
use aes::cipher::{BlockDecryptMut, KeyIvInit};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::DecryptError;
use crate::layout::FormatConfig;
use crate::metadata::DataRange;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Required key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;
/// Required IV length in bytes.
pub const IV_LEN: usize = 16;
/// AES block length in bytes.
pub const BLOCK_LEN: usize = 16;

// Multiple of BLOCK_LEN so every buffer splits into whole blocks.
const IO_BUF_LEN: usize = 64 * 1024;

/// Reject any cipher identifier other than the single supported one,
/// naming the header's description text in the error.
pub fn ensure_supported(
    cipher_id: u32,
    cipher_desc: &str,
    config: &FormatConfig,
) -> Result<(), DecryptError> {
    if cipher_id != config.supported_cipher_id {
        return Err(DecryptError::UnsupportedCipher {
            desc: cipher_desc.to_string(),
        });
    }
    Ok(())
}

pub fn check_key(key: &[u8]) -> Result<(), DecryptError> {
    if key.len() != KEY_LEN {
        return Err(DecryptError::InvalidKeyLength { actual: key.len() });
    }
    Ok(())
}

pub fn check_iv(iv: &[u8]) -> Result<(), DecryptError> {
    if iv.len() != IV_LEN {
        return Err(DecryptError::InvalidIvLength { actual: iv.len() });
    }
    Ok(())
}

/// Decrypt the body span of `input` into `output` in a single streaming
/// pass.  `range.data_start ..= range.data_end` must hold the ciphertext;
/// the plaintext is written incrementally to `output`.
pub fn decrypt_range(
    input: &Path,
    output: &Path,
    key: &[u8],
    iv: &[u8],
    range: &DataRange,
) -> Result<(), DecryptError> {
    check_key(key)?;
    check_iv(iv)?;

    let total = range.body_len();
    if total == 0 || total % BLOCK_LEN as u64 != 0 {
        return Err(DecryptError::Decryption(format!(
            "ciphertext length {total} is not a positive multiple of the {BLOCK_LEN}-byte AES block"
        )));
    }

    let mut decryptor = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|e| DecryptError::Decryption(format!("cipher init failed: {e}")))?;

    let mut reader = BufReader::new(File::open(input)?);
    reader.seek(SeekFrom::Start(range.data_start))?;
    let mut writer = BufWriter::new(File::create(output)?);

    let mut remaining = total;
    let mut buf = vec![0u8; IO_BUF_LEN];
    while remaining > 0 {
        let take = remaining.min(IO_BUF_LEN as u64) as usize;
        let chunk = &mut buf[..take];
        reader.read_exact(chunk)?;
        remaining -= take as u64;

        for block in chunk.chunks_exact_mut(BLOCK_LEN) {
            decryptor.decrypt_block_mut(aes::Block::from_mut_slice(block));
        }

        if remaining == 0 {
            // The stream's last block carries the PKCS#7 padding.
            let (body, last) = chunk.split_at(take - BLOCK_LEN);
            writer.write_all(body)?;
            let unpadded = Pkcs7::unpad(aes::Block::from_slice(last)).map_err(|_| {
                DecryptError::Decryption("invalid PKCS#7 padding in final block".to_string())
            })?;
            writer.write_all(unpadded)?;
        } else {
            writer.write_all(chunk)?;
        }
    }
    writer.flush()?;
    Ok(())
}
