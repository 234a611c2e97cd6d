//! Fail-closed decryption pipeline.
//!
//! One linear pass per container, modeled as an explicit state machine
//! with a single terminal success state and a single terminal failure
//! state.  Any failure deletes the output file, so a partial plaintext
//! never survives; the caller always receives a structured outcome,
//! never a raised error.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::cipher;
use crate::error::DecryptError;
use crate::integrity::{verify_range, IntegrityPhase};
use crate::layout::FormatConfig;
use crate::metadata::{extract_metadata, PdfMetadata};

/// Structured result of a [`decrypt`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptionOutcome {
    pub success: bool,
    pub metadata: Option<PdfMetadata>,
    pub error: Option<String>,
}

enum Phase {
    Extract,
    Validate(PdfMetadata),
    VerifySealed(PdfMetadata),
    DecryptBody(PdfMetadata),
    VerifyPlain(PdfMetadata),
    Done(PdfMetadata),
}

/// Decrypt the container at `input` into `output` with a 32-byte key.
///
/// Runs extract → validate → verify(pre) → decrypt → verify(post).  On
/// any failure the output file is removed (best-effort) and the failure
/// reason is reported in the outcome; on success the extracted metadata
/// is returned for caller inspection without re-reading the output.
pub fn decrypt(input: &Path, output: &Path, key: &[u8], config: &FormatConfig) -> DecryptionOutcome {
    match run(input, output, key, config) {
        Ok(metadata) => DecryptionOutcome {
            success: true,
            metadata: Some(metadata),
            error: None,
        },
        Err(err) => {
            remove_partial_output(output);
            DecryptionOutcome {
                success: false,
                metadata: None,
                error: Some(err.to_string()),
            }
        }
    }
}

fn run(
    input: &Path,
    output: &Path,
    key: &[u8],
    config: &FormatConfig,
) -> Result<PdfMetadata, DecryptError> {
    let mut phase = Phase::Extract;
    loop {
        phase = match phase {
            Phase::Extract => {
                debug!("extracting metadata from {}", input.display());
                Phase::Validate(extract_metadata(input, config)?)
            }
            Phase::Validate(m) => {
                cipher::ensure_supported(m.header.cipher_id, &m.header.cipher_desc, config)?;
                cipher::check_key(key)?;
                cipher::check_iv(&config.fixed_iv)?;
                Phase::VerifySealed(m)
            }
            Phase::VerifySealed(m) => {
                debug!("verifying sealed body ({} bytes)", m.data_range.body_len());
                verify_range(
                    input,
                    m.data_range.data_start,
                    m.data_range.data_end,
                    &m.footer.destination_md5,
                    &m.footer.destination_sha256,
                    IntegrityPhase::Pre,
                )?;
                Phase::DecryptBody(m)
            }
            Phase::DecryptBody(m) => {
                debug!("decrypting body into {}", output.display());
                cipher::decrypt_range(input, output, key, &config.fixed_iv, &m.data_range)?;
                Phase::VerifyPlain(m)
            }
            Phase::VerifyPlain(m) => {
                debug!("verifying recovered plaintext");
                verify_range(
                    output,
                    0,
                    m.data_range.total_size - 1,
                    &m.header.source_md5,
                    &m.header.source_sha256,
                    IntegrityPhase::Post,
                )?;
                Phase::Done(m)
            }
            Phase::Done(m) => return Ok(m),
        };
    }
}

// A failed delete is swallowed so it cannot mask the primary failure.
fn remove_partial_output(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("removed partial output {}", path.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!("could not remove partial output {}: {err}", path.display()),
    }
}
