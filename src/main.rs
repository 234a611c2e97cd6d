use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wpdf::integrity::{verify_range, IntegrityPhase};
use wpdf::metadata::PdfMetadata;
use wpdf::split::{split_file, SplitOutcome, DEFAULT_CHUNK_SIZE};
use wpdf::{decrypt, extract_metadata, FormatConfig};

#[derive(Parser)]
#[command(name = "wpdf", about = "Decoder for wrapped PDF document containers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decrypt a container and verify the recovered document
    Decrypt {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// 32-byte decryption key as raw text
        #[arg(short, long)]
        key: Option<String>,
        /// 32-byte decryption key, hex-encoded
        #[arg(long)]
        key_hex: Option<String>,
        /// Split the plaintext into numbered segments above this size (MiB)
        #[arg(long)]
        split_mib: Option<u64>,
    },
    /// Show container metadata
    Info {
        input: PathBuf,
        /// Emit JSON instead of the human-readable listing
        #[arg(long)]
        json: bool,
    },
    /// Verify the sealed body digests without decrypting
    Verify {
        input: PathBuf,
    },
    /// Split a file into fixed-size numbered segments
    Split {
        input: PathBuf,
        /// Segment threshold in MiB
        #[arg(short, long, default_value = "50")]
        chunk_mib: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = FormatConfig::default();

    match Cli::parse().command {

        // ── Decrypt ──────────────────────────────────────────────────────────
        Commands::Decrypt { input, output, key, key_hex, split_mib } => {
            let key_bytes = resolve_key(key, key_hex)?;
            let outcome = decrypt(&input, &output, &key_bytes, &config);
            if !outcome.success {
                return Err(outcome
                    .error
                    .unwrap_or_else(|| "decryption failed".to_string())
                    .into());
            }
            println!("Decrypted: {}", output.display());
            if let Some(m) = &outcome.metadata {
                if !m.footer.copyright.is_empty() {
                    println!("  {}", m.footer.copyright);
                }
            }

            if let Some(mib) = split_mib {
                match split_file(&output, mib.max(1) * 1024 * 1024)? {
                    SplitOutcome::Unsplit => {}
                    SplitOutcome::Split(parts) => {
                        println!("Split into {} segments:", parts.len());
                        for part in parts {
                            println!("  {}", part.display());
                        }
                    }
                }
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, json } => {
            let m = extract_metadata(&input, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&m)?);
            } else {
                print_metadata(&input, &m);
            }
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { input } => {
            let m = extract_metadata(&input, &config)?;
            verify_range(
                &input,
                m.data_range.data_start,
                m.data_range.data_end,
                &m.footer.destination_md5,
                &m.footer.destination_sha256,
                IntegrityPhase::Pre,
            )?;
            println!(
                "OK: sealed body ({} bytes) matches both digests",
                m.data_range.body_len()
            );
        }

        // ── Split ────────────────────────────────────────────────────────────
        Commands::Split { input, chunk_mib } => {
            let threshold = if chunk_mib == 0 {
                DEFAULT_CHUNK_SIZE
            } else {
                chunk_mib * 1024 * 1024
            };
            match split_file(&input, threshold)? {
                SplitOutcome::Unsplit => println!("Below threshold, left unsplit"),
                SplitOutcome::Split(parts) => {
                    for part in parts {
                        println!("  {}", part.display());
                    }
                }
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn resolve_key(
    key: Option<String>,
    key_hex: Option<String>,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    match (key, key_hex) {
        (Some(k), None) => Ok(k.into_bytes()),
        (None, Some(h)) => Ok(hex::decode(h.trim())?),
        _ => Err("exactly one of --key or --key-hex is required".into()),
    }
}

fn print_metadata(path: &PathBuf, m: &PdfMetadata) {
    println!("── Wrapped container ───────────────────────────────────");
    println!("  Path             {}", path.display());
    println!("  Head version     {}", m.header.head_version);
    println!("  Body version     {}", m.header.body_version);
    println!("  Tail version     {}", m.footer.tail_version);
    println!("  File method      {}", m.header.file_method);
    println!(
        "  Cipher           {} (0x{:02x})",
        m.header.cipher_desc, m.header.cipher_id
    );
    println!(
        "  Created          {}",
        format_time(m.header.create_time, m.header.created_at())
    );
    println!(
        "  Updated          {}",
        format_time(m.footer.update_time, m.footer.updated_at())
    );
    println!("  Source MD5       {}", m.header.source_md5);
    println!("  Source SHA-256   {}", m.header.source_sha256);
    println!("  Body MD5         {}", m.footer.destination_md5);
    println!("  Body SHA-256     {}", m.footer.destination_sha256);
    println!(
        "  Body bytes       {} ({}..={})",
        m.data_range.body_len(),
        m.data_range.data_start,
        m.data_range.data_end
    );
    println!("  Terminal marker  {}", m.footer.terminal_marker);
    if !m.footer.copyright.is_empty() {
        println!("  Copyright        {}", m.footer.copyright);
    }
}

fn format_time(raw: i64, parsed: Option<chrono::DateTime<chrono::Utc>>) -> String {
    match parsed {
        Some(t) => t.to_rfc3339(),
        None => format!("{raw} (out of range)"),
    }
}
