use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockEncryptMut, KeyIvInit};
use byteorder::{ByteOrder, LittleEndian};
use md5::{Digest, Md5};
use proptest::prelude::*;
use sha2::Sha256;

use wpdf::layout::FIXED_IV;
use wpdf::{decrypt, extract_metadata, DecryptError, FormatConfig};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

const TEST_KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

fn encrypt_body(plaintext: &[u8], key: &[u8; 32]) -> Vec<u8> {
    let msg_len = plaintext.len();
    let pad_len = 16 - msg_len % 16;
    let mut buf = plaintext.to_vec();
    buf.resize(msg_len + pad_len, 0);
    Aes256CbcEnc::new_from_slices(key, &FIXED_IV)
        .unwrap()
        .encrypt_padded_mut::<Pkcs7>(&mut buf, msg_len)
        .unwrap()
        .to_vec()
}

fn md5_bytes(data: &[u8]) -> [u8; 16] {
    Md5::digest(data).into()
}

fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

fn build_container(plaintext: &[u8], key: &[u8; 32]) -> Vec<u8> {
    build_container_with(plaintext, key, 0x8d, b"AES-256-CBC\0", true)
}

fn build_container_with(
    plaintext: &[u8],
    key: &[u8; 32],
    cipher_id: u32,
    cipher_desc: &[u8],
    true_source_digests: bool,
) -> Vec<u8> {
    let body = encrypt_body(plaintext, key);

    let mut header = vec![0u8; 1024];
    header[..4].copy_from_slice(b"WPDF");
    LittleEndian::write_u32(&mut header[64..68], 2);
    // Scrambled body_version word as found on disk; byte 1 (0x12) is the
    // one the deobfuscation discards.
    LittleEndian::write_u32(&mut header[68..72], 0x0500_1207);
    if true_source_digests {
        header[72..88].copy_from_slice(&md5_bytes(plaintext));
        header[88..120].copy_from_slice(&sha256_bytes(plaintext));
    } else {
        header[72..88].copy_from_slice(&[0xaa; 16]);
        header[88..120].copy_from_slice(&[0xbb; 32]);
    }
    // create_time; its upper half doubles as file_method in the wire format
    LittleEndian::write_i64(&mut header[204..212], 1_700_000_000);
    LittleEndian::write_u32(&mut header[212..216], cipher_id);
    header[216..216 + cipher_desc.len()].copy_from_slice(cipher_desc);

    let mut footer = vec![0u8; 1024];
    LittleEndian::write_u32(&mut footer[0..4], 1);
    footer[132..148].copy_from_slice(&md5_bytes(&body));
    footer[148..180].copy_from_slice(&sha256_bytes(&body));
    LittleEndian::write_i64(&mut footer[264..272], 1_700_000_100);
    footer[832..855].copy_from_slice(b"(c) Example Press 2024\0");
    footer[960..976].copy_from_slice(&[0xef; 16]);

    let mut container = header;
    container.extend_from_slice(&body);
    container.extend_from_slice(&footer);
    container
}

fn write_container(dir: &TempDir, bytes: &[u8]) -> (PathBuf, PathBuf) {
    let input = dir.path().join("book.wpdf");
    let output = dir.path().join("book.pdf");
    fs::write(&input, bytes).unwrap();
    (input, output)
}

fn run_decrypt(input: &Path, output: &Path, key: &[u8]) -> wpdf::DecryptionOutcome {
    decrypt(input, output, key, &FormatConfig::default())
}

#[test]
fn extracts_metadata_fields() {
    let dir = tempdir().unwrap();
    let plaintext = b"%PDF-1.7 sample document body";
    let body = encrypt_body(plaintext, TEST_KEY);
    let container = build_container(plaintext, TEST_KEY);
    let (input, _) = write_container(&dir, &container);

    let m = extract_metadata(&input, &FormatConfig::default()).unwrap();

    assert_eq!(m.data_range.total_size, container.len() as u64);
    assert_eq!(m.data_range.data_start, 1024);
    assert_eq!(m.data_range.data_end, container.len() as u64 - 1025);
    assert_eq!(m.data_range.body_len(), body.len() as u64);

    assert!(m.header.magic.starts_with("57504446")); // "WPDF"
    assert_eq!(m.header.head_version, 2);
    // 0x0500_1207 on disk; the lost byte reads back as zero
    assert_eq!(m.header.body_version, 0x0500_0007);
    assert_eq!(m.header.cipher_id, 0x8d);
    assert_eq!(m.header.cipher_desc, "AES-256-CBC");
    assert_eq!(m.header.source_md5, hex::encode(md5_bytes(plaintext)));
    assert_eq!(m.header.source_sha256, hex::encode(sha256_bytes(plaintext)));
    assert_eq!(m.header.create_time, 1_700_000_000);
    assert_eq!(m.header.created_at().unwrap().timestamp(), 1_700_000_000);

    assert_eq!(m.footer.tail_version, 1);
    assert_eq!(m.footer.destination_md5, hex::encode(md5_bytes(&body)));
    assert_eq!(m.footer.destination_sha256, hex::encode(sha256_bytes(&body)));
    assert_eq!(m.footer.update_time, 1_700_000_100);
    assert_eq!(m.footer.copyright, "(c) Example Press 2024");
    assert_eq!(m.footer.terminal_marker, "ef".repeat(16));
}

#[test]
fn decrypt_roundtrip_recovers_plaintext() {
    let dir = tempdir().unwrap();
    // Larger than one 64 KiB streaming buffer, so the final-block
    // hold-back crosses buffer boundaries.
    let plaintext: Vec<u8> = (0..150_000u32).map(|i| (i % 251) as u8).collect();
    let container = build_container(&plaintext, TEST_KEY);
    let (input, output) = write_container(&dir, &container);

    let outcome = run_decrypt(&input, &output, TEST_KEY);
    assert!(outcome.success, "decrypt failed: {:?}", outcome.error);
    assert!(outcome.error.is_none());
    assert_eq!(fs::read(&output).unwrap(), plaintext);

    let m = outcome.metadata.unwrap();
    assert_eq!(m.header.source_md5, hex::encode(md5_bytes(&plaintext)));
    assert_eq!(m.footer.copyright, "(c) Example Press 2024");
}

#[test]
fn empty_document_roundtrip() {
    let dir = tempdir().unwrap();
    let container = build_container(b"", TEST_KEY);
    let (input, output) = write_container(&dir, &container);

    let outcome = run_decrypt(&input, &output, TEST_KEY);
    assert!(outcome.success, "decrypt failed: {:?}", outcome.error);
    assert_eq!(fs::read(&output).unwrap().len(), 0);
}

#[test]
fn undersized_container_is_rejected() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("tiny.wpdf");
    fs::write(&input, vec![0u8; 100]).unwrap();

    let err = extract_metadata(&input, &FormatConfig::default()).unwrap_err();
    assert!(matches!(err, DecryptError::TooSmall { size: 100, min: 2048 }));

    let output = dir.path().join("tiny.pdf");
    let outcome = run_decrypt(&input, &output, TEST_KEY);
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("container too small"));
    assert!(!output.exists());
}

#[test]
fn tampered_body_fails_before_decryption() {
    let dir = tempdir().unwrap();
    let plaintext = vec![0x41u8; 600];
    let mut container = build_container(&plaintext, TEST_KEY);
    container[1500] ^= 0x01; // inside the body span
    let (input, output) = write_container(&dir, &container);

    let outcome = run_decrypt(&input, &output, TEST_KEY);
    assert!(!outcome.success);
    let reason = outcome.error.unwrap();
    assert!(reason.contains("pre-decryption"), "got: {reason}");
    assert!(!output.exists());
}

#[test]
fn wrong_source_digests_fail_after_decryption() {
    let dir = tempdir().unwrap();
    let plaintext = b"document whose header lies about its digests";
    let container = build_container_with(plaintext, TEST_KEY, 0x8d, b"AES-256-CBC\0", false);
    let (input, output) = write_container(&dir, &container);

    let outcome = run_decrypt(&input, &output, TEST_KEY);
    assert!(!outcome.success);
    let reason = outcome.error.unwrap();
    assert!(reason.contains("post-decryption"), "got: {reason}");
    // the written plaintext must not survive the failure
    assert!(!output.exists());
}

#[test]
fn short_key_is_rejected_without_output() {
    let dir = tempdir().unwrap();
    let container = build_container(b"irrelevant", TEST_KEY);
    let (input, output) = write_container(&dir, &container);

    let outcome = run_decrypt(&input, &output, &TEST_KEY[..31]);
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("invalid key length"));
    assert!(!output.exists());
}

#[test]
fn unsupported_cipher_names_the_description() {
    let dir = tempdir().unwrap();
    let container = build_container_with(b"irrelevant", TEST_KEY, 0x2a, b"RC4-40\0", true);
    let (input, output) = write_container(&dir, &container);

    let outcome = run_decrypt(&input, &output, TEST_KEY);
    assert!(!outcome.success);
    let reason = outcome.error.unwrap();
    assert!(reason.contains("unsupported cipher method"), "got: {reason}");
    assert!(reason.contains("RC4-40"), "got: {reason}");
    assert!(!output.exists());
}

#[test]
fn wrong_key_fails_closed() {
    let dir = tempdir().unwrap();
    let container = build_container(b"secret document", TEST_KEY);
    let (input, output) = write_container(&dir, &container);

    // Either the final-block padding breaks or the post-decryption
    // digests mismatch; in both cases no output may survive.
    let outcome = run_decrypt(&input, &output, &[0x55u8; 32]);
    assert!(!outcome.success);
    assert!(!output.exists());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn small_containers_always_rejected(size in 0usize..2048) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.wpdf");
        fs::write(&path, vec![0u8; size]).unwrap();
        let err = extract_metadata(&path, &FormatConfig::default()).unwrap_err();
        prop_assert!(matches!(err, DecryptError::TooSmall { .. }), "expected TooSmall error");
    }

    #[test]
    fn data_range_tracks_total_size(extra in 0u64..4096) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("any.wpdf");
        let size = 2048 + extra;
        fs::write(&path, vec![0u8; size as usize]).unwrap();
        let m = extract_metadata(&path, &FormatConfig::default()).unwrap();
        prop_assert_eq!(m.data_range.data_start, 1024);
        prop_assert_eq!(m.data_range.data_end, size - 1025);
        prop_assert_eq!(m.data_range.total_size, size);
        prop_assert_eq!(m.data_range.body_len(), extra);
    }
}
