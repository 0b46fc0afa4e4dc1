//! Symmetric authenticated encryption for audited artifacts.
//!
//! This module seals arbitrary bytes (typically a file's contents) with
//! AES-256-GCM and records each sealing operation on the audit chain as an
//! [`EncryptionEvent`] block. The freshly generated key is returned to the
//! caller; storing it is out of scope for this library.
//!
//! # Security Properties
//!
//! - **Confidentiality**: AES-256
//! - **Authenticity / Integrity**: the GCM tag detects tampering and wrong
//!   keys
//! - **Nonce uniqueness**: random 12-byte nonce per sealing
//! - **Key hygiene**: key material is zeroized on drop and redacted from
//!   debug output
//!
//! # Example
//!
//! ```no_run
//! use libauditchain::chain::AuditChain;
//! use libauditchain::sealing::{open_bytes, seal_file};
//!
//! # fn example() -> anyhow::Result<()> {
//! let chain = AuditChain::new()?;
//! let (sealed, key) = seal_file(&chain, "recordings/capture.mp4")?;
//!
//! // The chain now carries one encryption-event block.
//! assert_eq!(chain.len(), 2);
//!
//! let plaintext = open_bytes(&key, &sealed)?;
//! # let _ = plaintext;
//! # Ok(())
//! # }
//! ```

use crate::chain::AuditChain;
use crate::event::EncryptionEvent;
use anyhow::{Context, Result, anyhow};
use openssl::symm::Cipher;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretBox, zeroize::Zeroize};
use std::fmt;
use std::fs;
use std::path::Path;

pub const SEALING_KEY_SIZE: usize = 32; // AES-256 key size in bytes
pub const SEALING_NONCE_SIZE: usize = 12; // AES-GCM nonce size in bytes
pub const SEALING_TAG_SIZE: usize = 16; // AES-GCM tag size in bytes

/// Method identifier recorded on the chain for blocks created by sealing.
pub const SEALING_METHOD: &str = "AES-256-GCM";

/// Raw key bytes, zeroized when the containing secret is dropped.
struct KeyMaterial {
    bytes: [u8; SEALING_KEY_SIZE],
}

impl Zeroize for KeyMaterial {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
    }
}

/// An AES-256 key for sealing and opening artifacts.
///
/// Key material lives inside a `SecretBox`: it never appears in debug
/// output and is zeroized on drop. Access goes through the explicit
/// [`SealingKey::expose`] call.
pub struct SealingKey {
    material: SecretBox<KeyMaterial>,
}

impl SealingKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self::from_bytes(rand::random())
    }

    /// Wrap existing key bytes (e.g. a key the caller stored elsewhere).
    pub fn from_bytes(bytes: [u8; SEALING_KEY_SIZE]) -> Self {
        Self {
            material: SecretBox::new(Box::new(KeyMaterial { bytes })),
        }
    }

    /// Explicitly expose the raw key bytes.
    ///
    /// Callers that need to persist the key must copy from this reference;
    /// the backing storage is zeroized when the key is dropped.
    pub fn expose(&self) -> &[u8; SEALING_KEY_SIZE] {
        &self.material.expose_secret().bytes
    }
}

impl fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealingKey")
            .field("material", &"<redacted>")
            .finish()
    }
}

/// Container for sealed data.
///
/// Serializes to:
/// ```text
/// nonce(12) || tag(16) || ciphertext(variable)
/// ```
#[derive(Debug, Clone)]
pub struct SealedData {
    /// AES-GCM nonce (12 bytes, unique per sealing)
    pub nonce: Vec<u8>,

    /// AES-GCM authentication tag (16 bytes)
    pub tag: Vec<u8>,

    /// AES-GCM ciphertext (variable size)
    pub ciphertext: Vec<u8>,
}

impl SealedData {
    /// Serialize to the binary sealed format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(SEALING_NONCE_SIZE + SEALING_TAG_SIZE + self.ciphertext.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.tag);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Deserialize from the binary sealed format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SEALING_NONCE_SIZE + SEALING_TAG_SIZE {
            return Err(anyhow!("Invalid sealed data: too short"));
        }

        let nonce = bytes[..SEALING_NONCE_SIZE].to_vec();
        let tag = bytes[SEALING_NONCE_SIZE..SEALING_NONCE_SIZE + SEALING_TAG_SIZE].to_vec();
        let ciphertext = bytes[SEALING_NONCE_SIZE + SEALING_TAG_SIZE..].to_vec();

        Ok(Self {
            nonce,
            tag,
            ciphertext,
        })
    }
}

/// Seal bytes with AES-256-GCM under the given key.
///
/// A fresh random 12-byte nonce is generated per call; the result carries
/// the nonce, the authentication tag, and the ciphertext.
pub fn seal_bytes(key: &SealingKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = vec![0u8; SEALING_NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce);

    let cipher = Cipher::aes_256_gcm();
    let mut tag = vec![0u8; SEALING_TAG_SIZE];

    let ciphertext =
        openssl::symm::encrypt_aead(cipher, key.expose(), Some(&nonce), &[], plaintext, &mut tag)
            .map_err(|e| anyhow!("AES-GCM encryption failed: {}", e))?;

    Ok(SealedData {
        nonce,
        tag,
        ciphertext,
    }
    .to_bytes())
}

/// Open sealed bytes, verifying the authentication tag.
///
/// # Errors
/// Fails if the data was sealed under a different key or has been tampered
/// with since sealing.
pub fn open_bytes(key: &SealingKey, sealed: &[u8]) -> Result<Vec<u8>> {
    let data = SealedData::from_bytes(sealed)?;

    let cipher = Cipher::aes_256_gcm();
    openssl::symm::decrypt_aead(
        cipher,
        key.expose(),
        Some(&data.nonce),
        &[],
        &data.ciphertext,
        &data.tag,
    )
    .map_err(|e| {
        anyhow!(
            "AES-GCM decryption failed (wrong key or tampered data): {}",
            e
        )
    })
}

/// Seal a file's contents and record the event on the audit chain.
///
/// Reads the file at `path`, generates a fresh key, seals the contents, and
/// appends an [`EncryptionEvent`] block naming the file and the sealing
/// method. The event is appended only after sealing succeeds.
///
/// # Returns
/// The sealed bytes and the key. The key is not stored anywhere by this
/// library; the caller is responsible for keeping it.
///
/// # Errors
/// Fails if the file cannot be read, sealing fails, or the event cannot be
/// recorded on the chain.
pub fn seal_file<P: AsRef<Path>>(chain: &AuditChain, path: P) -> Result<(Vec<u8>, SealingKey)> {
    let path = path.as_ref();
    let plaintext = fs::read(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;

    let key = SealingKey::generate();
    let sealed = seal_bytes(&key, &plaintext)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    chain.append_record(&EncryptionEvent::new(file_name, SEALING_METHOD))?;

    Ok((sealed, key))
}
