//! Block structure for the hash-chain audit log.
//!
//! A block binds an opaque payload to its position in the chain and to its
//! predecessor's digest. Each block's hash is computed with SHA-256 over a
//! canonical binary encoding of its fields, so any mutation of a recorded
//! block is detectable by recomputing the digest.

use anyhow::{Result, anyhow};
use openssl::hash::MessageDigest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub const BLOCK_INDEX_SIZE: usize = 8; // u64 size in bytes
pub const BLOCK_TIMESTAMP_SIZE: usize = 8; // u64 size in bytes
pub const BLOCK_PAYLOAD_LEN_SIZE: usize = 4; // u32 size in bytes
pub const BLOCK_HASH_SIZE: usize = 32; // SHA-256 hash size in bytes

/// Payload carried by every genesis block.
pub const GENESIS_PAYLOAD: &[u8] = b"Genesis Block";

/// Previous-hash value of the genesis block (it has no real predecessor).
pub const GENESIS_PREVIOUS_HASH: [u8; BLOCK_HASH_SIZE] = [0u8; BLOCK_HASH_SIZE];

/// Current Unix timestamp in seconds.
pub(crate) fn unix_timestamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

/// A single entry in the hash-chain audit log.
///
/// # Digest Input Format
///
/// The block hash is SHA-256 over a fixed-width little-endian encoding with
/// a length-prefixed payload, so every field boundary is unambiguous:
///
/// ```text
/// index(8 LE) || timestamp(8 LE) || payload_len(4 LE) || payload || previous_hash(32)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (0 for genesis), strictly increasing by 1
    pub index: u64,

    /// Unix timestamp (seconds) assigned at creation, monotonically
    /// non-decreasing across the chain
    pub timestamp: u64,

    /// Application-specific data (opaque to this library)
    pub payload: Vec<u8>,

    /// SHA-256 hash of the preceding block (all zeros for genesis)
    pub previous_hash: [u8; BLOCK_HASH_SIZE],

    /// SHA-256 hash over this block's own fields
    pub hash: [u8; BLOCK_HASH_SIZE],
}

impl Block {
    /// Create a block at the given position, computing its hash.
    ///
    /// # Arguments
    /// * `index` - Position in the chain (predecessor's index + 1)
    /// * `timestamp` - Unix timestamp in seconds
    /// * `payload` - Application-specific data
    /// * `previous_hash` - SHA-256 hash of the preceding block
    ///
    /// # Errors
    /// Returns an error if the payload exceeds the u32 framing limit or if
    /// the digest cannot be computed.
    pub fn new(
        index: u64,
        timestamp: u64,
        payload: Vec<u8>,
        previous_hash: [u8; BLOCK_HASH_SIZE],
    ) -> Result<Self> {
        if payload.len() > u32::MAX as usize {
            return Err(anyhow!(
                "Payload too large for a block: {} bytes",
                payload.len()
            ));
        }

        let mut block = Self {
            index,
            timestamp,
            payload,
            previous_hash,
            hash: [0u8; BLOCK_HASH_SIZE],
        };
        block.hash = block.compute_hash()?;
        Ok(block)
    }

    /// Create a genesis block at the given timestamp.
    ///
    /// The genesis block always has index 0, an all-zero previous hash, and
    /// the fixed [`GENESIS_PAYLOAD`] sentinel.
    pub fn genesis(timestamp: u64) -> Result<Self> {
        Self::new(0, timestamp, GENESIS_PAYLOAD.to_vec(), GENESIS_PREVIOUS_HASH)
    }

    /// Canonical digest input for this block (see the struct-level format).
    pub fn digest_input(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            BLOCK_INDEX_SIZE
                + BLOCK_TIMESTAMP_SIZE
                + BLOCK_PAYLOAD_LEN_SIZE
                + self.payload.len()
                + BLOCK_HASH_SIZE,
        );
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes.extend_from_slice(&self.previous_hash);
        bytes
    }

    /// Recompute the SHA-256 digest over this block's own fields.
    ///
    /// The result equals the stored `hash` field exactly when the block has
    /// not been mutated since creation.
    pub fn compute_hash(&self) -> Result<[u8; BLOCK_HASH_SIZE]> {
        let digest = openssl::hash::hash(MessageDigest::sha256(), &self.digest_input())
            .map_err(|e| anyhow!("Failed to compute block hash: {}", e))?;
        digest
            .as_ref()
            .try_into()
            .map_err(|_| anyhow!("Unexpected digest length from SHA-256"))
    }

    /// Lowercase hexadecimal rendering of the block hash (64 characters).
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Lowercase hexadecimal rendering of the previous hash (64 characters).
    pub fn previous_hash_hex(&self) -> String {
        hex::encode(self.previous_hash)
    }

    /// Serialize the block for the journal.
    ///
    /// Format: the digest input followed by the stored hash:
    /// ```text
    /// index(8) || timestamp(8) || payload_len(4) || payload || previous_hash(32) || hash(32)
    /// ```
    pub fn bytes(&self) -> Vec<u8> {
        let mut bytes = self.digest_input();
        bytes.extend_from_slice(&self.hash);
        bytes
    }

    /// Deserialize a block from its journal record.
    ///
    /// Only the framing is checked here; cryptographic consistency is the
    /// chain's `validate` concern.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        const FIXED_LEN: usize = BLOCK_INDEX_SIZE
            + BLOCK_TIMESTAMP_SIZE
            + BLOCK_PAYLOAD_LEN_SIZE
            + BLOCK_HASH_SIZE
            + BLOCK_HASH_SIZE;
        if data.len() < FIXED_LEN {
            return Err(anyhow!(
                "Invalid block record: expected at least {} bytes, got {}",
                FIXED_LEN,
                data.len()
            ));
        }

        let mut index = 0;
        let block_index = u64::from_le_bytes(
            data.get(index..index + BLOCK_INDEX_SIZE)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| anyhow!("Not enough data for block index"))?,
        );
        index += BLOCK_INDEX_SIZE;

        let timestamp = u64::from_le_bytes(
            data.get(index..index + BLOCK_TIMESTAMP_SIZE)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| anyhow!("Not enough data for block timestamp"))?,
        );
        index += BLOCK_TIMESTAMP_SIZE;

        let payload_len = u32::from_le_bytes(
            data.get(index..index + BLOCK_PAYLOAD_LEN_SIZE)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| anyhow!("Not enough data for payload length"))?,
        ) as usize;
        index += BLOCK_PAYLOAD_LEN_SIZE;

        if data.len() != FIXED_LEN + payload_len {
            return Err(anyhow!(
                "Invalid block record: expected {} bytes for payload length {}, got {}",
                FIXED_LEN + payload_len,
                payload_len,
                data.len()
            ));
        }

        let payload = data
            .get(index..index + payload_len)
            .ok_or_else(|| anyhow!("Not enough data for block payload"))?
            .to_vec();
        index += payload_len;

        let mut previous_hash = [0u8; BLOCK_HASH_SIZE];
        previous_hash.copy_from_slice(
            data.get(index..index + BLOCK_HASH_SIZE)
                .ok_or_else(|| anyhow!("Not enough data for previous hash"))?,
        );
        index += BLOCK_HASH_SIZE;

        let mut hash = [0u8; BLOCK_HASH_SIZE];
        hash.copy_from_slice(
            data.get(index..index + BLOCK_HASH_SIZE)
                .ok_or_else(|| anyhow!("Not enough data for block hash"))?,
        );

        Ok(Self {
            index: block_index,
            timestamp,
            payload,
            previous_hash,
            hash,
        })
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block {} ({} payload bytes, previous {}, hash {})",
            self.index,
            self.payload.len(),
            self.previous_hash_hex(),
            self.hash_hex()
        )
    }
}
