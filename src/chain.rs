//! The hash-chain audit log: an ordered, append-only, tamper-evident
//! sequence of blocks.
//!
//! The chain lives in memory and is mutated by `append` only. Every chain is
//! constructed with exactly one genesis block at position 0, and every later
//! block stores the SHA-256 hash of its predecessor, so mutating any
//! historical block invalidates every block after it. The contract is
//! detection, not prevention: `validate` walks the chain and reports the
//! first position whose linkage or recomputed digest no longer holds.
//!
//! # Concurrency
//!
//! All chain state sits behind a single `Mutex`. `append` performs its whole
//! read-last/compute/journal/push sequence under the lock, so concurrent
//! callers cannot build two blocks against the same predecessor.
//!
//! # Example
//!
//! ```no_run
//! use libauditchain::chain::AuditChain;
//!
//! # fn example() -> anyhow::Result<()> {
//! let chain = AuditChain::new()?;
//! let block = chain.append(b"first record".to_vec())?;
//! assert_eq!(block.index, 1);
//! assert!(chain.verify());
//! # Ok(())
//! # }
//! ```

use crate::block::{Block, GENESIS_PREVIOUS_HASH, unix_timestamp_now};
use crate::journal::Journal;
use crate::traits::ChainPayload;
use anyhow::{Result, anyhow};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Chain state guarded by the single writer lock.
struct ChainInner {
    /// Ordered blocks, genesis at position 0
    blocks: Vec<Block>,

    /// Durable journal, when the chain was opened from a path
    journal: Option<Journal>,
}

/// An append-only, tamper-evident hash-chain log.
///
/// # Thread Safety
///
/// `AuditChain` can be shared across threads; every operation takes the
/// internal lock, so appends are serialized and snapshots are consistent.
pub struct AuditChain {
    inner: Mutex<ChainInner>,
}

impl AuditChain {
    /// Create a new in-memory chain with a freshly timestamped genesis block.
    pub fn new() -> Result<Self> {
        Self::with_genesis_timestamp(unix_timestamp_now())
    }

    /// Create a new in-memory chain whose genesis block carries the given
    /// Unix timestamp.
    pub fn with_genesis_timestamp(timestamp: u64) -> Result<Self> {
        let genesis = Block::genesis(timestamp)?;
        Ok(Self {
            inner: Mutex::new(ChainInner {
                blocks: vec![genesis],
                journal: None,
            }),
        })
    }

    /// Open a durable chain backed by the journal file at `path`.
    ///
    /// If the journal already holds records, the chain is rebuilt from them
    /// and validated before being accepted; a journal that fails validation
    /// is an error, never silently repaired. An empty or missing journal
    /// starts a fresh chain and writes its genesis block. Every subsequent
    /// `append` on this chain is journaled with fsync before it is
    /// considered durable.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let blocks = Journal::load(path)?;
        let mut journal = Journal::create(path)?;

        let blocks = if blocks.is_empty() {
            let genesis = Block::genesis(unix_timestamp_now())?;
            journal.append(&genesis)?;
            info!("Started new audit journal at {}", path.display());
            vec![genesis]
        } else {
            if let Err(e) = validate_blocks(&blocks) {
                warn!("Audit journal at {} failed validation: {}", path.display(), e);
                return Err(e.context(format!(
                    "Journal {} holds an invalid chain",
                    path.display()
                )));
            }
            info!("Recovered {} blocks from {}", blocks.len(), path.display());
            blocks
        };

        Ok(Self {
            inner: Mutex::new(ChainInner {
                blocks,
                journal: Some(journal),
            }),
        })
    }

    /// Rebuild a chain from existing blocks without validating them.
    ///
    /// Pair with [`AuditChain::validate`] before trusting the result. The
    /// rebuilt chain has no journal attached.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self {
            inner: Mutex::new(ChainInner {
                blocks,
                journal: None,
            }),
        }
    }

    /// Append a payload as a new block and return it.
    ///
    /// The new block's index is the predecessor's index + 1, its previous
    /// hash is the predecessor's hash, and its timestamp is the current time
    /// (clamped so the chain stays monotonically non-decreasing). The
    /// chain's length grows by exactly 1.
    pub fn append(&self, payload: Vec<u8>) -> Result<Block> {
        self.append_with_timestamp(payload, unix_timestamp_now())
    }

    /// Append a payload with an explicit Unix timestamp.
    ///
    /// The timestamp is clamped to the predecessor's, so supplying a value
    /// in the past cannot make the chain's timestamps decrease.
    pub fn append_with_timestamp(&self, payload: Vec<u8>, timestamp: u64) -> Result<Block> {
        let mut inner = self.inner.lock().unwrap();

        let last = inner
            .blocks
            .last()
            .ok_or_else(|| anyhow!("Chain is empty: missing genesis block"))?;

        let block = Block::new(
            last.index + 1,
            timestamp.max(last.timestamp),
            payload,
            last.hash,
        )?;

        // Journal before the in-memory push; a failed write must not leave
        // the chain ahead of its durable record.
        if let Some(journal) = inner.journal.as_mut() {
            journal.append(&block)?;
        }

        debug!("Appended block {} ({})", block.index, block.hash_hex());
        inner.blocks.push(block.clone());
        Ok(block)
    }

    /// Serialize a typed record and append it as a new block.
    ///
    /// Serialization failure surfaces as an error to the caller; nothing is
    /// appended in that case.
    pub fn append_record<T: ChainPayload>(&self, record: &T) -> Result<Block> {
        self.append(record.to_payload()?)
    }

    /// Number of blocks in the chain (always at least 1 after construction).
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().blocks.len()
    }

    /// Whether the chain holds no blocks.
    ///
    /// Only a chain rebuilt via [`AuditChain::from_blocks`] can be empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().blocks.is_empty()
    }

    /// Get a copy of the block at the given index, if present.
    pub fn get(&self, index: u64) -> Option<Block> {
        self.inner.lock().unwrap().blocks.get(index as usize).cloned()
    }

    /// Get a copy of the most recently appended block.
    pub fn latest(&self) -> Option<Block> {
        self.inner.lock().unwrap().blocks.last().cloned()
    }

    /// Point-in-time snapshot of the whole chain, in order.
    pub fn blocks(&self) -> Vec<Block> {
        self.inner.lock().unwrap().blocks.clone()
    }

    /// Check every chain invariant, reporting the first offending index.
    ///
    /// Checks, walking from position 0:
    /// - the genesis block has index 0 and an all-zero previous hash
    /// - every block's index equals its position
    /// - every block's previous hash equals its predecessor's stored hash
    /// - timestamps never decrease
    /// - every block's stored hash equals the digest recomputed over its
    ///   own fields
    pub fn validate(&self) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        validate_blocks(&inner.blocks)
    }

    /// Boolean form of [`AuditChain::validate`].
    pub fn verify(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Walk a block sequence and check every chain invariant.
fn validate_blocks(blocks: &[Block]) -> Result<()> {
    let genesis = blocks
        .first()
        .ok_or_else(|| anyhow!("Chain is empty: missing genesis block"))?;

    if genesis.index != 0 {
        return Err(anyhow!(
            "Genesis block has non-zero index {}",
            genesis.index
        ));
    }
    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(anyhow!(
            "Genesis block has non-zero previous hash {}",
            genesis.previous_hash_hex()
        ));
    }

    for (position, block) in blocks.iter().enumerate() {
        if block.index != position as u64 {
            return Err(anyhow!(
                "Block at position {} has index {}",
                position,
                block.index
            ));
        }

        if position > 0 {
            let prev = &blocks[position - 1];
            if block.previous_hash != prev.hash {
                return Err(anyhow!(
                    "Block at index {} has invalid previous hash: expected {}, got {}",
                    position,
                    prev.hash_hex(),
                    block.previous_hash_hex()
                ));
            }
            if block.timestamp < prev.timestamp {
                return Err(anyhow!(
                    "Block at index {} has decreasing timestamp: {} after {}",
                    position,
                    block.timestamp,
                    prev.timestamp
                ));
            }
        }

        if block.compute_hash()? != block.hash {
            return Err(anyhow!("Hash mismatch at index {}", position));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::GENESIS_PAYLOAD;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_new_chain_has_single_genesis_block() {
        let chain = AuditChain::new().expect("Failed to create chain");

        assert_eq!(chain.len(), 1);
        let genesis = chain.get(0).expect("Genesis not found");
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.payload, GENESIS_PAYLOAD);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(chain.verify());
    }

    #[test]
    fn test_append_links_to_predecessor() {
        let chain = AuditChain::new().expect("Failed to create chain");

        let block = chain
            .append(b"first record".to_vec())
            .expect("Failed to append");

        assert_eq!(chain.len(), 2);
        assert_eq!(block.index, 1);
        let genesis = chain.get(0).expect("Genesis not found");
        assert_eq!(block.previous_hash, genesis.hash);
        assert_eq!(chain.latest().expect("No latest block"), block);
    }

    #[test]
    fn test_hundred_appends_verify() {
        let chain = AuditChain::new().expect("Failed to create chain");

        for i in 0..100 {
            chain
                .append(format!("record {}", i).into_bytes())
                .expect("Failed to append");
        }

        assert_eq!(chain.len(), 101);
        assert!(chain.verify());

        let blocks = chain.blocks();
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.index, i as u64);
            if i > 0 {
                assert_eq!(block.previous_hash, blocks[i - 1].hash);
            }
        }
    }

    #[test]
    fn test_identical_inputs_build_identical_chains() {
        let a = AuditChain::with_genesis_timestamp(1_700_000_000).unwrap();
        let b = AuditChain::with_genesis_timestamp(1_700_000_000).unwrap();

        for chain in [&a, &b] {
            chain
                .append_with_timestamp(b"one".to_vec(), 1_700_000_010)
                .expect("Failed to append");
            chain
                .append_with_timestamp(b"two".to_vec(), 1_700_000_020)
                .expect("Failed to append");
        }

        let hashes_a: Vec<_> = a.blocks().iter().map(|b| b.hash).collect();
        let hashes_b: Vec<_> = b.blocks().iter().map(|b| b.hash).collect();
        assert_eq!(hashes_a, hashes_b);
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let chain = AuditChain::with_genesis_timestamp(1_700_000_100).unwrap();

        // Supplied timestamp is in the past relative to genesis.
        let block = chain
            .append_with_timestamp(b"late clock".to_vec(), 1_600_000_000)
            .expect("Failed to append");

        assert_eq!(block.timestamp, 1_700_000_100);
        assert!(chain.verify());
    }

    #[test]
    fn test_tampered_payload_detected_at_offending_index() {
        let chain = AuditChain::with_genesis_timestamp(1_700_000_000).unwrap();
        for i in 0..5 {
            chain
                .append_with_timestamp(format!("record {}", i).into_bytes(), 1_700_000_001 + i)
                .expect("Failed to append");
        }

        let mut blocks = chain.blocks();
        blocks[3].payload = b"rewritten history".to_vec();

        let tampered = AuditChain::from_blocks(blocks);
        assert!(!tampered.verify());

        let err = tampered.validate().unwrap_err().to_string();
        assert!(err.contains("index 3"), "unexpected error: {}", err);
    }

    #[test]
    fn test_broken_linkage_detected() {
        let chain = AuditChain::new().unwrap();
        chain.append(b"one".to_vec()).unwrap();
        chain.append(b"two".to_vec()).unwrap();

        let mut blocks = chain.blocks();
        // Rebuild block 1 so its own hash is consistent but block 2 no
        // longer links to it.
        let replacement = Block::new(
            1,
            blocks[1].timestamp,
            b"replaced".to_vec(),
            blocks[0].hash,
        )
        .unwrap();
        blocks[1] = replacement;

        let tampered = AuditChain::from_blocks(blocks);
        let err = tampered.validate().unwrap_err().to_string();
        assert!(
            err.contains("index 2") && err.contains("previous hash"),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn test_empty_chain_fails_validation() {
        let chain = AuditChain::from_blocks(Vec::new());
        assert!(!chain.verify());
        assert!(chain.append(b"orphan".to_vec()).is_err());
    }

    #[test]
    fn test_concurrent_appends_keep_single_chain() {
        let chain = Arc::new(AuditChain::new().expect("Failed to create chain"));

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let chain = Arc::clone(&chain);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        chain
                            .append(format!("worker {} record {}", worker, i).into_bytes())
                            .expect("Failed to append");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Worker panicked");
        }

        assert_eq!(chain.len(), 101);
        assert!(chain.verify());
    }

    #[test]
    fn test_open_journal_and_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("audit.chain");

        // Create a durable chain and append to it.
        {
            let chain = AuditChain::open(&path).expect("Failed to open chain");
            chain.append(b"record 1".to_vec()).expect("Failed to append");
            chain.append(b"record 2".to_vec()).expect("Failed to append");
            assert_eq!(chain.len(), 3);
        }

        // Reopen: same blocks, appends continue from the recovered tip.
        {
            let chain = AuditChain::open(&path).expect("Failed to reopen chain");
            assert_eq!(chain.len(), 3);
            assert!(chain.verify());

            let block = chain.append(b"record 3".to_vec()).expect("Failed to append");
            assert_eq!(block.index, 3);
            assert_eq!(
                block.previous_hash,
                chain.get(2).expect("Block 2 not found").hash
            );
        }

        // And once more, to confirm the post-reopen append was journaled.
        {
            let chain = AuditChain::open(&path).expect("Failed to reopen chain");
            assert_eq!(chain.len(), 4);
            assert!(chain.verify());
        }
    }

    #[test]
    fn test_open_rejects_tampered_journal() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("audit.chain");

        {
            let chain = AuditChain::open(&path).expect("Failed to open chain");
            chain.append(b"record".to_vec()).expect("Failed to append");
        }

        // Flip one byte somewhere inside the journaled records.
        let mut data = std::fs::read(&path).expect("Failed to read journal");
        let mid = data.len() / 2;
        data[mid] ^= 0xFF;
        std::fs::write(&path, data).expect("Failed to write journal");

        assert!(AuditChain::open(&path).is_err());
    }
}
