//! Durable append-only journal for the hash-chain audit log.
//!
//! Blocks are written to a single file as length-prefixed binary records
//! and fsynced on every append, so a block reported as appended survives a
//! crash. On open the whole file is replayed to reconstruct the chain.
//!
//! # Record Format
//!
//! ```text
//! record_len(4 LE) || block bytes (see Block::bytes)
//! ```

use crate::block::Block;
use anyhow::{Context, Result, anyhow};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Length prefix size for one journal record.
const RECORD_LEN_SIZE: usize = 4; // u32 size in bytes

/// Append-only file holding the chain's journaled blocks.
pub struct Journal {
    path: PathBuf,
    file: File,
}

impl Journal {
    /// Open the journal file at `path` for appending, creating it (and its
    /// parent directory) if needed. Existing records are left untouched.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create journal directory {}", parent.display())
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open journal file {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Path of the underlying journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one block record and fsync before returning.
    ///
    /// The write and the sync are both required: a block is only considered
    /// appended once its record is durable.
    pub fn append(&mut self, block: &Block) -> Result<()> {
        let record = block.bytes();
        let mut framed = Vec::with_capacity(RECORD_LEN_SIZE + record.len());
        framed.extend_from_slice(&(record.len() as u32).to_le_bytes());
        framed.extend_from_slice(&record);

        self.file
            .write_all(&framed)
            .with_context(|| format!("Failed to write to journal {}", self.path.display()))?;
        self.file
            .sync_data()
            .with_context(|| format!("Failed to sync journal {}", self.path.display()))?;

        debug!("Journaled block {} to {}", block.index, self.path.display());
        Ok(())
    }

    /// Read every record from the journal at `path`, in append order.
    ///
    /// A missing file yields an empty chain. Truncated or otherwise
    /// malformed framing is an explicit error; this function never returns
    /// a partial prefix of a damaged journal.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Block>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let data = fs::read(path)
            .with_context(|| format!("Failed to read journal file {}", path.display()))?;

        let mut blocks = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let record_len = u32::from_le_bytes(
                data.get(offset..offset + RECORD_LEN_SIZE)
                    .and_then(|s| s.try_into().ok())
                    .ok_or_else(|| {
                        anyhow!(
                            "Truncated record length at byte {} of journal {}",
                            offset,
                            path.display()
                        )
                    })?,
            ) as usize;
            offset += RECORD_LEN_SIZE;

            if data.len() - offset < record_len {
                return Err(anyhow!(
                    "Truncated record at byte {} of journal {}: expected {} bytes, {} remain",
                    offset,
                    path.display(),
                    record_len,
                    data.len() - offset
                ));
            }
            let block = Block::from_bytes(&data[offset..offset + record_len]).with_context(
                || format!("Malformed record at byte {} of journal {}", offset, path.display()),
            )?;
            offset += record_len;
            blocks.push(block);
        }

        debug!("Loaded {} records from journal {}", blocks.len(), path.display());
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BLOCK_HASH_SIZE;
    use tempfile::TempDir;

    fn sample_blocks() -> Vec<Block> {
        let genesis = Block::genesis(1_700_000_000).expect("Failed to create genesis");
        let second = Block::new(
            1,
            1_700_000_001,
            b"journal me".to_vec(),
            genesis.hash,
        )
        .expect("Failed to create block");
        vec![genesis, second]
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let blocks = Journal::load(temp_dir.path().join("absent.chain"))
            .expect("Failed to load missing journal");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_append_and_load_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("audit.chain");

        let blocks = sample_blocks();
        {
            let mut journal = Journal::create(&path).expect("Failed to create journal");
            for block in &blocks {
                journal.append(block).expect("Failed to append record");
            }
        }

        let loaded = Journal::load(&path).expect("Failed to load journal");
        assert_eq!(loaded, blocks);
    }

    #[test]
    fn test_create_makes_parent_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested/dir/audit.chain");

        let mut journal = Journal::create(&path).expect("Failed to create journal");
        journal
            .append(&sample_blocks()[0])
            .expect("Failed to append record");

        assert_eq!(Journal::load(&path).expect("Failed to load").len(), 1);
    }

    #[test]
    fn test_load_rejects_truncated_tail() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("audit.chain");

        {
            let mut journal = Journal::create(&path).expect("Failed to create journal");
            for block in &sample_blocks() {
                journal.append(block).expect("Failed to append record");
            }
        }

        let data = fs::read(&path).expect("Failed to read journal");
        fs::write(&path, &data[..data.len() - 3]).expect("Failed to truncate journal");

        assert!(Journal::load(&path).is_err());
    }

    #[test]
    fn test_load_rejects_garbage_length_prefix() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("audit.chain");

        // A length prefix promising far more data than the file holds.
        let mut data = u32::MAX.to_le_bytes().to_vec();
        data.extend_from_slice(&[0u8; BLOCK_HASH_SIZE]);
        fs::write(&path, data).expect("Failed to write journal");

        assert!(Journal::load(&path).is_err());
    }
}
