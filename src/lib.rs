//! A tamper-evident hash-chain audit log
//!
//! This library provides the primitives for keeping an append-only audit
//! trail where every record is cryptographically bound to its predecessor:
//! - Block structures with SHA-256 hashing over an unambiguous binary
//!   encoding
//! - An in-memory chain with a single-writer append discipline and full
//!   invariant validation
//! - Optional durability through an append-only journal file with
//!   fsync-on-append and load-on-start reconstruction
//! - AES-256-GCM sealing of files, with each sealing recorded on the chain
//!
//! # Architecture
//!
//! The library is designed to be data-agnostic - the payload stored in
//! blocks is application-specific `Vec<u8>`. Typed records reach the chain
//! through the [`traits::ChainPayload`] seam; the sealing path ships one
//! such record type, [`event::EncryptionEvent`].
//!
//! The chain guarantees detection, not prevention: mutating a recorded
//! block does not fail at mutation time, but `validate`/`verify` will
//! report the first position whose linkage or recomputed digest no longer
//! holds.
//!
//! # Core Components
//!
//! - [`block`]: Block structure, canonical digest encoding, journal record
//!   format
//! - [`chain`]: The `AuditChain` append/validate/verify operations
//! - [`journal`]: Durable append-only journal file
//! - [`sealing`]: AES-256-GCM sealing of audited artifacts
//! - [`event`]: The encryption-event payload recorded by sealing
//!
//! # Example
//!
//! ```no_run
//! use libauditchain::chain::AuditChain;
//! use libauditchain::sealing::{open_bytes, seal_file};
//!
//! # fn example() -> anyhow::Result<()> {
//! // Open a durable chain (journaled to disk, recovered on restart)
//! let chain = AuditChain::open("audit.chain")?;
//!
//! // Seal a recording; the event lands on the chain, the key goes to you
//! let (sealed, key) = seal_file(&chain, "recordings/capture.mp4")?;
//!
//! // The chain stays verifiable end to end
//! assert!(chain.verify());
//!
//! // And the artifact comes back with the returned key
//! let plaintext = open_bytes(&key, &sealed)?;
//! # let _ = plaintext;
//! # Ok(())
//! # }
//! ```
//!
//! # Design Decisions
//!
//! - **Data-agnostic**: block payloads are `Vec<u8>` - applications define
//!   the payload structure
//! - **Unambiguous hashing**: the digest input is fixed-width and
//!   length-prefixed, never a bare string concatenation
//! - **Single-writer discipline**: one mutex around the whole
//!   read-last/compute/append sequence
//! - **Detection over correction**: a chain that fails validation is
//!   reported, never repaired

pub mod block;
pub mod chain;
pub mod event;
pub mod journal;
pub mod sealing;
pub mod traits;

pub use block::Block;
pub use chain::AuditChain;
