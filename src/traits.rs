//! Core traits for the audit-chain library
//!
//! These traits let consumers feed their own record types into the
//! payload-agnostic chain.

use anyhow::Result;

/// A typed record that can be serialized into a block payload.
///
/// The chain stores payloads as opaque bytes; implementing this trait is
/// the seam between an application's record types and
/// [`AuditChain::append_record`](crate::chain::AuditChain::append_record).
/// Serialization must be deterministic for a given record, and failures
/// must surface as errors rather than producing truncated payloads.
///
/// # Examples
///
/// ```
/// use anyhow::Result;
/// use libauditchain::traits::ChainPayload;
///
/// struct Note(String);
///
/// impl ChainPayload for Note {
///     fn to_payload(&self) -> Result<Vec<u8>> {
///         Ok(self.0.as_bytes().to_vec())
///     }
/// }
/// ```
pub trait ChainPayload {
    /// Serialize this record into the byte payload stored on the chain.
    fn to_payload(&self) -> Result<Vec<u8>>;
}
