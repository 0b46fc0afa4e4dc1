//! Typed payload for encryption events recorded on the chain.

use crate::traits::ChainPayload;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// Record of one sealing operation: which artifact was encrypted, and how.
///
/// This is the payload shape the sealing path appends to the chain; the
/// chain itself stays payload-agnostic and callers are free to append other
/// shapes through [`ChainPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionEvent {
    /// Descriptive label of the source artifact (usually its file name)
    pub file_name: String,

    /// Method identifier, e.g. "AES-256-GCM"
    pub method: String,
}

impl EncryptionEvent {
    pub fn new(file_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            method: method.into(),
        }
    }

    /// Decode an event from a block payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| anyhow!("Failed to decode encryption event: {}", e))
    }
}

impl ChainPayload for EncryptionEvent {
    fn to_payload(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| anyhow!("Failed to serialize encryption event: {}", e))
    }
}
