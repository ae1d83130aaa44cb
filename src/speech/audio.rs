//! Playable audio handles

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// MIME type of the audio the synthesis endpoint returns
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Opaque reference to synthesized audio
///
/// Clones share the same underlying bytes and revocation flag. Once the
/// owning cache revokes a handle its bytes are no longer reachable through
/// any clone.
#[derive(Debug, Clone)]
pub struct AudioHandle {
    url: Arc<str>,
    bytes: Arc<[u8]>,
    revoked: Arc<AtomicBool>,
}

impl AudioHandle {
    /// Wrap raw audio bytes in a fresh handle
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            url: format!("blob:vigia/{}", uuid::Uuid::new_v4()).into(),
            bytes: bytes.into(),
            revoked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stable identifier of this handle, unique per synthesis
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// MIME type of the audio
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        AUDIO_MIME_TYPE
    }

    /// Audio bytes, or `None` once the handle has been revoked
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        (!self.is_revoked()).then_some(&*self.bytes)
    }

    /// Size of the audio in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the audio is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the handle has been released
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }

    /// Release the handle; idempotent
    pub(crate) fn revoke(&self) {
        self.revoked.store(true, Ordering::Release);
    }

    /// Whether two handles refer to the same synthesized audio
    #[must_use]
    pub fn same_audio(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}
