//! Deduplicating audio cache in front of the request queue

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::oneshot;

use super::audio::AudioHandle;
use super::init::InitState;
use super::queue::RequestQueue;
use super::rate_limiter::RateLimiter;
use super::retry::{RetryPolicy, fetch_with_retry};
use super::synthesizer::Synthesizer;
use crate::catalog::Catalog;
use crate::config::SpeechConfig;
use crate::error::SynthesisFailure;
use crate::{Error, Result};

/// Outcome shared by every caller waiting on the same text
type SharedOutcome = Shared<BoxFuture<'static, std::result::Result<AudioHandle, SynthesisFailure>>>;

#[derive(Default)]
struct Store {
    entries: HashMap<String, AudioHandle>,
    pending: HashMap<String, SharedOutcome>,
}

pub(super) struct Inner {
    synthesizer: Arc<dyn Synthesizer>,
    limiter: RateLimiter,
    queue: RequestQueue,
    retry: RetryPolicy,
    request_timeout: Duration,
    store: Mutex<Store>,
    pub(super) catalog: Catalog,
    pub(super) init: Mutex<InitState>,
    pub(super) startup_delay: Duration,
    pub(super) retry_pass_delay: Duration,
}

/// Process-wide speech cache and request queue
///
/// Cheap to clone; all clones share the same cache, queue and rate limiter.
/// Construct one at startup and hand clones to whatever needs audio.
#[derive(Clone)]
pub struct SpeechCache {
    pub(super) inner: Arc<Inner>,
}

impl std::fmt::Debug for SpeechCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.store();
        f.debug_struct("SpeechCache")
            .field("cached", &store.entries.len())
            .field("pending", &store.pending.len())
            .field("queue", &self.inner.queue)
            .finish_non_exhaustive()
    }
}

/// Point-in-time counters for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Texts with cached audio
    pub cached: usize,
    /// Texts currently being synthesized
    pub pending: usize,
    /// Jobs waiting in the queue
    pub queued: usize,
}

/// Pending entry owned by a queued job
///
/// Normally settled together with the cache insert. If the job never gets
/// that far (it panicked or the queue was torn down) the entry is removed
/// on drop, so the text can be admitted again.
struct PendingSlot {
    inner: Arc<Inner>,
    text: Option<String>,
}

impl PendingSlot {
    fn settle(mut self, store: &mut Store) {
        if let Some(text) = self.text.take() {
            store.pending.remove(&text);
        }
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        if let Some(text) = self.text.take() {
            self.inner
                .store
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pending
                .remove(&text);
        }
    }
}

impl SpeechCache {
    /// Create a cache over `synthesizer`, warming `catalog` on `initialize`
    #[must_use]
    pub fn new(synthesizer: Arc<dyn Synthesizer>, catalog: Catalog, config: &SpeechConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                synthesizer,
                limiter: RateLimiter::new(config.rate_limit),
                queue: RequestQueue::new(config.rate_limit),
                retry: config.retry,
                request_timeout: config.request_timeout,
                store: Mutex::new(Store::default()),
                catalog,
                init: Mutex::new(InitState::Uninitialized),
                startup_delay: config.startup_delay,
                retry_pass_delay: config.retry_pass_delay,
            }),
        }
    }

    /// Get playable audio for `text`
    ///
    /// Returns the cached handle when present. Otherwise joins an in-flight
    /// synthesis of the same text, or admits a new one to the queue. The
    /// queued job runs to completion even if every caller goes away, and
    /// later callers keep joining it until it settles.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidText` for blank text and `Error::Synthesis`
    /// once retries are exhausted; nothing is cached on failure
    pub async fn get_audio(&self, text: &str) -> Result<AudioHandle> {
        if text.trim().is_empty() {
            return Err(Error::InvalidText("text must not be empty".to_string()));
        }

        let outcome = {
            let mut store = self.store();

            if let Some(handle) = store.entries.get(text) {
                tracing::debug!(text, "speech cache hit");
                return Ok(handle.clone());
            }

            if let Some(outcome) = store.pending.get(text) {
                tracing::debug!(text, "joining in-flight synthesis");
                outcome.clone()
            } else {
                tracing::debug!(text, "speech cache miss, queueing synthesis");
                // The job cannot settle its slot before this insert: settling takes the store lock
                let outcome = self.admit(text);
                store.pending.insert(text.to_string(), outcome.clone());
                outcome
            }
        };

        outcome.await.map_err(Error::from)
    }

    /// Cached handle for `text`, without triggering synthesis
    #[must_use]
    pub fn cached(&self, text: &str) -> Option<AudioHandle> {
        self.store().entries.get(text).cloned()
    }

    /// Whether `text` is currently being synthesized
    #[must_use]
    pub fn is_pending(&self, text: &str) -> bool {
        self.store().pending.contains_key(text)
    }

    /// Number of cached entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.store().entries.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store().entries.is_empty()
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let store = self.store();
        CacheStats {
            cached: store.entries.len(),
            pending: store.pending.len(),
            queued: self.inner.queue.len(),
        }
    }

    /// Statement catalog this cache warms
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Drop every cached entry and revoke its handle
    ///
    /// In-flight syntheses are unaffected and will populate the cache when
    /// they finish. Returns the number of handles released.
    pub fn clear(&self) -> usize {
        let entries = std::mem::take(&mut self.store().entries);
        for handle in entries.values() {
            handle.revoke();
        }
        tracing::info!(released = entries.len(), "speech cache cleared");
        entries.len()
    }

    /// Enqueue synthesis of `text` and return its shared outcome
    fn admit(&self, text: &str) -> SharedOutcome {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();

        self.inner.queue.enqueue(Box::pin(async move {
            let slot = PendingSlot {
                inner: Arc::clone(&inner),
                text: Some(text.clone()),
            };

            let fetched = fetch_with_retry(
                inner.synthesizer.as_ref(),
                &inner.limiter,
                &inner.retry,
                inner.request_timeout,
                &text,
            )
            .await;

            // Cache insert and pending removal happen under one lock
            let result = {
                let mut store = inner.store.lock().unwrap_or_else(|e| e.into_inner());
                let result = fetched.map(|bytes| {
                    let handle = AudioHandle::new(bytes);
                    store.entries.insert(text.clone(), handle.clone());
                    handle
                });
                slot.settle(&mut store);
                result
            };

            if let Ok(handle) = &result {
                tracing::info!(text = %text, bytes = handle.len(), "synthesized and cached audio");
            }

            let failure = result.as_ref().err().cloned();
            // Receiver may be gone if every caller was dropped; the cache is still populated
            let _ = tx.send(result);

            failure.map_or(Ok(()), |f| Err(Error::Synthesis(f)))
        }));

        rx.map(|received| received.unwrap_or(Err(SynthesisFailure::Dropped)))
            .boxed()
            .shared()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.inner.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}
