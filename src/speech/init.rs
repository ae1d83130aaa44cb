//! Startup warm-up of the statement catalog

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;

use super::cache::SpeechCache;
use crate::catalog::Statement;

/// Completion signal of a warm-up pass, cloneable across callers
pub type InitHandle = Shared<BoxFuture<'static, InitReport>>;

/// Outcome of a warm-up pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitReport {
    /// Statements with audio in the cache after the pass
    pub warmed: usize,
    /// Ids of statements that failed both passes
    pub failed: Vec<String>,
}

/// Lifecycle phase of the warm-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitPhase {
    Uninitialized,
    Initializing,
    Initialized,
}

pub(super) enum InitState {
    Uninitialized,
    Initializing(InitHandle),
    Initialized,
}

impl InitState {
    const fn phase(&self) -> InitPhase {
        match self {
            Self::Uninitialized => InitPhase::Uninitialized,
            Self::Initializing(_) => InitPhase::Initializing,
            Self::Initialized => InitPhase::Initialized,
        }
    }
}

impl SpeechCache {
    /// Pre-synthesize every catalog statement in the background
    ///
    /// The first call starts the pass and returns its completion handle.
    /// Calls while it runs return the same handle; calls after it finished
    /// return an already-resolved empty report. Awaiting the handle is
    /// optional: dropping it does not stop the pass.
    ///
    /// # Panics
    ///
    /// Panics if the first call happens outside a tokio runtime
    pub fn initialize(&self) -> InitHandle {
        let mut state = self.inner.init.lock().unwrap_or_else(|e| e.into_inner());

        match &*state {
            InitState::Initializing(handle) => {
                tracing::debug!("speech warm-up already running");
                return handle.clone();
            }
            InitState::Initialized => {
                return futures::future::ready(InitReport::default())
                    .boxed()
                    .shared();
            }
            InitState::Uninitialized => {}
        }

        let cache = self.clone();
        let task = tokio::spawn(async move {
            let pass = cache.warm_catalog();
            cache.finish_warm_up(pass).await
        });
        let handle = async move {
            task.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "speech warm-up task failed");
                InitReport::default()
            })
        }
        .boxed()
        .shared();

        *state = InitState::Initializing(handle.clone());
        handle
    }

    /// Current warm-up phase
    #[must_use]
    pub fn init_phase(&self) -> InitPhase {
        self.inner
            .init
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .phase()
    }

    async fn warm_catalog(&self) -> InitReport {
        let catalog = &self.inner.catalog;

        tokio::time::sleep(self.inner.startup_delay).await;
        tracing::info!(statements = catalog.len(), "warming speech cache");

        let mut failed = Vec::new();
        for statement in catalog {
            if !self.warm_one(statement).await {
                failed.push(statement);
            }
        }

        if !failed.is_empty() {
            tracing::info!(
                failed = failed.len(),
                delay_ms = %self.inner.retry_pass_delay.as_millis(),
                "retrying failed statements"
            );
            tokio::time::sleep(self.inner.retry_pass_delay).await;

            let mut still_failed = Vec::new();
            for statement in failed {
                if !self.warm_one(statement).await {
                    tracing::warn!(id = %statement.id, "statement audio unavailable after retry");
                    still_failed.push(statement);
                }
            }
            failed = still_failed;
        }

        let report = InitReport {
            warmed: catalog.len() - failed.len(),
            failed: failed.into_iter().map(|s| s.id.clone()).collect(),
        };

        tracing::info!(
            warmed = report.warmed,
            failed = report.failed.len(),
            "speech cache warm-up complete"
        );

        report
    }

    /// Run a warm-up pass and mark the cache initialized however it ends
    async fn finish_warm_up<F>(&self, pass: F) -> InitReport
    where
        F: Future<Output = InitReport>,
    {
        let report = AssertUnwindSafe(pass).catch_unwind().await.unwrap_or_else(|_| {
            tracing::error!("speech warm-up panicked");
            InitReport::default()
        });

        *self.inner.init.lock().unwrap_or_else(|e| e.into_inner()) = InitState::Initialized;
        report
    }

    async fn warm_one(&self, statement: &Statement) -> bool {
        match self.get_audio(&statement.text).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(id = %statement.id, error = %e, "failed to warm statement audio");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::{Catalog, LocalizedText};
    use crate::config::SpeechConfig;
    use crate::error::SynthesisFailure;
    use crate::speech::Synthesizer;

    #[derive(Default)]
    struct Counting {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Synthesizer for Counting {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("never") {
                return Err(SynthesisFailure::Transport("connection refused".to_string()));
            }
            Ok(text.as_bytes().to_vec())
        }
    }

    fn statement(id: &str, text: &str) -> Statement {
        Statement {
            id: id.to_string(),
            title: LocalizedText {
                en: id.to_string(),
                es: id.to_string(),
            },
            text: text.to_string(),
        }
    }

    fn config() -> SpeechConfig {
        SpeechConfig {
            retry: crate::speech::RetryPolicy {
                max_retries: 0,
                ..crate::speech::RetryPolicy::default()
            },
            ..SpeechConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn phases_progress_to_initialized() {
        let synth = Arc::new(Counting::default());
        let catalog = Catalog::new(vec![statement("a", "Free to Go")]).unwrap();
        let cache = SpeechCache::new(synth, catalog, &config());

        assert_eq!(cache.init_phase(), InitPhase::Uninitialized);
        let handle = cache.initialize();
        assert_eq!(cache.init_phase(), InitPhase::Initializing);

        let report = handle.await;
        assert_eq!(report.warmed, 1);
        assert_eq!(cache.init_phase(), InitPhase::Initialized);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_initialize_is_noop() {
        let synth = Arc::new(Counting::default());
        let catalog = Catalog::new(vec![statement("a", "Free to Go")]).unwrap();
        let cache = SpeechCache::new(Arc::clone(&synth) as Arc<dyn Synthesizer>, catalog, &config());

        cache.initialize().await;
        let again = cache.initialize().await;

        assert_eq!(again, InitReport::default());
        assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    }

    async fn exploding_pass() -> InitReport {
        panic!("warm-up pass exploded")
    }

    #[tokio::test(start_paused = true)]
    async fn panicked_pass_still_reaches_initialized() {
        let synth = Arc::new(Counting::default());
        let catalog = Catalog::new(vec![statement("a", "Free to Go")]).unwrap();
        let cache = SpeechCache::new(synth, catalog, &config());

        let report = cache.finish_warm_up(exploding_pass()).await;

        assert_eq!(report, InitReport::default());
        assert_eq!(cache.init_phase(), InitPhase::Initialized);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_retried_once_then_reported() {
        let synth = Arc::new(Counting::default());
        let catalog = Catalog::new(vec![
            statement("ok", "Goodbye"),
            statement("bad", "never works"),
        ])
        .unwrap();
        let cache = SpeechCache::new(Arc::clone(&synth) as Arc<dyn Synthesizer>, catalog, &config());
        let start = tokio::time::Instant::now();

        let report = cache.initialize().await;

        assert_eq!(report.warmed, 1);
        assert_eq!(report.failed, vec!["bad".to_string()]);
        // one call for "ok", two for "bad" (first pass + retry pass)
        assert_eq!(synth.calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_secs(5) + Duration::from_secs(10));
    }
}
