//! Shared test utilities

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use vigia_speech::config::SpeechConfig;
use vigia_speech::{Catalog, LocalizedText, SpeechCache, Statement, SynthesisFailure, Synthesizer};

/// One recorded synthesis call
#[derive(Debug, Clone)]
pub struct Call {
    pub text: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Synthesizer that replays scripted failures per text and records every call
///
/// Texts without a script succeed, returning the text bytes as "audio".
#[derive(Default)]
pub struct ScriptedSynthesizer {
    scripts: Mutex<HashMap<String, VecDeque<SynthesisFailure>>>,
    calls: Mutex<Vec<Call>>,
    latency: Duration,
}

impl ScriptedSynthesizer {
    #[must_use]
    pub fn new(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            ..Self::default()
        })
    }

    /// Fail the next `n` calls for `text` with `failure`
    pub fn fail_next(&self, text: &str, n: usize, failure: &SynthesisFailure) {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.entry(text.to_string()).or_default();
        queue.extend(std::iter::repeat_n(failure.clone(), n));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.text == text).count()
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisFailure> {
        let started = Instant::now();
        tokio::time::sleep(self.latency).await;

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(text)
            .and_then(VecDeque::pop_front);

        self.calls.lock().unwrap().push(Call {
            text: text.to_string(),
            started,
            finished: Instant::now(),
        });

        match scripted {
            Some(failure) => Err(failure),
            None => Ok(text.as_bytes().to_vec()),
        }
    }
}

/// A non-2xx failure as the endpoint would report a rate limit
#[must_use]
pub fn rate_limited() -> SynthesisFailure {
    SynthesisFailure::Rejected {
        status: 429,
        message: "Too many concurrent requests".to_string(),
    }
}

/// Catalog whose statements speak the given texts
#[must_use]
pub fn catalog_of(texts: &[&str]) -> Catalog {
    let statements = texts
        .iter()
        .enumerate()
        .map(|(i, text)| Statement {
            id: format!("s{i}"),
            title: LocalizedText {
                en: (*text).to_string(),
                es: (*text).to_string(),
            },
            text: (*text).to_string(),
        })
        .collect();
    Catalog::new(statements).expect("valid test catalog")
}

/// Speech cache over `synth` with default timings
#[must_use]
pub fn cache_over(synth: &Arc<ScriptedSynthesizer>, catalog: Catalog) -> SpeechCache {
    SpeechCache::new(
        Arc::clone(synth) as Arc<dyn Synthesizer>,
        catalog,
        &SpeechConfig::default(),
    )
}
