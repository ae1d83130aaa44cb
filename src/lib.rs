//! VÍGIA speech service - rate-limited, deduplicating text-to-speech cache
//!
//! This library provides the speech layer of the VÍGIA reporting app:
//! - A process-wide audio cache with at most one synthesis per text
//! - A FIFO request queue with minimum spacing between outbound requests
//! - Bounded exponential backoff around the text-to-speech endpoint
//! - Startup warm-up of the bilingual statement catalog
//! - An HTTP API that serves the cached audio to UI clients
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              UI clients (playback)                   │
//! └────────────────────┬────────────────────────────────┘
//!                      │  HTTP API
//! ┌────────────────────▼────────────────────────────────┐
//! │                 SpeechCache                          │
//! │   Dedup map  │  Request queue  │  Bulk initializer   │
//! └────────────────────┬────────────────────────────────┘
//!                      │  rate limit + retry
//! ┌────────────────────▼────────────────────────────────┐
//! │            Text-to-speech endpoint                   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod speech;

pub use catalog::{Catalog, Language, LocalizedText, Statement};
pub use config::Config;
pub use error::{Error, Result, SynthesisFailure};
pub use speech::{AudioHandle, HttpSynthesizer, InitReport, SpeechCache, Synthesizer};
