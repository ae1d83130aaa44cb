//! Speech synthesis cache and request queue
//!
//! Every text-to-speech request in the app goes through [`SpeechCache`]:
//!
//! ```text
//! get_audio(text)
//!   │ cached? ───────────────▶ handle
//!   │ pending? ──────────────▶ join shared outcome
//!   ▼
//! RequestQueue (FIFO, one job at a time)
//!   │
//!   ▼
//! fetch_with_retry ── RateLimiter::wait ──▶ Synthesizer
//! ```

mod audio;
mod cache;
mod init;
mod queue;
mod rate_limiter;
mod retry;
mod synthesizer;

pub use audio::{AUDIO_MIME_TYPE, AudioHandle};
pub use cache::{CacheStats, SpeechCache};
pub use init::{InitHandle, InitPhase, InitReport};
pub use queue::{QueueJob, RequestQueue};
pub use rate_limiter::RateLimiter;
pub use retry::{RetryPolicy, fetch_with_retry};
pub use synthesizer::{HttpSynthesizer, Synthesizer, error_message};
