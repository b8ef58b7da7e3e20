//! TTS gateway: per-turn speech synthesis with voice selection, a
//! per-gender voice cache, bounded concurrency, and transient-only retry.

pub mod backend;
pub mod gateway;
pub mod health;
pub mod voice;

pub use backend::{GoogleTtsBackend, TtsBackend};
pub use gateway::TtsGateway;
pub use health::TtsHealth;
pub use voice::{pick_voice, VoiceProfile};
