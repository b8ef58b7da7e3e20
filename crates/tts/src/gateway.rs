//! `TtsGateway`: bounded-concurrency, retrying wrapper around a
//! [`TtsBackend`] with deterministic voice selection and a process-wide
//! per-gender voice cache (§4.6).

use crate::backend::{SynthesizeParams, TtsBackend};
use crate::health::{TtsHealth, TtsHealthSnapshot};
use crate::voice::{pick_voice, VoiceProfile};
use cf_domain::config::TtsConfig;
use cf_domain::error::{Error, Result};
use cf_domain::models::Gender;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell, Semaphore};

pub struct TtsGateway {
    backend: Arc<dyn TtsBackend>,
    semaphore: Arc<Semaphore>,
    voice_catalog: OnceCell<Mutex<HashMap<Gender, Vec<String>>>>,
    health: TtsHealth,
    call_timeout: Duration,
    max_retries: u32,
}

impl TtsGateway {
    pub fn new(backend: Arc<dyn TtsBackend>, config: &TtsConfig) -> Self {
        Self {
            backend,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_synthesis.max(1))),
            voice_catalog: OnceCell::new(),
            health: TtsHealth::default(),
            call_timeout: Duration::from_millis(config.call_timeout_ms),
            max_retries: config.max_retries,
        }
    }

    pub fn health(&self) -> TtsHealthSnapshot {
        self.health.snapshot()
    }

    /// Select a deterministic voice for a persona. Populates the
    /// per-gender catalog from the backend on first use; falls back to
    /// the hard-coded shortlist if the catalog fetch fails or is empty.
    pub async fn select_voice(&self, person_id: &str, gender: Gender) -> VoiceProfile {
        let catalog_lock = self
            .voice_catalog
            .get_or_init(|| async { Mutex::new(self.fetch_catalog().await) })
            .await;
        let catalog = catalog_lock.lock().await;
        pick_voice(person_id, gender, &catalog)
    }

    async fn fetch_catalog(&self) -> HashMap<Gender, Vec<String>> {
        match self.backend.list_voices().await {
            Ok(voices) if !voices.is_empty() => {
                let mut by_gender: HashMap<Gender, Vec<String>> = HashMap::new();
                // The backend's catalog doesn't label gender; names are
                // bucketed round-robin so every gender gets a shortlist
                // drawn from real backend voices rather than an empty one.
                for (i, v) in voices.into_iter().enumerate() {
                    let gender = match i % 3 {
                        0 => Gender::Male,
                        1 => Gender::Female,
                        _ => Gender::Neutral,
                    };
                    by_gender.entry(gender).or_default().push(v);
                }
                by_gender
            }
            Ok(_) => {
                tracing::warn!("TTS backend returned an empty voice catalog, using fallback shortlist");
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch TTS voice catalog, using fallback shortlist");
                HashMap::new()
            }
        }
    }

    /// Synthesize `text` with the given voice profile. Retries transient
    /// upstream errors with exponential backoff up to `max_retries`
    /// attempts; permanent errors are not retried.
    pub async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::Other("TTS semaphore closed".into()))?;

        self.health.on_start();
        let start = Instant::now();

        let mut attempt = 0u32;
        loop {
            let params = SynthesizeParams {
                text,
                voice_id: &voice.voice_id,
                language_code: &voice.language_code,
                speaking_rate: voice.speaking_rate,
            };

            let result = tokio::time::timeout(self.call_timeout, self.backend.synthesize(params))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::UpstreamTransient {
                        provider: "tts".into(),
                        message: format!("timed out after {}ms", self.call_timeout.as_millis()),
                    })
                });

            match result {
                Ok(bytes) => {
                    self.health.on_finish(true, start.elapsed().as_millis() as u64);
                    return Ok(bytes);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = Duration::from_millis(200 * 2u64.pow(attempt - 1));
                    tracing::warn!(attempt, error = %e, "TTS synthesis failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    self.health.on_finish(false, start.elapsed().as_millis() as u64);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyBackend {
        calls: AtomicUsize,
        fail_until: usize,
    }

    #[async_trait::async_trait]
    impl TtsBackend for FlakyBackend {
        async fn synthesize(&self, _params: SynthesizeParams<'_>) -> Result<Vec<u8>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_until {
                Err(Error::UpstreamTransient {
                    provider: "tts".into(),
                    message: "503".into(),
                })
            } else {
                Ok(vec![1, 2, 3])
            }
        }

        async fn list_voices(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    struct PermanentFailBackend;

    #[async_trait::async_trait]
    impl TtsBackend for PermanentFailBackend {
        async fn synthesize(&self, _params: SynthesizeParams<'_>) -> Result<Vec<u8>> {
            Err(Error::UpstreamPermanent {
                provider: "tts".into(),
                message: "401".into(),
            })
        }

        async fn list_voices(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn test_config() -> TtsConfig {
        TtsConfig {
            api_key_env: "X".into(),
            max_concurrent_synthesis: 2,
            call_timeout_ms: 5_000,
            max_retries: 3,
            inter_turn_silence_ms: 500,
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let backend = Arc::new(FlakyBackend {
            calls: AtomicUsize::new(0),
            fail_until: 2,
        });
        let gw = TtsGateway::new(backend, &test_config());
        let voice = VoiceProfile {
            voice_id: "en-US-Neural2-C".into(),
            language_code: "en-US".into(),
            speaking_rate: 1.0,
        };
        let result = gw.synthesize("hello", &voice).await;
        assert!(result.is_ok());
        assert_eq!(gw.health().succeeded, 1);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let backend = Arc::new(PermanentFailBackend);
        let gw = TtsGateway::new(backend, &test_config());
        let voice = VoiceProfile {
            voice_id: "en-US-Neural2-C".into(),
            language_code: "en-US".into(),
            speaking_rate: 1.0,
        };
        let result = gw.synthesize("hello", &voice).await;
        assert!(result.is_err());
        assert_eq!(gw.health().failed, 1);
    }

    #[tokio::test]
    async fn select_voice_falls_back_on_empty_catalog() {
        let backend = Arc::new(FlakyBackend {
            calls: AtomicUsize::new(0),
            fail_until: 0,
        });
        let gw = TtsGateway::new(backend, &test_config());
        let v1 = gw.select_voice("ada-lovelace", Gender::Female).await;
        let v2 = gw.select_voice("ada-lovelace", Gender::Female).await;
        assert_eq!(v1, v2);
    }
}
