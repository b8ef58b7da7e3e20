//! TTS backend contract: text + voice params → raw audio bytes.
//!
//! The backend is out of scope per the generation pipeline's spec — the
//! gateway wraps whatever implements [`TtsBackend`] with caching,
//! selection, concurrency, and retry. [`GoogleTtsBackend`] is the
//! shipped adapter; a mock backend can stand in for tests.

use cf_domain::error::{Error, Result};
use serde::Deserialize;
use serde_json::json;

/// Parameters for a single synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesizeParams<'a> {
    pub text: &'a str,
    pub voice_id: &'a str,
    pub language_code: &'a str,
    pub speaking_rate: f32,
}

#[async_trait::async_trait]
pub trait TtsBackend: Send + Sync {
    /// Synthesize `params` into raw audio bytes (MP3).
    async fn synthesize(&self, params: SynthesizeParams<'_>) -> Result<Vec<u8>>;

    /// List available voices, keyed loosely by name; used to populate the
    /// gateway's per-gender cache. An empty list falls back to the
    /// hard-coded shortlist.
    async fn list_voices(&self) -> Result<Vec<String>>;
}

/// Adapter for the Google Cloud Text-to-Speech REST API.
pub struct GoogleTtsBackend {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTtsBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: "https://texttospeech.googleapis.com".into(),
        }
    }
}

#[derive(Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: String,
}

#[derive(Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceEntry>,
}

#[derive(Deserialize)]
struct VoiceEntry {
    name: String,
}

#[async_trait::async_trait]
impl TtsBackend for GoogleTtsBackend {
    async fn synthesize(&self, params: SynthesizeParams<'_>) -> Result<Vec<u8>> {
        let url = format!("{}/v1/text:synthesize?key={}", self.base_url, self.api_key);
        let body = json!({
            "input": {"text": params.text},
            "voice": {"languageCode": params.language_code, "name": params.voice_id},
            "audioConfig": {"audioEncoding": "MP3", "speakingRate": params.speaking_rate},
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_reqwest(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(classify_reqwest)?;
        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        let parsed: SynthesizeResponse = serde_json::from_str(&text)?;
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&parsed.audio_content)
            .map_err(|e| Error::UpstreamPermanent {
                provider: "google_tts".into(),
                message: format!("invalid base64 in audioContent: {e}"),
            })
    }

    async fn list_voices(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1/voices?key={}", self.base_url, self.api_key);
        let resp = self.client.get(&url).send().await.map_err(classify_reqwest)?;
        let status = resp.status();
        let text = resp.text().await.map_err(classify_reqwest)?;
        if !status.is_success() {
            return Err(classify_status(status, &text));
        }
        let parsed: VoicesResponse = serde_json::from_str(&text)?;
        Ok(parsed.voices.into_iter().map(|v| v.name).collect())
    }
}

fn classify_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        Error::UpstreamTransient {
            provider: "google_tts".into(),
            message: e.to_string(),
        }
    } else {
        Error::UpstreamPermanent {
            provider: "google_tts".into(),
            message: e.to_string(),
        }
    }
}

fn classify_status(status: reqwest::StatusCode, body: &str) -> Error {
    if status.is_server_error() || status.as_u16() == 429 {
        Error::UpstreamTransient {
            provider: "google_tts".into(),
            message: format!("HTTP {} - {}", status.as_u16(), body),
        }
    } else {
        Error::UpstreamPermanent {
            provider: "google_tts".into(),
            message: format!("HTTP {} - {}", status.as_u16(), body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_status_marks_5xx_transient() {
        let err = classify_status(reqwest::StatusCode::SERVICE_UNAVAILABLE, "down");
        assert!(err.is_retryable());
    }

    #[test]
    fn classify_status_marks_4xx_permanent() {
        let err = classify_status(reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert!(!err.is_retryable());
    }
}
