//! WebhookNotifier (C8, §4.8). At-least-once delivery of a terminal-status
//! envelope with exponential backoff (base 1s, factor 2, max 3 attempts,
//! 10s per-attempt timeout). Delivery failures are logged, never surfaced
//! to the caller — they cannot alter task status (§4.8).

use std::time::Duration;

use cf_domain::models::ResultEpisode;
use cf_domain::trace::TraceEvent;
use reqwest::Client;
use serde::Serialize;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(1);
const PER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct WebhookEnvelope<'a> {
    task_id: &'a str,
    status: &'a str,
    timestamp: String,
    idempotency_key: String,
    result: Option<&'a ResultEpisode>,
    error: Option<&'a str>,
}

pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(PER_ATTEMPT_TIMEOUT)
                .build()
                .expect("reqwest client builder should never fail with no custom TLS config"),
        }
    }

    /// Delivers the terminal-transition envelope to `webhook_url`, retrying
    /// on non-2xx responses or network errors. Never returns an error to
    /// the caller: every outcome is logged via [`TraceEvent`].
    pub async fn notify(
        &self,
        webhook_url: &str,
        task_id: &str,
        status: &str,
        result: Option<&ResultEpisode>,
        error: Option<&str>,
    ) {
        let idempotency_key = format!("{task_id}:{status}");
        let envelope = WebhookEnvelope {
            task_id,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            idempotency_key,
            result,
            error,
        };

        let mut delay = BASE_DELAY;
        for attempt in 1..=MAX_ATTEMPTS {
            let started = std::time::Instant::now();
            let outcome = self.client.post(webhook_url).json(&envelope).send().await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(resp) if resp.status().is_success() => {
                    TraceEvent::WebhookDelivered {
                        task_id: task_id.to_string(),
                        status: status.to_string(),
                        attempt,
                        duration_ms,
                    }
                    .emit();
                    return;
                }
                Ok(resp) => {
                    let err = format!("non-2xx response: {}", resp.status());
                    self.log_failure(task_id, status, attempt, &err);
                }
                Err(e) => {
                    self.log_failure(task_id, status, attempt, &e.to_string());
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        TraceEvent::WebhookFailed {
            task_id: task_id.to_string(),
            status: status.to_string(),
            attempt: MAX_ATTEMPTS,
            error: "all delivery attempts exhausted".to_string(),
            exhausted: true,
        }
        .emit();
    }

    fn log_failure(&self, task_id: &str, status: &str, attempt: u32, error: &str) {
        TraceEvent::WebhookFailed {
            task_id: task_id.to_string(),
            status: status.to_string(),
            attempt,
            error: error.to_string(),
            exhausted: false,
        }
        .emit();
    }
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn delivers_successfully_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new();
        notifier
            .notify(&format!("{}/hook", server.uri()), "task-1", "completed", None, None)
            .await;
    }

    #[tokio::test]
    async fn retries_on_failure_then_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new();
        notifier
            .notify(&format!("{}/hook", server.uri()), "task-1", "failed", None, Some("boom"))
            .await;
    }

    #[tokio::test]
    async fn idempotency_key_is_deterministic() {
        let envelope = WebhookEnvelope {
            task_id: "task-1",
            status: "completed",
            timestamp: "2026-01-01T00:00:00Z".into(),
            idempotency_key: format!("{}:{}", "task-1", "completed"),
            result: None,
            error: None,
        };
        assert_eq!(envelope.idempotency_key, "task-1:completed");
    }
}
