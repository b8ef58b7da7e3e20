//! Anthropic-native adapter.
//!
//! Implements the Anthropic Messages API single-turn call. System messages
//! go in a separate top-level `system` field, matching the Anthropic wire
//! format; no tool-calling, no streaming, no embeddings.

use crate::auth::AuthRotator;
use crate::traits::{ChatRequest, ChatResponse, LlmProvider, Usage};
use crate::util::from_reqwest;
use cf_domain::capability::LlmCapabilities;
use cf_domain::config::ProviderConfig;
use cf_domain::error::{Error, Result};
use cf_domain::tool::{ContentPart, Message, MessageContent, Role};
use serde_json::Value;
use std::sync::Arc;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    id: String,
    base_url: String,
    auth: Arc<AuthRotator>,
    default_model: String,
    capabilities: LlmCapabilities,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let auth = Arc::new(AuthRotator::from_auth_config(&cfg.auth)?);
        let default_model = cfg
            .default_model
            .clone()
            .unwrap_or_else(|| "claude-sonnet-4-20250514".into());

        let capabilities = LlmCapabilities {
            supports_json_mode: false,
            supports_vision: true,
            context_window_tokens: Some(200_000),
            max_output_tokens: Some(8_192),
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| from_reqwest(&cfg.id, e))?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            auth,
            default_model,
            capabilities,
            client,
        })
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut system_parts: Vec<String> = Vec::new();
        let mut api_messages: Vec<Value> = Vec::new();

        for msg in &req.messages {
            match msg.role {
                Role::System => system_parts.push(msg.content.extract_all_text()),
                Role::User => api_messages.push(user_msg_to_anthropic(msg)),
                Role::Assistant => api_messages.push(assistant_msg_to_anthropic(msg)),
                Role::Tool => api_messages.push(tool_result_to_anthropic(msg)),
            }
        }

        let mut body = serde_json::json!({
            "model": model,
            "messages": api_messages,
        });

        if !system_parts.is_empty() {
            body["system"] = Value::String(system_parts.join("\n\n"));
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        let max_tokens = req.max_tokens.unwrap_or(4096);
        body["max_tokens"] = serde_json::json!(max_tokens);

        body
    }
}

fn user_msg_to_anthropic(msg: &Message) -> Value {
    match &msg.content {
        MessageContent::Text(t) => serde_json::json!({"role": "user", "content": t}),
        MessageContent::Parts(parts) => {
            let content: Vec<Value> = parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => {
                        Some(serde_json::json!({"type": "text", "text": text}))
                    }
                    ContentPart::Image { url, media_type } => {
                        let mt = media_type.as_deref().unwrap_or("image/png");
                        Some(serde_json::json!({
                            "type": "image",
                            "source": {"type": "base64", "media_type": mt, "data": url}
                        }))
                    }
                    _ => None,
                })
                .collect();
            serde_json::json!({"role": "user", "content": content})
        }
    }
}

fn assistant_msg_to_anthropic(msg: &Message) -> Value {
    let text = msg.content.extract_all_text();
    serde_json::json!({
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
    })
}

fn tool_result_to_anthropic(msg: &Message) -> Value {
    let text = msg.content.extract_all_text();
    serde_json::json!({"role": "user", "content": text})
}

fn parse_anthropic_response(body: &Value, provider: &str) -> Result<ChatResponse> {
    let content_arr = body
        .get("content")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::UpstreamPermanent {
            provider: provider.into(),
            message: "no content array in response".into(),
        })?;

    let mut text_parts: Vec<String> = Vec::new();
    for block in content_arr {
        if block.get("type").and_then(|v| v.as_str()) == Some("text") {
            if let Some(t) = block.get("text").and_then(|v| v.as_str()) {
                text_parts.push(t.to_string());
            }
        }
    }

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let finish_reason = body
        .get("stop_reason")
        .and_then(|v| v.as_str())
        .map(|s| match s {
            "end_turn" => "stop".to_string(),
            other => other.to_string(),
        });

    let usage = body.get("usage").and_then(parse_anthropic_usage).unwrap_or_default();

    Ok(ChatResponse {
        content: text_parts.join(""),
        usage,
        model,
        finish_reason,
    })
}

fn parse_anthropic_usage(v: &Value) -> Option<Usage> {
    Some(Usage {
        prompt_tokens: v.get("input_tokens").and_then(|v| v.as_u64()).map(|n| n as u32),
        completion_tokens: v.get("output_tokens").and_then(|v| v.as_u64()).map(|n| n as u32),
    })
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/v1/messages", self.base_url);
        let entry = self.auth.next_key();
        let body = self.build_body(&req);

        tracing::debug!(provider = %self.id, url = %url, "anthropic chat request");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &entry.key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                self.auth.mark_failed(entry.index);
                from_reqwest(&self.id, e)
            })?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(|e| from_reqwest(&self.id, e))?;

        if !status.is_success() {
            self.auth.mark_failed(entry.index);
            let kind = if status.is_server_error() || status.as_u16() == 429 {
                Error::UpstreamTransient {
                    provider: self.id.clone(),
                    message: format!("HTTP {} - {}", status.as_u16(), resp_text),
                }
            } else {
                Error::UpstreamPermanent {
                    provider: self.id.clone(),
                    message: format!("HTTP {} - {}", status.as_u16(), resp_text),
                }
            };
            return Err(kind);
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_anthropic_response(&resp_json, &self.id)
    }

    fn capabilities(&self) -> &LlmCapabilities {
        &self.capabilities
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_response() {
        let body = serde_json::json!({
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": "hello world"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 4},
        });
        let resp = parse_anthropic_response(&body, "anthropic").unwrap();
        assert_eq!(resp.content, "hello world");
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.usage.prompt_tokens, Some(10));
        assert_eq!(resp.usage.completion_tokens, Some(4));
    }

    #[test]
    fn missing_content_is_upstream_permanent() {
        let body = serde_json::json!({"model": "x"});
        let err = parse_anthropic_response(&body, "anthropic").unwrap_err();
        assert!(matches!(err, Error::UpstreamPermanent { .. }));
    }
}
