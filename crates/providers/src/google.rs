//! Google Gemini adapter.
//!
//! Implements the Gemini `generateContent` API. Auth is via an API key
//! passed as a query parameter (`key={api_key}`).

use crate::auth::AuthRotator;
use crate::traits::{ChatRequest, ChatResponse, LlmProvider, Usage};
use crate::util::from_reqwest;
use cf_domain::capability::LlmCapabilities;
use cf_domain::config::ProviderConfig;
use cf_domain::error::{Error, Result};
use cf_domain::tool::{ContentPart, Message, MessageContent, Role};
use serde_json::Value;
use std::sync::Arc;

pub struct GoogleProvider {
    id: String,
    base_url: String,
    auth: Arc<AuthRotator>,
    default_model: String,
    capabilities: LlmCapabilities,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let auth = Arc::new(AuthRotator::from_auth_config(&cfg.auth)?);
        let default_model = cfg
            .default_model
            .clone()
            .unwrap_or_else(|| "gemini-2.0-flash".into());

        let capabilities = LlmCapabilities {
            supports_json_mode: true,
            supports_vision: true,
            context_window_tokens: Some(1_000_000),
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

    fn generate_url(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, api_key
        )
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let mut contents: Vec<Value> = Vec::new();
        let mut system_instruction: Option<Value> = None;

        for msg in &req.messages {
            match msg.role {
                Role::System => {
                    let text = msg.content.extract_all_text();
                    system_instruction = Some(serde_json::json!({
                        "parts": [{"text": text}]
                    }));
                }
                Role::User => contents.push(user_to_gemini(msg)),
                Role::Assistant => contents.push(assistant_to_gemini(msg)),
                Role::Tool => contents.push(tool_result_to_gemini(msg)),
            }
        }

        let mut body = serde_json::json!({ "contents": contents });
        if let Some(si) = system_instruction {
            body["systemInstruction"] = si;
        }

        let mut gen_config = serde_json::json!({});
        if let Some(temp) = req.temperature {
            gen_config["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens {
            gen_config["maxOutputTokens"] = serde_json::json!(max);
        }
        if req.json_mode {
            gen_config["responseMimeType"] = serde_json::json!("application/json");
        }
        if gen_config.as_object().is_some_and(|o| !o.is_empty()) {
            body["generationConfig"] = gen_config;
        }

        body
    }
}

fn user_to_gemini(msg: &Message) -> Value {
    serde_json::json!({
        "role": "user",
        "parts": content_to_gemini_parts(&msg.content),
    })
}

fn assistant_to_gemini(msg: &Message) -> Value {
    let text = msg.content.extract_all_text();
    serde_json::json!({
        "role": "model",
        "parts": [{"text": text}],
    })
}

fn tool_result_to_gemini(msg: &Message) -> Value {
    let text = msg.content.extract_all_text();
    serde_json::json!({
        "role": "user",
        "parts": [{"text": text}],
    })
}

fn content_to_gemini_parts(content: &MessageContent) -> Vec<Value> {
    match content {
        MessageContent::Text(t) => vec![serde_json::json!({"text": t})],
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(serde_json::json!({"text": text})),
                ContentPart::Image { url, media_type } => {
                    let mt = media_type.as_deref().unwrap_or("image/png");
                    Some(serde_json::json!({
                        "inlineData": { "mimeType": mt, "data": url }
                    }))
                }
                _ => None,
            })
            .collect(),
    }
}

fn parse_gemini_response(body: &Value, model: &str, provider: &str) -> Result<ChatResponse> {
    let candidate = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::UpstreamPermanent {
            provider: provider.into(),
            message: "no candidates in response".into(),
        })?;

    let parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    let mut text_content = String::new();
    if let Some(parts) = parts {
        for part in parts {
            if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                text_content.push_str(text);
            }
        }
    }

    let finish_reason = candidate
        .get("finishReason")
        .and_then(|v| v.as_str())
        .map(|s| match s {
            "STOP" => "stop".to_string(),
            "MAX_TOKENS" => "length".to_string(),
            other => other.to_lowercase(),
        });

    let usage = body
        .get("usageMetadata")
        .map(parse_gemini_usage)
        .unwrap_or_default();

    Ok(ChatResponse {
        content: text_content,
        usage,
        model: model.to_string(),
        finish_reason,
    })
}

fn parse_gemini_usage(v: &Value) -> Usage {
    Usage {
        prompt_tokens: v.get("promptTokenCount").and_then(|v| v.as_u64()).map(|n| n as u32),
        completion_tokens: v
            .get("candidatesTokenCount")
            .and_then(|v| v.as_u64())
            .map(|n| n as u32),
    }
}

/// Redact API key from URL for safe logging.
fn redact_url_key(url: &str) -> String {
    if let Some(idx) = url.find("key=") {
        let prefix = &url[..idx + 4];
        let rest = &url[idx + 4..];
        let end = rest.find('&').unwrap_or(rest.len());
        format!("{prefix}[REDACTED]{}", &rest[end..])
    } else {
        url.to_string()
    }
}

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let entry = self.auth.next_key();
        let url = self.generate_url(&model, &entry.key);
        let body = self.build_body(&req);

        tracing::debug!(provider = %self.id, url = %redact_url_key(&url), "google chat request");

        let resp = self
            .client
            .post(&url)
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
        parse_gemini_response(&resp_json, &model, &self.id)
    }

    fn capabilities(&self) -> &LlmCapabilities {
        &self.capabilities
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
