use cf_domain::capability::LlmCapabilities;
use cf_domain::error::Result;
use cf_domain::tool::Message;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic chat completion request. No tool-calling or
/// streaming support — each `LLMGateway` operation is a single
/// request/response round trip that expects a JSON-mode reply.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 - 2.0). `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Maximum tokens in the response. `None` lets the provider choose.
    pub max_tokens: Option<u32>,
    /// When `true`, request the model to respond with valid JSON only.
    pub json_mode: bool,
    /// Model identifier override. When `None`, the provider uses its default.
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// A provider-agnostic chat completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Textual content of the response.
    pub content: String,
    pub usage: Usage,
    /// The model that actually produced the response.
    pub model: String,
    /// The reason the model stopped generating (e.g. "stop", "length").
    pub finish_reason: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every LLM adapter implements. Implementations are
/// provider-specific (Google Gemini, Anthropic) and translate between
/// our internal types and each provider's wire format.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and wait for the full response.
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse>;

    /// The advertised capabilities of this provider/model combination.
    fn capabilities(&self) -> &LlmCapabilities;

    /// A unique identifier for this provider instance (matches
    /// `ProviderConfig::id`).
    fn provider_id(&self) -> &str;
}
