//! LLM collaborator clients.
//!
//! One completion capability over two providers (ollama, openai-compatible)
//! and an Ollama embedding endpoint. Callers treat any error as "LLM
//! unavailable" and fall through to their deterministic paths, so errors
//! here carry diagnostics but no recovery logic.

use finmesh_config::{LlmConfig, LlmProvider};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM is disabled by configuration")]
    Disabled,

    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

/// Completion + embedding client for the configured provider.
pub struct LlmClient {
    config: LlmConfig,
    completion: reqwest::Client,
    embedding: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let completion = reqwest::Client::builder()
            .timeout(config.completion_timeout())
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {e}")))?;
        let embedding = reqwest::Client::builder()
            .timeout(config.embedding_timeout())
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            completion,
            embedding,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Generate a completion for the prompt.
    pub async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }
        match self.config.provider {
            LlmProvider::Ollama => self.complete_ollama(system, prompt).await,
            LlmProvider::Openai => self.complete_openai(system, prompt).await,
        }
    }

    async fn complete_ollama(
        &self,
        system: Option<&str>,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let url = format!(
            "{}/api/generate",
            self.config.base_url.trim_end_matches('/')
        );
        let mut payload = json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens,
            },
        });
        if let Some(system) = system {
            payload["system"] = json!(system);
        }

        let response = self
            .completion
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::Request(format!("ollama request failed: {e}")))?;
        let body: OllamaGenerateResponse = read_json(response).await?;
        Ok(body.response.trim().to_string())
    }

    async fn complete_openai(
        &self,
        system: Option<&str>,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let payload = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let mut request = self.completion.post(&url).json(&payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Request(format!("openai request failed: {e}")))?;
        let body: OpenAiResponse = read_json(response).await?;
        let choice = body
            .choices
            .first()
            .ok_or_else(|| LlmError::InvalidResponse("response had no choices".to_string()))?;
        Ok(extract_text(&choice.message.content))
    }

    /// Generate an embedding vector via the Ollama embedding endpoint.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }
        let url = format!("{}/api/embed", self.config.base_url.trim_end_matches('/'));
        let payload = json!({
            "model": self.config.embed_model,
            "input": text,
        });
        let response = self
            .embedding
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::Request(format!("embedding request failed: {e}")))?;
        let body: OllamaEmbedResponse = read_json(response).await?;
        let embedding = body
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no embeddings returned".to_string()))?;
        debug!(dims = embedding.len(), "embedding generated");
        Ok(embedding)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, LlmError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Provider {
            status: status.as_u16(),
            body: truncate(&body, 320),
        });
    }
    response
        .json()
        .await
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

fn extract_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.trim().to_string(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}

/// Strip a Markdown code fence from model output, if present.
///
/// Models asked for JSON frequently wrap it in ```json fences.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line, then the closing fence.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.trim_end_matches('`').trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmesh_config::LlmProvider;

    fn disabled_config() -> LlmConfig {
        LlmConfig {
            enabled: false,
            provider: LlmProvider::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            api_key: None,
            temperature: 0.2,
            max_tokens: 256,
        }
    }

    #[tokio::test]
    async fn disabled_client_refuses_calls() {
        let client = LlmClient::new(disabled_config()).unwrap();
        assert!(matches!(
            client.complete(None, "hello").await,
            Err(LlmError::Disabled)
        ));
        assert!(matches!(client.embed("hello").await, Err(LlmError::Disabled)));
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let fenced = "```json\n{\"intent\": \"CHECK_BALANCE\"}\n```";
        assert_eq!(strip_code_fence(fenced), "{\"intent\": \"CHECK_BALANCE\"}");
    }

    #[test]
    fn unfenced_text_passes_through() {
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn openai_content_arrays_flatten() {
        let content = serde_json::json!([{"text": "first"}, {"text": "second"}]);
        assert_eq!(extract_text(&content), "first\nsecond");
    }
}
