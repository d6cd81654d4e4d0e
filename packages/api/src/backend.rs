//! Concrete generation backends.

use std::sync::Arc;
use std::time::Duration;

use actors::{BackendError, BackendResult, Generation, GenerationBackend};
use serde::Serialize;
use tokio::runtime::Handle;

use crate::config::BackendKind;

/// Stop sequences of the chat-ML prompt format.
const STOP_SEQUENCES: [&str; 2] = ["<|im_end|>", "<|endoftext|>"];

/// Client for a llama.cpp server's `/completion` endpoint.
pub struct LlamaServerBackend {
    client: reqwest::Client,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
    stop: &'a [&'a str],
    cache_prompt: bool,
}

impl LlamaServerBackend {
    pub fn new(base_url: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            max_tokens,
            temperature,
        }
    }

    async fn complete(&self, prompt: &str) -> BackendResult {
        let request = CompletionRequest {
            prompt,
            n_predict: self.max_tokens,
            temperature: self.temperature,
            stop: &STOP_SEQUENCES,
            cache_prompt: true,
        };

        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(BackendError::Request(format!(
                "llama server returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        parse_completion(&body)
    }
}

impl GenerationBackend for LlamaServerBackend {
    fn name(&self) -> &str {
        "llama-server"
    }

    fn generate(&self, prompt: &str) -> BackendResult {
        // Called on a blocking thread, which may re-enter the runtime.
        let handle = Handle::try_current()
            .map_err(|e| BackendError::Other(format!("no async runtime: {}", e)))?;
        handle.block_on(self.complete(prompt))
    }
}

/// Extract the generated text from a `/completion` response body.
pub fn parse_completion(body: &str) -> BackendResult {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| BackendError::InvalidResponse(format!("not JSON: {}", e)))?;

    match value.get("content") {
        Some(serde_json::Value::String(text)) => Ok(Generation::new(text.clone())),
        Some(_) => Err(BackendError::InvalidResponse(
            "`content` is not a string".to_string(),
        )),
        None => Err(BackendError::InvalidResponse(
            "missing `content` field".to_string(),
        )),
    }
}

/// Sleeps, then returns a canned CAD document.
pub struct EchoBackend {
    delay: Duration,
}

impl EchoBackend {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl GenerationBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    fn generate(&self, prompt: &str) -> BackendResult {
        std::thread::sleep(self.delay);
        let output = serde_json::json!({
            "final_json": {
                "parts": [{ "type": "box", "size": [10, 10, 10] }]
            },
            "prompt_chars": prompt.chars().count(),
        });
        Ok(Generation::new(output.to_string()))
    }
}

/// Build the configured backend.
pub fn build_backend(kind: &BackendKind) -> Arc<dyn GenerationBackend> {
    match kind {
        BackendKind::Llama {
            url,
            max_tokens,
            temperature,
        } => Arc::new(LlamaServerBackend::new(url.clone(), *max_tokens, *temperature)),
        BackendKind::Echo { delay } => Arc::new(EchoBackend::new(*delay)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_completion_content() {
        let body = r#"{"content":"{\"final_json\":{}}","stop":true,"tokens_predicted":7}"#;
        let generation = parse_completion(body).expect("valid response");
        assert_eq!(generation.text, r#"{"final_json":{}}"#);
    }

    #[test]
    fn rejects_malformed_responses() {
        assert!(matches!(
            parse_completion("<html>bad gateway</html>"),
            Err(BackendError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"error":"model not loaded"}"#),
            Err(BackendError::InvalidResponse(msg)) if msg.contains("content")
        ));
        assert!(matches!(
            parse_completion(r#"{"content":42}"#),
            Err(BackendError::InvalidResponse(_))
        ));
    }

    #[test]
    fn completion_request_matches_server_format() {
        let request = CompletionRequest {
            prompt: "hi",
            n_predict: 16,
            temperature: 0.5,
            stop: &STOP_SEQUENCES,
            cache_prompt: true,
        };
        let json = serde_json::to_value(&request).expect("serializable");
        assert_eq!(json["n_predict"], 16);
        assert_eq!(json["stop"][0], "<|im_end|>");
        assert_eq!(json["cache_prompt"], true);
    }

    #[test]
    fn echo_backend_returns_json() {
        let backend = EchoBackend::new(Duration::ZERO);
        let generation = backend.generate("abc").expect("echo never fails");
        let value: serde_json::Value =
            serde_json::from_str(&generation.text).expect("echo output is JSON");
        assert_eq!(value["prompt_chars"], 3);
        assert_eq!(backend.name(), "echo");
    }
}
