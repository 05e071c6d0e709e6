//! OpenAI-compatible chat completions provider

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{Provider, ProviderError};
use crate::config::OpenAiConfig;
use crate::models::{ExecutionParams, ProviderOutput};

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    params: ExecutionParams,
}

impl OpenAiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        params: &ExecutionParams,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            params: params.clone(),
        })
    }

    /// Create from configuration, reading the API key from the configured variable
    pub fn from_config(config: &OpenAiConfig, params: &ExecutionParams) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} is not set", config.api_key_env))?;
        Self::new(&config.base_url, api_key, params)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "model": self.params.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
        });
        if let Value::Object(map) = &mut body {
            for (key, value) in &self.params.extra {
                map.insert(key.clone(), value.clone());
            }
        }
        body
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn infer(&self, prompt: &str) -> Result<ProviderOutput, ProviderError> {
        let url = self.endpoint();
        debug!("POST {} (model {})", url, self.params.model);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                let category = if e.is_connect() { "connect" } else { "transport" };
                ProviderError::new(category, e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::new(
                format!("http_status_{}", status.as_u16()),
                body,
            ));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::new("decode", e.to_string()))?;

        parse_completion(&body, &self.params.model)
    }
}

/// Extract text and usage from a chat completions response
fn parse_completion(body: &Value, requested_model: &str) -> Result<ProviderOutput, ProviderError> {
    let text = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::new("decode", "response missing choices[0].message.content"))?;

    let model = body
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(requested_model);

    let usage = |field: &str| {
        body.pointer(&format!("/usage/{field}"))
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };

    let mut output = ProviderOutput::new(text, model);
    output.prompt_tokens = usage("prompt_tokens");
    output.completion_tokens = usage("completion_tokens");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiProvider {
        let params = ExecutionParams::new("gpt-4o-mini")
            .with_max_tokens(32)
            .with_extra("top_p", json!(0.5));
        OpenAiProvider::new("http://localhost:8080/v1/", "sk-test", &params).unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(provider().endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_request_body() {
        let body = provider().request_body("hi");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["max_tokens"], 32);
        assert_eq!(body["top_p"], 0.5);
    }

    #[test]
    fn test_parse_completion() {
        let body = json!({
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{ "message": { "role": "assistant", "content": "408" } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 1 }
        });
        let out = parse_completion(&body, "gpt-4o-mini").unwrap();
        assert_eq!(out.output, "408");
        assert_eq!(out.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(out.prompt_tokens, Some(12));
        assert_eq!(out.completion_tokens, Some(1));
    }

    #[test]
    fn test_parse_completion_without_usage() {
        let body = json!({ "choices": [{ "message": { "content": "ok" } }] });
        let out = parse_completion(&body, "m").unwrap();
        assert_eq!(out.model, "m");
        assert_eq!(out.prompt_tokens, None);
    }

    #[test]
    fn test_parse_completion_oversized_usage() {
        let body = json!({
            "choices": [{ "message": { "content": "ok" } }],
            "usage": { "prompt_tokens": 4_294_967_296u64, "completion_tokens": 7 }
        });
        let out = parse_completion(&body, "m").unwrap();
        assert_eq!(out.prompt_tokens, None);
        assert_eq!(out.completion_tokens, Some(7));
    }

    #[test]
    fn test_parse_completion_missing_content() {
        let err = parse_completion(&json!({ "choices": [] }), "m").unwrap_err();
        assert_eq!(err.category, "decode");
    }
}
