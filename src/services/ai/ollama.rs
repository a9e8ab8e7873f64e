use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::LlmProvider;

pub struct OllamaProvider {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            url,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate_json(&self, prompt: &str, schema: &Value) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": prompt,
            }],
            "format": schema,
            "options": { "temperature": 0.0 },
            "stream": false,
        });

        let resp = self
            .client
            .post(format!("{}/api/chat", self.url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await
            .context("failed to call Ollama API")?;

        let data: Value = resp
            .json()
            .await
            .context("failed to parse Ollama response")?;

        data["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing content in Ollama response"))
    }
}
