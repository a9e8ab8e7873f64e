pub mod gemini;
pub mod groq;
pub mod intent;
pub mod ollama;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::AppConfig;
use crate::errors::AppError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends `prompt` as a single user turn and returns the raw model text.
    /// Implementations must request JSON output constrained by `schema`
    /// with zero sampling temperature.
    async fn generate_json(&self, prompt: &str, schema: &Value) -> anyhow::Result<String>;
}

pub fn provider_from_config(config: &AppConfig) -> Result<Box<dyn LlmProvider>, AppError> {
    match config.llm_provider.as_str() {
        "gemini" => {
            if config.gemini_api_key.is_empty() {
                return Err(AppError::Config(
                    "GEMINI_API_KEY must be set when LLM_PROVIDER=gemini".to_string(),
                ));
            }
            tracing::info!("using Gemini LLM provider (model: {})", config.gemini_model);
            Ok(Box::new(gemini::GeminiProvider::new(
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
            )))
        }
        "groq" => {
            if config.groq_api_key.is_empty() {
                return Err(AppError::Config(
                    "GROQ_API_KEY must be set when LLM_PROVIDER=groq".to_string(),
                ));
            }
            tracing::info!("using Groq LLM provider (model: {})", config.groq_model);
            Ok(Box::new(groq::GroqProvider::new(
                config.groq_api_key.clone(),
                config.groq_model.clone(),
            )))
        }
        "ollama" => {
            tracing::info!("using Ollama LLM provider (url: {})", config.ollama_url);
            Ok(Box::new(ollama::OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
            )))
        }
        other => Err(AppError::Config(format!(
            "unknown LLM_PROVIDER '{other}' (expected gemini, groq or ollama)"
        ))),
    }
}
