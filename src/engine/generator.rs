//! Generator contract.
//!
//! The model behind the wrapper is a black box: text in, text out. Adapters
//! may be slow and may fail, but a failure is always an error value and never
//! an empty string posing as output.

use crate::config::ModelConfig;
use crate::engine::{OpenRouterConfig, OpenRouterGenerator};
use crate::error::{GeneratorError, WrapperError, WrapperResult};

/// Trait for text generator adapters.
pub trait Generator: Send + Sync {
    /// Model identifier recorded in the audit log.
    fn model_id(&self) -> &str;

    /// Produce a completion for `prompt`.
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;
}

/// Offline generator that answers every prompt with the prompt itself.
///
/// Handy for dry runs of the pipeline without a hosted model.
pub struct EchoGenerator {
    model_id: String,
}

impl EchoGenerator {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
        }
    }
}

impl Default for EchoGenerator {
    fn default() -> Self {
        Self::new("echo")
    }
}

impl Generator for EchoGenerator {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        Ok(prompt.to_string())
    }
}

/// Build the generator named by `config.provider`.
pub fn build_generator(config: &ModelConfig) -> WrapperResult<Box<dyn Generator>> {
    match config.provider.trim().to_lowercase().as_str() {
        "echo" => Ok(Box::new(EchoGenerator::new(config.name.clone()))),
        "openrouter" => {
            if config.api_key.is_empty() {
                return Err(WrapperError::Config(
                    "model.api_key is required for the openrouter provider".to_string(),
                ));
            }
            let generator = OpenRouterGenerator::new(OpenRouterConfig {
                api_key: config.api_key.clone(),
                model: config.name.clone(),
                base_url: config.base_url.clone(),
                timeout_secs: config.timeout_secs,
                max_tokens: config.max_tokens,
            })?;
            Ok(Box::new(generator))
        }
        other => Err(WrapperError::Config(format!(
            "Unknown model provider: {}. Use echo or openrouter",
            other
        ))),
    }
}
