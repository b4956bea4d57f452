use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::parse::parse_response;
use super::prompt::analysis_prompt;
use super::{EstimationError, NutritionEstimator, NutritionalData};
use crate::config::EstimatorConfig;

/// OpenAI-compatible chat-completions client pointed at Groq. A missing
/// API key is tolerated at construction and reported as a configuration
/// failure on first use, before any network call.
pub struct GroqEstimator {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GroqEstimator {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl NutritionEstimator for GroqEstimator {
    #[instrument(skip(self, description))]
    async fn analyze(&self, description: &str) -> Result<NutritionalData, EstimationError> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("analysis requested without a configured API key");
            return Err(EstimationError::Configuration);
        };

        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": analysis_prompt(description)}],
            "temperature": 0.2,
            "max_tokens": 500,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let completion: ChatCompletion = response.json().await?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!(chars = text.len(), "completion received");

        parse_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_key_fails_without_a_network_call() {
        let estimator = GroqEstimator::new(&EstimatorConfig {
            api_key: None,
            base_url: "http://127.0.0.1:1".into(),
            model: "llama-3.3-70b-versatile".into(),
        });
        assert!(matches!(
            estimator.analyze("2 eggs and toast").await,
            Err(EstimationError::Configuration)
        ));
    }
}
