use async_trait::async_trait;
use pipeline_core::{AnalysisError, LlmClient};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the structured-completion endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        // .env is optional; absent files are ignored
        let _ = dotenvy::dotenv();
        Self {
            base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/v1".to_string()),
            api_key: std::env::var("LLM_API_KEY").ok(),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Chat-completion client returning schema-shaped JSON.
///
/// Transport, status, and parse failures all map to
/// `AnalysisError::LlmFailure`; the hybrid layer treats them uniformly.
#[derive(Clone)]
pub struct HttpLlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpLlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::LlmFailure(format!("client build: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self, AnalysisError> {
        Self::new(LlmConfig::default())
    }

    fn system_prompt(agent_role: &str, schema: &serde_json::Value) -> String {
        format!(
            "You are {}. Respond with a single JSON object matching this schema, no prose:\n{}",
            agent_role, schema
        )
    }
}

/// Pull the first top-level JSON object out of a completion, tolerating
/// surrounding prose or markdown fences.
pub fn extract_json(content: &str) -> Result<serde_json::Value, AnalysisError> {
    let start = content
        .find('{')
        .ok_or_else(|| AnalysisError::LlmFailure("no JSON object in completion".to_string()))?;
    let end = content
        .rfind('}')
        .ok_or_else(|| AnalysisError::LlmFailure("unterminated JSON object".to_string()))?;
    if end < start {
        return Err(AnalysisError::LlmFailure(
            "malformed completion payload".to_string(),
        ));
    }

    serde_json::from_str(&content[start..=end])
        .map_err(|e| AnalysisError::LlmFailure(format!("completion is not valid JSON: {}", e)))
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(
        &self,
        prompt: &str,
        agent_role: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, AnalysisError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Self::system_prompt(agent_role, schema),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.2,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AnalysisError::LlmFailure(format!("transport: {}", e)))?;

        if !response.status().is_success() {
            return Err(AnalysisError::LlmFailure(format!(
                "status {}",
                response.status()
            )));
        }

        let parsed = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| AnalysisError::LlmFailure(format!("decode: {}", e)))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AnalysisError::LlmFailure("empty choices".to_string()))?;

        tracing::debug!("completion received ({} chars)", content.len());
        extract_json(content)
    }
}
