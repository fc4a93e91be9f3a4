use crate::config::AiConfig;
use crate::describe::render_prompt;
use crate::error::{Result, SynthError};
use crate::llm::types::*;
use reqwest::Client;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_SYSTEM_PROMPT: &str =
    "You write concise, plain descriptions for accounts-payable invoice line items. Reply with one sentence and nothing else.";

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ChatCompletionsClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    /// Reads `OPENAI_API_KEY` and, if set, `OPENAI_BASE_URL`.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())?;
        let client = Self::new(api_key);
        Some(match std::env::var("OPENAI_BASE_URL") {
            Ok(url) if !url.is_empty() => client.with_base_url(url),
            _ => client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn build_request(ai: &AiConfig, item_name: &str, prompt_template: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: ai.model.clone(),
            messages: vec![
                ChatMessage::system(
                    ai.system_prompt
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
                ),
                ChatMessage::user(render_prompt(prompt_template, item_name)),
            ],
            temperature: ai.temperature,
            top_p: ai.top_p,
            max_tokens: ai.max_output_tokens,
        }
    }

    pub async fn complete(&self, request: &ChatCompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(SynthError::Description(format!(
                "Chat completion error (status {}): {}",
                status, err_text
            )));
        }

        let body: ChatCompletionResponse = res.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| SynthError::Description("No choices returned".to_string()))
    }

    pub async fn describe(&self, ai: &AiConfig, item_name: &str, prompt_template: &str) -> Result<String> {
        let request = Self::build_request(ai, item_name, prompt_template);
        self.complete(&request).await
    }
}
