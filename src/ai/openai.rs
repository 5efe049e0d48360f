use serde::{Deserialize, Serialize};

use super::provider::{
    api_key_or_env, post_json, prompt_or_default, ChatExchange, ChatMessage, ChatProvider,
    GENERATE_PROMPT, REFINE_PROMPT,
};
use crate::config::EffectiveConfig;
use crate::error::ProviderError;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4o-mini";
const MAX_TOKENS: u32 = 1024;
const API_KEY_ENV: &str = "OPENAI_API_KEY";
const NAME: &str = "openai";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiClient {
    endpoint: String,
    api_key: String,
    generate_prompt: String,
    refine_prompt: String,
}

impl OpenAiClient {
    pub fn new(config: &EffectiveConfig) -> Self {
        Self::with_endpoint(config, API_URL)
    }

    pub(crate) fn with_endpoint(config: &EffectiveConfig, endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key_or_env(&config.api_key, API_KEY_ENV),
            generate_prompt: prompt_or_default(&config.generate_prompt, GENERATE_PROMPT),
            refine_prompt: prompt_or_default(&config.refine_prompt, REFINE_PROMPT),
        }
    }

    fn chat(&self, exchange: &ChatExchange) -> Result<String, ProviderError> {
        let body = build_request(exchange);
        let bearer = format!("Bearer {}", self.api_key);
        let raw = post_json(NAME, &self.endpoint, &[("Authorization", bearer.as_str())], &body)?;
        extract_reply(&raw)
    }
}

impl ChatProvider for OpenAiClient {
    fn name(&self) -> &'static str {
        NAME
    }

    fn commit_message(&self, diff: &str) -> Result<String, ProviderError> {
        self.chat(&ChatExchange::new(&self.generate_prompt, diff))
    }

    fn refine_text(&self, message: &str) -> Result<String, ProviderError> {
        self.chat(&ChatExchange::new(&self.refine_prompt, message))
    }
}

/// Chat Completions request. The system instruction leads the message list.
fn build_request(exchange: &ChatExchange) -> CompletionRequest<'static> {
    let mut messages = Vec::with_capacity(exchange.messages.len() + 1);
    messages.push(ChatMessage::system(&exchange.system));
    messages.extend(exchange.messages.iter().cloned());

    CompletionRequest {
        model: MODEL,
        messages,
        max_tokens: MAX_TOKENS,
    }
}

fn extract_reply(raw: &str) -> Result<String, ProviderError> {
    let decode = |reason: String| ProviderError::Decode {
        provider: NAME,
        reason,
    };

    let response: CompletionResponse =
        serde_json::from_str(raw).map_err(|e| decode(e.to_string()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| decode("response has no choices".into()))?;

    choice
        .message
        .content
        .ok_or_else(|| decode("first choice has no message content".into()))
}
