use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{anthropic::AnthropicClient, openai::OpenAiClient};
use crate::config::EffectiveConfig;
use crate::error::ProviderError;

const USER_AGENT: &str = concat!("prepare-commit-msg/", env!("CARGO_PKG_VERSION"));

/// Instruction used to write a new commit message from a staged diff.
pub const GENERATE_PROMPT: &str = "You will receive a Git diff output. Based on the diff, generate a commit message. The message should include a short description on the first line, followed by a more detailed explanation of the changes made. Do not add comments or descriptions about the generated text.";

/// Instruction used to fix up a message the user already wrote.
pub const REFINE_PROMPT: &str = "You are a writing assistant specialized in spelling and grammar correction. You will receive a Git commit message describing changes made to source code. Your task is to fix any spelling or grammatical errors while keeping changes minimal. Do not include explanations or comments about the corrections.";

/// A chat-completion backend able to write and polish commit messages.
#[cfg_attr(test, mockall::automock)]
pub trait ChatProvider {
    fn name(&self) -> &'static str;

    /// Write a commit message for the given staged diff.
    fn commit_message(&self, diff: &str) -> Result<String, ProviderError>;

    /// Return a corrected version of an existing commit message.
    fn refine_text(&self, message: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "openai" | "gpt" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

impl Default for ProviderKind {
    fn default() -> Self {
        Self::Anthropic
    }
}

/// Pick the backend named by the configuration, falling back to Anthropic.
pub fn select_provider(config: &EffectiveConfig) -> Box<dyn ChatProvider> {
    let kind = ProviderKind::parse(&config.provider).unwrap_or_else(|| {
        if !config.provider.is_empty() {
            warn!(provider = %config.provider, "unknown provider, using default");
        }
        ProviderKind::default()
    });

    debug!(provider = kind.name(), "selected provider");

    match kind {
        ProviderKind::Anthropic => Box::new(AnthropicClient::new(config)),
        ProviderKind::OpenAi => Box::new(OpenAiClient::new(config)),
    }
}

/// Resolve a credential, consulting the vendor variable when the
/// configuration left it empty.
pub(crate) fn api_key_or_env(configured: &str, env_var: &str) -> String {
    if !configured.is_empty() {
        return configured.to_string();
    }
    std::env::var(env_var).unwrap_or_default()
}

pub(crate) fn prompt_or_default(configured: &str, default: &str) -> String {
    if configured.is_empty() {
        default.to_string()
    } else {
        configured.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: &str) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn system(content: &str) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }
}

/// One request to a backend: a system instruction plus the user's text.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatExchange {
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatExchange {
    pub fn new(system: &str, user_content: &str) -> Self {
        Self {
            system: system.to_string(),
            messages: vec![ChatMessage::user(user_content)],
        }
    }
}

/// POST a JSON body and return the raw response text on a success status.
pub(crate) fn post_json<B: Serialize>(
    provider: &'static str,
    endpoint: &str,
    headers: &[(&str, &str)],
    body: &B,
) -> Result<String, ProviderError> {
    let transport = |source: reqwest::Error| ProviderError::Transport { provider, source };

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(transport)?;

    let mut request = client.post(endpoint).json(body);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    debug!(provider, endpoint, "sending request");
    let response = request.send().map_err(transport)?;
    let status = response.status();
    let text = response.text().map_err(transport)?;

    if !status.is_success() {
        return Err(ProviderError::Request {
            status: status.as_u16(),
            body: text,
        });
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> EffectiveConfig {
        EffectiveConfig {
            provider: provider.into(),
            api_key: "sk-test".into(),
            generate_prompt: String::new(),
            refine_prompt: String::new(),
        }
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(ProviderKind::parse("openai"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse("OpenAI"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse("claude"), Some(ProviderKind::Anthropic));
        assert_eq!(ProviderKind::parse("mistral"), None);
        assert_eq!(ProviderKind::parse(""), None);
    }

    #[test]
    fn test_select_provider() {
        assert_eq!(select_provider(&config("openai")).name(), "openai");
        assert_eq!(select_provider(&config("anthropic")).name(), "anthropic");
    }

    #[test]
    fn test_select_unknown_falls_back_to_default() {
        assert_eq!(select_provider(&config("mistral")).name(), "anthropic");
        assert_eq!(select_provider(&config("")).name(), "anthropic");
    }

    #[test]
    fn test_prompt_or_default() {
        assert_eq!(prompt_or_default("", GENERATE_PROMPT), GENERATE_PROMPT);
        assert_eq!(prompt_or_default("custom", GENERATE_PROMPT), "custom");
    }

    #[test]
    fn test_exchange_has_single_user_message() {
        let exchange = ChatExchange::new("be terse", "diff --git a/x b/x");
        assert_eq!(exchange.system, "be terse");
        assert_eq!(exchange.messages, vec![ChatMessage::user("diff --git a/x b/x")]);
    }
}
