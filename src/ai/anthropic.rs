use serde::{Deserialize, Serialize};

use super::provider::{
    api_key_or_env, post_json, prompt_or_default, ChatExchange, ChatMessage, ChatProvider,
    GENERATE_PROMPT, REFINE_PROMPT,
};
use crate::config::EffectiveConfig;
use crate::error::ProviderError;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const MODEL: &str = "claude-3-5-sonnet-20240620";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const NAME: &str = "anthropic";

/// Messages API request. The system instruction travels beside the
/// conversation, not inside it.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicClient {
    endpoint: String,
    api_key: String,
    generate_prompt: String,
    refine_prompt: String,
}

impl AnthropicClient {
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
        let headers = [
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", API_VERSION),
        ];
        let raw = post_json(NAME, &self.endpoint, &headers, &body)?;
        extract_reply(&raw)
    }
}

impl ChatProvider for AnthropicClient {
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

fn build_request(exchange: &ChatExchange) -> MessagesRequest<'_> {
    MessagesRequest {
        model: MODEL,
        system: &exchange.system,
        messages: &exchange.messages,
        max_tokens: MAX_TOKENS,
        stream: false,
    }
}

/// Take the first text block of a Messages API response.
fn extract_reply(raw: &str) -> Result<String, ProviderError> {
    let response: MessagesResponse =
        serde_json::from_str(raw).map_err(|e| ProviderError::Decode {
            provider: NAME,
            reason: e.to_string(),
        })?;

    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| ProviderError::Decode {
            provider: NAME,
            reason: "response has no text content block".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_key: &str) -> EffectiveConfig {
        EffectiveConfig {
            provider: NAME.into(),
            api_key: api_key.into(),
            generate_prompt: String::new(),
            refine_prompt: String::new(),
        }
    }

    fn fixture(text: &str) -> serde_json::Value {
        json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": MODEL,
            "content": [{ "type": "text", "text": text }],
            "stop_reason": "end_turn",
            "stop_sequence": null,
            "usage": { "input_tokens": 12, "output_tokens": 9 }
        })
    }

    #[test]
    fn test_request_body_shape() {
        let exchange = ChatExchange::new("sys prompt", "the diff");
        let body = serde_json::to_value(build_request(&exchange)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": MODEL,
                "system": "sys prompt",
                "messages": [{ "role": "user", "content": "the diff" }],
                "max_tokens": 1024,
                "stream": false
            })
        );
    }

    #[test]
    fn test_extract_skips_non_text_blocks() {
        let raw = json!({
            "content": [
                { "type": "tool_use", "id": "t1", "name": "x", "input": {} },
                { "type": "text", "text": "  Add parser\n\nDetails.\n" }
            ]
        })
        .to_string();
        assert_eq!(extract_reply(&raw).unwrap(), "  Add parser\n\nDetails.\n");
    }

    #[test]
    fn test_extract_without_text_block_is_decode_error() {
        let raw = json!({ "content": [] }).to_string();
        assert!(matches!(extract_reply(&raw), Err(ProviderError::Decode { .. })));

        let raw = json!({ "id": "msg_01" }).to_string();
        assert!(matches!(extract_reply(&raw), Err(ProviderError::Decode { .. })));
    }

    #[test]
    fn test_first_text_block_without_text_is_decode_error() {
        let raw = json!({
            "content": [
                { "type": "text" },
                { "type": "text", "text": "later block" }
            ]
        })
        .to_string();
        assert!(matches!(extract_reply(&raw), Err(ProviderError::Decode { .. })));
    }

    #[test]
    #[serial]
    fn test_api_key_falls_back_to_vendor_env() {
        temp_env::with_var(API_KEY_ENV, Some("sk-vendor"), || {
            assert_eq!(AnthropicClient::new(&config("")).api_key, "sk-vendor");
            assert_eq!(AnthropicClient::new(&config("sk-cfg")).api_key, "sk-cfg");
        });
    }

    #[test]
    fn test_default_prompts_used_without_override() {
        let client = AnthropicClient::new(&config("sk"));
        assert_eq!(client.generate_prompt, GENERATE_PROMPT);
        assert_eq!(client.refine_prompt, REFINE_PROMPT);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_commit_message_round_trip() {
        let server = MockServer::start().await;
        let reply = "Fix typo in README\n\nCorrects the install command.";

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_json(json!({
                "model": MODEL,
                "system": GENERATE_PROMPT,
                "messages": [{ "role": "user", "content": "diff --git a/README b/README" }],
                "max_tokens": 1024,
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixture(reply)))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = format!("{}/v1/messages", server.uri());
        let result = tokio::task::spawn_blocking(move || {
            AnthropicClient::with_endpoint(&config("sk-test"), &endpoint)
                .commit_message("diff --git a/README b/README")
        })
        .await
        .unwrap();

        assert_eq!(result.unwrap(), reply);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_refine_uses_refine_prompt() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(wiremock::matchers::body_partial_json(json!({ "system": REFINE_PROMPT })))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixture("Fix typo")))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = format!("{}/v1/messages", server.uri());
        let result = tokio::task::spawn_blocking(move || {
            AnthropicClient::with_endpoint(&config("sk-test"), &endpoint).refine_text("Fix tpyo")
        })
        .await
        .unwrap();

        assert_eq!(result.unwrap(), "Fix typo");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_error_status_is_request_error() {
        let server = MockServer::start().await;
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string(body))
            .mount(&server)
            .await;

        let endpoint = format!("{}/v1/messages", server.uri());
        let result = tokio::task::spawn_blocking(move || {
            AnthropicClient::with_endpoint(&config("bad"), &endpoint).commit_message("diff")
        })
        .await
        .unwrap();

        match result {
            Err(ProviderError::Request { status, body: got }) => {
                assert_eq!(status, 401);
                assert_eq!(got, body);
            }
            other => panic!("expected request error, got {:?}", other),
        }
    }
}
