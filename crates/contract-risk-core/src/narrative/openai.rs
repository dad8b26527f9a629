use super::{build_prompt, LlmSettings, NarrativeClient};
use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Narrative client for OpenAI-compatible chat-completions services.
#[derive(Debug, Clone)]
pub struct OpenAiNarrativeClient {
    http: reqwest::Client,
    completions_url: String,
    api_key: String,
    model: String,
}

impl OpenAiNarrativeClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let base = settings.endpoint.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let completions_url = format!("{}{COMPLETIONS_PATH}", base.trim_end_matches('/'));
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("contract-risk/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build().context("could not build narrative HTTP client")?,
            completions_url,
            api_key: settings.api_key.clone(),
            model: settings.model.as_deref().unwrap_or(DEFAULT_MODEL).to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl NarrativeClient for OpenAiNarrativeClient {
    async fn narrate(&self, contract_text: &str) -> Result<String> {
        ensure!(
            !self.api_key.trim().is_empty(),
            "no API key configured for provider `openai`; set CONTRACT_RISK_API_KEY"
        );
        let request = CompletionRequest {
            model: &self.model,
            messages: [PromptMessage {
                role: "user",
                content: build_prompt(contract_text),
            }],
        };

        let response = self
            .http
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("narrative request to {} failed", self.completions_url))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("narrative service returned {status}: {detail}"));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("narrative service sent an unreadable completion")?;
        completion
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("completion is missing message content"))
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [PromptMessage; 1],
}

#[derive(Serialize)]
struct PromptMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::{narrate_or_fallback, NarrativeOutcome, FALLBACK_NARRATIVE};
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings(endpoint: &str, api_key: &str) -> LlmSettings {
        LlmSettings {
            provider: "openai".into(),
            api_key: api_key.into(),
            endpoint: Some(endpoint.into()),
            model: Some("test-model".into()),
            timeout: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn returns_message_content_verbatim() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .body_contains("test-model")
                    .body_contains("Contract Text:");
                then.status(200).json_body(json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "Contract Type: NDA\nRisk: Low" } }
                    ]
                }));
            })
            .await;

        let client = OpenAiNarrativeClient::new(&settings(&server.base_url(), "test-key")).unwrap();
        let narrative = client.narrate("1. Confidential information").await.unwrap();
        assert_eq!(narrative, "Contract Type: NDA\nRisk: Low");
        mock.assert_async().await;
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn quota_error_falls_back() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("insufficient_quota");
            })
            .await;

        let client = OpenAiNarrativeClient::new(&settings(&server.base_url(), "test-key")).unwrap();
        let outcome = narrate_or_fallback(&client, "1. Payment terms").await.unwrap();
        mock.assert_hits_async(1).await;
        match outcome {
            NarrativeOutcome::Fallback { narrative, reason } => {
                assert_eq!(narrative, FALLBACK_NARRATIVE);
                assert!(reason.contains("429"));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn missing_content_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .json_body(json!({ "choices": [ { "message": { "content": null } } ] }));
            })
            .await;

        let client = OpenAiNarrativeClient::new(&settings(&server.base_url(), "test-key")).unwrap();
        let err = client.narrate("1. Scope").await.unwrap_err();
        assert!(err.to_string().contains("missing message content"));
    }

    #[test]
    fn model_defaults_when_unset() {
        let mut settings = settings("https://example.invalid/", "key");
        settings.model = None;
        let client = OpenAiNarrativeClient::new(&settings).unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.completions_url, "https://example.invalid/v1/chat/completions");
    }

    #[tokio::test]
    async fn empty_key_fails_without_request() {
        let client = OpenAiNarrativeClient::new(&settings("http://127.0.0.1:9", "")).unwrap();
        let err = client.narrate("1. Scope").await.unwrap_err();
        assert!(err.to_string().contains("CONTRACT_RISK_API_KEY"));
    }

    #[tokio::test]
    async fn unreachable_service_falls_back() {
        let mut settings = settings("http://127.0.0.1:9", "test-key");
        settings.timeout = Some(std::time::Duration::from_secs(5));
        let client = OpenAiNarrativeClient::new(&settings).unwrap();
        let outcome = narrate_or_fallback(&client, "1. Scope").await.unwrap();
        assert!(outcome.is_fallback());
        assert_eq!(outcome.narrative(), FALLBACK_NARRATIVE);
    }
}
