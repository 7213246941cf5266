//! Narrative sections requested from a chat-completion service.
//!
//! [`NarrativeGenerator::try_generate`] reports failures as [`NarrativeError`] values and
//! [`NarrativeGenerator::generate`] collapses them into fallback text, so a single failed
//! section never aborts a report.

use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Config, ModelChoice};

/// Sections written by the language model, in document order.
pub const NARRATIVE_SECTIONS: [&str; 8] = [
    "Executive Summary",
    "1. Introduction",
    "2. Goal and Scope",
    "3. Functional Unit",
    "4. System Boundary",
    "8. Interpretation",
    "9. Limitations",
    "10. Recommendations",
];

pub const SYSTEM_PROMPT: &str = "You are a sustainability analyst writing ISO-style LCA reports.";

pub const TEMPERATURE: f32 = 0.7;

/// User message asking for one section about `product`.
pub fn user_prompt(section: &str, product: &str) -> String {
    format!(
        "Write the '{section}' section for a life cycle assessment of a {product}, with citations if possible."
    )
}

/// Text used when no completion client is configured.
pub fn unconfigured_fallback(section: &str, product: &str) -> String {
    format!("[Fallback] {section} content for {product} would go here.")
}

/// Text used when a completion attempt fails.
pub fn failure_fallback(section: &str, error: &NarrativeError) -> String {
    format!("[Fallback] Unable to generate content for '{section}': {error}.")
}

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("no language-model credential configured")]
    Unconfigured,
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("completion response was not valid JSON: {0}")]
    Malformed(#[source] reqwest::Error),
    #[error("completion response contained no message")]
    EmptyResponse,
}

/// One chat completion to be answered.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub model: ModelChoice,
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Request for `section` about `product` with the fixed system prompt and temperature.
    pub fn for_section(model: ModelChoice, section: &str, product: &str) -> Self {
        Self {
            model,
            system: SYSTEM_PROMPT.to_owned(),
            user: user_prompt(section, product),
            temperature: TEMPERATURE,
        }
    }
}

/// Anything that can answer a [`CompletionRequest`] with message text.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String, NarrativeError>;
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NarrativeError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NarrativeError::Transport)?;

        Ok(Self {
            http,
            endpoint: chat_completions_url(base_url),
            api_key: api_key.into(),
            timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> NarrativeError {
        if err.is_timeout() {
            NarrativeError::Timeout(self.timeout)
        } else {
            NarrativeError::Transport(err)
        }
    }
}

/// Normalises a base URL with or without a trailing `/v1` to the completions endpoint.
fn chat_completions_url(base_url: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let base = base.strip_suffix("/v1").unwrap_or(base);
    format!("{base}/v1/chat/completions")
}

impl CompletionClient for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, NarrativeError> {
        let body = ChatRequest {
            model: request.model.as_str(),
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NarrativeError::Status { status, body });
        }

        let parsed: ChatResponse = response.json().map_err(|err| {
            if err.is_timeout() {
                NarrativeError::Timeout(self.timeout)
            } else {
                NarrativeError::Malformed(err)
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(NarrativeError::EmptyResponse)
    }
}

/// A generated (or fallback) section ready for assembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarrativeSection {
    pub title: String,
    pub text: String,
    /// Set when `text` is fallback text rather than model output.
    pub fallback: bool,
}

/// Produces the narrative sections of a report for one model choice.
pub struct NarrativeGenerator {
    client: Option<Box<dyn CompletionClient>>,
    model: ModelChoice,
}

impl NarrativeGenerator {
    /// A generator that never calls out and always returns the unconfigured fallback.
    pub fn unconfigured(model: ModelChoice) -> Self {
        Self {
            client: None,
            model,
        }
    }

    /// Uses an [`OpenAiClient`] when a credential is configured.
    pub fn from_config(config: &Config) -> Result<Self, NarrativeError> {
        match &config.credential {
            Some(key) => {
                let client =
                    OpenAiClient::new(&config.openai_base_url, key.clone(), config.http_timeout)?;
                Ok(Self::with_client(config.model, client))
            }
            None => Ok(Self::unconfigured(config.model)),
        }
    }

    pub fn with_client(model: ModelChoice, client: impl CompletionClient + 'static) -> Self {
        Self {
            client: Some(Box::new(client)),
            model,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Requests one section.
    pub fn try_generate(&self, section: &str, product: &str) -> Result<String, NarrativeError> {
        let client = self.client.as_ref().ok_or(NarrativeError::Unconfigured)?;
        let request = CompletionRequest::for_section(self.model, section, product);
        debug!("Requesting '{}' from {}", section, self.model);
        client.complete(&request)
    }

    /// Requests one section, substituting fallback text on any failure.
    pub fn generate_section(&self, section: &str, product: &str) -> NarrativeSection {
        let (text, fallback) = match self.try_generate(section, product) {
            Ok(text) => (text, false),
            Err(NarrativeError::Unconfigured) => (unconfigured_fallback(section, product), true),
            Err(err) => {
                warn!("Narrative section '{}' failed: {}", section, err);
                (failure_fallback(section, &err), true)
            }
        };
        NarrativeSection {
            title: section.to_owned(),
            text,
            fallback,
        }
    }

    /// Text of [`generate_section`](Self::generate_section).
    pub fn generate(&self, section: &str, product: &str) -> String {
        self.generate_section(section, product).text
    }

    /// Generates every entry of [`NARRATIVE_SECTIONS`] sequentially.
    pub fn generate_all(&self, product: &str) -> Vec<NarrativeSection> {
        NARRATIVE_SECTIONS
            .iter()
            .map(|title| self.generate_section(title, product))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Answers every request with the section label, except for one that times out.
    struct ScriptedClient {
        failing_section: &'static str,
        seen: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl ScriptedClient {
        fn new(failing_section: &'static str) -> Self {
            Self {
                failing_section,
                seen: Arc::default(),
            }
        }
    }

    impl CompletionClient for ScriptedClient {
        fn complete(&self, request: &CompletionRequest) -> Result<String, NarrativeError> {
            self.seen.lock().unwrap().push(request.clone());
            if request.user.contains(&format!("'{}'", self.failing_section)) {
                Err(NarrativeError::Timeout(Duration::from_secs(60)))
            } else {
                Ok(format!("Generated: {}", request.user))
            }
        }
    }

    struct EmptyClient;

    impl CompletionClient for EmptyClient {
        fn complete(&self, _request: &CompletionRequest) -> Result<String, NarrativeError> {
            Err(NarrativeError::EmptyResponse)
        }
    }

    #[test]
    fn unconfigured_generator_returns_fallbacks_for_every_section() {
        let generator = NarrativeGenerator::unconfigured(ModelChoice::Gpt35Turbo);
        let sections = generator.generate_all("Electric Toothbrush");

        assert_eq!(sections.len(), NARRATIVE_SECTIONS.len());
        for (section, title) in sections.iter().zip(NARRATIVE_SECTIONS) {
            assert_eq!(section.title, title);
            assert!(section.fallback);
            assert_eq!(
                section.text,
                format!("[Fallback] {title} content for Electric Toothbrush would go here.")
            );
        }
    }

    #[test]
    fn timeout_affects_only_that_section() {
        let client = ScriptedClient::new("1. Introduction");
        let seen = Arc::clone(&client.seen);
        let generator = NarrativeGenerator::with_client(ModelChoice::Gpt4Turbo, client);
        let sections = generator.generate_all("Cup");

        let failed: Vec<_> = sections.iter().filter(|section| section.fallback).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].title, "1. Introduction");
        assert_eq!(
            failed[0].text,
            "[Fallback] Unable to generate content for '1. Introduction': request timed out after 60s."
        );

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), NARRATIVE_SECTIONS.len());
        assert!(seen.iter().all(|request| request.model == ModelChoice::Gpt4Turbo
            && request.system == SYSTEM_PROMPT
            && (request.temperature - 0.7).abs() < f32::EPSILON));
        assert_eq!(
            seen[0].user,
            "Write the 'Executive Summary' section for a life cycle assessment of a Cup, with citations if possible."
        );
    }

    #[test]
    fn empty_response_falls_back() {
        let generator = NarrativeGenerator::with_client(ModelChoice::Gpt35Turbo, EmptyClient);
        assert!(matches!(
            generator.try_generate("9. Limitations", "Cup"),
            Err(NarrativeError::EmptyResponse)
        ));
        assert_eq!(
            generator.generate("9. Limitations", "Cup"),
            "[Fallback] Unable to generate content for '9. Limitations': completion response contained no message."
        );
    }

    #[test]
    fn from_config_without_credential_is_unconfigured() {
        let generator = NarrativeGenerator::from_config(&Config::default()).unwrap();
        assert!(!generator.is_configured());
        assert!(matches!(
            generator.try_generate("Executive Summary", "Cup"),
            Err(NarrativeError::Unconfigured)
        ));
    }

    #[test]
    fn request_body_matches_chat_format() {
        let request = CompletionRequest::for_section(ModelChoice::Gpt35Turbo, "7. LCIA", "Cup");
        let body = ChatRequest {
            model: request.model.as_str(),
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], request.user.as_str());
    }

    #[test]
    fn response_without_content_parses() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(parsed.choices[0].message.content.is_none());

        let parsed: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn completions_url_is_normalised() {
        for base in [
            "https://api.openai.com",
            "https://api.openai.com/",
            "https://api.openai.com/v1",
            "https://api.openai.com/v1/",
        ] {
            assert_eq!(
                chat_completions_url(base),
                "https://api.openai.com/v1/chat/completions"
            );
        }
    }

    #[test]
    fn unreachable_endpoint_is_a_failure_fallback() {
        let client = OpenAiClient::new("http://127.0.0.1:9", "sk-test", Duration::from_secs(2)).unwrap();
        let generator = NarrativeGenerator::with_client(ModelChoice::Gpt35Turbo, client);
        let text = generator.generate("7. LCIA", "Cup");
        assert!(text.starts_with("[Fallback] Unable to generate content for '7. LCIA': "));
        assert!(text.ends_with('.'));
    }

    #[test]
    fn model_output_is_not_marked_as_fallback() {
        let generator =
            NarrativeGenerator::with_client(ModelChoice::Gpt35Turbo, ScriptedClient::new("none"));
        let section = generator.generate_section("9. Limitations", "Cup");
        assert_eq!(section.title, "9. Limitations");
        assert!(!section.fallback);
        assert!(section.text.starts_with("Generated: "));
    }
}
