use crate::config::Config;
use crate::error::ProviderError;
use crate::i18n::{Language, TranslationMetrics, TranslationValidator};
use crate::retry::{with_retry_if, RetryConfig};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A remote service that can translate free text and guess its language.
///
/// Implementations report failures honestly; [`RemoteTranslationClient`] is
/// the layer that turns them into fallbacks.
pub trait TranslationProvider: Send + Sync {
    fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;

    fn detect(&self, text: &str) -> impl Future<Output = Result<Language, ProviderError>> + Send;
}

/// OpenAI Chat Completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Reasoning models reject `temperature` and need a larger token budget
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

fn build_translation_system_prompt(source: Language, target: Language) -> String {
    format!(
        r#"You are a translator for a civic services mobile app. Translate the user's text from {} to {}.

Rules:
- Reply with the translation only, no quotes, notes or explanations
- Keep placeholders in curly braces (e.g. {{service}}, {{name}}) exactly as written
- Keep URLs, numbers, ticket ids and phone numbers unchanged
- Keep proper names of places, departments and people
- Use the plain, polite register a government service would use
- If the text is already in {}, return it unchanged"#,
        source.name(),
        target.name(),
        target.name()
    )
}

fn build_detection_system_prompt() -> String {
    r#"Identify the language of the user's text.
Reply with only its two-letter ISO 639-1 code in lowercase (for example: en, hi, te).
Do not add punctuation or any other words."#
        .to_string()
}

/// Normalize a detection answer like `" HI.\n"` or `"'te'"` to a registered language.
fn parse_detected_code(answer: &str) -> Result<Language, ProviderError> {
    let code: String = answer
        .trim()
        .trim_matches(|c: char| !c.is_ascii_alphabetic())
        .to_ascii_lowercase();

    Language::from_code_any(&code).ok_or_else(|| {
        ProviderError::Parse(format!("detection returned unsupported code '{}'", answer.trim()))
    })
}

/// Translation provider backed by an OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    retry: RetryConfig,
    detection_retry: RetryConfig,
}

impl OpenAiTranslator {
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.translation_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.translation_api_url.clone(),
            api_key: config.translation_api_key.clone(),
            model: config.translation_model.clone(),
            retry: RetryConfig::translation(),
            detection_retry: RetryConfig::detection(),
        })
    }

    /// Override the retry policy for both translation and detection.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.detection_retry = retry.clone();
        self.retry = retry;
        self
    }

    fn build_request(&self, system_prompt: String, user_text: &str) -> ChatRequest {
        let is_reasoning = is_reasoning_model(&self.model);

        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt,
                },
                Message {
                    role: "user".to_string(),
                    content: user_text.to_string(),
                },
            ],
            max_completion_tokens: if is_reasoning { 4000 } else { 1000 },
            temperature: if is_reasoning { None } else { Some(0.2) },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
        }
    }

    /// One request/response round trip.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ProviderError::Empty)
    }
}

impl TranslationProvider for OpenAiTranslator {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ProviderError> {
        let request = self.build_request(build_translation_system_prompt(source, target), text);

        let translated = with_retry_if(
            &self.retry,
            &format!("Translation {}->{}", source, target),
            || self.complete(&request),
            ProviderError::is_retryable,
        )
        .await?;

        let translated = translated.trim().to_string();
        if translated.is_empty() {
            return Err(ProviderError::Empty);
        }

        let validation = TranslationValidator::validate(text, &translated);
        if validation.has_warnings() {
            warn!(
                "Translation validation warnings for {}->{}: {:?}",
                source, target, validation.warnings
            );
        }
        if validation.has_errors() {
            warn!(
                "Translation validation errors for {}->{}: {:?}",
                source, target, validation.errors
            );
        }

        Ok(translated)
    }

    async fn detect(&self, text: &str) -> Result<Language, ProviderError> {
        let request = self.build_request(build_detection_system_prompt(), text);

        let answer = with_retry_if(
            &self.detection_retry,
            "Language detection",
            || self.complete(&request),
            ProviderError::is_retryable,
        )
        .await?;

        parse_detected_code(&answer)
    }
}

/// Result of a best-effort remote translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translated {
    /// The provider answered
    Remote(String),
    /// The provider failed; this is the caller's original text
    Original(String),
}

impl Translated {
    pub fn is_remote(&self) -> bool {
        matches!(self, Translated::Remote(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Translated::Remote(text) | Translated::Original(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Translated::Remote(text) | Translated::Original(text) => text,
        }
    }
}

/// Wraps a [`TranslationProvider`] so that failures degrade instead of
/// propagating: translation falls back to the input text and detection to
/// the canonical language.
pub struct RemoteTranslationClient<P> {
    provider: P,
    metrics: Arc<TranslationMetrics>,
}

impl<P: TranslationProvider> RemoteTranslationClient<P> {
    pub fn new(provider: P, metrics: Arc<TranslationMetrics>) -> Self {
        Self { provider, metrics }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn translate(&self, text: &str, source: Language, target: Language) -> Translated {
        self.metrics.record_provider_call();
        match self.provider.translate(text, source, target).await {
            Ok(translated) => {
                debug!("Translated {} chars {}->{}", text.len(), source, target);
                Translated::Remote(translated)
            }
            Err(e) => {
                self.metrics.record_provider_failure();
                warn!(
                    "Translation {}->{} failed, keeping original text: {}",
                    source, target, e
                );
                Translated::Original(text.to_string())
            }
        }
    }

    pub async fn detect(&self, text: &str) -> Language {
        self.metrics.record_provider_call();
        match self.provider.detect(text).await {
            Ok(language) => language,
            Err(e) => {
                self.metrics.record_provider_failure();
                let fallback = Language::canonical();
                warn!("Language detection failed, assuming '{}': {}", fallback, e);
                fallback
            }
        }
    }
}
