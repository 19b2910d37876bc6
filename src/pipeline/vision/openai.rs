//! OpenAI-compatible chat-completions client.
//!
//! Plain OpenAI endpoints use `Authorization: Bearer`. When an API version is
//! configured the client speaks the Azure dialect instead: the model name is
//! the deployment, the key goes in an `api-key` header and the version in
//! the query string.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{VisionClient, VisionError};

pub const DEFAULT_VISION_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";

const MAX_TOKENS: u32 = 2000;

pub struct OpenAiVisionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    api_version: Option<String>,
    model: String,
    timeout: Duration,
}

impl OpenAiVisionClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        api_key: Option<String>,
        api_version: Option<String>,
        model: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            api_version,
            model: model.to_string(),
            timeout,
        }
    }

    fn is_azure(&self) -> bool {
        self.api_version.is_some()
    }

    fn transport_error(&self, e: reqwest::Error) -> VisionError {
        if e.is_timeout() {
            VisionError::Timeout(self.timeout.as_secs())
        } else {
            VisionError::Network(e.to_string())
        }
    }

    fn completions_url(&self) -> String {
        if self.is_azure() {
            format!("{}/openai/deployments/{}/chat/completions", self.endpoint, self.model)
        } else {
            format!("{}/chat/completions", self.endpoint)
        }
    }
}

// ── Wire types ──────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn build_request<'a>(
    model: &'a str,
    system: &'a str,
    user_text: Option<&'a str>,
    image_urls: &'a [String],
) -> ChatRequest<'a> {
    let mut parts: Vec<ContentPart<'a>> = Vec::with_capacity(image_urls.len() + 1);
    if let Some(text) = user_text {
        parts.push(ContentPart::Text { text });
    }
    parts.extend(image_urls.iter().map(|url| ContentPart::ImageUrl {
        image_url: ImageUrl { url },
    }));

    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(system),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(parts),
            },
        ],
        max_tokens: MAX_TOKENS,
        temperature: 0.0,
        response_format: ResponseFormat { kind: "json_object" },
    }
}

#[async_trait]
impl VisionClient for OpenAiVisionClient {
    async fn chat_json(
        &self,
        system: &str,
        user_text: Option<&str>,
        image_urls: &[String],
    ) -> Result<String, VisionError> {
        let key = self.api_key.as_deref().ok_or(VisionError::NotConfigured)?;
        let body = build_request(&self.model, system, user_text, image_urls);

        let mut request = self
            .client
            .post(self.completions_url())
            .timeout(self.timeout)
            .json(&body);
        request = match &self.api_version {
            Some(version) => request.header("api-key", key).query(&[("api-version", version)]),
            None => request.bearer_auth(key),
        };

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(VisionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // A body cut short is a failed call, not an unreadable reply.
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|e| VisionError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| VisionError::ResponseParsing("no message content".into()))
    }
}
