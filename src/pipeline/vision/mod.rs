//! Vision collaborator: a remote multimodal model that looks at image URLs
//! and answers in JSON. Used twice per request, once to describe the
//! product and once to arbitrate between grids.

pub mod describe;
pub mod openai;
pub mod prompts;

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

pub use describe::{describe_product, ProductDescription};
pub use openai::OpenAiVisionClient;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("vision model not configured (missing API key)")]
    NotConfigured,

    #[error("vision endpoint unreachable: {0}")]
    Network(String),

    #[error("vision request timed out after {0}s")]
    Timeout(u64),

    #[error("vision API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("vision response unreadable: {0}")]
    ResponseParsing(String),
}

/// Chat-style multimodal model constrained to JSON output.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// One completion. Returns the raw message content (expected JSON).
    async fn chat_json(
        &self,
        system: &str,
        user_text: Option<&str>,
        image_urls: &[String],
    ) -> Result<String, VisionError>;
}

/// Strip a Markdown code fence if the model wrapped its JSON in one.
pub fn json_payload(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// A call the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionCall {
    pub system: String,
    pub user_text: Option<String>,
    pub image_urls: Vec<String>,
}

/// Mock vision client for testing: answers from a script, in order, and
/// records every call.
pub struct MockVisionClient {
    script: Mutex<VecDeque<Result<String, VisionError>>>,
    calls: Mutex<Vec<VisionCall>>,
}

impl MockVisionClient {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn then_reply(self, content: &str) -> Self {
        self.push(Ok(content.to_string()))
    }

    pub fn then_fail(self, error: VisionError) -> Self {
        self.push(Err(error))
    }

    fn push(self, entry: Result<String, VisionError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
        self
    }

    pub fn calls(&self) -> Vec<VisionCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Default for MockVisionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionClient for MockVisionClient {
    async fn chat_json(
        &self,
        system: &str,
        user_text: Option<&str>,
        image_urls: &[String],
    ) -> Result<String, VisionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(VisionCall {
                system: system.to_string(),
                user_text: user_text.map(str::to_string),
                image_urls: image_urls.to_vec(),
            });
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| Err(VisionError::Network("mock script exhausted".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_payload_unwraps_fences() {
        assert_eq!(json_payload("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(json_payload("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(json_payload("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(json_payload("  {}  "), "{}");
    }

    #[test]
    fn fence_tag_is_case_insensitive() {
        assert_eq!(json_payload("```JSON\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(json_payload("```Json\n[]\n```"), "[]");
    }

    #[tokio::test]
    async fn mock_replies_in_order_and_records_calls() {
        let mock = MockVisionClient::new()
            .then_reply("{\"first\":true}")
            .then_fail(VisionError::Timeout(3));

        let urls = vec!["https://a".to_string()];
        assert_eq!(mock.chat_json("sys", None, &urls).await.unwrap(), "{\"first\":true}");
        assert!(matches!(
            mock.chat_json("sys", Some("hi"), &urls).await,
            Err(VisionError::Timeout(3))
        ));
        assert!(mock.chat_json("sys", None, &[]).await.is_err());

        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].user_text.as_deref(), Some("hi"));
        assert_eq!(calls[0].image_urls, urls);
    }
}
