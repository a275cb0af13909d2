//! Report generation from a composed prompt.
//!
//! [`ReportGenerator`] is the seam; [`AnthropicClient`] sends the prompt as a
//! single user message to the Anthropic messages API and returns the text of
//! the reply.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::ReportConfig;

/// Errors from report generation.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Transport failure or unreadable response body.
    #[error("report request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("report API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The API kept rate limiting until retries ran out.
    #[error("report API rate limited after {attempts} attempts")]
    RateLimited {
        /// Attempts made.
        attempts: u32,
    },

    /// The reply contained no text.
    #[error("report API returned no text content")]
    EmptyResponse,
}

/// Result alias for report generation.
pub type ReportResult<T> = Result<T, ReportError>;

/// Produces a release report from a prompt.
pub trait ReportGenerator {
    /// Generate the report text.
    fn generate(&self, prompt: &str) -> ReportResult<String>;
}

const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const MAX_ATTEMPTS: u32 = 3;
const RATE_LIMITED: u16 = 429;

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessageResponse {
    /// Text of the first text block.
    fn into_text(self) -> Option<String> {
        self.content.into_iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
    }
}

/// [`ReportGenerator`] backed by the Anthropic messages API.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    api_key: String,
    model: String,
    max_tokens: u32,
    url: String,
    http: reqwest::blocking::Client,
}

impl AnthropicClient {
    /// Build a client from report settings and an API key.
    pub fn new(api_key: impl Into<String>, config: &ReportConfig) -> ReportResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            url: config.api_url.clone(),
            http,
        })
    }

    /// Model the client requests.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ReportGenerator for AnthropicClient {
    #[instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.len()))]
    fn generate(&self, prompt: &str) -> ReportResult<String> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self
                .http
                .post(&self.url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&request)
                .send()?;

            let status = response.status();
            debug!(status = status.as_u16(), attempt, "report response");

            if status.is_success() {
                let text = response
                    .json::<MessageResponse>()?
                    .into_text()
                    .ok_or(ReportError::EmptyResponse)?;
                info!(chars = text.len(), "report generated");
                return Ok(text);
            }

            if status.as_u16() == RATE_LIMITED {
                if attempt >= MAX_ATTEMPTS {
                    return Err(ReportError::RateLimited { attempts: attempt });
                }
                let wait = Duration::from_secs(2u64.pow(attempt));
                warn!(?wait, "rate limited, retrying");
                thread::sleep(wait);
                continue;
            }

            return Err(ReportError::Api {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }
    }
}
