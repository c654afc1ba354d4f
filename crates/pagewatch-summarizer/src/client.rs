//! HTTP client for an OpenAI-compatible `chat/completions` endpoint.
//!
//! The public summarize methods never fail on soft errors: rate limits that
//! outlast the retries, timeouts, bad statuses, and malformed replies all
//! come back as `Ok(None)`. Only an overloaded service is reported as an
//! error, so the caller can ask the user to try again later.

use std::sync::LazyLock;
use std::time::Duration;

use pagewatch_core::ChangeSummary;
use regex::Regex;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::SummarizerError;
use crate::excerpt::{cap_chars, filter_citations, BASELINE_EXCERPT_CHARS, DIFF_EXCERPT_CHARS};
use crate::prompt::{baseline_prompt, diff_prompt, response_format, SYSTEM_PROMPT};
use crate::retry::{retry_with_backoff, RetryPolicy};

const TEMPERATURE: f32 = 0.2;

/// Upper bound when reading server-suggested delays; `RetryPolicy` caps lower.
const MAX_SUGGESTED_SECS: f64 = 3_600.0;

/// "Please try again in 1.5s" / "try again in 250ms" in rate-limit bodies.
static TRY_AGAIN_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)try again in\s*([0-9]+(?:\.[0-9]+)?)\s*(ms|s)\b").expect("valid retry regex")
});

// --- wire types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: serde_json::Value,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
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
    content: Option<String>,
}

#[derive(Deserialize)]
struct SummaryPayload {
    summary: String,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Client for the change summarizer.
///
/// Use [`SummarizerClient::new`] with the configured endpoint; tests point
/// `base_url` at a wiremock server and shorten the policy with
/// [`SummarizerClient::with_policy`].
#[derive(Clone)]
pub struct SummarizerClient {
    client: Client,
    api_key: String,
    endpoint: Url,
    model: String,
    timeout: Duration,
    policy: RetryPolicy,
}

impl SummarizerClient {
    /// # Errors
    ///
    /// Returns [`SummarizerError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`SummarizerError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self, SummarizerError> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .user_agent("pagewatch/0.1 (change-summaries)")
            .build()?;

        // Exactly one trailing slash, so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join("chat/completions"))
            .map_err(|e| SummarizerError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint,
            model: model.to_owned(),
            timeout,
            policy: RetryPolicy::with_max_retries(max_retries),
        })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Summarizes the difference between two versions of a page.
    ///
    /// `removed` and `added` are capped independently before sending. Returns
    /// `Ok(None)` without calling the model when both are blank.
    ///
    /// # Errors
    ///
    /// Returns [`SummarizerError::Overloaded`] when the service reports overload.
    pub async fn summarize_diff(
        &self,
        removed: &str,
        added: &str,
    ) -> Result<Option<ChangeSummary>, SummarizerError> {
        if removed.trim().is_empty() && added.trim().is_empty() {
            return Ok(None);
        }
        let removed = cap_chars(removed, DIFF_EXCERPT_CHARS);
        let added = cap_chars(added, DIFF_EXCERPT_CHARS);
        let source = format!("{removed}\n{added}");
        self.summarize(&diff_prompt(removed, added), &source).await
    }

    /// Summarizes a page seen for the first time.
    ///
    /// # Errors
    ///
    /// Returns [`SummarizerError::Overloaded`] when the service reports overload.
    pub async fn summarize_baseline(
        &self,
        page: &str,
    ) -> Result<Option<ChangeSummary>, SummarizerError> {
        if page.trim().is_empty() {
            return Ok(None);
        }
        let page = cap_chars(page, BASELINE_EXCERPT_CHARS);
        self.summarize(&baseline_prompt(page), page).await
    }

    async fn summarize(
        &self,
        user_prompt: &str,
        source: &str,
    ) -> Result<Option<ChangeSummary>, SummarizerError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            response_format: response_format(),
        };

        let attempt = retry_with_backoff(&self.policy, || self.request_once(&request));
        let outcome = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(SummarizerError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(payload) => Ok(finish(payload, source)),
            Err(err @ SummarizerError::Overloaded { .. }) => {
                tracing::warn!(error = %err, "summarizer overloaded");
                Err(err)
            }
            Err(err) => {
                tracing::warn!(error = %err, "summarizer unavailable, continuing without summary");
                Ok(None)
            }
        }
    }

    async fn request_once(&self, request: &ChatRequest<'_>) -> Result<SummaryPayload, SummarizerError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            return parse_completion(&body);
        }

        let suggested = retry_after_from_headers(response.headers());
        let body = response.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SummarizerError::RateLimited {
                retry_after: suggested.or_else(|| retry_after_from_body(&body)),
            });
        }

        let overloaded_type = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|e| e.error)
            .and_then(|e| e.kind)
            .is_some_and(|kind| kind.to_ascii_lowercase().contains("overloaded"));

        if status.as_u16() == 503 || status.as_u16() == 529 || overloaded_type {
            return Err(SummarizerError::Overloaded {
                status: status.as_u16(),
            });
        }

        Err(SummarizerError::UnexpectedStatus {
            status: status.as_u16(),
            body: cap_chars(&body, 500).to_owned(),
        })
    }
}

fn parse_completion(body: &str) -> Result<SummaryPayload, SummarizerError> {
    let completion: ChatResponse =
        serde_json::from_str(body).map_err(|e| SummarizerError::Deserialize {
            context: "chat completion".to_owned(),
            source: e,
        })?;

    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(SummarizerError::EmptyResponse)?;

    serde_json::from_str(&content).map_err(|e| SummarizerError::Deserialize {
        context: "summary payload".to_owned(),
        source: e,
    })
}

fn finish(payload: SummaryPayload, source: &str) -> Option<ChangeSummary> {
    let summary = payload.summary.trim();
    if summary.is_empty() {
        return None;
    }
    Some(ChangeSummary {
        summary: summary.to_owned(),
        citations: filter_citations(payload.citations, source),
    })
}

fn retry_after_from_headers(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let header_f64 = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.min(MAX_SUGGESTED_SECS * 1000.0))
    };

    header_f64("retry-after-ms")
        .map(|ms| Duration::from_secs_f64(ms / 1000.0))
        .or_else(|| header_f64("retry-after").map(|s| Duration::from_secs_f64(s.min(MAX_SUGGESTED_SECS))))
}

fn retry_after_from_body(body: &str) -> Option<Duration> {
    let caps = TRY_AGAIN_IN.captures(body)?;
    let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let secs = if caps.get(2)?.as_str().eq_ignore_ascii_case("ms") {
        value / 1000.0
    } else {
        value
    };
    Some(Duration::from_secs_f64(secs.min(MAX_SUGGESTED_SECS)))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
