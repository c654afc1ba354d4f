use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

const ANONYMOUS_CALLER: &str = "anonymous";

/// Sliding-window limiter keyed by caller identity.
///
/// Each caller keeps the instants of its admitted requests within the last
/// `window`; a request is rejected once `max_requests` of them remain.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    callers: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            callers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Records a request from `caller` at `now` if it fits in the window.
    pub(crate) async fn admit(&self, caller: &str, now: Instant) -> bool {
        let mut callers = self.callers.lock().await;

        // Drop callers whose whole history has aged out.
        callers.retain(|_, hits| {
            hits.back()
                .is_some_and(|last| now.saturating_duration_since(*last) < self.window)
        });

        let hits = callers.entry(caller.to_owned()).or_default();
        while hits
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push_back(now);
        true
    }
}

/// Caller identity: first `x-forwarded-for` entry, then `x-real-ip`.
pub(crate) fn caller_identity(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(ANONYMOUS_CALLER)
        .to_owned()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing the per-caller request limit.
///
/// Must run inside [`request_id`] so rejections carry the request's ID.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let caller = caller_identity(req.headers());

    if !rate_limit.admit(&caller, Instant::now()).await {
        let rid = req
            .extensions()
            .get::<RequestId>()
            .map_or_else(String::new, |r| r.0.clone());
        tracing::warn!(caller = %caller, "check rate limit exceeded");
        return ApiError::new(
            rid,
            "rate_limited",
            "too many check requests; try again later",
        )
        .into_response();
    }

    next.run(req).await
}
