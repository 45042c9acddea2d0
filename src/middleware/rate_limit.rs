use super::ip::client_identifier;
use axum::{
    extract::{Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::config::RateLimitConfig;
use crate::response::{now_iso, ApiResponse};

pub const GLOBAL_SCOPE: &str = "rate_limit";
pub const CUSTOM_SCOPE: &str = "custom_rate_limit";

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + 'static {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self { now: Arc::new(AtomicU64::new(start_millis)) }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    requests: Vec<u64>,
    reset_time: u64,
    window_ms: u64,
}

impl RateLimitEntry {
    fn prune(&mut self, now: u64) {
        let window = self.window_ms;
        // A timestamp ahead of `now` (clock skew) is kept
        self.requests.retain(|&ts| now.saturating_sub(ts) < window);
    }

    fn active_requests(&self, now: u64) -> usize {
        self.requests.iter().filter(|&&ts| now.saturating_sub(ts) < self.window_ms).count()
    }
}

/// Outcome of counting one request against a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { limit: u32, remaining: u32, reset_time: u64 },
    Limited { limit: u32, reset_time: u64, retry_after_secs: u64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStats {
    pub total_clients: usize,
    pub total_requests: usize,
    pub active_clients: usize,
}

/// Per-identifier request timestamps shared by every limiter built on it.
///
/// Each check runs its whole prune-then-append sequence under the write lock, so
/// concurrent requests from one client can never be admitted past the limit.
#[derive(Clone)]
pub struct RateLimitStore {
    entries: Arc<RwLock<HashMap<String, RateLimitEntry>>>,
    clock: Arc<dyn Clock>,
}

impl Default for RateLimitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock) -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())), clock: Arc::new(clock) }
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Counts one request for `key` against a fixed window of `window_ms`.
    pub async fn hit(&self, key: &str, max_requests: u32, window_ms: u64) -> RateLimitDecision {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().await;

        let entry = entries.entry(key.to_string()).or_insert_with(|| RateLimitEntry {
            requests: Vec::new(),
            reset_time: now + window_ms,
            window_ms,
        });
        entry.window_ms = window_ms;

        // The window snaps forward from the first request after it expired
        if now > entry.reset_time {
            entry.requests.clear();
            entry.reset_time = now + window_ms;
        }
        entry.prune(now);

        if entry.requests.len() >= max_requests as usize {
            return RateLimitDecision::Limited {
                limit: max_requests,
                reset_time: entry.reset_time,
                retry_after_secs: entry.reset_time.saturating_sub(now).div_ceil(1000),
            };
        }

        entry.requests.push(now);
        RateLimitDecision::Allowed {
            limit: max_requests,
            remaining: max_requests.saturating_sub(entry.requests.len() as u32),
            reset_time: entry.reset_time,
        }
    }

    /// Drops identifiers with no requests left in their window and an expired reset time.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.prune(now);
            !(entry.requests.is_empty() && now > entry.reset_time)
        });
        before - entries.len()
    }

    pub async fn stats(&self) -> RateLimitStats {
        let now = self.clock.now_millis();
        let entries = self.entries.read().await;
        let mut stats = RateLimitStats { total_clients: entries.len(), ..RateLimitStats::default() };
        for entry in entries.values() {
            stats.total_requests += entry.requests.len();
            if entry.active_requests(now) > 0 {
                stats.active_clients += 1;
            }
        }
        stats
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// A fixed-window limit applied per client identifier.
///
/// Limiters sharing one [`RateLimitStore`] stay independent as long as their scopes differ.
#[derive(Clone)]
pub struct RateLimiter {
    store: RateLimitStore,
    scope: Arc<str>,
    max_requests: u32,
    window_ms: u64,
    enabled: bool,
    trust_proxy: bool,
    message: Arc<str>,
}

impl RateLimiter {
    /// The application-wide limiter described by `[rate_limit]`.
    pub fn from_config(store: RateLimitStore, cfg: &RateLimitConfig, trust_proxy: bool) -> Self {
        Self {
            store,
            scope: Arc::from(GLOBAL_SCOPE),
            max_requests: cfg.max_requests,
            window_ms: cfg.window_ms,
            enabled: cfg.enabled,
            trust_proxy,
            message: Arc::from(cfg.message.as_str()),
        }
    }

    /// A per-route limit independent of the global configuration.
    pub fn custom(store: RateLimitStore, max_requests: u32, window_ms: u64) -> Self {
        Self {
            store,
            scope: Arc::from(CUSTOM_SCOPE),
            max_requests,
            window_ms,
            enabled: true,
            trust_proxy: false,
            message: Arc::from("Rate limit exceeded for this endpoint"),
        }
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = Arc::from(scope);
        self
    }

    pub fn with_trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    pub async fn check(&self, client: &str) -> RateLimitDecision {
        let key = format!("{}:{}", self.scope, client);
        self.store.hit(&key, self.max_requests, self.window_ms).await
    }

    fn rejection(&self, client: &str, reset_time: u64, retry_after_secs: u64) -> Response {
        let reset_iso = iso_from_millis(reset_time);
        tracing::debug!(client = %client, scope = %self.scope, retry_after_secs, "Rate limit exceeded");

        let mut response = ApiResponse::rate_limit_exceeded(
            &*self.message,
            Some(json!({
                "retryAfter": retry_after_secs,
                "resetTime": reset_iso,
                "limit": self.max_requests,
                "windowMs": self.window_ms,
            })),
        )
        .into_response();

        let headers = response.headers_mut();
        set_limit_headers(headers, self.max_requests, 0, &reset_iso);
        headers.insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        response
    }
}

fn iso_from_millis(millis: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis as i64)
        .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(now_iso)
}

fn set_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset_iso: &str) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
    if let Ok(v) = HeaderValue::from_str(reset_iso) {
        headers.insert(X_RATELIMIT_RESET, v);
    }
}

/// An Axum middleware enforcing a [`RateLimiter`].
///
/// A disabled limiter passes every request through untouched. Otherwise admitted
/// requests get the `X-RateLimit-*` headers on their response, and rejected ones are
/// answered here with a `429 rate_limit_exceeded` envelope and `Retry-After`.
pub async fn rate_limit_middleware(State(limiter): State<RateLimiter>, req: Request, next: Next) -> Response {
    if !limiter.enabled {
        return next.run(req).await;
    }

    let client = client_identifier(&req, limiter.trust_proxy);
    match limiter.check(&client).await {
        RateLimitDecision::Allowed { limit, remaining, reset_time } => {
            let mut response = next.run(req).await;
            set_limit_headers(response.headers_mut(), limit, remaining, &iso_from_millis(reset_time));
            response
        }
        RateLimitDecision::Limited { reset_time, retry_after_secs, .. } => {
            limiter.rejection(&client, reset_time, retry_after_secs)
        }
    }
}

/// Periodically sweeps `store` until `shutdown` is cancelled.
pub fn spawn_sweeper(store: RateLimitStore, every: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Rate limit sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = store.sweep().await;
                    if removed > 0 {
                        tracing::debug!(removed, "Swept idle rate limit entries");
                    }
                }
            }
        }
    })
}
