//! Security headers middleware for HTTP responses.
//!
//! Applies the hardening headers a helmet-style stack sets by default, driven by the
//! `[security]` configuration section.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::{AppConfig, SecurityConfig};

const DEFAULT_CSP: &str = "default-src 'self'; base-uri 'self'; font-src 'self' https: data:; \
form-action 'self'; frame-ancestors 'self'; img-src 'self' data:; object-src 'none'; \
script-src 'self'; style-src 'self' https: 'unsafe-inline'; upgrade-insecure-requests";

/// Adds security-related HTTP headers to all responses.
///
/// When `security.helmet_enabled` is off only the cache policy for JSON responses is
/// applied. `Strict-Transport-Security` is sent when `hsts_max_age` is set, and
/// `security.csp` replaces the default content security policy.
pub async fn security_headers_middleware(
    State(cfg): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();

    if cfg.security.helmet_enabled {
        apply_helmet(headers, &cfg.security);
    }

    // API responses must never be served from a cache
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .is_some_and(|s| s.starts_with("application/json"));
    if is_json {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    }

    res
}

fn apply_helmet(headers: &mut HeaderMap, sec: &SecurityConfig) {
    const FIXED: [(&str, &str); 10] = [
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "SAMEORIGIN"),
        ("referrer-policy", "no-referrer"),
        ("cross-origin-opener-policy", "same-origin"),
        ("cross-origin-resource-policy", "same-origin"),
        ("origin-agent-cluster", "?1"),
        ("x-dns-prefetch-control", "off"),
        ("x-download-options", "noopen"),
        ("x-permitted-cross-domain-policies", "none"),
        ("x-xss-protection", "0"),
    ];
    for (name, value) in FIXED {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    let csp = sec.csp.as_deref().map(str::trim).filter(|c| !c.is_empty()).unwrap_or(DEFAULT_CSP);
    match HeaderValue::from_str(csp) {
        Ok(val) => {
            headers.insert(HeaderName::from_static("content-security-policy"), val);
        }
        Err(e) => tracing::warn!("Ignoring invalid content security policy: {}", e),
    }

    if let Some(max_age) = sec.hsts_max_age {
        let value = format!("max-age={}; includeSubDomains", max_age);
        if let Ok(val) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static("strict-transport-security"), val);
        }
    }

    headers.remove(HeaderName::from_static("x-powered-by"));
}
