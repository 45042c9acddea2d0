use axum::{
    extract::{connect_info::ConnectInfo, Request},
    http::HeaderMap,
};
use std::net::{IpAddr, SocketAddr};

/// Identifier shared by every client whose address cannot be resolved.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Extract client IP from proxy headers, falling back to the transport address.
pub fn extract_ip_from_headers(headers: &HeaderMap, fallback: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(h) = headers.get("x-forwarded-for").and_then(|hv| hv.to_str().ok()) {
        if let Some(first) = h.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    if let Some(h) = headers.get("x-real-ip").and_then(|hv| hv.to_str().ok()) {
        if let Ok(ip) = h.trim().parse::<IpAddr>() {
            return Some(ip);
        }
    }
    fallback
}

/// The rate-limit identity of a request.
///
/// Uses the peer address from `ConnectInfo`; proxy headers are only consulted when
/// `trust_proxy` is set. Unresolvable clients all map to [`UNKNOWN_CLIENT`].
pub fn client_identifier(req: &Request, trust_proxy: bool) -> String {
    let remote_ip = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    let ip = if trust_proxy { extract_ip_from_headers(req.headers(), remote_ip) } else { remote_ip };
    match ip {
        Some(ip) => ip.to_string(),
        None => {
            tracing::debug!("No client address resolvable, using shared '{}' identifier", UNKNOWN_CLIENT);
            UNKNOWN_CLIENT.to_string()
        }
    }
}
