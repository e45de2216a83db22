//! Client IP extraction for abuse limiting.

use axum::http::HeaderMap;
use std::net::SocketAddr;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Resolves the client IP used as the abuse-limiter key.
///
/// With `behind_proxy` set, the first `X-Forwarded-For` entry wins, then
/// `X-Real-IP`; otherwise, and as a fallback, the socket peer address is used.
/// Forwarded headers are ignored without `behind_proxy` since any client can
/// set them.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, behind_proxy: bool) -> String {
    if behind_proxy {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    peer.ip().to_string()
}
