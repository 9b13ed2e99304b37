//! Whether a live channel may be opened at all.
//!
//! A non-development build never opens a channel to a loopback backend.
//! The check is per `open()`; REST calls are unaffected.

#[cfg(test)]
#[path = "policy_test.rs"]
mod policy_test;

use std::net::IpAddr;

use reqwest::Url;

use crate::config::Mode;

/// `true` unless a non-development build targets a loopback backend.
#[must_use]
pub fn should_connect(mode: Mode, base_url: &str) -> bool {
    mode.is_development() || !is_loopback_url(base_url)
}

/// Host of `base_url` is `localhost`, `*.localhost`, `127.0.0.0/8` or `::1`.
/// Unparseable URLs are not loopback.
#[must_use]
pub fn is_loopback_url(base_url: &str) -> bool {
    Url::parse(base_url.trim())
        .ok()
        .and_then(|url| url.host_str().map(is_loopback_host))
        .unwrap_or(false)
}

#[must_use]
pub fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback();
    }
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host == "localhost" || host.ends_with(".localhost")
}
