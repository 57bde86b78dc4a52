use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use url::{Host, Url};

/// Longest probe deadline accepted from callers (5 minutes).
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// Input rejected before any network or store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("URL is required")]
    EmptyUrl,

    #[error("URL must include scheme (http:// or https://)")]
    MissingScheme,

    #[error("Invalid scheme '{0}'. Must be http or https")]
    UnsupportedScheme(String),

    #[error("URL must have a valid host")]
    MissingHost,

    #[error("Invalid URL: {0}")]
    Malformed(#[from] url::ParseError),

    #[error("Private/local addresses are not allowed: {0}")]
    PrivateTarget(String),

    #[error("Timeout must be between 1 and {MAX_TIMEOUT_MS} ms, got {0}")]
    InvalidTimeout(u64),
}

/// Which hosts a deployment is willing to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPolicy {
    pub allow_private_targets: bool,
}

impl Default for TargetPolicy {
    fn default() -> Self {
        Self { allow_private_targets: true }
    }
}

/// Validate a site URL: absolute, http(s), with a host.
pub fn validate_site_url(raw: &str, policy: TargetPolicy) -> Result<Url, ValidationError> {
    let target = raw.trim();
    if target.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    let url = match Url::parse(target) {
        Ok(url) => url,
        // "example.com" parses as a relative reference, report the missing scheme instead
        Err(_) if !target.contains("://") => return Err(ValidationError::MissingScheme),
        Err(e) => return Err(ValidationError::Malformed(e)),
    };

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
    }

    let host = url.host().ok_or(ValidationError::MissingHost)?;
    if !policy.allow_private_targets && is_private_or_local(&host) {
        return Err(ValidationError::PrivateTarget(host.to_string()));
    }

    Ok(url)
}

/// Validate a probe deadline in milliseconds.
pub fn validate_timeout_ms(timeout_ms: u64) -> Result<u64, ValidationError> {
    if timeout_ms == 0 || timeout_ms > MAX_TIMEOUT_MS {
        return Err(ValidationError::InvalidTimeout(timeout_ms));
    }
    Ok(timeout_ms)
}

/// Loopback, private, link-local or otherwise non-public address.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => is_private_v4(&ip),
        IpAddr::V6(ip) => is_private_v6(&ip),
    }
}

fn is_private_or_local(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost"
                || domain.ends_with(".localhost")
                || domain.ends_with(".local")
                || domain.ends_with(".internal")
        }
        Host::Ipv4(ip) => is_private_v4(ip),
        Host::Ipv6(ip) => is_private_v6(ip),
    }
}

fn is_private_v4(ip: &Ipv4Addr) -> bool {
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_unspecified()
}

fn is_private_v6(ip: &Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_private_v4(&mapped);
    }
    // fc00::/7 unique local, fe80::/10 link local
    let first = ip.segments()[0];
    ip.is_loopback() || ip.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}
