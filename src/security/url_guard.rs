//! Syntactic validation of target URLs.
//!
//! Only rejects what can be decided from the URL text. Hostnames that are not
//! IP literals pass through and are screened by the DNS guard.

use thiserror::Error;
use url::{Host, Url};

use crate::security::address::is_disallowed_ip;

/// Reasons a target URL is rejected before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("not an absolute URL: {0}")]
    Unparseable(#[from] url::ParseError),

    #[error("scheme {0:?} is not allowed")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("host {0:?} is a loopback name")]
    LoopbackHost(String),

    #[error("host {0} is a private or reserved address")]
    PrivateAddress(std::net::IpAddr),
}

/// Parse and validate a caller-supplied target URL.
pub fn validate_target(raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw.trim())?;
    check_url(&url)?;
    Ok(url)
}

/// Validate an already parsed URL. Also applied to redirect targets.
pub fn check_url(url: &Url) -> Result<(), ValidationError> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
    }

    match url.host() {
        None => Err(ValidationError::MissingHost),
        Some(Host::Domain(domain)) => {
            if domain.trim_end_matches('.').eq_ignore_ascii_case("localhost") {
                Err(ValidationError::LoopbackHost(domain.to_string()))
            } else {
                Ok(())
            }
        }
        Some(Host::Ipv4(v4)) if is_disallowed_ip(v4.into()) => {
            Err(ValidationError::PrivateAddress(v4.into()))
        }
        Some(Host::Ipv6(v6)) if is_disallowed_ip(v6.into()) => {
            Err(ValidationError::PrivateAddress(v6.into()))
        }
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_public_targets() {
        for raw in [
            "https://example.com",
            "http://example.com/path?q=1",
            "HTTPS://Example.COM:8443/",
            "http://8.8.8.8/",
            "http://[2606:4700:4700::1111]/",
        ] {
            assert!(validate_target(raw).is_ok(), "{raw} should be accepted");
        }
    }

    #[test]
    fn test_rejects_unparseable() {
        for raw in ["", "not a url", "example.com", "/relative/path"] {
            assert!(
                matches!(validate_target(raw), Err(ValidationError::Unparseable(_))),
                "{raw:?} should be unparseable"
            );
        }
    }

    #[test]
    fn test_rejects_other_schemes() {
        for raw in ["ftp://example.com", "file:///etc/passwd", "gopher://example.com", "javascript:alert(1)"] {
            assert!(
                matches!(validate_target(raw), Err(ValidationError::UnsupportedScheme(_))),
                "{raw} should be rejected by scheme"
            );
        }
    }

    #[test]
    fn test_rejects_loopback_tokens() {
        assert!(matches!(
            validate_target("http://localhost:3000/"),
            Err(ValidationError::LoopbackHost(_))
        ));
        assert!(matches!(
            validate_target("http://LOCALHOST./"),
            Err(ValidationError::LoopbackHost(_))
        ));
        for raw in ["http://127.0.0.1/", "http://0.0.0.0/", "http://[::1]/"] {
            assert!(
                matches!(validate_target(raw), Err(ValidationError::PrivateAddress(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_private_literals() {
        for raw in [
            "http://10.1.2.3/",
            "http://172.16.0.1/",
            "http://172.31.255.254/",
            "http://192.168.0.10/",
            "http://169.254.169.254/latest/meta-data/",
            "http://[fd12:3456::1]/",
            "http://[::ffff:192.168.0.1]/",
        ] {
            assert!(
                matches!(validate_target(raw), Err(ValidationError::PrivateAddress(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_numeric_shorthand_is_normalized() {
        // The URL parser canonicalizes these forms to dotted quads.
        assert!(validate_target("http://2130706433/").is_err());
        assert!(validate_target("http://0x7f.0.0.1/").is_err());
        assert!(validate_target("http://172.15.0.1/").is_ok());
    }
}
