//! Upstream page fetch.
//!
//! # Responsibilities
//! - GET the target page with a bounded timeout and identifying user agent
//! - Screen every redirect hop with the URL validator
//! - Connect only to screened addresses when pinning is enabled
//! - Read at most `max_body_bytes` of the body
//! - Classify failures into the outward error taxonomy

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;
use thiserror::Error;
use url::Url;

use crate::config::{DnsConfig, FetchConfig};
use crate::security::dns_guard::{DnsGuard, GuardError};
use crate::security::pinning::{PinTable, PinnedResolver};
use crate::security::url_guard::check_url;

/// Failures of the upstream fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream responded with {0}")]
    Status(reqwest::StatusCode),

    #[error("upstream request timed out")]
    Timeout,

    #[error("host {0} not found")]
    HostNotFound(String),

    #[error("redirect rejected: {0}")]
    Redirect(String),

    #[error("upstream host blocked at connect time")]
    Blocked(#[source] GuardError),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// HTTP client wrapper used for every upstream GET.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    pins: Option<PinTable>,
    max_body_bytes: usize,
}

impl Fetcher {
    pub fn new(config: &FetchConfig, dns: &DnsConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            // A proxy would resolve names itself and bypass the pins.
            .no_proxy()
            .redirect(redirect_policy(config.max_redirects));

        let pins = if config.pin_resolved_addresses {
            let pins = PinTable::new();
            let resolver = PinnedResolver::new(pins.clone(), DnsGuard::new(dns));
            builder = builder.dns_resolver(Arc::new(resolver));
            Some(pins)
        } else {
            None
        };

        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self {
            client,
            pins,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// GET `target` and return its body as text.
    ///
    /// `screened` is the address set the DNS guard accepted for the target
    /// host; with pinning enabled the connection is restricted to it.
    pub async fn fetch_page(&self, target: &Url, screened: &[SocketAddr]) -> Result<String, FetchError> {
        let host = target.host_str().unwrap_or_default().to_string();
        let _pin = match (&self.pins, screened.is_empty()) {
            (Some(pins), false) => Some(pins.pin(&host, screened.to_vec())),
            _ => None,
        };

        let mut response = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(|e| classify(e, &host))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Body(e.to_string())
            }
        })? {
            let room = self.max_body_bytes - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                tracing::debug!(url = %target, limit = self.max_body_bytes, "Body truncated at limit");
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            attempt.error(format!("more than {max_redirects} redirects"))
        } else if let Err(e) = check_url(attempt.url()) {
            tracing::warn!(url = %attempt.url(), error = %e, "Blocked redirect target");
            attempt.error(e)
        } else {
            attempt.follow()
        }
    })
}

/// Map a client error onto the fetch taxonomy.
fn classify(err: reqwest::Error, host: &str) -> FetchError {
    if err.is_timeout() {
        return FetchError::Timeout;
    }
    if err.is_redirect() {
        let reason = err
            .source()
            .map(ToString::to_string)
            .unwrap_or_else(|| err.to_string());
        return FetchError::Redirect(reason);
    }
    if let Some(guard) = find_source::<GuardError>(&err) {
        return match guard {
            GuardError::PrivateAddress { host, address } => {
                FetchError::Blocked(GuardError::PrivateAddress {
                    host: host.clone(),
                    address: *address,
                })
            }
            GuardError::Resolution { host, .. } | GuardError::Timeout { host, .. } => {
                FetchError::HostNotFound(host.clone())
            }
        };
    }
    if err.is_connect() && is_dns_failure(&err) {
        return FetchError::HostNotFound(host.to_string());
    }
    FetchError::Transport(err)
}

fn find_source<'a, T: StdError + 'static>(err: &'a (dyn StdError + 'static)) -> Option<&'a T> {
    let mut current = err.source();
    while let Some(e) = current {
        if let Some(found) = e.downcast_ref::<T>() {
            return Some(found);
        }
        current = e.source();
    }
    None
}

/// The system resolver path reports lookup failures as "dns error".
fn is_dns_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = err.source();
    while let Some(e) = current {
        if e.to_string().starts_with("dns error") {
            return true;
        }
        current = e.source();
    }
    false
}
