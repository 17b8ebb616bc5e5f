//! Favicon resolution pipeline.
//!
//! # Data Flow
//! ```text
//! raw `url` parameter
//!     → security::url_guard (syntactic rejection)
//!     → security::dns_guard (resolve, reject disallowed addresses)
//!     → fetch.rs (GET with timeout, pinned to screened addresses)
//!     → extract.rs (find link tag, absolutize)
//!     → absolute favicon URL
//! ```
//!
//! # Design Decisions
//! - Each step returns a tagged error; the HTTP layer maps them to codes
//! - No retries: every failure is terminal for the request
//! - Nothing is cached between requests

pub mod extract;
pub mod fetch;

use thiserror::Error;

use crate::config::ServiceConfig;
use crate::security::dns_guard::{DnsGuard, GuardError};
use crate::security::url_guard::{validate_target, ValidationError};

pub use extract::{absolutize, extract_favicon, find_icon_href, DEFAULT_FAVICON_PATH};
pub use fetch::{FetchError, Fetcher};

/// Failure at any stage of the pipeline.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Validator, DNS guard and fetcher wired together.
#[derive(Debug, Clone)]
pub struct FaviconResolver {
    guard: DnsGuard,
    fetcher: Fetcher,
}

impl FaviconResolver {
    pub fn new(config: &ServiceConfig) -> Result<Self, FetchError> {
        Ok(Self {
            guard: DnsGuard::new(&config.dns),
            fetcher: Fetcher::new(&config.fetch, &config.dns)?,
        })
    }

    /// Resolve the favicon of the page at `raw`.
    pub async fn resolve(&self, raw: &str) -> Result<String, ResolveError> {
        let target = validate_target(raw)?;
        let host = target.host_str().unwrap_or_default();
        let port = target.port_or_known_default().unwrap_or(80);

        let screened = self.guard.check(host, port).await?;
        let html = self.fetcher.fetch_page(&target, &screened).await?;

        let favicon = extract_favicon(&html, &target);
        tracing::debug!(target = %target, favicon = %favicon, "Favicon resolved");
        Ok(favicon)
    }
}
