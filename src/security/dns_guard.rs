//! Resolution-time screening of target hosts.
//!
//! Resolves every A/AAAA record of a host through the system resolver and
//! rejects the host when any record is a disallowed address. The returned
//! addresses can be pinned into the fetch so the connection never goes to an
//! address that was not screened here.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

use crate::config::DnsConfig;
use crate::security::address::is_disallowed_ip;

/// Reasons the DNS guard rejects a host.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("failed to resolve {host}: {source}")]
    Resolution {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("resolution of {host} timed out after {timeout:?}")]
    Timeout { host: String, timeout: Duration },

    #[error("{host} resolves to disallowed address {address}")]
    PrivateAddress { host: String, address: IpAddr },
}

/// Resolves and screens target hosts.
#[derive(Debug, Clone)]
pub struct DnsGuard {
    timeout: Duration,
}

impl DnsGuard {
    pub fn new(config: &DnsConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Resolve `host` and return the screened address set.
    pub async fn check(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, GuardError> {
        // IPv6 literals arrive bracketed from `Url::host_str`.
        let bare = host.trim_start_matches('[').trim_end_matches(']');

        let lookup = tokio::net::lookup_host((bare, port));
        let addrs: Vec<SocketAddr> = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(addrs)) => addrs.collect(),
            Ok(Err(source)) => {
                return Err(GuardError::Resolution {
                    host: host.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(GuardError::Timeout {
                    host: host.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        screen_addresses(host, &addrs)?;

        tracing::debug!(host = %host, addresses = ?addrs, "Host passed DNS guard");
        Ok(addrs)
    }
}

/// Reject an address set that is empty or contains any disallowed address.
pub fn screen_addresses(host: &str, addrs: &[SocketAddr]) -> Result<(), GuardError> {
    if addrs.is_empty() {
        return Err(GuardError::Resolution {
            host: host.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses returned"),
        });
    }

    match addrs.iter().map(SocketAddr::ip).find(|ip| is_disallowed_ip(*ip)) {
        Some(address) => Err(GuardError::PrivateAddress {
            host: host.to_string(),
            address,
        }),
        None => Ok(()),
    }
}
