//! DNS resolver for the upstream client that only hands out screened addresses.
//!
//! Addresses the DNS guard already accepted are pinned per host for the
//! duration of a fetch. Any other host the client needs (redirect targets)
//! is resolved and screened on the spot, so the client never connects to an
//! address the guard has not seen.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};

use crate::security::dns_guard::DnsGuard;

/// Screened addresses for one host and the number of fetches holding them.
#[derive(Debug)]
struct Pin {
    addrs: Vec<SocketAddr>,
    holders: usize,
}

/// Host → screened addresses, shared with the fetcher.
///
/// Concurrent fetches of the same host share one entry: their screened sets
/// are merged and the entry lives until the last fetch releases it.
#[derive(Debug, Clone, Default)]
pub struct PinTable {
    inner: Arc<DashMap<String, Pin>>,
}

impl PinTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `addrs` for `host` until the returned guard is dropped.
    pub fn pin(&self, host: &str, addrs: Vec<SocketAddr>) -> PinGuard {
        let mut pin = self.inner.entry(host.to_string()).or_insert_with(|| Pin {
            addrs: Vec::with_capacity(addrs.len()),
            holders: 0,
        });
        pin.holders += 1;
        for addr in addrs {
            if !pin.addrs.contains(&addr) {
                pin.addrs.push(addr);
            }
        }
        drop(pin);

        PinGuard {
            table: self.clone(),
            host: host.to_string(),
        }
    }

    pub fn get(&self, host: &str) -> Option<Vec<SocketAddr>> {
        self.inner.get(host).map(|pin| pin.addrs.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn release(&self, host: &str) {
        if let Entry::Occupied(mut pin) = self.inner.entry(host.to_string()) {
            pin.get_mut().holders -= 1;
            if pin.get().holders == 0 {
                pin.remove();
            }
        }
    }
}

/// Releases a pin when the fetch that needed it finishes.
#[derive(Debug)]
pub struct PinGuard {
    table: PinTable,
    host: String,
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        self.table.release(&self.host);
    }
}

/// `reqwest` resolver backed by the pin table, falling back to the DNS guard.
#[derive(Debug, Clone)]
pub struct PinnedResolver {
    pins: PinTable,
    guard: DnsGuard,
}

impl PinnedResolver {
    pub fn new(pins: PinTable, guard: DnsGuard) -> Self {
        Self { pins, guard }
    }
}

impl Resolve for PinnedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let pinned = self.pins.get(name.as_str());
        Box::pin(resolve_screened(name, pinned, self.guard.clone()))
    }
}

async fn resolve_screened(
    name: Name,
    pinned: Option<Vec<SocketAddr>>,
    guard: DnsGuard,
) -> Result<Addrs, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(addrs) = pinned {
        return Ok(Box::new(addrs.into_iter()));
    }

    let host = name.as_str();
    tracing::debug!(host = %host, "Screening unpinned host at connect time");
    // reqwest replaces the port with the one from the URL.
    let addrs = guard.check(host, 0).await?;
    Ok(Box::new(addrs.into_iter()))
}
