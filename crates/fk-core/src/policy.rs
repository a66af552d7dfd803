//! Block list and global enable flag
//!
//! Matching is permissive: a host is blocked when any stored
//! pattern occurs *anywhere* in it, so `example.com` also catches
//! `sub.example.com.evil.org`. Both sides are ASCII-lowercased first.

use crate::store::{keys, load_or_default, save, Store, StoreError};
use crate::types::HostOutcome;
use crate::url::Host;

/// Owns `blockedHosts` and `blockingEnabled`.
pub struct BlockListPolicy<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> BlockListPolicy<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Global enable flag. Blocking is inert until switched on.
    pub async fn is_enabled(&self) -> bool {
        load_or_default(self.store, keys::BLOCKING_ENABLED, false).await
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        save(self.store, keys::BLOCKING_ENABLED, &enabled).await?;
        log::debug!("blocking enabled set to {enabled}");
        Ok(())
    }

    /// Flip the enable flag and return the new value.
    pub async fn toggle(&self) -> Result<bool, StoreError> {
        let enabled = !self.is_enabled().await;
        self.set_enabled(enabled).await?;
        Ok(enabled)
    }

    /// Stored patterns in insertion order.
    pub async fn hosts(&self) -> Vec<String> {
        load_or_default(self.store, keys::BLOCKED_HOSTS, Vec::new()).await
    }

    pub async fn matches(&self, host: &Host) -> bool {
        matches_any(&self.hosts().await, host.as_str())
    }

    /// Append `host` unless already present, ignoring ASCII case.
    pub async fn add(&self, host: &Host) -> Result<HostOutcome, StoreError> {
        if host.is_empty() {
            return Ok(HostOutcome::Invalid);
        }

        let mut hosts = self.hosts().await;
        if hosts.iter().any(|h| h.eq_ignore_ascii_case(host.as_str())) {
            return Ok(HostOutcome::AlreadyPresent);
        }

        hosts.push(host.as_str().to_string());
        save(self.store, keys::BLOCKED_HOSTS, &hosts).await?;
        log::debug!("added {host} to block list ({} entries)", hosts.len());
        Ok(HostOutcome::Added)
    }

    /// Delete `host` if present, keeping the order of the rest.
    pub async fn remove(&self, host: &Host) -> Result<HostOutcome, StoreError> {
        let mut hosts = self.hosts().await;
        let Some(index) = hosts.iter().position(|h| h.eq_ignore_ascii_case(host.as_str())) else {
            return Ok(HostOutcome::NotPresent);
        };

        hosts.remove(index);
        save(self.store, keys::BLOCKED_HOSTS, &hosts).await?;
        log::debug!("removed {host} from block list ({} entries)", hosts.len());
        Ok(HostOutcome::Removed)
    }
}

/// True iff some non-empty pattern is a substring of `host`.
pub fn matches_any<P: AsRef<str>>(patterns: &[P], host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    patterns
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.is_empty())
        .any(|p| host.contains(&p.to_ascii_lowercase()))
}
