//! Decision Engine
//!
//! Combines the exemption window, the enable flag and the block list into a
//! [`Decision`]. Evaluation reads the store and nothing else; it has no side
//! effects and never fails.
//!
//! Precedence:
//!
//! ```text
//! exemption open            -> Exempt   (every host)
//! enabled && pattern match  -> Blocked
//! otherwise                 -> Allowed
//! ```

use chrono::{DateTime, Utc};

use crate::exemption::{remaining_between, ExemptionWindow};
use crate::policy::{matches_any, BlockListPolicy};
use crate::store::Store;
use crate::types::Decision;
use crate::url::Host;

/// A decision plus the exemption time left when it is `Exempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: Decision,
    /// Whole seconds of exemption left; 0 unless `decision` is `Exempt`.
    pub remaining_secs: i64,
}

/// Evaluates persisted policy for a host at an instant.
pub struct DecisionEngine<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> DecisionEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn decide(&self, host: &Host, now: DateTime<Utc>) -> Decision {
        self.evaluate(host, now).await.decision
    }

    pub async fn evaluate(&self, host: &Host, now: DateTime<Utc>) -> Evaluation {
        let exempt_until = ExemptionWindow::new(self.store).exempt_until().await;
        if exempt_until > now {
            return Evaluation {
                decision: Decision::Exempt,
                remaining_secs: remaining_between(exempt_until, now),
            };
        }

        let policy = BlockListPolicy::new(self.store);
        let enabled = policy.is_enabled().await;
        let patterns = if enabled { policy.hosts().await } else { Vec::new() };

        Evaluation {
            decision: resolve(exempt_until, enabled, &patterns, host, now),
            remaining_secs: 0,
        }
    }
}

/// The decision rule over already-loaded state.
pub fn resolve<P: AsRef<str>>(
    exempt_until: DateTime<Utc>,
    enabled: bool,
    patterns: &[P],
    host: &Host,
    now: DateTime<Utc>,
) -> Decision {
    if exempt_until > now {
        Decision::Exempt
    } else if enabled && matches_any(patterns, host.as_str()) {
        Decision::Blocked
    } else {
        Decision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exemption::EPOCH;
    use crate::store::{keys, MemoryStore};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn blocking(hosts: &[&str]) -> MemoryStore {
        MemoryStore::new()
            .with_value(keys::BLOCKED_HOSTS, json!(hosts))
            .with_value(keys::BLOCKING_ENABLED, json!(true))
    }

    #[tokio::test]
    async fn test_allowed_by_default() {
        let store = MemoryStore::new();
        let engine = DecisionEngine::new(&store);
        assert_eq!(engine.decide(&Host::parse("example.com"), now()).await, Decision::Allowed);
    }

    #[tokio::test]
    async fn test_blocked_requires_enabled() {
        let store = blocking(&["example.com"]);
        let engine = DecisionEngine::new(&store);
        assert_eq!(engine.decide(&Host::parse("example.com"), now()).await, Decision::Blocked);
        assert_eq!(engine.decide(&Host::parse("other.org"), now()).await, Decision::Allowed);

        store.set(keys::BLOCKING_ENABLED, json!(false)).await.unwrap();
        assert_eq!(engine.decide(&Host::parse("example.com"), now()).await, Decision::Allowed);
    }

    #[tokio::test]
    async fn test_exemption_overrides_every_host() {
        let store = blocking(&["example.com"]);
        ExemptionWindow::new(&store)
            .grant(now(), Duration::seconds(60))
            .await
            .unwrap();
        let engine = DecisionEngine::new(&store);

        for host in ["example.com", "never-listed.net", ""] {
            let eval = engine.evaluate(&Host::parse(host), now() + Duration::seconds(1)).await;
            assert_eq!(eval.decision, Decision::Exempt);
            assert_eq!(eval.remaining_secs, 59);
        }

        let after = now() + Duration::seconds(60);
        assert_eq!(engine.decide(&Host::parse("example.com"), after).await, Decision::Blocked);
    }

    #[tokio::test]
    async fn test_storage_failure_allows() {
        let store = blocking(&["example.com"]);
        store.set_unavailable(true);
        let engine = DecisionEngine::new(&store);
        assert_eq!(engine.decide(&Host::parse("example.com"), now()).await, Decision::Allowed);
    }

    #[test]
    fn test_resolve_precedence() {
        let host = Host::parse("sub.example.com");
        let open = now() + Duration::seconds(1);
        assert_eq!(resolve(open, true, &["example"], &host, now()), Decision::Exempt);
        assert_eq!(resolve(EPOCH, true, &["example"], &host, now()), Decision::Blocked);
        assert_eq!(resolve(EPOCH, false, &["example"], &host, now()), Decision::Allowed);
        assert_eq!(resolve(now(), true, &["example"], &host, now()), Decision::Blocked);
    }
}
