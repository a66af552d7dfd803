//! The single global exemption window
//!
//! One deadline applies to every host, not just the one that asked for it.
//! A new grant always replaces the deadline; it never extends the time left.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::FokusError;
use crate::store::{keys, save, Store, StoreError};

/// Deadline of a cleared window.
pub const EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Owns `exemptUntil_global`.
pub struct ExemptionWindow<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> ExemptionWindow<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Stored deadline, or the epoch when absent, unreadable or malformed.
    ///
    /// Accepts an ISO-8601 string, or a number of epoch milliseconds as
    /// older clients wrote when clearing the window.
    pub async fn exempt_until(&self) -> DateTime<Utc> {
        let raw = match self.store.get(keys::EXEMPT_UNTIL).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("{e}; treating exemption as cleared");
                return EPOCH;
            }
        };

        match raw {
            None | Some(Value::Null) => EPOCH,
            Some(Value::String(s)) => match DateTime::parse_from_rfc3339(&s) {
                Ok(at) => at.with_timezone(&Utc),
                Err(e) => {
                    log::warn!("unparseable exemption deadline '{s}': {e}");
                    EPOCH
                }
            },
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .unwrap_or(EPOCH),
            Some(other) => {
                log::warn!("malformed exemption deadline {other}");
                EPOCH
            }
        }
    }

    /// Open the window until `now + duration`, replacing any open window.
    ///
    /// The duration must be positive and the deadline representable; nothing
    /// is written otherwise.
    pub async fn grant(&self, now: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>, FokusError> {
        let until = deadline(now, duration)?;
        save(self.store, keys::EXEMPT_UNTIL, &format_timestamp(until)).await?;
        log::debug!("exemption granted until {until}");
        Ok(until)
    }

    /// Close the window.
    pub async fn clear(&self) -> Result<(), StoreError> {
        save(self.store, keys::EXEMPT_UNTIL, &format_timestamp(EPOCH)).await?;
        log::debug!("exemption cleared");
        Ok(())
    }

    pub async fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.exempt_until().await > now
    }

    /// Whole seconds left; zero or negative means inactive.
    pub async fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        remaining_between(self.exempt_until().await, now)
    }
}

/// `now + duration`, rejecting non-positive and out-of-range durations.
pub fn deadline(now: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>, FokusError> {
    if duration <= Duration::zero() {
        return Err(FokusError::InvalidDuration(format!(
            "{}s is not positive",
            duration.num_seconds()
        )));
    }
    now.checked_add_signed(duration)
        .ok_or_else(|| FokusError::InvalidDuration(format!("{}s is out of range", duration.num_seconds())))
}

/// Whole seconds as a duration, without panicking on huge values.
pub fn duration_from_secs(secs: i64) -> Result<Duration, FokusError> {
    Duration::try_seconds(secs).ok_or_else(|| FokusError::InvalidDuration(format!("{secs}s is out of range")))
}

/// `floor((until - now) / 1s)`.
pub fn remaining_between(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (until - now).num_milliseconds().div_euclid(1000)
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_default_is_epoch() {
        let store = MemoryStore::new();
        let window = ExemptionWindow::new(&store);
        assert_eq!(window.exempt_until().await, EPOCH);
        assert!(!window.is_active(t0()).await);
    }

    #[tokio::test]
    async fn test_grant_replaces_instead_of_extending() {
        let store = MemoryStore::new();
        let window = ExemptionWindow::new(&store);

        window.grant(t0(), Duration::seconds(60)).await.unwrap();
        let later = t0() + Duration::seconds(5);
        window.grant(later, Duration::seconds(10)).await.unwrap();

        assert_eq!(window.exempt_until().await, t0() + Duration::seconds(15));
        assert_eq!(window.remaining_seconds(later).await, 10);
    }

    #[tokio::test]
    async fn test_stored_as_iso_string() {
        let store = MemoryStore::new();
        let window = ExemptionWindow::new(&store);
        window.grant(t0(), Duration::seconds(300)).await.unwrap();
        assert_eq!(store.raw(keys::EXEMPT_UNTIL), Some(json!("2024-05-04T09:05:00.000Z")));

        window.clear().await.unwrap();
        assert_eq!(store.raw(keys::EXEMPT_UNTIL), Some(json!("1970-01-01T00:00:00.000Z")));
        assert!(!window.is_active(t0()).await);
    }

    #[tokio::test]
    async fn test_remaining_floors() {
        let store = MemoryStore::new();
        let window = ExemptionWindow::new(&store);
        window.grant(t0(), Duration::seconds(300)).await.unwrap();

        assert_eq!(window.remaining_seconds(t0() + Duration::milliseconds(1)).await, 299);
        assert_eq!(window.remaining_seconds(t0() + Duration::seconds(1)).await, 299);
        assert_eq!(window.remaining_seconds(t0() + Duration::seconds(300)).await, 0);
        assert_eq!(window.remaining_seconds(t0() + Duration::milliseconds(300_500)).await, -1);
    }

    #[tokio::test]
    async fn test_legacy_numeric_values() {
        let store = MemoryStore::new().with_value(keys::EXEMPT_UNTIL, json!(0));
        assert_eq!(ExemptionWindow::new(&store).exempt_until().await, EPOCH);

        let millis = t0().timestamp_millis();
        let store = MemoryStore::new().with_value(keys::EXEMPT_UNTIL, json!(millis));
        assert_eq!(ExemptionWindow::new(&store).exempt_until().await, t0());
    }

    #[tokio::test]
    async fn test_malformed_is_inactive() {
        let store = MemoryStore::new().with_value(keys::EXEMPT_UNTIL, json!("tomorrow-ish"));
        assert!(!ExemptionWindow::new(&store).is_active(t0()).await);

        let store = MemoryStore::new().with_value(keys::EXEMPT_UNTIL, json!([1, 2]));
        assert!(!ExemptionWindow::new(&store).is_active(t0()).await);
    }

    #[tokio::test]
    async fn test_grant_rejects_unusable_durations() {
        let store = MemoryStore::new();
        let window = ExemptionWindow::new(&store);
        window.grant(t0(), Duration::seconds(60)).await.unwrap();

        for duration in [
            Duration::zero(),
            Duration::seconds(-5),
            Duration::seconds(9_000_000_000_000),
            Duration::days(100_000_000),
        ] {
            let err = window.grant(t0(), duration).await.unwrap_err();
            assert!(matches!(err, FokusError::InvalidDuration(_)), "{err}");
        }
        assert_eq!(window.exempt_until().await, t0() + Duration::seconds(60));
    }

    #[test]
    fn test_duration_from_secs_bounds() {
        assert_eq!(duration_from_secs(90).unwrap(), Duration::seconds(90));
        assert!(duration_from_secs(i64::MAX).is_err());
        assert!(duration_from_secs(i64::MIN).is_err());
    }

    #[tokio::test]
    async fn test_unavailable_is_inactive() {
        let store = MemoryStore::new();
        ExemptionWindow::new(&store).grant(t0(), Duration::seconds(60)).await.unwrap();
        store.set_unavailable(true);
        assert!(!ExemptionWindow::new(&store).is_active(t0()).await);
    }
}
