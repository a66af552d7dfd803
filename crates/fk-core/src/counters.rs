//! Per-day block and exemption tallies
//!
//! Counters reset lazily: whenever the stored `date` differs from today both
//! maps are emptied before use. There is no background job. A pure read does
//! not write the reset back; the next increment persists it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{keys, load_or_default, save, Store, StoreError};
use crate::url::Host;

/// Persisted shape of `blockCounts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTally {
    /// `YYYY-MM-DD` (UTC) the tallies belong to
    #[serde(default)]
    pub date: String,
    /// Host -> times blocked
    #[serde(default)]
    pub hosts: BTreeMap<String, u64>,
    /// Host -> exemptions granted
    #[serde(default)]
    pub exemptions: BTreeMap<String, u64>,
}

impl DailyTally {
    fn empty(date: String) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    /// Block tallies, highest count first, ties by host.
    pub fn ranked_hosts(&self) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> = self.hosts.iter().map(|(h, c)| (h.clone(), *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    pub fn total_blocks(&self) -> u64 {
        self.hosts.values().sum()
    }

    pub fn total_exemptions(&self) -> u64 {
        self.exemptions.values().sum()
    }
}

/// Calendar day key for `now`.
pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Owns `blockCounts`.
pub struct DailyCounters<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> DailyCounters<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Today's tallies; stale days are never observed.
    pub async fn snapshot(&self, now: DateTime<Utc>) -> DailyTally {
        let today = day_key(now);
        let tally: DailyTally = load_or_default(self.store, keys::BLOCK_COUNTS, DailyTally::default()).await;
        if tally.date == today {
            return tally;
        }

        if !tally.date.is_empty() {
            log::debug!("daily counters rolled over from {} to {today}", tally.date);
        }
        DailyTally::empty(today)
    }

    /// Count one block of `host`; returns today's total for it.
    pub async fn record_block(&self, host: &Host, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tally = self.snapshot(now).await;
        let count = bump(&mut tally.hosts, host);
        save(self.store, keys::BLOCK_COUNTS, &tally).await?;
        Ok(count)
    }

    /// Count one exemption granted from `host`; returns today's total for it.
    pub async fn record_exemption(&self, host: &Host, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tally = self.snapshot(now).await;
        let count = bump(&mut tally.exemptions, host);
        save(self.store, keys::BLOCK_COUNTS, &tally).await?;
        Ok(count)
    }
}

fn bump(map: &mut BTreeMap<String, u64>, host: &Host) -> u64 {
    let count = map.entry(host.as_str().to_string()).or_insert(0);
    *count += 1;
    *count
}
