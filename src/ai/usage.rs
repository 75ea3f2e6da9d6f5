//! Daily LLM call budget
//!
//! Usage is persisted as `{"date": "2024-01-15", "count": 3, "last_ts": "..."}`
//! so the cap survives restarts. A missing or unreadable file, or a record
//! from an earlier UTC day, counts as a fresh day.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Persisted usage for one UTC day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub count: u32,
    pub last_ts: Option<DateTime<Utc>>,
}

impl UsageRecord {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            date: now.date_naive(),
            count: 0,
            last_ts: None,
        }
    }
}

/// Why a call was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitReason {
    DailyCap,
    Cooldown,
}

impl fmt::Display for LimitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitReason::DailyCap => f.write_str("daily_cap"),
            LimitReason::Cooldown => f.write_str("cooldown"),
        }
    }
}

/// Outcome of a budget check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageDecision {
    Allowed,
    Limited { reason: LimitReason, wait_secs: u64 },
}

impl UsageDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, UsageDecision::Allowed)
    }
}

/// File-backed call counter with daily cap and cooldown
pub struct UsageTracker {
    path: PathBuf,
    max_calls_per_day: u32,
    cooldown: Duration,
    lock: Mutex<()>,
}

impl UsageTracker {
    pub fn new(path: impl Into<PathBuf>, max_calls_per_day: u32, cooldown_secs: u64) -> Self {
        Self {
            path: path.into(),
            max_calls_per_day,
            cooldown: Duration::seconds(cooldown_secs as i64),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current record, reset when it belongs to an earlier day
    pub fn load(&self, now: DateTime<Utc>) -> UsageRecord {
        let record = std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| serde_json::from_str::<UsageRecord>(&s).ok());

        match record {
            Some(r) if r.date == now.date_naive() => r,
            Some(_) | None => UsageRecord::fresh(now),
        }
    }

    /// Whether a call may be made at `now`
    pub fn check(&self, now: DateTime<Utc>) -> UsageDecision {
        let _guard = self.lock.lock();
        let usage = self.load(now);

        if usage.count >= self.max_calls_per_day {
            return UsageDecision::Limited {
                reason: LimitReason::DailyCap,
                wait_secs: secs_until_midnight(now),
            };
        }

        if let Some(last) = usage.last_ts {
            let elapsed = now - last;
            if elapsed < self.cooldown {
                let wait = (self.cooldown - elapsed).num_milliseconds().max(0) as u64;
                return UsageDecision::Limited {
                    reason: LimitReason::Cooldown,
                    wait_secs: wait.div_ceil(1000),
                };
            }
        }

        UsageDecision::Allowed
    }

    /// Count a call made at `now`
    pub fn record(&self, now: DateTime<Utc>) -> std::io::Result<UsageRecord> {
        let _guard = self.lock.lock();
        let mut usage = self.load(now);
        usage.count += 1;
        usage.last_ts = Some(now);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&usage).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, json)?;
        Ok(usage)
    }
}

fn secs_until_midnight(now: DateTime<Utc>) -> u64 {
    now.date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|midnight| (midnight.and_utc() - now).num_seconds().max(0) as u64)
        .unwrap_or(0)
}
