//! 송수신 통계.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// 카운터 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Sent,
    Received,
}

/// 통계 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub sent: u64,
    pub received: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// 송수신 카운터 + 마지막 활동 시각 (리셋 없음)
#[derive(Debug, Default)]
pub struct StatsCounter {
    sent: AtomicU64,
    received: AtomicU64,
    last_activity: RwLock<Option<DateTime<Utc>>>,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, kind: StatKind) {
        self.increment_by(kind, 1);
    }

    pub fn increment_by(&self, kind: StatKind, delta: u64) {
        let counter = match kind {
            StatKind::Sent => &self.sent,
            StatKind::Received => &self.received,
        };
        counter.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// 마지막 활동 시각 갱신
    pub fn touch(&self, at: DateTime<Utc>) {
        *self.last_activity.write() = Some(at);
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        *self.last_activity.read()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent(),
            received: self.received(),
            last_activity: self.last_activity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let stats = StatsCounter::new();
        let snap = stats.snapshot();
        assert_eq!(snap.sent, 0);
        assert_eq!(snap.received, 0);
        assert!(snap.last_activity.is_none());
    }

    #[test]
    fn increments_are_independent() {
        let stats = StatsCounter::new();
        stats.increment(StatKind::Sent);
        stats.increment(StatKind::Sent);
        stats.increment_by(StatKind::Received, 5);
        assert_eq!(stats.sent(), 2);
        assert_eq!(stats.received(), 5);
    }

    #[test]
    fn touch_records_last_activity() {
        let stats = StatsCounter::new();
        let now = Utc::now();
        stats.touch(now);
        assert_eq!(stats.last_activity(), Some(now));
    }
}
