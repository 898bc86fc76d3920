//! 알림 로그.
//!
//! 모든 항목을 순서대로 보존하고, debug 항목은 표시 플래그가 켜져 있을 때만
//! 표시 싱크로 전달한다. 항목마다 통계의 마지막 활동 시각을 갱신한다.

use chrono::Utc;
use elderex_core::models::notification::{NotificationEntry, Severity};
use elderex_core::ports::display::DisplaySink;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::stats::StatsCounter;

/// 알림 로그
pub struct NotificationLog {
    entries: Mutex<Vec<NotificationEntry>>,
    sink: Arc<dyn DisplaySink>,
    stats: Arc<StatsCounter>,
    show_debug: AtomicBool,
}

impl NotificationLog {
    pub fn new(sink: Arc<dyn DisplaySink>, stats: Arc<StatsCounter>, show_debug: bool) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            sink,
            stats,
            show_debug: AtomicBool::new(show_debug),
        }
    }

    /// 알림 기록
    ///
    /// 타임스탬프는 직전 항목보다 작아지지 않는다.
    pub fn emit(&self, severity: Severity, text: impl Into<String>) {
        let entry = {
            let mut entries = self.entries.lock();
            let now = Utc::now();
            let timestamp = entries
                .last()
                .map_or(now, |last| last.timestamp.max(now));
            let entry = NotificationEntry {
                timestamp,
                severity,
                text: text.into(),
            };
            entries.push(entry.clone());
            entry
        };

        trace!("[{}] {}", entry.severity.tag(), entry.text);
        self.stats.touch(entry.timestamp);

        if severity != Severity::Debug || self.show_debug.load(Ordering::Relaxed) {
            self.sink.display(&entry);
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        self.emit(Severity::Info, text);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.emit(Severity::Success, text);
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.emit(Severity::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.emit(Severity::Error, text);
    }

    pub fn debug(&self, text: impl Into<String>) {
        self.emit(Severity::Debug, text);
    }

    /// 표시 영역 비우기 (기록은 유지)
    pub fn clear(&self) {
        self.sink.clear();
        self.info("🧹 로그를 비웠습니다");
    }

    /// 차단형 알림
    pub fn alert(&self, message: &str) {
        self.sink.alert(message);
    }

    pub fn set_show_debug(&self, show: bool) {
        self.show_debug.store(show, Ordering::Relaxed);
    }

    pub fn show_debug(&self) -> bool {
        self.show_debug.load(Ordering::Relaxed)
    }

    pub fn entries(&self) -> Vec<NotificationEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
