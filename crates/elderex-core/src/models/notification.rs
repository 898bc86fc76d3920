//! 알림(로그 항목) 모델.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// 알림 심각도/분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    Debug,
}

impl Severity {
    /// 콘솔 표시용 태그
    pub fn tag(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Success => "OK",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
            Severity::Debug => "DEBUG",
        }
    }
}

/// 타임스탬프가 붙은 알림 한 건
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEntry {
    /// 기록 시각
    pub timestamp: DateTime<Utc>,
    /// 심각도
    pub severity: Severity,
    /// 본문
    pub text: String,
}

impl NotificationEntry {
    /// 로컬 시각 `HH:MM:SS`
    pub fn local_time(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string()
    }
}
