//! 표시 포트.
//!
//! 구현: `elderex-app` crate (콘솔)

use crate::models::connection::ConnectionState;
use crate::models::notification::NotificationEntry;

/// 알림 표시 싱크
pub trait DisplaySink: Send + Sync {
    /// 알림 한 건 표시
    fn display(&self, entry: &NotificationEntry);

    /// 표시된 로그 비우기
    fn clear(&self);

    /// 운영자 확인이 필요한 차단형 알림
    fn alert(&self, message: &str);
}

/// 연결 상태 변경 리스너 (상태별 조작 활성화/비활성화)
pub trait StatusListener: Send + Sync {
    fn on_state_changed(&self, state: ConnectionState);
}
