//! # elderex-session
//!
//! 연결 세션 상태 머신과 메시지 계수/기록 파이프라인.
//!
//! - [`session`]: `ConnectionSession` 상태 머신
//! - [`dispatcher`]: 송신 페이로드 검증, 수신 메시지 분류
//! - [`notification_log`]: 시각/심각도가 붙은 알림 로그
//! - [`stats`]: 송수신 카운터
//! - [`uptime`]: 연결 업타임 타이머
//! - [`validation`]: 토큰 검증 보조 채널

pub mod dispatcher;
pub mod notification_log;
pub mod session;
pub mod stats;
pub mod uptime;
pub mod validation;
