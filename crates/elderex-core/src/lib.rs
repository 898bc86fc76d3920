//! # elderex-core
//!
//! ElderEx WebSocket 테스터 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 연결 상태, 알림 항목, 송신 페이로드 (serde Serialize/Deserialize)
//! - [`ports`]: 전송 계층/표시/토큰 검증 포트 인터페이스
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 테스터 설정 구조체
//! - [`config_manager`]: 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;
