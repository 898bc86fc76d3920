//! ElderEx 핵심 에러 타입.
//!
//! 세션/디스패처/어댑터 계층이 모두 이 타입으로 실패를 보고한다.

use thiserror::Error;

use crate::models::connection::ConnectionState;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 빈 토큰으로 연결 시도
    #[error("JWT 토큰이 필요합니다")]
    EmptyCredential,

    /// 전송 객체 생성 실패 (잘못된 URL 등)
    #[error("전송 계층 생성 실패: {0}")]
    TransportConstruction(String),

    /// 세션 핸드셰이크 실패 (서버 거부, 타임아웃)
    #[error("핸드셰이크 실패: {0}")]
    Handshake(String),

    /// 연결되지 않은 상태에서 송신 시도
    #[error("WebSocket에 연결되어 있지 않습니다")]
    NotConnected,

    /// 이미 연결 중이거나 연결된 상태에서 재연결 시도
    #[error("이미 {0} 상태입니다")]
    AlreadyActive(ConnectionState),

    /// 사용자 정의 페이로드가 비어 있음
    #[error("사용자 정의 페이로드가 비어 있습니다")]
    EmptyCustomPayload,

    /// 사용자 정의 페이로드 JSON 파싱 실패
    #[error("잘못된 JSON: {0}")]
    MalformedCustomPayload(String),

    /// 수신 본문 JSON 파싱 실패 (경고로 강등)
    #[error("수신 메시지를 JSON으로 파싱할 수 없음: {0}")]
    InboundParse(String),

    /// 토큰 검증 요청 실패 (네트워크 또는 non-2xx)
    #[error("토큰 검증 실패: {0}")]
    ValidationRequest(String),

    /// STOMP/SockJS 프레임 디코딩 실패
    #[error("프로토콜 에러: {0}")]
    Protocol(String),

    /// 네트워크 에러 (전송 채널 닫힘, 소켓 에러)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_active_message_names_state() {
        let err = CoreError::AlreadyActive(ConnectionState::Connecting);
        assert_eq!(err.to_string(), "이미 connecting 상태입니다");
    }
}
