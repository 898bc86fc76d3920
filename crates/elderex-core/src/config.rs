//! 테스터 설정 구조체.
//!
//! 서버 URL, 전송 모드, 목적지, 표시 옵션, 기본 페이로드 등
//! 런타임 설정을 정의한다. `ConfigManager`를 통해 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 최상위 테스터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TesterConfig {
    /// 서버 연결 설정
    pub server: ServerConfig,
    /// 인증 설정
    #[serde(default)]
    pub auth: AuthConfig,
    /// STOMP 목적지 설정
    #[serde(default)]
    pub destinations: DestinationConfig,
    /// 표시 설정
    #[serde(default)]
    pub display: DisplayConfig,
    /// 기본 페이로드 설정
    #[serde(default)]
    pub payload: PayloadConfig,
}

// ============================================================
// 서버 / 전송 설정
// ============================================================

/// WebSocket 위의 프레이밍 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// SockJS websocket 전송 (`/{server}/{session}/websocket`)
    #[default]
    SockJs,
    /// STOMP 프레임을 WebSocket 텍스트 메시지에 직접 실음
    Raw,
}

/// 서버 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 서버 기본 URL (http/https/ws/wss)
    pub base_url: String,
    /// 재연결 지연 힌트 (밀리초, 정보용)
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// 전송 모드
    #[serde(default)]
    pub transport: TransportMode,
    /// 핸드셰이크 대기 한도 (밀리초)
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// DISCONNECT 영수증 대기 한도 (밀리초)
    #[serde(default = "default_disconnect_timeout_ms")]
    pub disconnect_timeout_ms: u64,
    /// 클라이언트가 보낼 수 있는 heart-beat 간격 (밀리초, 0이면 비활성)
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
    /// 토큰 검증 HTTP 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// 인증 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 미리 채워 둘 JWT 토큰
    #[serde(default)]
    pub token: Option<String>,
}

/// STOMP 목적지 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// 기본 URL 뒤에 붙는 WebSocket 엔드포인트 경로
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// 개인 응답 구독 목적지
    #[serde(default = "default_subscribe_destination")]
    pub subscribe: String,
    /// 송신 목적지
    #[serde(default = "default_send_destination")]
    pub send: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            subscribe: default_subscribe_destination(),
            send: default_send_destination(),
        }
    }
}

/// 표시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// debug 항목 표시
    #[serde(default)]
    pub show_debug: bool,
    /// 새 항목 즉시 출력 (끄면 `log` 명령까지 보류)
    #[serde(default = "default_true")]
    pub auto_scroll: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_debug: false,
            auto_scroll: true,
        }
    }
}

/// 기본 페이로드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadConfig {
    /// 운동 데이터 특징 텍스트 기본값 (쉼표 구분)
    #[serde(default = "default_features_text")]
    pub features: String,
    /// 기대 특징 개수 (불일치 시 경고만)
    #[serde(default = "default_expected_feature_count")]
    pub expected_feature_count: usize,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            features: default_features_text(),
            expected_feature_count: default_expected_feature_count(),
        }
    }
}

// ============================================================
// TesterConfig impl
// ============================================================

impl TesterConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://localhost:8080".to_string(),
                reconnect_delay_ms: default_reconnect_delay_ms(),
                transport: TransportMode::default(),
                handshake_timeout_ms: default_handshake_timeout_ms(),
                disconnect_timeout_ms: default_disconnect_timeout_ms(),
                heartbeat_ms: default_heartbeat_ms(),
                request_timeout_ms: default_request_timeout_ms(),
            },
            auth: AuthConfig::default(),
            destinations: DestinationConfig::default(),
            display: DisplayConfig::default(),
            payload: PayloadConfig::default(),
        }
    }

    /// 핸드셰이크 타임아웃
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.server.handshake_timeout_ms)
    }

    /// DISCONNECT 영수증 대기 시간
    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_millis(self.server.disconnect_timeout_ms)
    }

    /// HTTP 요청 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }
}

fn default_true() -> bool {
    true
}
fn default_reconnect_delay_ms() -> u64 {
    5_000
}
fn default_handshake_timeout_ms() -> u64 {
    10_000
}
fn default_disconnect_timeout_ms() -> u64 {
    3_000
}
fn default_heartbeat_ms() -> u64 {
    10_000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_endpoint() -> String {
    "/websocket".to_string()
}
fn default_subscribe_destination() -> String {
    "/user/topic/exercises".to_string()
}
fn default_send_destination() -> String {
    "/app/websocket".to_string()
}
fn default_features_text() -> String {
    "0.12,0.34,0.56,0.78,0.91,0.23,0.45,0.67,0.89,0.10,0.32,0.54,0.76,0.98,0.21".to_string()
}
fn default_expected_feature_count() -> usize {
    crate::models::payload::EXPECTED_FEATURE_COUNT
}
