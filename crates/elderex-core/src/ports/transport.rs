//! 메시징 전송 계층 포트.
//!
//! 구현: `elderex-network` crate (STOMP over SockJS/WebSocket)
//!
//! 연결 개방과 송신 요청은 동기적으로 큐에 넣고, 핸드셰이크 결과·수신 메시지·
//! 종료 완료는 [`EventSender`]를 통해 세션 루프로 비동기 전달된다.

use tokio::sync::mpsc;

use crate::error::CoreError;

/// 전송 계층 개방 요청
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// 엔드포인트 URL (`{base_url}/websocket`)
    pub url: String,
    /// 핸드셰이크 헤더 (`token` 등)
    pub headers: Vec<(String, String)>,
}

/// 전송 계층이 세션 루프로 올려 보내는 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// 핸드셰이크 성공 (STOMP CONNECTED)
    Connected {
        version: Option<String>,
        server: Option<String>,
    },
    /// 핸드셰이크 실패 (ERROR 프레임, 소켓 에러, 타임아웃)
    HandshakeFailed(String),
    /// 구독으로 배달된 메시지
    Message {
        subscription: String,
        destination: String,
        body: String,
    },
    /// 연결 이후 전송 계층 에러
    Error(String),
    /// 전송 계층 종료 (정상 종료 완료 포함)
    Closed,
    /// 프레임 송수신 추적 (`>>> SEND` / `<<< MESSAGE`)
    Trace(String),
}

/// 연결 시도 세대가 붙은 이벤트
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub generation: u64,
    pub event: TransportEvent,
}

/// 한 연결 시도에 묶인 이벤트 송신기
#[derive(Debug, Clone)]
pub struct EventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSender {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 이벤트 전달. 수신 측이 사라졌으면 `false`.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(SessionEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// 전송 계층 팩토리
pub trait TransportConnector: Send + Sync {
    /// 전송 객체 생성 + 핸드셰이크 시작
    ///
    /// URL 형식 오류처럼 즉시 판별 가능한 실패는 `TransportConstruction`으로
    /// 동기 반환한다. 핸드셰이크 결과는 `events`로 전달된다.
    fn open(
        &self,
        request: ConnectRequest,
        events: EventSender,
    ) -> Result<Box<dyn TransportHandle>, CoreError>;
}

/// 살아 있는 전송 세션 핸들
pub trait TransportHandle: Send {
    /// 목적지로 프레임 송신 요청
    fn send(
        &mut self,
        destination: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<(), CoreError>;

    /// 목적지 구독. 구독 ID 반환.
    fn subscribe(&mut self, destination: &str) -> Result<String, CoreError>;

    /// 정상 종료 요청. 완료 시 `TransportEvent::Closed`.
    fn disconnect(&mut self) -> Result<(), CoreError>;

    /// 이벤트 없이 즉시 폐기
    fn abort(&mut self);
}
