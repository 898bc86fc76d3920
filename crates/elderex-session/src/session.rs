//! 연결 세션 상태 머신.
//!
//! `Disconnected → Connecting → Connected → Disconnected` 순환.
//! 전송 핸들은 `Connecting`/`Connected` 동안에만 세션이 단독 소유한다.
//! 전송 계층의 비동기 결과는 세대 번호가 붙은 [`SessionEvent`]로 돌아오며,
//! 현재 연결 시도의 이벤트만 반영한다.

use elderex_core::config::DestinationConfig;
use elderex_core::error::CoreError;
use elderex_core::models::connection::ConnectionState;
use elderex_core::ports::display::StatusListener;
use elderex_core::ports::transport::{
    ConnectRequest, EventSender, SessionEvent, TransportConnector, TransportEvent, TransportHandle,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dispatcher::InboundHandler;
use crate::notification_log::NotificationLog;
use crate::stats::{StatKind, StatsCounter};
use crate::uptime::UptimeTimer;

/// 연결 시 제공된 자격 증명
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub token: String,
    pub base_url: String,
}

/// 세션이 상태 변화를 알리는 협력 객체 묶음
#[derive(Clone)]
pub struct SessionComponents {
    pub log: Arc<NotificationLog>,
    pub stats: Arc<StatsCounter>,
    pub uptime: Arc<UptimeTimer>,
    pub status: Arc<dyn StatusListener>,
    pub inbound: Arc<dyn InboundHandler>,
}

/// 연결 세션
pub struct ConnectionSession {
    connector: Arc<dyn TransportConnector>,
    destinations: DestinationConfig,
    state: ConnectionState,
    handle: Option<Box<dyn TransportHandle>>,
    subscription: Option<String>,
    credentials: Option<SessionCredentials>,
    closing: bool,
    generation: u64,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    log: Arc<NotificationLog>,
    stats: Arc<StatsCounter>,
    uptime: Arc<UptimeTimer>,
    status: Arc<dyn StatusListener>,
    inbound: Arc<dyn InboundHandler>,
}

impl ConnectionSession {
    /// `Disconnected` 상태의 세션과 전송 이벤트 수신기 생성
    pub fn new(
        connector: Arc<dyn TransportConnector>,
        destinations: DestinationConfig,
        components: SessionComponents,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            connector,
            destinations,
            state: ConnectionState::Disconnected,
            handle: None,
            subscription: None,
            credentials: None,
            closing: false,
            generation: 0,
            events_tx,
            log: components.log,
            stats: components.stats,
            uptime: components.uptime,
            status: components.status,
            inbound: components.inbound,
        };
        (session, events_rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn has_transport(&self) -> bool {
        self.handle.is_some()
    }

    pub fn subscription(&self) -> Option<&str> {
        self.subscription.as_deref()
    }

    pub fn credentials(&self) -> Option<&SessionCredentials> {
        self.credentials.as_ref()
    }

    /// 정상 종료 완료를 기다리는 중인지
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 연결 시작
    ///
    /// 핸드셰이크 결과는 이벤트로 돌아오므로 `Ok`는 `Connecting` 진입만 뜻한다.
    pub fn connect(
        &mut self,
        token: &str,
        base_url: &str,
        reconnect_delay_ms: u64,
    ) -> Result<(), CoreError> {
        let token = token.trim();
        if token.is_empty() {
            self.log.error("❌ 에러: JWT 토큰이 필요합니다");
            self.log.alert("JWT 토큰을 먼저 입력하세요");
            return Err(CoreError::EmptyCredential);
        }

        if self.state != ConnectionState::Disconnected {
            self.log.warning(format!(
                "⚠️ 이미 {} 상태입니다. 먼저 연결을 해제하세요",
                self.state
            ));
            return Err(CoreError::AlreadyActive(self.state));
        }

        let base_url = base_url.trim().trim_end_matches('/').to_string();
        self.transition(ConnectionState::Connecting);
        self.log.info("🔄 WebSocket 연결 중...");

        self.generation += 1;
        let request = ConnectRequest {
            url: format!("{base_url}{}", self.destinations.endpoint),
            headers: vec![("token".to_string(), token.to_string())],
        };
        let events = EventSender::new(self.generation, self.events_tx.clone());

        match self.connector.open(request, events) {
            Ok(handle) => {
                self.handle = Some(handle);
                self.credentials = Some(SessionCredentials {
                    token: token.to_string(),
                    base_url,
                });
                self.log
                    .debug(format!("⏱️ 재연결 지연 {reconnect_delay_ms}ms (참고값)"));
                info!("연결 시도 시작 (세대 {})", self.generation);
                Ok(())
            }
            Err(e) => {
                self.log.error(format!("❌ 연결 실패: {e}"));
                self.transition(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// 연결 해제
    ///
    /// `Connected`면 정상 종료를 요청하고 완료 이벤트를 기다린다.
    /// 그 외에는 즉시 `Disconnected`로 강제 전환한다.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Connected && !self.closing {
            if let Some(handle) = self.handle.as_mut() {
                match handle.disconnect() {
                    Ok(()) => {
                        self.closing = true;
                        info!("정상 종료 요청 (세대 {})", self.generation);
                        return;
                    }
                    Err(e) => warn!("정상 종료 요청 실패, 강제 해제: {e}"),
                }
            }
        }

        self.transition(ConnectionState::Disconnected);
        self.log.info("🛑 연결 해제됨");
    }

    /// 송신 가능 상태 확인
    pub fn ensure_connected(&self) -> Result<(), CoreError> {
        if self.state == ConnectionState::Connected && self.handle.is_some() && !self.closing {
            Ok(())
        } else {
            Err(CoreError::NotConnected)
        }
    }

    /// 목적지로 송신. 성공 시 송신 카운터 +1.
    pub fn send(
        &mut self,
        destination: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<(), CoreError> {
        self.ensure_connected()?;
        let handle = self.handle.as_mut().ok_or(CoreError::NotConnected)?;
        handle.send(destination, headers, body)?;
        self.stats.increment(StatKind::Sent);
        Ok(())
    }

    /// 전송 계층 이벤트 반영
    pub fn handle_event(&mut self, event: SessionEvent) {
        if event.generation != self.generation || self.handle.is_none() {
            debug!(
                "이전 연결 시도의 이벤트 무시 (세대 {}, 현재 {})",
                event.generation, self.generation
            );
            return;
        }

        match event.event {
            TransportEvent::Connected { version, server } => {
                if self.state != ConnectionState::Connecting {
                    debug!("Connecting이 아닌 상태의 CONNECTED 무시: {}", self.state);
                    return;
                }
                info!(
                    "STOMP 세션 수립: version={} server={}",
                    version.as_deref().unwrap_or("-"),
                    server.as_deref().unwrap_or("-")
                );
                self.transition(ConnectionState::Connected);
                self.log.success("✅ WebSocket 연결 성공");
                self.subscribe_replies();
            }
            TransportEvent::HandshakeFailed(detail) => {
                self.transition(ConnectionState::Disconnected);
                self.log.error(format!("❌ STOMP 오류: {detail}"));
            }
            TransportEvent::Message {
                subscription,
                destination,
                body,
            } => {
                if self.state == ConnectionState::Connected
                    && self.subscription.as_deref() == Some(subscription.as_str())
                {
                    self.inbound.on_message(&destination, &body);
                } else {
                    debug!("구독 외 메시지 무시: {subscription} {destination}");
                }
            }
            TransportEvent::Error(detail) => {
                warn!("전송 계층 오류: {detail}");
                self.transition(ConnectionState::Disconnected);
                self.log.error(format!("❌ 전송 계층 오류: {detail}"));
            }
            TransportEvent::Closed => {
                let manual = self.closing;
                self.transition(ConnectionState::Disconnected);
                if manual {
                    self.log.info("🛑 수동으로 연결 해제됨");
                } else {
                    self.log.error("❌ 연결이 예기치 않게 종료되었습니다");
                }
            }
            TransportEvent::Trace(line) => self.log.debug(format!("📡 {line}")),
        }
    }

    fn subscribe_replies(&mut self) {
        let destination = self.destinations.subscribe.clone();
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        match handle.subscribe(&destination) {
            Ok(id) => {
                debug!("구독 ID: {id}");
                self.subscription = Some(id);
                self.log.success(format!("📬 {destination} 구독 완료"));
            }
            Err(e) => self.log.error(format!("❌ 구독 실패: {e}")),
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        let previous = self.state;
        self.state = next;

        match next {
            ConnectionState::Connected => self.uptime.arm(),
            ConnectionState::Disconnected => {
                if let Some(mut handle) = self.handle.take() {
                    handle.abort();
                }
                self.subscription = None;
                self.credentials = None;
                self.closing = false;
                self.uptime.disarm();
            }
            ConnectionState::Connecting => {}
        }

        if previous != next {
            debug!("세션 상태: {previous} → {next}");
        }
        self.status.on_state_changed(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use assert_matches::assert_matches;
    use elderex_core::models::notification::Severity;

    const BASE: &str = "http://localhost:8080";

    #[test]
    fn starts_disconnected_without_transport() {
        let h = Harness::new();
        assert_eq!(h.session.state(), ConnectionState::Disconnected);
        assert!(!h.session.has_transport());
        assert!(h.session.subscription().is_none());
    }

    #[test]
    fn empty_token_fails_fast() {
        let mut h = Harness::new();
        let result = h.session.connect("   ", BASE, 5000);

        assert_matches!(result, Err(CoreError::EmptyCredential));
        assert_eq!(h.session.state(), ConnectionState::Disconnected);
        assert_eq!(h.sink.alerts().len(), 1);
        assert_eq!(h.log.entries().len(), 1);
        assert_eq!(h.log.entries()[0].severity, Severity::Error);
        assert!(h.connector.calls().opened.is_empty());
        assert!(h.status.states().is_empty());
    }

    #[test]
    fn connect_opens_endpoint_with_token_header() {
        let mut h = Harness::new();
        h.session.connect(" jwt-abc ", "http://localhost:8080/", 7000).unwrap();

        assert_eq!(h.session.state(), ConnectionState::Connecting);
        assert!(h.session.has_transport());
        assert_eq!(h.status.states(), vec![ConnectionState::Connecting]);

        let calls = h.connector.calls();
        assert_eq!(calls.opened.len(), 1);
        assert_eq!(calls.opened[0].url, "http://localhost:8080/websocket");
        assert_eq!(
            calls.opened[0].headers,
            vec![("token".to_string(), "jwt-abc".to_string())]
        );

        let credentials = h.session.credentials().unwrap();
        assert_eq!(credentials.base_url, "http://localhost:8080");
        assert!(h
            .log
            .entries()
            .iter()
            .any(|e| e.severity == Severity::Debug && e.text.contains("7000ms")));
    }

    #[test]
    fn duplicate_connect_is_rejected() {
        let mut h = Harness::new();
        h.session.connect("tok", BASE, 5000).unwrap();
        let result = h.session.connect("tok", BASE, 5000);

        assert_matches!(
            result,
            Err(CoreError::AlreadyActive(ConnectionState::Connecting))
        );
        assert_eq!(h.connector.calls().opened.len(), 1);
        assert_eq!(
            h.log.entries().last().unwrap().severity,
            Severity::Warning
        );
    }

    #[test]
    fn construction_failure_returns_to_disconnected() {
        let mut h = Harness::new();
        h.connector.fail_next_open();
        let result = h.session.connect("tok", "not a url", 5000);

        assert_matches!(result, Err(CoreError::TransportConstruction(_)));
        assert_eq!(h.session.state(), ConnectionState::Disconnected);
        assert!(!h.session.has_transport());
        assert_eq!(
            h.status.states(),
            vec![ConnectionState::Connecting, ConnectionState::Disconnected]
        );
        assert!(h
            .log
            .entries()
            .iter()
            .any(|e| e.severity == Severity::Error && e.text.contains("연결 실패")));
    }

    #[tokio::test]
    async fn handshake_success_subscribes_and_arms_timer() {
        let mut h = Harness::new();
        h.connect_ok();

        assert_eq!(h.session.state(), ConnectionState::Connected);
        assert_eq!(h.session.subscription(), Some("sub-0"));
        assert_eq!(
            h.connector.calls().subscribed,
            vec!["/user/topic/exercises".to_string()]
        );
        assert!(h.uptime.is_armed());

        let successes: Vec<_> = h
            .log
            .entries()
            .into_iter()
            .filter(|e| e.severity == Severity::Success)
            .collect();
        assert_eq!(successes.len(), 2);
        assert!(successes[1].text.contains("/user/topic/exercises"));
    }

    #[test]
    fn handshake_failure_reports_detail() {
        let mut h = Harness::new();
        h.session.connect("tok", BASE, 5000).unwrap();
        h.emit(TransportEvent::HandshakeFailed("Invalid token".to_string()));
        h.pump();

        assert_eq!(h.session.state(), ConnectionState::Disconnected);
        assert!(!h.session.has_transport());
        assert!(h.session.credentials().is_none());
        assert_eq!(h.uptime.display(), "00:00");
        let last = h.log.entries().pop().unwrap();
        assert_eq!(last.severity, Severity::Error);
        assert!(last.text.contains("Invalid token"));
    }

    #[test]
    fn disconnect_while_disconnected_is_idempotent() {
        let mut h = Harness::new();
        h.session.disconnect();

        assert_eq!(h.session.state(), ConnectionState::Disconnected);
        assert_eq!(h.log.entries().len(), 1);
        let calls = h.connector.calls();
        assert_eq!(calls.disconnects, 0);
        assert_eq!(calls.aborts, 0);
    }

    #[tokio::test]
    async fn graceful_disconnect_waits_for_close() {
        let mut h = Harness::new();
        h.connect_ok();

        h.session.disconnect();
        assert_eq!(h.connector.calls().disconnects, 1);
        assert_eq!(h.session.state(), ConnectionState::Connected);
        assert!(h.session.is_closing());
        assert_matches!(h.session.ensure_connected(), Err(CoreError::NotConnected));

        h.emit(TransportEvent::Closed);
        h.pump();

        assert_eq!(h.session.state(), ConnectionState::Disconnected);
        assert!(!h.session.is_closing());
        assert!(!h.uptime.is_armed());
        let last = h.log.entries().pop().unwrap();
        assert_eq!(last.severity, Severity::Info);
        assert!(last.text.contains("수동"));
    }

    #[tokio::test]
    async fn unexpected_close_is_an_error() {
        let mut h = Harness::new();
        h.connect_ok();
        h.emit(TransportEvent::Closed);
        h.pump();

        assert_eq!(h.session.state(), ConnectionState::Disconnected);
        assert_eq!(h.log.entries().pop().unwrap().severity, Severity::Error);
    }

    #[tokio::test]
    async fn transport_error_disarms_timer() {
        let mut h = Harness::new();
        h.connect_ok();
        h.emit(TransportEvent::Error("socket reset".to_string()));
        h.pump();

        assert_eq!(h.session.state(), ConnectionState::Disconnected);
        assert!(!h.uptime.is_armed());
        assert_eq!(h.uptime.display(), "00:00");
        assert!(h.log.entries().pop().unwrap().text.contains("socket reset"));
    }

    #[test]
    fn force_disconnect_while_connecting_aborts_transport() {
        let mut h = Harness::new();
        h.session.connect("tok", BASE, 5000).unwrap();
        h.session.disconnect();

        assert_eq!(h.session.state(), ConnectionState::Disconnected);
        let calls = h.connector.calls();
        assert_eq!(calls.aborts, 1);
        assert_eq!(calls.disconnects, 0);
    }

    #[test]
    fn stale_generation_events_are_ignored() {
        let mut h = Harness::new();
        h.session.connect("tok", BASE, 5000).unwrap();
        let stale = h.connector.sender(0);
        h.session.disconnect();
        h.session.connect("tok", BASE, 5000).unwrap();

        stale.emit(TransportEvent::Connected {
            version: None,
            server: None,
        });
        h.pump();

        assert_eq!(h.session.state(), ConnectionState::Connecting);
        assert_eq!(h.session.generation(), 2);
    }

    #[test]
    fn send_requires_connection() {
        let mut h = Harness::new();
        let result = h.session.send("/app/websocket", &[], "{}");

        assert_matches!(result, Err(CoreError::NotConnected));
        assert_eq!(h.stats.sent(), 0);
    }

    #[tokio::test]
    async fn send_counts_issued_frames() {
        let mut h = Harness::new();
        h.connect_ok();
        h.session.send("/app/websocket", &[], r#"{"a":1}"#).unwrap();
        h.session.send("/app/websocket", &[], r#"{"a":2}"#).unwrap();

        assert_eq!(h.stats.sent(), 2);
        assert_eq!(h.connector.calls().sent.len(), 2);
    }

    #[tokio::test]
    async fn inbound_only_from_own_subscription() {
        let mut h = Harness::new();
        h.connect_ok();

        h.emit(TransportEvent::Message {
            subscription: "sub-0".to_string(),
            destination: "/user/topic/exercises".to_string(),
            body: r#"{"ok":true}"#.to_string(),
        });
        h.emit(TransportEvent::Message {
            subscription: "sub-9".to_string(),
            destination: "/topic/other".to_string(),
            body: "x".to_string(),
        });
        h.pump();

        assert_eq!(h.stats.received(), 1);
    }

    #[test]
    fn trace_lines_become_debug_entries() {
        let mut h = Harness::new();
        h.session.connect("tok", BASE, 5000).unwrap();
        h.emit(TransportEvent::Trace(">>> CONNECT".to_string()));
        h.pump();

        let last = h.log.entries().pop().unwrap();
        assert_eq!(last.severity, Severity::Debug);
        assert_eq!(last.text, "📡 >>> CONNECT");
        assert!(h.sink.displayed().iter().all(|e| e.severity != Severity::Debug));
    }

    #[tokio::test]
    async fn handle_matches_state_through_cycle() {
        let mut h = Harness::new();
        assert_eq!(h.session.has_transport(), h.session.state().holds_transport());
        h.session.connect("tok", BASE, 5000).unwrap();
        assert_eq!(h.session.has_transport(), h.session.state().holds_transport());
        h.emit(TransportEvent::Connected {
            version: Some("1.2".to_string()),
            server: None,
        });
        h.pump();
        assert_eq!(h.session.has_transport(), h.session.state().holds_transport());
        h.session.disconnect();
        h.emit(TransportEvent::Closed);
        h.pump();
        assert_eq!(h.session.has_transport(), h.session.state().holds_transport());
        assert_eq!(h.session.state(), ConnectionState::Disconnected);
    }
}
