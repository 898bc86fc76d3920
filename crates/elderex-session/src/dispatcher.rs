//! 메시지 디스패처.
//!
//! 송신: 페이로드 검증/직렬화 후 세션으로 전달.
//! 수신: 구독 메시지 계수, 원문과 파싱 결과 기록.

use elderex_core::config::DestinationConfig;
use elderex_core::error::CoreError;
use elderex_core::models::payload::{parse_features, OutboundPayload};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::notification_log::NotificationLog;
use crate::session::ConnectionSession;
use crate::stats::{StatKind, StatsCounter};

/// 구독 메시지 처리기
pub trait InboundHandler: Send + Sync {
    /// 실패하지 않는다
    fn on_message(&self, destination: &str, body: &str);
}

/// 메시지 디스패처
pub struct MessageDispatcher {
    log: Arc<NotificationLog>,
    stats: Arc<StatsCounter>,
    send_destination: String,
    expected_features: usize,
}

impl MessageDispatcher {
    pub fn new(
        log: Arc<NotificationLog>,
        stats: Arc<StatsCounter>,
        destinations: &DestinationConfig,
        expected_features: usize,
    ) -> Self {
        Self {
            log,
            stats,
            send_destination: destinations.send.clone(),
            expected_features,
        }
    }

    /// 쉼표 구분 특징 텍스트를 운동 데이터로 송신
    ///
    /// 개수가 기대값과 다르면 경고만 남기고 그대로 보낸다.
    pub fn send_exercise(
        &self,
        session: &mut ConnectionSession,
        features_text: &str,
    ) -> Result<(), CoreError> {
        self.check_connected(session)?;

        let features = parse_features(features_text);
        if features.len() != self.expected_features {
            self.log.warning(format!(
                "⚠️ 경고: 특징 {}개를 기대했지만 {}개입니다",
                self.expected_features,
                features.len()
            ));
        }
        self.deliver(session, &OutboundPayload::ExerciseData { features })
    }

    /// 세션 종료 신호 송신
    pub fn send_session_end(&self, session: &mut ConnectionSession) -> Result<(), CoreError> {
        self.check_connected(session)?;
        self.deliver(session, &OutboundPayload::SessionEnd)
    }

    /// 사용자 정의 JSON 송신
    pub fn send_custom(
        &self,
        session: &mut ConnectionSession,
        text: &str,
    ) -> Result<(), CoreError> {
        self.check_connected(session)?;

        let payload = match OutboundPayload::custom_from_text(text) {
            Ok(payload) => payload,
            Err(CoreError::EmptyCustomPayload) => {
                self.log.warning("⚠️ 경고: 사용자 정의 페이로드가 비어 있습니다");
                self.log.alert("사용자 정의 페이로드를 먼저 입력하세요");
                return Err(CoreError::EmptyCustomPayload);
            }
            Err(e) => {
                self.log.error(format!("❌ 사용자 정의 메시지 전송 실패: {e}"));
                self.log.alert(&e.to_string());
                return Err(e);
            }
        };
        self.deliver(session, &payload)
    }

    fn check_connected(&self, session: &ConnectionSession) -> Result<(), CoreError> {
        if let Err(e) = session.ensure_connected() {
            self.log.error("❌ 에러: WebSocket에 연결되어 있지 않습니다");
            self.log.alert("연결되지 않았습니다!");
            return Err(e);
        }
        Ok(())
    }

    fn deliver(
        &self,
        session: &mut ConnectionSession,
        payload: &OutboundPayload,
    ) -> Result<(), CoreError> {
        let result = payload
            .to_wire()
            .and_then(|body| session.send(&self.send_destination, &[], &body));

        match result {
            Ok(()) => {
                self.log.success(sent_summary(payload));
                if let Ok(pretty) = payload.to_pretty() {
                    self.log.debug(format!("📊 페이로드: {pretty}"));
                }
                Ok(())
            }
            Err(e) => {
                self.log
                    .error(format!("❌ {} 전송 실패: {e}", payload.kind()));
                Err(e)
            }
        }
    }
}

fn sent_summary(payload: &OutboundPayload) -> String {
    match payload {
        OutboundPayload::ExerciseData { features } => {
            format!("📤 특징 {}개가 담긴 운동 데이터 전송", features.len())
        }
        OutboundPayload::SessionEnd => "📤 세션 종료 신호 전송".to_string(),
        OutboundPayload::Custom(_) => "📤 사용자 정의 메시지 전송".to_string(),
    }
}

impl InboundHandler for MessageDispatcher {
    fn on_message(&self, destination: &str, body: &str) {
        self.stats.increment(StatKind::Received);
        debug!("수신 메시지: {destination} ({} bytes)", body.len());
        self.log.info(format!("📩 수신: {body}"));

        match serde_json::from_str::<Value>(body) {
            Ok(value) => {
                let pretty =
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string());
                self.log.info(format!("📦 파싱 결과: {pretty}"));
            }
            Err(e) => {
                self.log
                    .warning(format!("⚠️ {}", CoreError::InboundParse(e.to_string())));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use assert_matches::assert_matches;
    use elderex_core::models::notification::Severity;
    use serde_json::json;

    fn sent_body(h: &Harness, index: usize) -> Value {
        let calls = h.connector.calls();
        let (destination, _, body) = &calls.sent[index];
        assert_eq!(destination, "/app/websocket");
        serde_json::from_str(body).unwrap()
    }

    fn warnings(h: &Harness) -> Vec<String> {
        h.log
            .entries()
            .into_iter()
            .filter(|e| e.severity == Severity::Warning)
            .map(|e| e.text)
            .collect()
    }

    #[test]
    fn not_connected_reports_once() {
        let mut h = Harness::new();
        let entries_before = h.log.len();
        let result = h.dispatcher.send_exercise(&mut h.session, "1,2,3");

        assert_matches!(result, Err(CoreError::NotConnected));
        assert_eq!(h.stats.sent(), 0);
        assert_eq!(h.log.len(), entries_before + 1);
        assert_eq!(h.sink.alerts(), vec!["연결되지 않았습니다!".to_string()]);
    }

    #[test]
    fn not_connected_checked_before_parsing_custom() {
        let mut h = Harness::new();
        let result = h.dispatcher.send_custom(&mut h.session, "{not json");

        assert_matches!(result, Err(CoreError::NotConnected));
        assert_eq!(h.sink.alerts().len(), 1);
    }

    #[tokio::test]
    async fn short_feature_vector_warns_and_sends() {
        let mut h = Harness::new();
        h.connect_ok();
        h.dispatcher.send_exercise(&mut h.session, "1,2,abc,3").unwrap();

        assert_eq!(
            sent_body(&h, 0),
            json!({"type": "exercise_data", "features": [1.0, 2.0, 3.0]})
        );
        assert_eq!(h.stats.sent(), 1);
        let warnings = warnings(&h);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("15"));
        assert!(warnings[0].contains('3'));
    }

    #[tokio::test]
    async fn full_feature_vector_does_not_warn() {
        let mut h = Harness::new();
        h.connect_ok();
        let text = (0..15).map(|i| format!("0.{i}")).collect::<Vec<_>>().join(", ");
        h.dispatcher.send_exercise(&mut h.session, &text).unwrap();

        assert!(warnings(&h).is_empty());
        assert_eq!(
            sent_body(&h, 0)["features"].as_array().unwrap().len(),
            15
        );
        let last_success = h
            .log
            .entries()
            .into_iter()
            .filter(|e| e.severity == Severity::Success)
            .last()
            .unwrap();
        assert!(last_success.text.contains("15"));
    }

    #[tokio::test]
    async fn session_end_body() {
        let mut h = Harness::new();
        h.connect_ok();
        h.dispatcher.send_session_end(&mut h.session).unwrap();

        assert_eq!(sent_body(&h, 0), json!({"type": "session_end"}));
        assert_eq!(h.stats.sent(), 1);
    }

    #[tokio::test]
    async fn malformed_custom_aborts_before_send() {
        let mut h = Harness::new();
        h.connect_ok();
        let result = h.dispatcher.send_custom(&mut h.session, "{not json");

        assert_matches!(result, Err(CoreError::MalformedCustomPayload(_)));
        assert!(h.connector.calls().sent.is_empty());
        assert_eq!(h.stats.sent(), 0);
        let alerts = h.sink.alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("잘못된 JSON"));
    }

    #[tokio::test]
    async fn empty_custom_warns() {
        let mut h = Harness::new();
        h.connect_ok();
        let result = h.dispatcher.send_custom(&mut h.session, "  \n ");

        assert_matches!(result, Err(CoreError::EmptyCustomPayload));
        assert_eq!(warnings(&h).len(), 1);
        assert_eq!(h.sink.alerts().len(), 1);
        assert!(h.connector.calls().sent.is_empty());
    }

    #[tokio::test]
    async fn custom_json_sent_verbatim() {
        let mut h = Harness::new();
        h.connect_ok();
        h.dispatcher.send_custom(&mut h.session, r#"{"a":1}"#).unwrap();

        let calls = h.connector.calls();
        assert_eq!(calls.sent[0].2, r#"{"a":1}"#);
        assert_eq!(h.stats.sent(), 1);
    }

    #[tokio::test]
    async fn successful_send_logs_pretty_debug() {
        let mut h = Harness::new();
        h.connect_ok();
        h.dispatcher.send_session_end(&mut h.session).unwrap();

        let last = h.log.entries().pop().unwrap();
        assert_eq!(last.severity, Severity::Debug);
        assert!(last.text.contains("\"session_end\""));
    }

    #[test]
    fn inbound_json_logs_raw_and_parsed() {
        let h = Harness::new();
        h.dispatcher
            .on_message("/user/topic/exercises", r#"{"score":0.9}"#);

        assert_eq!(h.stats.received(), 1);
        let entries = h.log.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.severity == Severity::Info));
        assert!(entries[0].text.contains(r#"{"score":0.9}"#));
        assert!(entries[1].text.contains("\"score\": 0.9"));
    }

    #[test]
    fn inbound_non_json_still_counts() {
        let h = Harness::new();
        h.dispatcher.on_message("/user/topic/exercises", "plain text");

        assert_eq!(h.stats.received(), 1);
        let entries = h.log.entries();
        assert_eq!(entries[0].severity, Severity::Info);
        assert_eq!(entries[1].severity, Severity::Warning);
    }
}
