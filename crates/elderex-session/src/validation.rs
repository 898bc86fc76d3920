//! 토큰 검증 보조 채널.
//!
//! 요청은 메인 루프 밖에서 실행하고 결과는 [`TokenValidation::report`]로 기록한다.

use elderex_core::error::CoreError;
use elderex_core::ports::validator::TokenValidator;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::notification_log::NotificationLog;

pub struct TokenValidation {
    validator: Arc<dyn TokenValidator>,
    log: Arc<NotificationLog>,
}

impl TokenValidation {
    pub fn new(validator: Arc<dyn TokenValidator>, log: Arc<NotificationLog>) -> Self {
        Self { validator, log }
    }

    /// 검증 요청 준비
    ///
    /// 토큰이 비어 있으면 경고와 알림만 남기고 `None`.
    pub fn begin(
        &self,
        base_url: &str,
        token: &str,
    ) -> Option<impl Future<Output = Result<String, CoreError>> + Send + 'static> {
        let token = token.trim().to_string();
        if token.is_empty() {
            self.log.warning("⚠️ 경고: JWT 토큰이 없습니다");
            self.log.alert("JWT 토큰을 입력하세요!");
            return None;
        }

        self.log.info("🔐 토큰 검증 중...");
        let validator = self.validator.clone();
        let base_url = base_url.trim().to_string();
        Some(async move { validator.validate(&base_url, &token).await })
    }

    /// 검증 결과 기록
    pub fn report(&self, outcome: Result<String, CoreError>) {
        match outcome {
            Ok(text) => self.log.success(format!("✅ 토큰 검증 성공: {text}")),
            Err(e) => {
                debug!("토큰 검증 실패: {e:?}");
                self.log.error(format!("❌ {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatsCounter;
    use crate::testing::RecordingSink;
    use async_trait::async_trait;
    use elderex_core::models::notification::Severity;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeValidator {
        requests: Mutex<Vec<(String, String)>>,
        reject: bool,
    }

    #[async_trait]
    impl TokenValidator for FakeValidator {
        async fn validate(&self, base_url: &str, token: &str) -> Result<String, CoreError> {
            self.requests
                .lock()
                .push((base_url.to_string(), token.to_string()));
            if self.reject {
                Err(CoreError::ValidationRequest(
                    "HTTP 401: Unauthorized".to_string(),
                ))
            } else {
                Ok("Token is valid".to_string())
            }
        }
    }

    type Setup = (
        TokenValidation,
        Arc<FakeValidator>,
        Arc<NotificationLog>,
        Arc<RecordingSink>,
    );

    fn setup(reject: bool) -> Setup {
        let sink = Arc::new(RecordingSink::default());
        let log = Arc::new(NotificationLog::new(
            sink.clone(),
            Arc::new(StatsCounter::new()),
            false,
        ));
        let validator = Arc::new(FakeValidator {
            reject,
            ..Default::default()
        });
        (
            TokenValidation::new(validator.clone(), log.clone()),
            validator,
            log,
            sink,
        )
    }

    #[test]
    fn empty_token_skips_request() {
        let (validation, validator, log, sink) = setup(false);
        assert!(validation.begin("http://localhost:8080", " ").is_none());

        assert!(validator.requests.lock().is_empty());
        assert_eq!(log.entries()[0].severity, Severity::Warning);
        assert_eq!(sink.alerts().len(), 1);
    }

    #[tokio::test]
    async fn success_is_reported() {
        let (validation, validator, log, _) = setup(false);
        let request = validation.begin("http://localhost:8080", "jwt").unwrap();
        assert_eq!(log.entries()[0].text, "🔐 토큰 검증 중...");

        validation.report(request.await);

        assert_eq!(
            validator.requests.lock()[0],
            ("http://localhost:8080".to_string(), "jwt".to_string())
        );
        let last = log.entries().pop().unwrap();
        assert_eq!(last.severity, Severity::Success);
        assert!(last.text.contains("Token is valid"));
    }

    #[tokio::test]
    async fn failure_is_reported_with_status() {
        let (validation, _, log, _) = setup(true);
        let request = validation.begin("http://localhost:8080", "jwt").unwrap();
        validation.report(request.await);

        let last = log.entries().pop().unwrap();
        assert_eq!(last.severity, Severity::Error);
        assert!(last.text.contains("HTTP 401: Unauthorized"));
    }
}
