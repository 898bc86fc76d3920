//! JWT 토큰 검증 HTTP 클라이언트.
//!
//! 세션 연결과 무관하게 `GET {base}/auth/validate`로 토큰을 확인한다.

use async_trait::async_trait;
use elderex_core::error::CoreError;
use elderex_core::ports::validator::TokenValidator;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// 토큰 검증 클라이언트: `TokenValidator` 포트 구현
#[derive(Clone)]
pub struct TokenValidationClient {
    client: reqwest::Client,
}

impl TokenValidationClient {
    /// 요청 타임아웃을 지정해 생성
    pub fn new(timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 생성 실패: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TokenValidator for TokenValidationClient {
    async fn validate(&self, base_url: &str, token: &str) -> Result<String, CoreError> {
        let url = format!("{}/auth/validate", base_url.trim_end_matches('/'));
        debug!("토큰 검증 요청: {url}");

        let resp = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CoreError::ValidationRequest(format!("요청 실패: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::ValidationRequest(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        resp.text()
            .await
            .map_err(|e| CoreError::ValidationRequest(format!("응답 본문 읽기 실패: {e}")))
    }
}
