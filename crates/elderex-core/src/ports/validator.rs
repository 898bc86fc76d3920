//! 토큰 검증 포트.
//!
//! 구현: `elderex-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;

/// JWT 토큰 검증 인터페이스
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// `GET {base_url}/auth/validate`: 성공 시 응답 본문 반환
    async fn validate(&self, base_url: &str, token: &str) -> Result<String, CoreError>;
}
