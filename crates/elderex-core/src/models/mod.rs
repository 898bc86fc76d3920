//! 도메인 모델.

pub mod connection;
pub mod notification;
pub mod payload;
