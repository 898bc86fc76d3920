//! # elderex-network
//!
//! 네트워크 어댑터.
//!
//! - [`stomp`]: STOMP 1.2 프레임 코덱
//! - [`sockjs`]: SockJS websocket 전송 프레이밍
//! - [`ws_client`]: `TransportConnector` 구현 (tokio-tungstenite)
//! - [`auth`]: `TokenValidator` 구현 (reqwest)

pub mod auth;
pub mod sockjs;
pub mod stomp;
pub mod ws_client;
