//! # elderex-app
//!
//! 대화형 터미널 테스터의 조립 계층.
//! 바이너리(`main.rs`)와 통합 테스트가 같은 컨트롤러를 쓴다.

pub mod command;
pub mod console;
pub mod controller;
