//! 연결 상태 모델.

use serde::{Deserialize, Serialize};

/// 세션 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// 연결 끊김 (초기 상태)
    Disconnected,
    /// 전송 계층 개방 + 핸드셰이크 진행 중
    Connecting,
    /// 핸드셰이크 완료, 송수신 가능
    Connected,
}

impl ConnectionState {
    /// 상태 배지 문자열 (대문자)
    pub fn badge(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
        }
    }

    /// 전송 핸들을 보유해야 하는 상태인지
    pub fn holds_transport(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }

    /// 상태별 조작 버튼 활성화 여부
    pub fn controls(&self) -> ControlState {
        match self {
            ConnectionState::Disconnected => ControlState {
                connect: true,
                disconnect: false,
                send_exercise: false,
                session_end: false,
            },
            ConnectionState::Connecting => ControlState {
                connect: false,
                disconnect: false,
                send_exercise: false,
                session_end: false,
            },
            ConnectionState::Connected => ControlState {
                connect: false,
                disconnect: true,
                send_exercise: true,
                session_end: true,
            },
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// 상태별 운영자 조작 활성화 집합
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlState {
    pub connect: bool,
    pub disconnect: bool,
    pub send_exercise: bool,
    pub session_end: bool,
}

impl ControlState {
    /// 활성화된 조작 이름 목록
    pub fn enabled(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.connect {
            names.push("connect");
        }
        if self.disconnect {
            names.push("disconnect");
        }
        if self.send_exercise {
            names.push("exercise");
        }
        if self.session_end {
            names.push("end");
        }
        names
    }
}
