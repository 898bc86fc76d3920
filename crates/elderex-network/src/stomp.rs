//! STOMP 1.2 프레임 코덱.
//!
//! `COMMAND\n(header:value\n)*\n<body>\0` 형식.
//! CONNECT/CONNECTED 프레임을 제외하고 헤더 값은 이스케이프한다.

use elderex_core::error::CoreError;
use std::fmt;
use std::str::FromStr;

/// 프레임 종결 문자
const NUL: u8 = 0;

/// 프레임 한 개의 최대 크기 (헤더 + 본문)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// STOMP 명령
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StompCommand {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl StompCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            StompCommand::Connect => "CONNECT",
            StompCommand::Stomp => "STOMP",
            StompCommand::Connected => "CONNECTED",
            StompCommand::Send => "SEND",
            StompCommand::Subscribe => "SUBSCRIBE",
            StompCommand::Unsubscribe => "UNSUBSCRIBE",
            StompCommand::Ack => "ACK",
            StompCommand::Nack => "NACK",
            StompCommand::Begin => "BEGIN",
            StompCommand::Commit => "COMMIT",
            StompCommand::Abort => "ABORT",
            StompCommand::Disconnect => "DISCONNECT",
            StompCommand::Message => "MESSAGE",
            StompCommand::Receipt => "RECEIPT",
            StompCommand::Error => "ERROR",
        }
    }

    /// 헤더 이스케이프 적용 여부 (CONNECT 계열은 제외)
    fn escapes_headers(&self) -> bool {
        !matches!(
            self,
            StompCommand::Connect | StompCommand::Stomp | StompCommand::Connected
        )
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StompCommand {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s {
            "CONNECT" => StompCommand::Connect,
            "STOMP" => StompCommand::Stomp,
            "CONNECTED" => StompCommand::Connected,
            "SEND" => StompCommand::Send,
            "SUBSCRIBE" => StompCommand::Subscribe,
            "UNSUBSCRIBE" => StompCommand::Unsubscribe,
            "ACK" => StompCommand::Ack,
            "NACK" => StompCommand::Nack,
            "BEGIN" => StompCommand::Begin,
            "COMMIT" => StompCommand::Commit,
            "ABORT" => StompCommand::Abort,
            "DISCONNECT" => StompCommand::Disconnect,
            "MESSAGE" => StompCommand::Message,
            "RECEIPT" => StompCommand::Receipt,
            "ERROR" => StompCommand::Error,
            other => {
                return Err(CoreError::Protocol(format!("알 수 없는 STOMP 명령: {other}")))
            }
        };
        Ok(command)
    }
}

/// STOMP 프레임
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: StompCommand,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// 헤더 추가 (빌더)
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 본문 설정 (빌더)
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// 헤더 조회. 반복 헤더는 첫 번째 값이 유효하다.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// 추적 로그용 한 줄 요약
    pub fn summary(&self) -> String {
        match self.get("destination") {
            Some(dest) => format!("{} {dest}", self.command),
            None => self.command.to_string(),
        }
    }

    /// 와이어 텍스트로 인코딩
    ///
    /// 본문이 있으면 `content-length`를 자동으로 붙인다.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');

        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }

        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push(NUL as char);
        out
    }
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, CoreError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(CoreError::Protocol(format!(
                    "잘못된 헤더 이스케이프: \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}

/// 스트림 디코더
///
/// 텍스트 조각을 누적하다가 완성된 프레임을 꺼낸다.
/// 프레임 사이의 EOL(heart-beat)은 건너뛴다.
#[derive(Debug, Default)]
pub struct StompDecoder {
    buf: Vec<u8>,
}

impl StompDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) {
        self.buf.extend_from_slice(chunk.as_bytes());
    }

    /// 버퍼에 남은 바이트 수
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// 다음 완성 프레임. 데이터가 부족하면 `Ok(None)`.
    pub fn next_frame(&mut self) -> Result<Option<StompFrame>, CoreError> {
        let start = self
            .buf
            .iter()
            .position(|b| *b != b'\n' && *b != b'\r')
            .unwrap_or(self.buf.len());
        if start > 0 {
            self.buf.drain(..start);
        }
        if self.buf.is_empty() {
            return Ok(None);
        }

        let Some(head_end) = find_header_end(&self.buf) else {
            return self.incomplete();
        };
        let (head_len, sep_len) = head_end;
        let head = std::str::from_utf8(&self.buf[..head_len])
            .map_err(|e| CoreError::Protocol(format!("헤더 UTF-8 오류: {e}")))?;

        let mut lines = head.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        let command: StompCommand = lines.next().unwrap_or_default().parse()?;
        let escape = command.escapes_headers();

        let mut headers = Vec::new();
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                return Err(CoreError::Protocol(format!("잘못된 헤더 줄: {line}")));
            };
            if escape {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let body_start = head_len + sep_len;
        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map(|(_, v)| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| CoreError::Protocol(format!("잘못된 content-length: {v}")))
            })
            .transpose()?;

        let body_end = match content_length {
            Some(len) => {
                let frame_end = body_start
                    .checked_add(len)
                    .filter(|end| *end < MAX_FRAME_SIZE)
                    .ok_or_else(|| {
                        CoreError::Protocol(format!("content-length가 너무 큼: {len}"))
                    })?;
                if self.buf.len() <= frame_end {
                    return self.incomplete();
                }
                if self.buf[frame_end] != NUL {
                    return Err(CoreError::Protocol(
                        "content-length 뒤에 NUL 종결 문자가 없음".to_string(),
                    ));
                }
                frame_end
            }
            None => match self.buf[body_start..].iter().position(|b| *b == NUL) {
                Some(offset) => body_start + offset,
                None => return self.incomplete(),
            },
        };

        let body = String::from_utf8(self.buf[body_start..body_end].to_vec())
            .map_err(|e| CoreError::Protocol(format!("본문 UTF-8 오류: {e}")))?;
        self.buf.drain(..=body_end);

        Ok(Some(StompFrame {
            command,
            headers,
            body,
        }))
    }

    /// 프레임이 아직 덜 왔을 때. 한도를 넘겨 쌓이면 프로토콜 오류.
    fn incomplete(&self) -> Result<Option<StompFrame>, CoreError> {
        if self.buf.len() > MAX_FRAME_SIZE {
            return Err(CoreError::Protocol(format!(
                "프레임이 {MAX_FRAME_SIZE}바이트를 넘었습니다"
            )));
        }
        Ok(None)
    }
}

/// 헤더 블록 끝 위치: (헤더 길이, 빈 줄 구분자 길이)
fn find_header_end(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < buf.len() {
        if buf[i] == b'\n' {
            if buf.get(i + 1) == Some(&b'\n') {
                return Some((i, 2));
            }
            if buf.get(i + 1) == Some(&b'\r') && buf.get(i + 2) == Some(&b'\n') {
                return Some((i, 3));
            }
        }
        i += 1;
    }
    None
}
