//! SockJS websocket 전송 프레이밍.
//!
//! 서버 → 클라이언트: `o`(open), `h`(heartbeat), `a[...]`(메시지 배열), `c[code,"reason"]`(close).
//! 클라이언트 → 서버: 문자열 하나를 담은 JSON 배열.

use elderex_core::error::CoreError;
use url::Url;

/// 서버에서 수신한 SockJS 프레임
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SockJsFrame {
    Open,
    Heartbeat,
    Messages(Vec<String>),
    Close { code: u16, reason: String },
}

/// SockJS 프레임 디코딩
pub fn decode(text: &str) -> Result<SockJsFrame, CoreError> {
    let Some(kind) = text.chars().next() else {
        return Err(CoreError::Protocol("빈 SockJS 프레임".to_string()));
    };
    let rest = &text[kind.len_utf8()..];

    match kind {
        'o' => Ok(SockJsFrame::Open),
        'h' => Ok(SockJsFrame::Heartbeat),
        'a' => {
            let messages: Vec<String> = serde_json::from_str(rest)
                .map_err(|e| CoreError::Protocol(format!("SockJS 메시지 배열 파싱 실패: {e}")))?;
            Ok(SockJsFrame::Messages(messages))
        }
        'm' => {
            let message: String = serde_json::from_str(rest)
                .map_err(|e| CoreError::Protocol(format!("SockJS 메시지 파싱 실패: {e}")))?;
            Ok(SockJsFrame::Messages(vec![message]))
        }
        'c' => {
            let (code, reason): (u16, String) = serde_json::from_str(rest)
                .map_err(|e| CoreError::Protocol(format!("SockJS close 파싱 실패: {e}")))?;
            Ok(SockJsFrame::Close { code, reason })
        }
        other => Err(CoreError::Protocol(format!(
            "알 수 없는 SockJS 프레임 종류: {other}"
        ))),
    }
}

/// 클라이언트 송신 메시지 인코딩
pub fn encode(message: &str) -> Result<String, CoreError> {
    Ok(serde_json::to_string(&[message])?)
}

/// SockJS 세션 URL 생성
///
/// `{endpoint}/{server-id}/{session-id}/websocket` (server-id: 000–999)
pub fn session_url(endpoint: &Url) -> Url {
    let server_id = rand::random::<u16>() % 1000;
    let session_id = uuid::Uuid::new_v4().simple().to_string();
    let mut url = endpoint.clone();
    let path = format!(
        "{}/{server_id:03}/{session_id}/websocket",
        endpoint.path().trim_end_matches('/')
    );
    url.set_path(&path);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn decode_control_frames() {
        assert_eq!(decode("o").unwrap(), SockJsFrame::Open);
        assert_eq!(decode("h").unwrap(), SockJsFrame::Heartbeat);
        assert_eq!(
            decode(r#"c[3000,"Go away!"]"#).unwrap(),
            SockJsFrame::Close {
                code: 3000,
                reason: "Go away!".to_string()
            }
        );
    }

    #[test]
    fn decode_message_array_with_nul() {
        let frame = decode(r#"a["CONNECTED\nversion:1.2\n\n\u0000"]"#).unwrap();
        assert_eq!(
            frame,
            SockJsFrame::Messages(vec!["CONNECTED\nversion:1.2\n\n\0".to_string()])
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_matches!(decode(""), Err(CoreError::Protocol(_)));
        assert_matches!(decode("x"), Err(CoreError::Protocol(_)));
        assert_matches!(decode("a[1,2"), Err(CoreError::Protocol(_)));
    }

    #[test]
    fn encode_wraps_in_array() {
        assert_eq!(encode("SEND\n\n\0").unwrap(), r#"["SEND\n\n\u0000"]"#);
    }

    #[test]
    fn session_url_shape() {
        let endpoint = Url::parse("ws://localhost:8080/websocket").unwrap();
        let url = session_url(&endpoint);

        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], "websocket");
        assert_eq!(segments[1].len(), 3);
        assert!(segments[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(segments[2].len(), 32);
        assert_eq!(segments[3], "websocket");
    }
}
