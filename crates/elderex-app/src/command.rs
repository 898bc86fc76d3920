//! 운영자 명령 파싱.

use thiserror::Error;

/// 운영자 명령
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    /// 특징 텍스트를 생략하면 현재 기본값 사용
    Exercise(Option<String>),
    SessionEnd,
    Custom(String),
    Validate,
    Clear,
    Stats,
    Status,
    Token(String),
    Url(String),
    Features(String),
    Delay(u64),
    Debug(bool),
    Scroll(bool),
    Log,
    Help,
    Quit,
}

/// 명령 파싱 에러
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("알 수 없는 명령: {0} (help로 목록 확인)")]
    Unknown(String),

    #[error("{0} 명령에 인자가 필요합니다")]
    MissingArgument(&'static str),

    #[error("{command} 인자가 올바르지 않습니다: {value}")]
    InvalidArgument { command: &'static str, value: String },
}

pub const HELP: &str = "\
명령 목록:
  connect               토큰으로 연결
  disconnect            연결 해제
  exercise [csv]        운동 데이터 전송 (생략 시 기본 특징값)
  end                   세션 종료 신호 전송
  custom <json>         사용자 정의 JSON 전송
  validate              토큰 검증 (GET /auth/validate)
  clear                 로그 화면 비우기
  stats                 송수신 통계
  status                연결 상태
  token <jwt>           JWT 토큰 설정
  url <base>            서버 기본 URL 설정
  features <csv>        기본 특징값 설정
  delay <ms>            재연결 지연 힌트 설정
  debug on|off          debug 로그 표시
  scroll on|off         자동 출력 (off면 log 명령까지 보류)
  log                   보류된 로그 출력
  help                  도움말
  quit                  종료";

/// 한 줄 파싱. 빈 줄이면 `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    let command = match name.to_ascii_lowercase().as_str() {
        "connect" => Command::Connect,
        "disconnect" => Command::Disconnect,
        "exercise" | "send" => Command::Exercise(arg),
        "end" => Command::SessionEnd,
        "custom" => Command::Custom(rest.to_string()),
        "validate" => Command::Validate,
        "clear" => Command::Clear,
        "stats" => Command::Stats,
        "status" => Command::Status,
        "token" => Command::Token(rest.to_string()),
        "url" => Command::Url(arg.ok_or(CommandError::MissingArgument("url"))?),
        "features" => Command::Features(arg.ok_or(CommandError::MissingArgument("features"))?),
        "delay" => {
            let value = arg.ok_or(CommandError::MissingArgument("delay"))?;
            let ms = value.parse().map_err(|_| CommandError::InvalidArgument {
                command: "delay",
                value,
            })?;
            Command::Delay(ms)
        }
        "debug" => Command::Debug(on_off("debug", arg)?),
        "scroll" => Command::Scroll(on_off("scroll", arg)?),
        "log" => Command::Log,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn on_off(command: &'static str, arg: Option<String>) -> Result<bool, CommandError> {
    let value = arg.ok_or(CommandError::MissingArgument(command))?;
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(CommandError::InvalidArgument { command, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("connect"), Ok(Some(Command::Connect)));
        assert_eq!(parse(" END "), Ok(Some(Command::SessionEnd)));
        assert_eq!(parse("quit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn exercise_argument_is_optional() {
        assert_eq!(parse("exercise"), Ok(Some(Command::Exercise(None))));
        assert_eq!(
            parse("exercise 1,2, 3"),
            Ok(Some(Command::Exercise(Some("1,2, 3".to_string()))))
        );
    }

    #[test]
    fn custom_keeps_rest_of_line() {
        assert_eq!(
            parse(r#"custom {"a": [1, 2]}"#),
            Ok(Some(Command::Custom(r#"{"a": [1, 2]}"#.to_string())))
        );
        assert_eq!(parse("custom"), Ok(Some(Command::Custom(String::new()))));
    }

    #[test]
    fn toggles_and_numbers() {
        assert_eq!(parse("debug on"), Ok(Some(Command::Debug(true))));
        assert_eq!(parse("scroll OFF"), Ok(Some(Command::Scroll(false))));
        assert_eq!(parse("delay 2500"), Ok(Some(Command::Delay(2500))));
        assert_eq!(
            parse("delay soon"),
            Err(CommandError::InvalidArgument {
                command: "delay",
                value: "soon".to_string()
            })
        );
        assert_eq!(parse("debug"), Err(CommandError::MissingArgument("debug")));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse("reboot now"),
            Err(CommandError::Unknown("reboot".to_string()))
        );
    }
}
