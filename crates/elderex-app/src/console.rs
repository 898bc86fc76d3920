//! 콘솔 표시 싱크.
//!
//! 알림은 `[HH:MM:SS] TAG 본문` 한 줄로 출력한다. 자동 출력이 꺼져 있으면
//! 줄을 보류했다가 `log` 명령이나 자동 출력 재개 시 한꺼번에 내보낸다.
//! 차단형 알림은 표준 에러로 보낸다.

use elderex_core::models::connection::ConnectionState;
use elderex_core::models::notification::NotificationEntry;
use elderex_core::ports::display::{DisplaySink, StatusListener};
use parking_lot::Mutex;
use std::io::Write;
use tracing::warn;

type Output = Box<dyn Write + Send>;

struct ConsoleState {
    out: Output,
    err: Output,
    auto_scroll: bool,
    pending: Vec<String>,
}

/// 콘솔 싱크
pub struct ConsoleSink {
    state: Mutex<ConsoleState>,
}

impl ConsoleSink {
    pub fn new(out: Output, err: Output, auto_scroll: bool) -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                out,
                err,
                auto_scroll,
                pending: Vec::new(),
            }),
        }
    }

    /// 표준 출력/에러에 연결된 싱크
    pub fn stdio(auto_scroll: bool) -> Self {
        Self::new(
            Box::new(std::io::stdout()),
            Box::new(std::io::stderr()),
            auto_scroll,
        )
    }

    pub fn set_auto_scroll(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.auto_scroll = enabled;
        if enabled {
            flush_pending(&mut state);
        }
    }

    pub fn auto_scroll(&self) -> bool {
        self.state.lock().auto_scroll
    }

    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// 보류된 줄 출력
    pub fn flush(&self) {
        flush_pending(&mut self.state.lock());
    }

    /// 로그에 남기지 않는 안내 출력 (도움말, 통계 등)
    pub fn notice(&self, text: &str) {
        let mut state = self.state.lock();
        write_line(&mut state.out, text);
    }
}

fn format_entry(entry: &NotificationEntry) -> String {
    format!(
        "[{}] {:<5} {}",
        entry.local_time(),
        entry.severity.tag(),
        entry.text
    )
}

fn flush_pending(state: &mut ConsoleState) {
    let pending = std::mem::take(&mut state.pending);
    for line in pending {
        write_line(&mut state.out, &line);
    }
}

fn write_line(out: &mut Output, line: &str) {
    if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
        warn!("콘솔 출력 실패: {e}");
    }
}

impl DisplaySink for ConsoleSink {
    fn display(&self, entry: &NotificationEntry) {
        let line = format_entry(entry);
        let mut state = self.state.lock();
        if state.auto_scroll {
            write_line(&mut state.out, &line);
        } else {
            state.pending.push(line);
        }
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        // ANSI 화면 지우기 + 커서 원점
        write_line(&mut state.out, "\x1b[2J\x1b[H");
    }

    fn alert(&self, message: &str) {
        let mut state = self.state.lock();
        write_line(&mut state.err, &format!("🚨 {message}"));
    }
}

impl StatusListener for ConsoleSink {
    fn on_state_changed(&self, state: ConnectionState) {
        let controls = state.controls().enabled();
        let controls = if controls.is_empty() {
            "-".to_string()
        } else {
            controls.join(", ")
        };
        let mut console = self.state.lock();
        write_line(
            &mut console.out,
            &format!("● {}  [사용 가능: {controls}]", state.badge()),
        );
    }
}
