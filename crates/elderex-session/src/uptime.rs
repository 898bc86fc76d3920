//! 연결 업타임 타이머.
//!
//! 연결 시점부터 1초마다 `mm:ss` 표시를 갱신한다.
//! 재시작 시 이전 틱 태스크를 중단하고 세대 번호로 늦게 깬 틱을 무시한다.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

/// 경과 초 → `mm:ss` (분은 99를 넘을 수 있음)
pub fn format_uptime(elapsed_secs: u64) -> String {
    format!("{:02}:{:02}", elapsed_secs / 60, elapsed_secs % 60)
}

struct UptimeState {
    display: RwLock<String>,
    generation: AtomicU64,
    ticks: AtomicU64,
}

impl UptimeState {
    /// 세대를 올리고 표시를 `00:00`으로. 새 세대 반환.
    fn reset(&self) -> u64 {
        let mut display = self.display.write();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *display = format_uptime(0);
        generation
    }

    /// 틱 반영. 세대가 바뀌었으면 쓰지 않고 `false`.
    ///
    /// 세대 확인과 표시 갱신은 같은 쓰기 잠금 안에서 한다.
    fn record_tick(&self, generation: u64, elapsed_secs: u64) -> bool {
        let mut display = self.display.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        *display = format_uptime(elapsed_secs);
        self.ticks.fetch_add(1, Ordering::SeqCst);
        true
    }
}

/// 업타임 타이머
pub struct UptimeTimer {
    state: Arc<UptimeState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for UptimeTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl UptimeTimer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(UptimeState {
                display: RwLock::new(format_uptime(0)),
                generation: AtomicU64::new(0),
                ticks: AtomicU64::new(0),
            }),
            task: Mutex::new(None),
        }
    }

    /// 타이머 시작. 이미 동작 중이면 이전 틱 소스를 먼저 중단.
    pub fn arm(&self) {
        let mut task = self.task.lock();
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let generation = self.state.reset();

        let state = self.state.clone();
        let start = Instant::now();
        *task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(start + TICK, TICK);
            loop {
                interval.tick().await;
                if !state.record_tick(generation, start.elapsed().as_secs()) {
                    break;
                }
            }
        }));

        debug!("업타임 타이머 시작 (세대 {generation})");
    }

    /// 타이머 중단 + `00:00`으로 리셋
    pub fn disarm(&self) {
        if let Some(previous) = self.task.lock().take() {
            previous.abort();
            debug!("업타임 타이머 중단");
        }
        self.state.reset();
    }

    pub fn is_armed(&self) -> bool {
        self.task.lock().is_some()
    }

    /// 현재 표시값
    pub fn display(&self) -> String {
        self.state.display.read().clone()
    }

    /// 누적 틱 수
    pub fn ticks(&self) -> u64 {
        self.state.ticks.load(Ordering::SeqCst)
    }
}

impl Drop for UptimeTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_pads_and_overflows() {
        assert_eq!(format_uptime(0), "00:00");
        assert_eq!(format_uptime(65), "01:05");
        assert_eq!(format_uptime(3599), "59:59");
        assert_eq!(format_uptime(6000), "100:00");
    }

    #[test]
    fn fresh_timer_is_idle() {
        let timer = UptimeTimer::new();
        assert_eq!(timer.display(), "00:00");
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn armed_timer_reports_elapsed() {
        let timer = UptimeTimer::new();
        timer.arm();
        tokio::time::sleep(Duration::from_millis(65_500)).await;

        assert_eq!(timer.display(), "01:05");
        assert_eq!(timer.ticks(), 65);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_resets_and_stops_ticks() {
        let timer = UptimeTimer::new();
        timer.arm();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        timer.disarm();

        assert_eq!(timer.display(), "00:00");
        assert!(!timer.is_armed());
        let ticks = timer.ticks();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.ticks(), ticks);
        assert_eq!(timer.display(), "00:00");
    }

    #[tokio::test(start_paused = true)]
    async fn late_tick_after_disarm_is_discarded() {
        let timer = UptimeTimer::new();
        timer.arm();
        let generation = timer.state.generation.load(Ordering::SeqCst);
        timer.disarm();

        // 중단 직전에 이미 깨어 있던 틱
        assert!(!timer.state.record_tick(generation, 5));
        assert_eq!(timer.display(), "00:00");
        assert_eq!(timer.ticks(), 0);

        timer.arm();
        let current = timer.state.generation.load(Ordering::SeqCst);
        assert!(timer.state.record_tick(current, 5));
        assert_eq!(timer.display(), "00:05");
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_keeps_single_tick_source() {
        let timer = UptimeTimer::new();
        timer.arm();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        timer.arm();
        timer.arm();
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        assert_eq!(timer.ticks(), 2 + 10);
        assert_eq!(timer.display(), "00:10");
    }
}
