//! 애플리케이션 컨트롤러.
//!
//! 모든 컴포넌트를 소유하고, 운영자 입력·전송 이벤트·토큰 검증 결과·Ctrl-C를
//! 하나의 `select!` 루프에서 순서대로 처리한다. 세션 상태 변경은 이 루프에서만 일어난다.

use elderex_core::config::TesterConfig;
use elderex_core::config_manager::ConfigManager;
use elderex_core::error::CoreError;
use elderex_core::models::connection::ConnectionState;
use elderex_core::ports::transport::{SessionEvent, TransportConnector};
use elderex_core::ports::validator::TokenValidator;
use elderex_session::dispatcher::MessageDispatcher;
use elderex_session::notification_log::NotificationLog;
use elderex_session::session::{ConnectionSession, SessionComponents};
use elderex_session::stats::StatsCounter;
use elderex_session::uptime::UptimeTimer;
use elderex_session::validation::TokenValidation;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::command::{self, Command, HELP};
use crate::console::ConsoleSink;

/// 명령 처리 후 루프 진행 여부
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// 실행 중 바꿀 수 있는 운영자 입력값
#[derive(Debug, Clone)]
struct OperatorSettings {
    token: String,
    base_url: String,
    reconnect_delay_ms: u64,
    features: String,
}

/// 컨트롤러 구성 요소
pub struct ControllerDeps {
    pub config: TesterConfig,
    /// 있으면 설정 변경을 파일에 저장
    pub config_manager: Option<ConfigManager>,
    pub connector: Arc<dyn TransportConnector>,
    pub validator: Arc<dyn TokenValidator>,
    pub console: Arc<ConsoleSink>,
}

/// 애플리케이션 컨트롤러
pub struct Controller {
    config: TesterConfig,
    config_manager: Option<ConfigManager>,
    settings: OperatorSettings,
    session: ConnectionSession,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    dispatcher: Arc<MessageDispatcher>,
    validation: TokenValidation,
    validations: JoinSet<Result<String, CoreError>>,
    console: Arc<ConsoleSink>,
    log: Arc<NotificationLog>,
    stats: Arc<StatsCounter>,
    uptime: Arc<UptimeTimer>,
}

impl Controller {
    pub fn new(deps: ControllerDeps) -> Self {
        let ControllerDeps {
            config,
            config_manager,
            connector,
            validator,
            console,
        } = deps;

        let stats = Arc::new(StatsCounter::new());
        let log = Arc::new(NotificationLog::new(
            console.clone(),
            stats.clone(),
            config.display.show_debug,
        ));
        let uptime = Arc::new(UptimeTimer::new());
        let dispatcher = Arc::new(MessageDispatcher::new(
            log.clone(),
            stats.clone(),
            &config.destinations,
            config.payload.expected_feature_count,
        ));

        let (session, events) = ConnectionSession::new(
            connector,
            config.destinations.clone(),
            SessionComponents {
                log: log.clone(),
                stats: stats.clone(),
                uptime: uptime.clone(),
                status: console.clone(),
                inbound: dispatcher.clone(),
            },
        );

        let settings = OperatorSettings {
            token: config.auth.token.clone().unwrap_or_default(),
            base_url: config.server.base_url.clone(),
            reconnect_delay_ms: config.server.reconnect_delay_ms,
            features: config.payload.features.clone(),
        };

        Self {
            validation: TokenValidation::new(validator, log.clone()),
            validations: JoinSet::new(),
            config,
            config_manager,
            settings,
            session,
            events,
            dispatcher,
            console,
            log,
            stats,
            uptime,
        }
    }

    /// 시작 알림 + 초기 상태 표시
    pub fn start(&self) {
        self.console
            .notice(&format!("● {}", self.session.state().badge()));
        self.log.info("👋 ElderEx WebSocket Tester 초기화됨");
        self.log
            .info("💡 token <jwt> 로 토큰을 설정하고 connect 로 연결하세요 (help: 명령 목록)");
    }

    pub fn session(&self) -> &ConnectionSession {
        &self.session
    }

    pub fn log(&self) -> &Arc<NotificationLog> {
        &self.log
    }

    pub fn stats(&self) -> &Arc<StatsCounter> {
        &self.stats
    }

    /// 명령 한 건 처리
    pub fn execute(&mut self, command: Command) -> Flow {
        debug!("명령 실행: {command:?}");
        match command {
            Command::Connect => {
                let result = self.session.connect(
                    &self.settings.token,
                    &self.settings.base_url,
                    self.settings.reconnect_delay_ms,
                );
                if let Err(e) = result {
                    debug!("연결 요청 거부: {e}");
                }
            }
            Command::Disconnect => self.session.disconnect(),
            Command::Exercise(features) => {
                let text = features.unwrap_or_else(|| self.settings.features.clone());
                let _ = self.dispatcher.send_exercise(&mut self.session, &text);
            }
            Command::SessionEnd => {
                let _ = self.dispatcher.send_session_end(&mut self.session);
            }
            Command::Custom(text) => {
                let _ = self.dispatcher.send_custom(&mut self.session, &text);
            }
            Command::Validate => {
                if let Some(request) = self
                    .validation
                    .begin(&self.settings.base_url, &self.settings.token)
                {
                    self.validations.spawn(request);
                }
            }
            Command::Clear => self.log.clear(),
            Command::Stats => self.print_stats(),
            Command::Status => self.print_status(),
            Command::Token(token) => {
                self.settings.token = token.trim().to_string();
                if self.settings.token.is_empty() {
                    self.console.notice("🔑 토큰을 지웠습니다");
                } else {
                    self.console.notice(&format!(
                        "🔑 토큰 설정됨 ({}자)",
                        self.settings.token.chars().count()
                    ));
                }
            }
            Command::Url(url) => {
                self.console.notice(&format!("🌐 서버 URL: {url}"));
                self.persist(|c| c.server.base_url = url.clone());
                self.settings.base_url = url;
            }
            Command::Features(features) => {
                self.console.notice("🧮 기본 특징값을 변경했습니다");
                self.persist(|c| c.payload.features = features.clone());
                self.settings.features = features;
            }
            Command::Delay(ms) => {
                self.settings.reconnect_delay_ms = ms;
                self.persist(|c| c.server.reconnect_delay_ms = ms);
                self.console.notice(&format!("⏱️ 재연결 지연: {ms}ms"));
            }
            Command::Debug(show) => {
                self.log.set_show_debug(show);
                self.persist(|c| c.display.show_debug = show);
                self.console
                    .notice(&format!("🐞 debug 표시: {}", on_off(show)));
            }
            Command::Scroll(enabled) => {
                self.console.set_auto_scroll(enabled);
                self.persist(|c| c.display.auto_scroll = enabled);
                self.console
                    .notice(&format!("📜 자동 출력: {}", on_off(enabled)));
            }
            Command::Log => self.console.flush(),
            Command::Help => self.console.notice(HELP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// 입력 한 줄 처리
    pub fn execute_line(&mut self, line: &str) -> Flow {
        match command::parse(line) {
            Ok(Some(command)) => self.execute(command),
            Ok(None) => Flow::Continue,
            Err(e) => {
                self.console.notice(&format!("❓ {e}"));
                Flow::Continue
            }
        }
    }

    /// 전송 이벤트 한 건 반영
    pub fn handle_event(&mut self, event: SessionEvent) {
        self.session.handle_event(event);
    }

    /// 조건이 참이 될 때까지 전송 이벤트 처리. 시간 안에 만족하면 `true`.
    pub async fn pump_until<F>(&mut self, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&ConnectionSession) -> bool,
    {
        let session = &mut self.session;
        let events = &mut self.events;
        let wait = async {
            while !predicate(&*session) {
                match events.recv().await {
                    Some(event) => session.handle_event(event),
                    None => return false,
                }
            }
            true
        };
        tokio::time::timeout(timeout, wait).await.unwrap_or(false)
    }

    /// 메인 루프
    pub async fn run<R>(&mut self, input: R) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => {
                        if self.execute_line(&line) == Flow::Quit {
                            break;
                        }
                    }
                    None => {
                        debug!("입력 스트림 종료");
                        break;
                    }
                },
                Some(event) = self.events.recv() => self.session.handle_event(event),
                Some(joined) = self.validations.join_next(), if !self.validations.is_empty() => {
                    self.on_validation_joined(joined);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C 수신");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// 종료 처리
    ///
    /// 연결 중이면 정상 종료를 요청하고 제한 시간 동안 완료를 기다린다.
    pub async fn shutdown(&mut self) {
        if self.session.state() == ConnectionState::Connected {
            self.session.disconnect();
            let limit = self.config.disconnect_timeout() + Duration::from_secs(1);
            let closed = self
                .pump_until(limit, |s| s.state() == ConnectionState::Disconnected)
                .await;
            if !closed {
                warn!("정상 종료 대기 시간 초과, 강제 해제");
            }
        }
        if self.session.state() != ConnectionState::Disconnected {
            self.session.disconnect();
        }

        let pending = self.validations.len();
        if pending > 0 {
            debug!("진행 중인 토큰 검증 {pending}건 대기");
            let limit = self.config.request_timeout();
            if tokio::time::timeout(limit, self.settle_validations())
                .await
                .is_err()
            {
                warn!("토큰 검증 대기 시간 초과");
            }
            self.validations.abort_all();
        }
        self.console.flush();
        info!(
            "종료: 송신 {} / 수신 {}",
            self.stats.sent(),
            self.stats.received()
        );
    }

    /// 진행 중인 토큰 검증을 모두 기다려 결과 기록
    pub async fn settle_validations(&mut self) {
        while let Some(joined) = self.validations.join_next().await {
            self.on_validation_joined(joined);
        }
    }

    fn on_validation_joined(
        &self,
        joined: Result<Result<String, CoreError>, tokio::task::JoinError>,
    ) {
        match joined {
            Ok(outcome) => self.validation.report(outcome),
            Err(e) => warn!("토큰 검증 태스크 실패: {e}"),
        }
    }

    fn print_stats(&self) {
        let snapshot = self.stats.snapshot();
        let last_activity = snapshot
            .last_activity
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| "-".to_string());
        self.console.notice(&format!(
            "📊 송신 {} | 수신 {} | 업타임 {} | 마지막 활동 {last_activity}",
            snapshot.sent,
            snapshot.received,
            self.uptime.display(),
        ));
    }

    fn print_status(&self) {
        let state = self.session.state();
        let controls = state.controls().enabled().join(", ");
        self.console.notice(&format!(
            "● {} | 서버 {} | 구독 {} | 토큰 {} | 사용 가능: {}",
            state.badge(),
            self.settings.base_url,
            self.session.subscription().unwrap_or("-"),
            if self.settings.token.is_empty() { "없음" } else { "설정됨" },
            if controls.is_empty() { "-" } else { controls.as_str() },
        ));
    }

    fn persist<F>(&self, change: F)
    where
        F: FnOnce(&mut TesterConfig),
    {
        let Some(manager) = &self.config_manager else {
            return;
        };
        if let Err(e) = manager.update_with(change) {
            warn!("설정 저장 실패: {e}");
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
