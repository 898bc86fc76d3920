//! # elderex
//!
//! ElderEx WebSocket 테스터 바이너리 진입점.
//! 설정 로드, CLI 오버라이드, 어댑터 와이어링 후 컨트롤러 루프 실행.

use anyhow::{anyhow, Result};
use clap::Parser;
use elderex_app::command::Command;
use elderex_app::console::ConsoleSink;
use elderex_app::controller::{Controller, ControllerDeps};
use elderex_core::config::{TesterConfig, TransportMode};
use elderex_core::config_manager::ConfigManager;
use elderex_network::auth::TokenValidationClient;
use elderex_network::ws_client::{StompWsConnector, TransportOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// ElderEx WebSocket 테스터
///
/// STOMP over SockJS 엔드포인트 진단용 대화형 클라이언트
#[derive(Parser, Debug)]
#[command(name = "elderex")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 서버 기본 URL (기본: http://localhost:8080)
    #[arg(long, short = 's')]
    server: Option<String>,

    /// JWT 토큰
    #[arg(long, short = 't')]
    token: Option<String>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "warn")]
    log_level: String,

    /// debug 알림 표시
    #[arg(long)]
    show_debug: bool,

    /// 자동 출력 끄기 (log 명령으로 확인)
    #[arg(long)]
    no_auto_scroll: bool,

    /// SockJS 없이 순수 WebSocket으로 STOMP 전송
    #[arg(long)]
    raw: bool,

    /// 시작하자마자 연결
    #[arg(long)]
    connect: bool,
}

impl Args {
    /// CLI 인자로 설정 오버라이드 (파일에는 저장하지 않음)
    fn apply(&self, config: &mut TesterConfig) {
        if let Some(server) = &self.server {
            config.server.base_url = server.clone();
        }
        if let Some(token) = &self.token {
            config.auth.token = Some(token.clone());
        }
        if self.show_debug {
            config.display.show_debug = true;
        }
        if self.no_auto_scroll {
            config.display.auto_scroll = false;
        }
        if self.raw {
            config.server.transport = TransportMode::Raw;
        }
    }
}

/// 배너 출력
fn print_banner() {
    println!();
    println!("╔══════════════════════════════════════════╗");
    println!("║   🧓 ElderEx WebSocket Tester            ║");
    println!("║   STOMP over SockJS 진단 클라이언트      ║");
    println!("╚══════════════════════════════════════════╝");
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 진단 로그는 stderr, 운영자 출력은 stdout
    let log_filter = format!(
        "elderex={lvl},elderex_app={lvl},elderex_core={lvl},elderex_network={lvl},elderex_session={lvl}",
        lvl = args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    print_banner();

    let config_manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .map_err(|e| anyhow!("설정 로드 실패: {e}"))?;
    info!("설정 파일: {}", config_manager.config_path().display());

    let mut config = config_manager.get();
    args.apply(&mut config);
    info!(
        "서버: {} ({:?})",
        config.server.base_url, config.server.transport
    );

    let console = Arc::new(ConsoleSink::stdio(config.display.auto_scroll));
    let connector = Arc::new(StompWsConnector::new(TransportOptions::from_config(&config)));
    let validator = Arc::new(
        TokenValidationClient::new(config.request_timeout())
            .map_err(|e| anyhow!("HTTP 클라이언트 초기화 실패: {e}"))?,
    );

    let mut controller = Controller::new(ControllerDeps {
        config,
        config_manager: Some(config_manager),
        connector,
        validator,
        console,
    });
    controller.start();

    if args.connect {
        controller.execute(Command::Connect);
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    controller.run(stdin).await?;

    info!("ElderEx 테스터 종료");
    Ok(())
}
