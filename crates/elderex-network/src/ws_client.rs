//! STOMP over WebSocket 전송 어댑터.
//!
//! `tokio-tungstenite` 기반. SockJS websocket 전송 또는 순수 WebSocket 위에서
//! STOMP 세션을 맺고, 결과를 `EventSender`로 세션 루프에 전달한다.
//! 핸들은 명령 채널만 들고 있고 실제 소켓은 연결 태스크가 소유한다.

use elderex_core::config::{TesterConfig, TransportMode};
use elderex_core::error::CoreError;
use elderex_core::ports::transport::{
    ConnectRequest, EventSender, TransportConnector, TransportEvent, TransportHandle,
};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::sockjs::{self, SockJsFrame};
use crate::stomp::{StompCommand, StompDecoder, StompFrame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// CONNECT 프레임의 지원 버전
const ACCEPT_VERSION: &str = "1.1,1.2";

/// DISCONNECT 영수증 ID
const DISCONNECT_RECEIPT: &str = "disconnect-0";

/// 전송 옵션
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub mode: TransportMode,
    pub handshake_timeout: Duration,
    pub disconnect_timeout: Duration,
    /// 클라이언트 송신 heart-beat 간격 (0이면 비활성)
    pub heartbeat: Duration,
}

impl TransportOptions {
    pub fn from_config(config: &TesterConfig) -> Self {
        Self {
            mode: config.server.transport,
            handshake_timeout: config.handshake_timeout(),
            disconnect_timeout: config.disconnect_timeout(),
            heartbeat: Duration::from_millis(config.server.heartbeat_ms),
        }
    }
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::from_config(&TesterConfig::default_config())
    }
}

/// STOMP/WebSocket 전송 팩토리: `TransportConnector` 포트 구현
pub struct StompWsConnector {
    options: TransportOptions,
}

impl StompWsConnector {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    /// 엔드포인트 URL → 실제 WebSocket URL
    fn resolve_target(&self, raw: &str) -> Result<Url, CoreError> {
        let mut url = Url::parse(raw)
            .map_err(|e| CoreError::TransportConstruction(format!("잘못된 URL '{raw}': {e}")))?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(CoreError::TransportConstruction(format!(
                    "지원하지 않는 스킴: {other}"
                )))
            }
        };
        url.set_scheme(scheme).map_err(|_| {
            CoreError::TransportConstruction(format!("스킴 변환 실패: {raw}"))
        })?;

        if url.host_str().is_none() {
            return Err(CoreError::TransportConstruction(format!(
                "호스트가 없는 URL: {raw}"
            )));
        }

        Ok(match self.options.mode {
            TransportMode::SockJs => sockjs::session_url(&url),
            TransportMode::Raw => url,
        })
    }
}

impl TransportConnector for StompWsConnector {
    fn open(
        &self,
        request: ConnectRequest,
        events: EventSender,
    ) -> Result<Box<dyn TransportHandle>, CoreError> {
        let target = self.resolve_target(&request.url)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::TransportConstruction(format!("tokio 런타임 없음: {e}")))?;

        info!(
            "STOMP 전송 개방 (세대 {}): {target} [{:?}]",
            events.generation(),
            self.options.mode
        );

        let host = target.host_str().unwrap_or("localhost").to_string();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(run_connection(
            target,
            request.headers,
            host,
            self.options.clone(),
            commands_rx,
            events,
        ));

        Ok(Box::new(WsTransportHandle {
            commands: commands_tx,
            next_subscription: 0,
            task,
        }))
    }
}

/// 핸들 → 연결 태스크 명령
#[derive(Debug)]
enum Command {
    Send {
        destination: String,
        headers: Vec<(String, String)>,
        body: String,
    },
    Subscribe {
        id: String,
        destination: String,
    },
    Disconnect,
}

/// 연결 태스크 핸들: `TransportHandle` 포트 구현
pub struct WsTransportHandle {
    commands: mpsc::UnboundedSender<Command>,
    next_subscription: u32,
    task: JoinHandle<()>,
}

impl WsTransportHandle {
    fn dispatch(&self, command: Command) -> Result<(), CoreError> {
        self.commands
            .send(command)
            .map_err(|_| CoreError::Network("전송 태스크가 이미 종료됨".to_string()))
    }
}

impl TransportHandle for WsTransportHandle {
    fn send(
        &mut self,
        destination: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<(), CoreError> {
        self.dispatch(Command::Send {
            destination: destination.to_string(),
            headers: headers.to_vec(),
            body: body.to_string(),
        })
    }

    fn subscribe(&mut self, destination: &str) -> Result<String, CoreError> {
        let id = format!("sub-{}", self.next_subscription);
        self.dispatch(Command::Subscribe {
            id: id.clone(),
            destination: destination.to_string(),
        })?;
        self.next_subscription += 1;
        Ok(id)
    }

    fn disconnect(&mut self) -> Result<(), CoreError> {
        self.dispatch(Command::Disconnect)
    }

    fn abort(&mut self) {
        self.task.abort();
    }
}

impl Drop for WsTransportHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// WebSocket 위의 STOMP 프레임 송수신기
struct StompLink {
    ws: WsStream,
    mode: TransportMode,
    decoder: StompDecoder,
    close_reason: Option<String>,
}

impl StompLink {
    async fn open(target: &Url, mode: TransportMode) -> Result<Self, CoreError> {
        let (ws, _) = tokio_tungstenite::connect_async(target.as_str())
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 연결 실패: {e}")))?;

        let mut link = Self {
            ws,
            mode,
            decoder: StompDecoder::new(),
            close_reason: None,
        };
        if mode == TransportMode::SockJs {
            link.await_sockjs_open().await?;
        }
        Ok(link)
    }

    async fn await_sockjs_open(&mut self) -> Result<(), CoreError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => match sockjs::decode(text.as_str())? {
                    SockJsFrame::Open => return Ok(()),
                    SockJsFrame::Heartbeat => continue,
                    SockJsFrame::Close { code, reason } => {
                        return Err(CoreError::Network(format!(
                            "SockJS 세션 거부 ({code}): {reason}"
                        )))
                    }
                    SockJsFrame::Messages(_) => {
                        return Err(CoreError::Protocol(
                            "SockJS open 프레임 전에 메시지 수신".to_string(),
                        ))
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    return Err(CoreError::Network(
                        "SockJS open 프레임 전에 연결 종료".to_string(),
                    ))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(CoreError::Network(format!("WebSocket 수신 에러: {e}")))
                }
            }
        }
    }

    async fn send_frame(&mut self, frame: &StompFrame) -> Result<(), CoreError> {
        self.send_raw(&frame.encode()).await
    }

    async fn send_heartbeat(&mut self) -> Result<(), CoreError> {
        self.send_raw("\n").await
    }

    async fn send_raw(&mut self, text: &str) -> Result<(), CoreError> {
        let payload = match self.mode {
            TransportMode::SockJs => sockjs::encode(text)?,
            TransportMode::Raw => text.to_string(),
        };
        self.ws
            .send(Message::text(payload))
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 전송 실패: {e}")))
    }

    /// 다음 STOMP 프레임. 연결이 닫히면 `Ok(None)`.
    ///
    /// 취소되어도 디코더 버퍼가 유지되므로 `select!` 안에서 써도 된다.
    async fn next_frame(&mut self) -> Result<Option<StompFrame>, CoreError> {
        loop {
            if let Some(frame) = self.decoder.next_frame()? {
                return Ok(Some(frame));
            }
            if self.close_reason.is_some() {
                return Ok(None);
            }

            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => self.ingest(text.as_str())?,
                Some(Ok(Message::Binary(data))) => {
                    let text = String::from_utf8(data.to_vec())
                        .map_err(|e| CoreError::Protocol(format!("바이너리 UTF-8 오류: {e}")))?;
                    self.ingest(&text)?;
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str()))
                        .unwrap_or_else(|| "close 프레임".to_string());
                    self.close_reason = Some(reason);
                }
                Some(Ok(_)) => {} // Ping/Pong은 자동 처리
                Some(Err(e)) => {
                    return Err(CoreError::Network(format!("WebSocket 수신 에러: {e}")))
                }
                None => {
                    self.close_reason = Some("스트림 종료".to_string());
                }
            }
        }
    }

    fn ingest(&mut self, text: &str) -> Result<(), CoreError> {
        match self.mode {
            TransportMode::Raw => self.decoder.push(text),
            TransportMode::SockJs => match sockjs::decode(text)? {
                SockJsFrame::Messages(messages) => {
                    for message in messages {
                        self.decoder.push(&message);
                    }
                }
                SockJsFrame::Open | SockJsFrame::Heartbeat => {}
                SockJsFrame::Close { code, reason } => {
                    self.close_reason = Some(format!("SockJS {code} {reason}"));
                }
            },
        }
        Ok(())
    }

    fn close_detail(&self) -> String {
        match &self.close_reason {
            Some(reason) => format!("서버가 연결을 종료했습니다 ({reason})"),
            None => "서버가 연결을 종료했습니다".to_string(),
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            debug!("WebSocket 종료 중 에러 무시: {e}");
        }
    }
}

/// 핸드셰이크 완료 결과
struct Established {
    link: StompLink,
    version: Option<String>,
    server: Option<String>,
    heartbeat: Option<Duration>,
}

/// 연결 태스크 본체
async fn run_connection(
    target: Url,
    connect_headers: Vec<(String, String)>,
    host: String,
    options: TransportOptions,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: EventSender,
) {
    let established = match tokio::time::timeout(
        options.handshake_timeout,
        handshake(&target, &connect_headers, &host, &options, &events),
    )
    .await
    {
        Ok(Ok(established)) => established,
        Ok(Err(e)) => {
            warn!("STOMP 핸드셰이크 실패: {e}");
            events.emit(TransportEvent::HandshakeFailed(e.to_string()));
            return;
        }
        Err(_) => {
            warn!("STOMP 핸드셰이크 타임아웃: {:?}", options.handshake_timeout);
            events.emit(TransportEvent::HandshakeFailed(format!(
                "{}ms 안에 핸드셰이크가 끝나지 않았습니다",
                options.handshake_timeout.as_millis()
            )));
            return;
        }
    };

    let Established {
        mut link,
        version,
        server,
        heartbeat,
    } = established;
    events.emit(TransportEvent::Connected { version, server });

    let mut heartbeat = heartbeat.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send { destination, headers, body }) => {
                    let mut frame =
                        StompFrame::new(StompCommand::Send).header("destination", destination);
                    for (name, value) in headers {
                        frame = frame.header(name, value);
                    }
                    let frame = frame.body(body);
                    events.emit(TransportEvent::Trace(format!(">>> {}", frame.summary())));
                    if let Err(e) = link.send_frame(&frame).await {
                        events.emit(TransportEvent::Error(e.to_string()));
                        return;
                    }
                }
                Some(Command::Subscribe { id, destination }) => {
                    let frame = StompFrame::new(StompCommand::Subscribe)
                        .header("id", id)
                        .header("destination", destination)
                        .header("ack", "auto");
                    events.emit(TransportEvent::Trace(format!(">>> {}", frame.summary())));
                    if let Err(e) = link.send_frame(&frame).await {
                        events.emit(TransportEvent::Error(e.to_string()));
                        return;
                    }
                }
                Some(Command::Disconnect) => {
                    graceful_close(&mut link, &options, &events).await;
                    events.emit(TransportEvent::Closed);
                    return;
                }
                None => {
                    debug!("전송 핸들 해제됨, 연결 정리");
                    link.close().await;
                    return;
                }
            },
            frame = link.next_frame() => match frame {
                Ok(Some(frame)) => {
                    events.emit(TransportEvent::Trace(format!("<<< {}", frame.summary())));
                    match frame.command {
                        StompCommand::Message => {
                            let subscription =
                                frame.get("subscription").unwrap_or_default().to_string();
                            let destination =
                                frame.get("destination").unwrap_or_default().to_string();
                            events.emit(TransportEvent::Message {
                                subscription,
                                destination,
                                body: frame.body,
                            });
                        }
                        StompCommand::Error => {
                            events.emit(TransportEvent::Error(error_detail(&frame)));
                            link.close().await;
                            return;
                        }
                        other => debug!("처리하지 않는 STOMP 프레임: {other}"),
                    }
                }
                Ok(None) => {
                    events.emit(TransportEvent::Error(link.close_detail()));
                    return;
                }
                Err(e) => {
                    events.emit(TransportEvent::Error(e.to_string()));
                    link.close().await;
                    return;
                }
            },
            _ = tick(&mut heartbeat) => {
                if let Err(e) = link.send_heartbeat().await {
                    events.emit(TransportEvent::Error(e.to_string()));
                    return;
                }
            }
        }
    }
}

/// 소켓 개방 + CONNECT/CONNECTED 교환
async fn handshake(
    target: &Url,
    connect_headers: &[(String, String)],
    host: &str,
    options: &TransportOptions,
    events: &EventSender,
) -> Result<Established, CoreError> {
    let mut link = StompLink::open(target, options.mode).await?;

    let mut connect = StompFrame::new(StompCommand::Connect)
        .header("accept-version", ACCEPT_VERSION)
        .header("host", host)
        .header("heart-beat", format!("{},0", options.heartbeat.as_millis()));
    for (name, value) in connect_headers {
        connect = connect.header(name.clone(), value.clone());
    }

    events.emit(TransportEvent::Trace(format!(">>> {}", connect.summary())));
    link.send_frame(&connect).await?;

    loop {
        let Some(frame) = link.next_frame().await? else {
            return Err(CoreError::Handshake(link.close_detail()));
        };
        events.emit(TransportEvent::Trace(format!("<<< {}", frame.summary())));

        match frame.command {
            StompCommand::Connected => {
                let heartbeat = negotiate_outgoing_heartbeat(
                    options.heartbeat.as_millis() as u64,
                    frame.get("heart-beat"),
                );
                return Ok(Established {
                    version: frame.get("version").map(str::to_string),
                    server: frame.get("server").map(str::to_string),
                    heartbeat,
                    link,
                });
            }
            StompCommand::Error => return Err(CoreError::Handshake(error_detail(&frame))),
            other => debug!("핸드셰이크 중 예상치 못한 프레임 무시: {other}"),
        }
    }
}

/// DISCONNECT 송신 후 영수증을 기다렸다가 소켓 종료
async fn graceful_close(link: &mut StompLink, options: &TransportOptions, events: &EventSender) {
    let frame = StompFrame::new(StompCommand::Disconnect).header("receipt", DISCONNECT_RECEIPT);
    events.emit(TransportEvent::Trace(format!(">>> {}", frame.summary())));

    if let Err(e) = link.send_frame(&frame).await {
        warn!("DISCONNECT 전송 실패: {e}");
        link.close().await;
        return;
    }

    let wait_receipt = async {
        loop {
            match link.next_frame().await {
                Ok(Some(frame)) => {
                    events.emit(TransportEvent::Trace(format!("<<< {}", frame.summary())));
                    if frame.command == StompCommand::Receipt
                        && frame.get("receipt-id") == Some(DISCONNECT_RECEIPT)
                    {
                        return;
                    }
                }
                Ok(None) | Err(_) => return,
            }
        }
    };

    if tokio::time::timeout(options.disconnect_timeout, wait_receipt)
        .await
        .is_err()
    {
        warn!(
            "DISCONNECT 영수증 대기 시간 초과: {:?}",
            options.disconnect_timeout
        );
    }
    link.close().await;
}

/// ERROR 프레임 → 사람이 읽을 상세
fn error_detail(frame: &StompFrame) -> String {
    let body = frame.body.trim();
    match (frame.get("message"), body.is_empty()) {
        (Some(message), true) => message.to_string(),
        (Some(message), false) => format!("{message}: {body}"),
        (None, false) => body.to_string(),
        (None, true) => "서버가 ERROR 프레임을 보냈습니다".to_string(),
    }
}

/// 클라이언트 송신 heart-beat 간격 협상
///
/// 클라이언트가 `cx`를 제안하고 서버가 `sy`를 원하면 `max(cx, sy)`, 둘 중 하나가 0이면 없음.
fn negotiate_outgoing_heartbeat(client_ms: u64, server_header: Option<&str>) -> Option<Duration> {
    let server_wants = server_header
        .and_then(|h| h.split(',').nth(1))
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);
    if client_ms == 0 || server_wants == 0 {
        None
    } else {
        Some(Duration::from_millis(client_ms.max(server_wants)))
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
