//! 行情推送 WebSocket 客户端
//!
//! 连接建立后先发送认证消息，之后每 30 秒发送一次心跳。
//! 连接断开后以固定间隔重连，超过次数后发出 `GaveUp` 事件并停止。
//! 收到的消息按 `type` 分发给订阅者。
//! 订阅的股票按引用计数维护，重连后自动重新订阅。

use futures::future::{AbortHandle, Abortable};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, sleep, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::client::TokenStore;

/// 重连全部失败后的提示
pub const GAVE_UP_MESSAGE: &str = "WebSocket连接失败，请刷新页面重试";

const EVENT_CAPACITY: usize = 256;

/// 股票代码 -> 订阅方数量
type Interest = Arc<Mutex<BTreeMap<String, usize>>>;

fn lock(interest: &Mutex<BTreeMap<String, usize>>) -> MutexGuard<'_, BTreeMap<String, usize>> {
    interest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 连接参数
#[derive(Debug, Clone)]
pub struct WsOptions {
    pub url: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for WsOptions {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(3),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

/// 收发的消息
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl WsMessage {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    pub fn auth(token: String) -> Self {
        Self {
            token: Some(token),
            ..Self::new("auth")
        }
    }

    pub fn ping() -> Self {
        Self::new("ping")
    }

    pub fn subscribe(codes: &[String]) -> Self {
        Self {
            codes: Some(codes.to_vec()),
            ..Self::new("subscribe")
        }
    }

    pub fn unsubscribe(codes: &[String]) -> Self {
        Self {
            codes: Some(codes.to_vec()),
            ..Self::new("unsubscribe")
        }
    }
}

/// 推送事件
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    Connected,
    Disconnected,
    Message(WsMessage),
    /// 重连次数用尽
    GaveUp(String),
}

/// 只接收某一类型消息的订阅
pub struct Subscription {
    kind: String,
    events: broadcast::Receiver<WsEvent>,
}

impl Subscription {
    /// 下一条匹配的消息；连接放弃或客户端关闭后返回 None
    pub async fn recv(&mut self) -> Option<WsMessage> {
        loop {
            match self.events.recv().await {
                Ok(WsEvent::Message(msg)) if msg.kind == self.kind => return Some(msg),
                Ok(WsEvent::GaveUp(_)) => return None,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("[WS] 订阅 {} 丢失 {} 条消息", self.kind, n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

pub struct QuoteStream {
    commands: mpsc::UnboundedSender<WsMessage>,
    events: broadcast::Sender<WsEvent>,
    connected: Arc<AtomicBool>,
    interest: Interest,
    abort: AbortHandle,
}

impl QuoteStream {
    /// 启动后台连接任务，认证 token 在每次连接时从 `tokens` 读取
    pub fn connect(options: WsOptions, tokens: TokenStore) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));
        let interest = Interest::default();
        let (abort, registration) = AbortHandle::new_pair();

        let task = run(
            options,
            tokens,
            command_rx,
            events.clone(),
            connected.clone(),
            interest.clone(),
        );
        tokio::spawn(async move {
            if Abortable::new(task, registration).await.is_err() {
                log::debug!("[WS] 连接已关闭");
            }
        });

        Self {
            commands,
            events,
            connected,
            interest,
            abort,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// 发送消息，未连接时返回错误
    pub fn send(&self, message: WsMessage) -> anyhow::Result<()> {
        if !self.is_connected() {
            anyhow::bail!("WebSocket未连接，无法发送消息");
        }
        self.commands
            .send(message)
            .map_err(|_| anyhow::anyhow!("WebSocket已关闭"))
    }

    /// 增加订阅；只有首次订阅的代码会发给服务端，未连接时在连接后补发
    pub fn subscribe(&self, codes: &[String]) -> anyhow::Result<()> {
        let fresh: Vec<String> = {
            let mut interest = lock(&self.interest);
            codes
                .iter()
                .filter(|code| {
                    let count = interest.entry(code.to_string()).or_insert(0);
                    *count += 1;
                    *count == 1
                })
                .cloned()
                .collect()
        };
        if fresh.is_empty() || !self.is_connected() {
            return Ok(());
        }
        self.send(WsMessage::subscribe(&fresh))
    }

    /// 减少订阅；最后一个订阅方退出时才通知服务端
    pub fn unsubscribe(&self, codes: &[String]) -> anyhow::Result<()> {
        let released: Vec<String> = {
            let mut interest = lock(&self.interest);
            codes
                .iter()
                .filter(|code| {
                    let Some(count) = interest.get_mut(code.as_str()) else {
                        return false;
                    };
                    *count -= 1;
                    if *count > 0 {
                        return false;
                    }
                    interest.remove(code.as_str());
                    true
                })
                .cloned()
                .collect()
        };
        if released.is_empty() || !self.is_connected() {
            return Ok(());
        }
        self.send(WsMessage::unsubscribe(&released))
    }

    /// 当前订阅的代码
    pub fn subscribed_codes(&self) -> Vec<String> {
        lock(&self.interest).keys().cloned().collect()
    }

    /// 订阅某一类型的消息
    pub fn on(&self, kind: &str) -> Subscription {
        Subscription {
            kind: kind.to_string(),
            events: self.events.subscribe(),
        }
    }

    /// 全部事件，含连接状态变化
    pub fn events(&self) -> broadcast::Receiver<WsEvent> {
        self.events.subscribe()
    }

    pub fn disconnect(&self) {
        self.abort.abort();
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for QuoteStream {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

// ==================== 后台任务 ====================

enum SessionEnd {
    /// 对端关闭或出错，需要重连
    Closed,
    /// 客户端已释放
    Shutdown,
}

async fn run(
    options: WsOptions,
    tokens: TokenStore,
    mut commands: mpsc::UnboundedReceiver<WsMessage>,
    events: broadcast::Sender<WsEvent>,
    connected: Arc<AtomicBool>,
    interest: Interest,
) {
    let mut attempts = 0u32;
    loop {
        let end = session(
            &options,
            &tokens,
            &mut commands,
            &events,
            &connected,
            &interest,
            &mut attempts,
        )
        .await;
        let was_connected = connected.swap(false, Ordering::SeqCst);
        if was_connected {
            let _ = events.send(WsEvent::Disconnected);
        }

        match end {
            Ok(SessionEnd::Shutdown) => return,
            Ok(SessionEnd::Closed) => log::info!("[WS] 连接关闭"),
            Err(e) => log::warn!("[WS] 连接错误: {}", e),
        }

        if attempts >= options.max_reconnect_attempts {
            log::error!("[WS] {}", GAVE_UP_MESSAGE);
            let _ = events.send(WsEvent::GaveUp(GAVE_UP_MESSAGE.to_string()));
            return;
        }
        attempts += 1;
        log::info!("[WS] 尝试重连 ({}/{})...", attempts, options.max_reconnect_attempts);
        sleep(options.reconnect_delay).await;
    }
}

async fn session(
    options: &WsOptions,
    tokens: &TokenStore,
    commands: &mut mpsc::UnboundedReceiver<WsMessage>,
    events: &broadcast::Sender<WsEvent>,
    connected: &AtomicBool,
    interest: &Mutex<BTreeMap<String, usize>>,
    attempts: &mut u32,
) -> anyhow::Result<SessionEnd> {
    let (stream, _) = connect_async(options.url.as_str()).await?;
    let (mut write, mut read) = stream.split();
    log::info!("[WS] 连接成功: {}", options.url);

    let auth = WsMessage::auth(tokens.token().unwrap_or_default());
    write.send(Message::Text(serde_json::to_string(&auth)?)).await?;

    *attempts = 0;
    connected.store(true, Ordering::SeqCst);

    let codes: Vec<String> = lock(interest).keys().cloned().collect();
    if !codes.is_empty() {
        log::info!("[WS] 重新订阅 {} 只股票", codes.len());
        write.send(Message::Text(serde_json::to_string(&WsMessage::subscribe(&codes))?)).await?;
    }
    let _ = events.send(WsEvent::Connected);

    let period = options.heartbeat_interval;
    let mut heartbeat = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                write.send(Message::Text(serde_json::to_string(&WsMessage::ping())?)).await?;
            }
            command = commands.recv() => match command {
                Some(msg) => {
                    write.send(Message::Text(serde_json::to_string(&msg)?)).await?;
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => dispatch(&text, events),
                Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }
}

fn dispatch(text: &str, events: &broadcast::Sender<WsEvent>) {
    match serde_json::from_str::<WsMessage>(text) {
        Ok(msg) if !msg.kind.is_empty() => {
            let _ = events.send(WsEvent::Message(msg));
        }
        Ok(_) => log::debug!("[WS] 忽略无类型消息"),
        Err(e) => log::error!("[WS] 解析消息失败: {}", e),
    }
}
