//! WebSocketプッシュ通知チャネル
//!
//! 受信メッセージは種別ごとに1つのハンドラへ振り分ける。
//! 同じ種別に再登録すると前のハンドラは置き換えられる（後勝ち）。
//! 再接続・バックオフは行わない。

use crate::error::Result;
use async_trait::async_trait;
use futures::StreamExt;
use ocr_client_common::{parse_push_message, EventKind, PushMessage};
use std::collections::HashMap;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// プッシュ通知の受信口
///
/// 実体はWebSocketだが、ストアからはこのトレイト越しに扱う。
#[async_trait]
pub trait PushTransport: Send {
    /// 次のメッセージを待つ。チャネルが閉じたら `None`
    async fn next_message(&mut self) -> Result<Option<PushMessage>>;

    /// 切断する。既に閉じていても成功扱い
    async fn disconnect(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// `ws(s)://.../ws/{batch_id}` への接続
pub struct PushChannel {
    url: String,
    stream: Option<WsStream>,
}

impl PushChannel {
    pub async fn connect(url: &str) -> Result<Self> {
        info!("WebSocket接続: {}", url);
        let (stream, _response) = connect_async(url).await?;
        Ok(Self {
            url: url.to_string(),
            stream: Some(stream),
        })
    }
}

#[async_trait]
impl PushTransport for PushChannel {
    async fn next_message(&mut self) -> Result<Option<PushMessage>> {
        loop {
            let Some(stream) = self.stream.as_mut() else {
                return Ok(None);
            };

            let text = match stream.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("UTF-8でないバイナリメッセージを無視");
                        continue;
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("サーバーが切断: {:?}", frame);
                    self.stream = None;
                    return Ok(None);
                }
                // Ping/Pongはtungstenite側で応答済み
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(e.into());
                }
                None => {
                    self.stream = None;
                    return Ok(None);
                }
            };

            match parse_push_message(&text) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => warn!("{}", e),
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            info!("WebSocket切断: {}", self.url);
            if let Err(e) = stream.close(None).await {
                debug!("切断時のエラーを無視: {}", e);
            }
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

pub type Handler<C> = Box<dyn FnMut(&mut C, &PushMessage) + Send>;

/// イベント種別 → ハンドラの対応表（1種別1ハンドラ、後勝ち）
pub struct EventDispatcher<C> {
    handlers: HashMap<EventKind, Handler<C>>,
}

impl<C> Default for EventDispatcher<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C> EventDispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// ハンドラを登録する。既存のハンドラを置き換えた場合 true
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> bool
    where
        F: FnMut(&mut C, &PushMessage) + Send + 'static,
    {
        self.handlers.insert(kind, Box::new(handler)).is_some()
    }

    /// メッセージを対応するハンドラへ渡す。ハンドラがなければ false
    pub fn dispatch(&mut self, ctx: &mut C, msg: &PushMessage) -> bool {
        match self.handlers.get_mut(&msg.kind) {
            Some(handler) => {
                handler(ctx, msg);
                true
            }
            None => false,
        }
    }
}
