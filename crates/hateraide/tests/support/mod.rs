#![allow(dead_code)]

use futures::channel::mpsc as fmpsc;
use futures::{SinkExt, StreamExt};
use hateraide::channel::{ChannelOptions, ModerationChannel};
use hateraide::common::StreamError;
use hateraide::common::http_client::HttpClient;
use hateraide::common::websocket::{WebSocketClient, WebSocketConnection, WsMessage, WsSink, WsStream};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use url::Url;

pub const RECONNECT: Duration = Duration::from_millis(5000);

/// Server side of one accepted mock connection
pub struct ServerEnd {
    pub to_client: fmpsc::UnboundedSender<Result<WsMessage, StreamError>>,
    pub from_client: fmpsc::UnboundedReceiver<WsMessage>,
}

impl ServerEnd {
    pub fn push_text(&self, text: &str) {
        self.to_client
            .unbounded_send(Ok(WsMessage::from(text.to_owned())))
            .expect("client gone");
    }

    pub fn push(&self, msg: WsMessage) {
        self.to_client.unbounded_send(Ok(msg)).expect("client gone");
    }

    pub async fn next_from_client(&mut self) -> Option<WsMessage> {
        self.from_client.next().await
    }
}

#[derive(Clone)]
pub struct MockSocketClient {
    pub connects: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
    pub gate: Option<Arc<Notify>>,
    accepted: mpsc::UnboundedSender<ServerEnd>,
}

impl MockSocketClient {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEnd>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        (
            Self {
                connects: Arc::new(AtomicUsize::new(0)),
                fail: Arc::new(AtomicBool::new(false)),
                gate: None,
                accepted,
            },
            rx,
        )
    }

    /// Connection attempts hang until the returned gate is notified
    pub fn gated() -> (Self, mpsc::UnboundedReceiver<ServerEnd>, Arc<Notify>) {
        let (mut client, rx) = Self::new();
        let gate = Arc::new(Notify::new());
        client.gate = Some(gate.clone());
        (client, rx, gate)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl WebSocketClient for MockSocketClient {
    type Error = std::io::Error;

    async fn connect(&self, _url: Url) -> Result<WebSocketConnection, Self::Error> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ));
        }

        let (to_client, client_rx) = fmpsc::unbounded();
        let (client_tx, from_client) = fmpsc::unbounded::<WsMessage>();
        let sink = client_tx.sink_map_err(|_| StreamError::closed());
        self.accepted
            .send(ServerEnd {
                to_client,
                from_client,
            })
            .map_err(|_| std::io::Error::other("test dropped the accept queue"))?;
        Ok(WebSocketConnection::new(
            WsSink::new(sink),
            WsStream::new(client_rx),
        ))
    }
}

pub fn push_url() -> Url {
    Url::parse("ws://localhost:8000/ws").unwrap()
}

pub fn channel(client: MockSocketClient) -> ModerationChannel<MockSocketClient> {
    ModerationChannel::new(
        client,
        push_url(),
        ChannelOptions::builder().reconnect_delay(RECONNECT).build(),
    )
}

/// Let spawned tasks run to quiescence without reaching any timer
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

pub fn moderation_frame(id: &str, action_type: &str) -> String {
    serde_json::json!({
        "type": "content_moderation",
        "action": {
            "reply_id": id,
            "action_type": action_type,
            "reason": format!("Content flagged for {action_type}"),
            "sentiment": "harmful",
            "timestamp": "2025-06-14T10:22:31.123456",
            "status": "applied"
        }
    })
    .to_string()
}

/// HTTP backend answering by request path
#[derive(Clone, Default)]
pub struct MockHttp {
    routes: Arc<Mutex<HashMap<String, (http::StatusCode, Vec<u8>)>>>,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl MockHttp {
    pub fn route(&self, path: &str, status: http::StatusCode, body: impl Into<Vec<u8>>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_owned(), (status, body.into()));
    }
}

impl HttpClient for MockHttp {
    type Error = std::convert::Infallible;

    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl core::future::Future<
        Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>,
    > + Send {
        let path = request.uri().path().to_owned();
        self.log.lock().unwrap().push(path.clone());
        let found = self.routes.lock().unwrap().get(&path).cloned();
        async move {
            let (status, body) =
                found.unwrap_or((http::StatusCode::NOT_FOUND, b"not found".to_vec()));
            Ok(http::Response::builder().status(status).body(body).unwrap())
        }
    }
}
