use bytes::Bytes;
use n0_future::Stream;
use n0_future::stream::Boxed;
use smol_str::SmolStr;
use std::fmt::{self, Display};
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use url::Url;

use crate::stream::StreamError;

/// UTF-8 validated bytes for WebSocket text messages
#[repr(transparent)]
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
pub struct WsText(Bytes);

impl WsText {
    /// Get as string slice
    pub fn as_str(&self) -> &str {
        // SAFETY: every constructor starts from a `str`
        unsafe { std::str::from_utf8_unchecked(&self.0) }
    }
}

impl Deref for WsText {
    type Target = str;
    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for WsText {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<[u8]> for WsText {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for WsText {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(self.as_str(), f)
    }
}

impl From<String> for WsText {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<&str> for WsText {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

/// WebSocket close code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// Normal closure
    Normal,
    /// Endpoint going away
    Away,
    /// Protocol error
    Protocol,
    /// Unsupported data
    Unsupported,
    /// Closed without a status code
    Abnormal,
    /// Invalid frame payload data
    Invalid,
    /// Policy violation
    Policy,
    /// Message too big
    Size,
    /// Unexpected condition
    Error,
    /// Other code
    Other(u16),
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::Away,
            1002 => CloseCode::Protocol,
            1003 => CloseCode::Unsupported,
            1006 => CloseCode::Abnormal,
            1007 => CloseCode::Invalid,
            1008 => CloseCode::Policy,
            1009 => CloseCode::Size,
            1011 => CloseCode::Error,
            other => CloseCode::Other(other),
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> u16 {
        match code {
            CloseCode::Normal => 1000,
            CloseCode::Away => 1001,
            CloseCode::Protocol => 1002,
            CloseCode::Unsupported => 1003,
            CloseCode::Abnormal => 1006,
            CloseCode::Invalid => 1007,
            CloseCode::Policy => 1008,
            CloseCode::Size => 1009,
            CloseCode::Error => 1011,
            CloseCode::Other(code) => code,
        }
    }
}

/// WebSocket close frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// Close code
    pub code: CloseCode,
    /// Close reason text
    pub reason: SmolStr,
}

impl CloseFrame {
    /// Create a new close frame
    pub fn new(code: CloseCode, reason: impl Into<SmolStr>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// WebSocket message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// Text message (UTF-8)
    Text(WsText),
    /// Binary message
    Binary(Bytes),
    /// Close frame
    Close(Option<CloseFrame>),
}

impl WsMessage {
    /// Serialize a payload into a JSON text frame
    pub fn json<T: serde::Serialize + ?Sized>(payload: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(payload).map(WsMessage::from)
    }

    /// Check if this is a close message
    pub fn is_close(&self) -> bool {
        matches!(self, WsMessage::Close(_))
    }

    /// Get as text, if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }
}

impl From<String> for WsMessage {
    fn from(s: String) -> Self {
        WsMessage::Text(WsText::from(s))
    }
}

impl From<&str> for WsMessage {
    fn from(s: &str) -> Self {
        WsMessage::Text(WsText::from(s))
    }
}

impl From<Vec<u8>> for WsMessage {
    fn from(vec: Vec<u8>) -> Self {
        WsMessage::Binary(Bytes::from(vec))
    }
}

/// WebSocket message stream
pub struct WsStream(Boxed<Result<WsMessage, StreamError>>);

impl WsStream {
    /// Create a new message stream
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<WsMessage, StreamError>> + Send + 'static,
    {
        Self(Box::pin(stream))
    }

    /// Convert into the inner pinned boxed stream
    pub fn into_inner(self) -> Boxed<Result<WsMessage, StreamError>> {
        self.0
    }
}

/// Frame decoded from a [`WsStream`]
#[derive(Debug)]
pub enum Decoded<T> {
    /// A data frame that deserialized into `T`
    Frame(T),
    /// A data frame that did not deserialize into `T`
    Undecodable(StreamError),
    /// The peer sent a close frame
    Closed(Option<CloseFrame>),
}

/// Extension trait for decoding typed messages from WebSocket streams
pub trait WsStreamExt: Sized {
    /// Decode JSON text/binary frames into typed messages
    ///
    /// Payloads that fail to deserialize are yielded as
    /// [`Decoded::Undecodable`] rather than ending the stream, so a caller can
    /// skip them and keep reading.
    fn decode_json<T>(self) -> impl Stream<Item = Result<Decoded<T>, StreamError>> + Send
    where
        T: for<'de> serde::Deserialize<'de> + Send;
}

impl WsStreamExt for WsStream {
    fn decode_json<T>(self) -> impl Stream<Item = Result<Decoded<T>, StreamError>> + Send
    where
        T: for<'de> serde::Deserialize<'de> + Send,
    {
        use n0_future::StreamExt as _;

        Box::pin(self.into_inner().map(|msg_result| {
            msg_result.map(|msg| match msg {
                WsMessage::Text(text) => decode_frame(text.as_ref()),
                WsMessage::Binary(bytes) => decode_frame(&bytes),
                WsMessage::Close(frame) => Decoded::Closed(frame),
            })
        }))
    }
}

fn decode_frame<T>(payload: &[u8]) -> Decoded<T>
where
    T: for<'de> serde::Deserialize<'de>,
{
    match serde_json::from_slice(payload) {
        Ok(value) => Decoded::Frame(value),
        Err(e) => Decoded::Undecodable(StreamError::decode(e)),
    }
}

impl fmt::Debug for WsStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsStream").finish_non_exhaustive()
    }
}

/// WebSocket message sink
pub struct WsSink(Pin<Box<dyn n0_future::Sink<WsMessage, Error = StreamError> + Send>>);

impl WsSink {
    /// Create a new message sink
    pub fn new<S>(sink: S) -> Self
    where
        S: n0_future::Sink<WsMessage, Error = StreamError> + Send + 'static,
    {
        Self(Box::pin(sink))
    }

    /// Convert into the inner pinned boxed sink
    pub fn into_inner(self) -> Pin<Box<dyn n0_future::Sink<WsMessage, Error = StreamError> + Send>> {
        self.0
    }
}

impl fmt::Debug for WsSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsSink").finish_non_exhaustive()
    }
}

/// WebSocket client trait
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait WebSocketClient {
    /// Error type for WebSocket operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Connect to a WebSocket endpoint
    fn connect(&self, url: Url) -> impl Future<Output = Result<WebSocketConnection, Self::Error>>;
}

/// WebSocket connection with bidirectional streams
pub struct WebSocketConnection {
    tx: WsSink,
    rx: WsStream,
}

impl WebSocketConnection {
    /// Create a new WebSocket connection
    pub fn new(tx: WsSink, rx: WsStream) -> Self {
        Self { tx, rx }
    }

    /// Split into sender and receiver
    pub fn split(self) -> (WsSink, WsStream) {
        (self.tx, self.rx)
    }
}

impl fmt::Debug for WebSocketConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketConnection")
            .finish_non_exhaustive()
    }
}

/// Concrete WebSocket client implementation using tokio-tungstenite-wasm
#[cfg(feature = "websocket")]
pub mod tungstenite_client {
    use super::*;
    use futures::{SinkExt, StreamExt};

    /// WebSocket client backed by tokio-tungstenite-wasm
    #[derive(Debug, Clone, Default)]
    pub struct TungsteniteClient;

    impl TungsteniteClient {
        /// Create a new tungstenite WebSocket client
        pub fn new() -> Self {
            Self
        }
    }

    impl WebSocketClient for TungsteniteClient {
        type Error = tokio_tungstenite_wasm::Error;

        async fn connect(&self, url: Url) -> Result<WebSocketConnection, Self::Error> {
            #[cfg(feature = "tracing")]
            tracing::debug!(%url, "opening websocket");

            let ws_stream = tokio_tungstenite_wasm::connect(url.as_str()).await?;

            let (sink, stream) = ws_stream.split();

            let rx_stream = stream.filter_map(|result| async move {
                match result {
                    Ok(msg) => convert_message(msg).map(Ok),
                    Err(e) => Some(Err(StreamError::transport(e))),
                }
            });

            let rx = WsStream::new(rx_stream);

            let tx_sink = sink.with(|msg: WsMessage| async move {
                Ok::<_, tokio_tungstenite_wasm::Error>(msg.into())
            });

            let tx = WsSink::new(tx_sink.sink_map_err(StreamError::transport));

            Ok(WebSocketConnection::new(tx, rx))
        }
    }

    /// Convert tokio-tungstenite-wasm Message to our WsMessage
    fn convert_message(msg: tokio_tungstenite_wasm::Message) -> Option<WsMessage> {
        use tokio_tungstenite_wasm::Message;

        match msg {
            Message::Text(text) => Some(WsMessage::Text(WsText::from(text.to_string()))),
            Message::Binary(vec) => Some(WsMessage::Binary(Bytes::from(vec))),
            Message::Close(frame) => {
                let close_frame = frame.map(|f| {
                    let raw: u16 = f.code.into();
                    CloseFrame::new(CloseCode::from(raw), &*f.reason)
                });
                Some(WsMessage::Close(close_frame))
            }
        }
    }

    impl From<WsMessage> for tokio_tungstenite_wasm::Message {
        fn from(msg: WsMessage) -> Self {
            use tokio_tungstenite_wasm::Message;

            match msg {
                WsMessage::Text(text) => Message::Text(text.as_str().to_owned().into()),
                WsMessage::Binary(bytes) => Message::Binary(bytes.to_vec().into()),
                WsMessage::Close(frame) => {
                    let close_frame = frame.map(|f| tokio_tungstenite_wasm::CloseFrame {
                        code: u16::from(f.code).into(),
                        reason: f.reason.to_string().into(),
                    });
                    Message::Close(close_frame)
                }
            }
        }
    }
}
