//! Live moderation updates over a persistent WebSocket
//!
//! [`ModerationChannel`] keeps a single connection to the backend's push
//! endpoint, fans every `content_moderation` event out to the registered
//! listeners, and reconnects on a fixed delay whenever the connection drops.
//! Connection trouble is never reported to callers; it only shows up in the
//! logs and in [`ModerationChannel::state`].
//!
//! ```no_run
//! # use hateraide::channel::{ChannelOptions, ListenerResult, ModerationChannel};
//! # use hateraide_common::websocket::tungstenite_client::TungsteniteClient;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = url::Url::parse("ws://localhost:8000/ws")?;
//! let channel = ModerationChannel::new(TungsteniteClient::new(), endpoint, ChannelOptions::default());
//! channel.subscribe("log", |action: &hateraide::moderation::ModerationAction| -> ListenerResult {
//!     println!("{} -> {}", action.item_id, action.action_type);
//!     Ok(())
//! });
//! channel.connect();
//! # Ok(())
//! # }
//! ```

use crate::moderation::ModerationAction;
use futures::{SinkExt, StreamExt};
use hateraide_common::stream::BoxError;
use hateraide_common::websocket::{
    CloseCode, CloseFrame, Decoded, WebSocketClient, WsMessage, WsSink, WsStream, WsStreamExt,
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use url::Url;

/// Delay between a dropped connection and the next attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Message pushed by the backend
///
/// Only `content_moderation` is acted on. Any other `type` decodes as
/// [`PushEvent::Other`] and is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PushEvent {
    /// A moderation action was applied to one item
    #[serde(rename = "content_moderation")]
    ContentModeration {
        /// The action
        action: ModerationAction,
    },
    /// Anything else the backend sends
    #[serde(other)]
    Other,
}

/// Result returned by a [`Listener`]
pub type ListenerResult = Result<(), BoxError>;

/// Callback invoked for every live moderation update
///
/// Failures (an `Err` or a panic) are logged and contained: the other
/// listeners still run and the failing listener stays subscribed.
pub trait Listener: Send + Sync {
    /// Handle one update
    fn on_update(&self, action: &ModerationAction) -> ListenerResult;
}

impl<F> Listener for F
where
    F: Fn(&ModerationAction) -> ListenerResult + Send + Sync,
{
    fn on_update(&self, action: &ModerationAction) -> ListenerResult {
        self(action)
    }
}

/// Tunables for a [`ModerationChannel`]
#[derive(Debug, Clone, bon::Builder)]
pub struct ChannelOptions {
    /// Fixed delay before each reconnect attempt
    #[builder(default = DEFAULT_RECONNECT_DELAY)]
    pub reconnect_delay: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Connection phase reported by [`ModerationChannel::state`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No connection and no attempt in flight
    Idle,
    /// An attempt is in flight
    Connecting,
    /// Connected
    Open,
}

/// Snapshot of the channel's connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    /// Connection phase
    pub link: LinkState,
    /// A reconnect timer is armed
    pub reconnect_pending: bool,
    /// Number of registered listeners
    pub listeners: usize,
}

enum Link {
    Idle,
    Connecting {
        task: AbortHandle,
    },
    Open {
        outbound: mpsc::UnboundedSender<WsMessage>,
        task: AbortHandle,
    },
}

struct State {
    link: Link,
    reconnect: Option<(u64, AbortHandle)>,
    // Bumped by disconnect; tasks from an older generation are inert.
    generation: u64,
    timers: u64,
}

struct Shared<W> {
    client: W,
    endpoint: Url,
    options: ChannelOptions,
    state: Mutex<State>,
    listeners: Mutex<HashMap<SmolStr, Arc<dyn Listener>>>,
}

/// Shared, self-reconnecting push channel
///
/// Cheap to clone; clones share the connection and the listener registry.
/// Background work runs on the ambient tokio runtime, so [`connect`](Self::connect)
/// must be called from within one. Dropping every handle stops the background
/// tasks the next time they wake.
pub struct ModerationChannel<W> {
    shared: Arc<Shared<W>>,
}

impl<W> Clone for ModerationChannel<W> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<W> fmt::Debug for ModerationChannel<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModerationChannel")
            .field("endpoint", &self.shared.endpoint.as_str())
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}

impl<W> ModerationChannel<W>
where
    W: WebSocketClient + Send + Sync + 'static,
{
    /// Create a channel for the given endpoint; nothing connects until [`connect`](Self::connect)
    pub fn new(client: W, endpoint: Url, options: ChannelOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                endpoint,
                options,
                state: Mutex::new(State {
                    link: Link::Idle,
                    reconnect: None,
                    generation: 0,
                    timers: 0,
                }),
                listeners: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Endpoint this channel connects to
    pub fn endpoint(&self) -> &Url {
        &self.shared.endpoint
    }

    /// Open the connection
    ///
    /// Does nothing while a connection is open or an attempt is already in
    /// flight.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn connect(&self) {
        self.shared.connect();
    }

    /// Close the connection, cancel any pending reconnect and drop every listener
    ///
    /// Safe to call at any time, including when never connected.
    pub fn disconnect(&self) {
        {
            let mut state = self.shared.lock_state();
            state.generation += 1;
            if let Some((_, timer)) = state.reconnect.take() {
                timer.abort();
            }
            match std::mem::replace(&mut state.link, Link::Idle) {
                Link::Idle => {}
                Link::Connecting { task } => task.abort(),
                Link::Open { outbound, .. } => {
                    // The socket task sends this and exits; if it already exited there is nothing to close.
                    let _ = outbound.send(WsMessage::Close(Some(CloseFrame::new(
                        CloseCode::Normal,
                        "client disconnect",
                    ))));
                }
            }
        }
        self.shared.lock_listeners().clear();
        tracing::info!(endpoint = %self.shared.endpoint, "moderation channel disconnected");
    }

    /// Register `listener` under `id`, replacing any listener already there
    pub fn subscribe(&self, id: impl Into<SmolStr>, listener: impl Listener + 'static) {
        let id = id.into();
        tracing::debug!(subscription = %id, "listener subscribed");
        self.shared.lock_listeners().insert(id, Arc::new(listener));
    }

    /// Remove the listener registered under `id`, if any
    ///
    /// The connection stays up; it is shared with the remaining listeners.
    pub fn unsubscribe(&self, id: &str) {
        if self.shared.lock_listeners().remove(id).is_some() {
            tracing::debug!(subscription = %id, "listener unsubscribed");
        }
    }

    /// Send a JSON payload if the connection is open
    ///
    /// Returns whether the frame was handed to the socket. Nothing is queued
    /// while disconnected and no error is raised.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        let msg = match WsMessage::json(payload) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unserializable outbound payload");
                return false;
            }
        };
        match &self.shared.lock_state().link {
            Link::Open { outbound, .. } => outbound.send(msg).is_ok(),
            _ => false,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ChannelState {
        let listeners = self.shared.lock_listeners().len();
        let state = self.shared.lock_state();
        ChannelState {
            link: match state.link {
                Link::Idle => LinkState::Idle,
                Link::Connecting { .. } => LinkState::Connecting,
                Link::Open { .. } => LinkState::Open,
            },
            reconnect_pending: state.reconnect.is_some(),
            listeners,
        }
    }
}

impl<W> Shared<W> {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, HashMap<SmolStr, Arc<dyn Listener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, action: &ModerationAction) {
        let listeners: Vec<_> = self
            .lock_listeners()
            .iter()
            .map(|(id, listener)| (id.clone(), listener.clone()))
            .collect();

        tracing::debug!(
            item = %action.item_id,
            action = %action.action_type,
            listeners = listeners.len(),
            "dispatching moderation update"
        );

        for (id, listener) in listeners {
            match std::panic::catch_unwind(AssertUnwindSafe(|| listener.on_update(action))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(subscription = %id, error = %e, "listener failed"),
                Err(_) => tracing::warn!(subscription = %id, "listener panicked"),
            }
        }
    }
}

impl<W> Shared<W>
where
    W: WebSocketClient + Send + Sync + 'static,
{
    fn connect(self: &Arc<Self>) {
        let mut state = self.lock_state();
        if !matches!(state.link, Link::Idle) {
            tracing::trace!("connect ignored, channel busy");
            return;
        }
        tracing::debug!(endpoint = %self.endpoint, "connecting moderation channel");
        let task = tokio::spawn(run_connection(Arc::downgrade(self), state.generation));
        state.link = Link::Connecting {
            task: task.abort_handle(),
        };
    }

    fn opened(&self, generation: u64, outbound: mpsc::UnboundedSender<WsMessage>) -> bool {
        let mut state = self.lock_state();
        if state.generation != generation {
            return false;
        }
        let Link::Connecting { task } = std::mem::replace(&mut state.link, Link::Idle) else {
            return false;
        };
        if let Some((_, timer)) = state.reconnect.take() {
            timer.abort();
        }
        state.link = Link::Open { outbound, task };
        tracing::info!(endpoint = %self.endpoint, "moderation channel open");
        true
    }

    fn connection_lost(self: &Arc<Self>, generation: u64) {
        let mut state = self.lock_state();
        if state.generation != generation {
            return;
        }
        state.link = Link::Idle;

        if let Some((_, timer)) = state.reconnect.take() {
            timer.abort();
        }
        state.timers += 1;
        let token = state.timers;
        let delay = self.options.reconnect_delay;
        tracing::info!(delay_ms = delay.as_millis() as u64, "moderation channel lost, reconnect scheduled");

        let shared = Arc::downgrade(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            {
                let mut state = shared.lock_state();
                if state.generation != generation
                    || !matches!(state.reconnect, Some((armed, _)) if armed == token)
                {
                    return;
                }
                state.reconnect = None;
            }
            shared.connect();
        });
        state.reconnect = Some((token, timer.abort_handle()));
    }
}

async fn run_connection<W>(shared: Weak<Shared<W>>, generation: u64)
where
    W: WebSocketClient + Send + Sync + 'static,
{
    let Some(strong) = shared.upgrade() else {
        return;
    };

    let conn = match strong.client.connect(strong.endpoint.clone()).await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(endpoint = %strong.endpoint, error = %e, "moderation channel connect failed");
            strong.connection_lost(generation);
            return;
        }
    };

    let (sink, stream) = conn.split();
    let (outbound, rx) = mpsc::unbounded_channel();
    if !strong.opened(generation, outbound) {
        return;
    }
    drop(strong);

    if pump(&shared, sink, stream, rx).await == Exit::Lost {
        if let Some(shared) = shared.upgrade() {
            shared.connection_lost(generation);
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Exit {
    // Closed by us, or the channel is gone.
    Done,
    // Closed by the peer or the network.
    Lost,
}

async fn pump<W>(
    shared: &Weak<Shared<W>>,
    sink: WsSink,
    stream: WsStream,
    mut outbound: mpsc::UnboundedReceiver<WsMessage>,
) -> Exit {
    let mut sink = sink.into_inner();
    let mut frames = std::pin::pin!(stream.decode_json::<PushEvent>());

    loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok(Decoded::Frame(PushEvent::ContentModeration { action }))) => {
                    let Some(shared) = shared.upgrade() else {
                        return Exit::Done;
                    };
                    shared.dispatch(&action);
                }
                Some(Ok(Decoded::Frame(PushEvent::Other))) => {
                    tracing::trace!("ignoring push event");
                }
                Some(Ok(Decoded::Undecodable(e))) => {
                    tracing::debug!(error = %e, "dropping malformed push frame");
                }
                Some(Ok(Decoded::Closed(frame))) => {
                    tracing::info!(code = ?frame.as_ref().map(|f| f.code), "server closed moderation channel");
                    return Exit::Lost;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "moderation channel socket error");
                    return Exit::Lost;
                }
                None => return Exit::Lost,
            },
            msg = outbound.recv() => match msg {
                Some(msg) => {
                    let closing = msg.is_close();
                    if let Err(e) = sink.send(msg).await {
                        tracing::warn!(error = %e, "moderation channel send failed");
                        return if closing { Exit::Done } else { Exit::Lost };
                    }
                    if closing {
                        return Exit::Done;
                    }
                }
                None => return Exit::Done,
            },
        }
    }
}
