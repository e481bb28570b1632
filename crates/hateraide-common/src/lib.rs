//! Common transport plumbing for the hateraide moderation client

#![warn(missing_docs)]
pub use smol_str;
pub use url;

pub mod error;
/// HTTP client abstraction used by hateraide crates.
pub mod http_client;
pub mod stream;
/// WebSocket client abstraction.
pub mod websocket;

pub use error::{ClientError, DecodeError, HttpError, TransportError};
pub use stream::{BoxError, StreamError, StreamErrorKind};
