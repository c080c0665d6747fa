//! Lifecycle callbacks for realtime channels.
//!
//! - [`on_connect`](EventHandlers::on_connect): channel joined, receives the topic
//! - [`on_disconnect`](EventHandlers::on_disconnect): socket closed for any reason
//! - [`on_error`](EventHandlers::on_error): socket or protocol failure
//! - [`on_frame`](EventHandlers::on_frame): raw inbound frames, for debugging
//!
//! ```rust
//! use atrium_link::EventHandlers;
//!
//! let handlers = EventHandlers::new()
//!     .on_connect(|topic| println!("joined {}", topic))
//!     .on_disconnect(|reason| println!("closed: {}", reason))
//!     .on_error(|err| eprintln!("realtime error: {}", err));
//! assert!(handlers.has_any());
//! ```

use std::fmt;
use std::sync::Arc;

/// Why a channel's socket closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    pub message: String,
    /// WebSocket close code when the peer sent one (1000 = normal).
    pub code: Option<u16>,
}

impl DisconnectReason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code: {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Error passed to `on_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeError {
    pub message: String,
    /// Whether opening a new channel may succeed (network blip vs. rejected join).
    pub recoverable: bool,
}

impl RealtimeError {
    pub fn new(message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            recoverable,
        }
    }
}

impl fmt::Display for RealtimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub type OnConnectCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type OnDisconnectCallback = Arc<dyn Fn(DisconnectReason) + Send + Sync>;
pub type OnErrorCallback = Arc<dyn Fn(RealtimeError) + Send + Sync>;
pub type OnFrameCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional callbacks shared by every channel a client opens.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) on_connect: Option<OnConnectCallback>,
    pub(crate) on_disconnect: Option<OnDisconnectCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
    pub(crate) on_frame: Option<OnFrameCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_frame", &self.on_frame.is_some())
            .finish()
    }
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    pub fn on_disconnect(mut self, f: impl Fn(DisconnectReason) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(RealtimeError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Debug hook receiving every inbound text frame before it is parsed.
    pub fn on_frame(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_frame = Some(Arc::new(f));
        self
    }

    pub fn has_any(&self) -> bool {
        self.on_connect.is_some()
            || self.on_disconnect.is_some()
            || self.on_error.is_some()
            || self.on_frame.is_some()
    }

    pub(crate) fn emit_connect(&self, topic: &str) {
        if let Some(cb) = &self.on_connect {
            cb(topic);
        }
    }

    pub(crate) fn emit_disconnect(&self, reason: DisconnectReason) {
        if let Some(cb) = &self.on_disconnect {
            cb(reason);
        }
    }

    pub(crate) fn emit_error(&self, error: RealtimeError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }

    pub(crate) fn emit_frame(&self, raw: &str) {
        if let Some(cb) = &self.on_frame {
            cb(raw);
        }
    }
}
