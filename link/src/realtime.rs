//! Realtime row-change channels.
//!
//! A [`RealtimeChannel`] owns one socket joined to one topic scoped by a
//! [`ChangeFilter`]. All socket I/O happens on a background task; the
//! consumer pulls events with [`RealtimeChannel::next`].
//!
//! ```rust,no_run
//! use atrium_link::{AtriumClient, ChangeFilter, EventFilter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AtriumClient::builder()
//!     .base_url("https://abc.example.co")
//!     .anon_key("public-anon-key")
//!     .build()?;
//!
//! let filter = ChangeFilter::table("messages").with_event(EventFilter::Insert);
//! let mut channel = client.channel("messages-feed", filter).await?;
//! while let Some(event) = channel.next().await {
//!     println!("{:?}", event?);
//! }
//! # Ok(())
//! # }
//! ```

mod reader;
mod url;

pub(crate) use url::resolve_ws_url;

use crate::{
    auth::AuthProvider,
    error::{AtriumLinkError, Result},
    event_handlers::{EventHandlers, RealtimeError},
    models::{
        channel_topic,
        phoenix_message::{EVENT_CLOSE, EVENT_ERROR, EVENT_JOIN, EVENT_REPLY},
        ChangeEvent, ChangeFilter, JoinPayload, PhoenixMessage, ReplyPayload,
    },
    timeouts::LinkTimeouts,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use reader::{ws_reader_loop, ReaderConfig};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, error::Error as WsError, protocol::Message},
};

type WebSocketStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

/// Capacity of the reader-to-consumer queue. A full queue pauses socket reads.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

const JOIN_REF: &str = "1";

/// A joined realtime channel delivering [`ChangeEvent`]s in arrival order.
pub struct RealtimeChannel {
    topic: String,
    filter: ChangeFilter,
    event_rx: mpsc::Receiver<Result<ChangeEvent>>,
    /// `None` once `close()` or `Drop` has signalled the reader.
    close_tx: Option<oneshot::Sender<()>>,
    _reader_handle: JoinHandle<()>,
    closed: bool,
}

impl RealtimeChannel {
    /// Connect, join `realtime:<name>` and start the reader task.
    pub(crate) async fn open(
        base_url: &str,
        name: &str,
        filter: ChangeFilter,
        auth: &AuthProvider,
        timeouts: &LinkTimeouts,
        event_handlers: &EventHandlers,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(AtriumLinkError::ValidationError(
                "Channel name must not be empty".to_string(),
            ));
        }
        let topic = channel_topic(name);
        let join = JoinPayload::for_filter(&filter, auth.user_token().map(str::to_string))?;

        let request_url = resolve_ws_url(base_url, auth.api_key())?;
        let mut request = request_url.into_client_request().map_err(|e| {
            AtriumLinkError::WebSocketError(format!("Failed to build WebSocket request: {}", e))
        })?;
        request.headers_mut().insert("apikey", auth.ws_api_key_header()?);

        let mut ws_stream = connect(request, timeouts, event_handlers).await?;

        let join_frame = PhoenixMessage::new(
            topic.as_str(),
            EVENT_JOIN,
            serde_json::to_value(&join)?,
            JOIN_REF,
        );
        ws_stream
            .send(Message::text(serde_json::to_string(&join_frame)?))
            .await
            .map_err(|e| AtriumLinkError::WebSocketError(format!("Failed to send join: {}", e)))?;

        let joined = with_timeout(
            timeouts.join_timeout,
            wait_for_join_reply(&mut ws_stream, &topic),
        )
        .await;
        match joined {
            Some(Ok(())) => {},
            Some(Err(e)) => {
                event_handlers.emit_error(RealtimeError::new(e.to_string(), false));
                let _ = ws_stream.close(None).await;
                return Err(e);
            },
            None => {
                let msg = format!("Join of {} timed out ({:?})", topic, timeouts.join_timeout);
                event_handlers.emit_error(RealtimeError::new(&msg, true));
                let _ = ws_stream.close(None).await;
                return Err(AtriumLinkError::TimeoutError(msg));
            },
        }

        info!("[REALTIME] Joined {} ({} on {}.{})", topic, filter.event, filter.schema, filter.table);
        event_handlers.emit_connect(&topic);

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel();
        let config = ReaderConfig {
            topic: topic.clone(),
            filter: filter.clone(),
            heartbeat_interval: optional(timeouts.heartbeat_interval),
            idle_timeout: timeouts.channel_idle_timeout(),
            next_ref: 2,
        };
        let reader_handle = tokio::spawn(ws_reader_loop(
            ws_stream,
            event_tx,
            close_rx,
            config,
            event_handlers.clone(),
        ));

        Ok(Self {
            topic,
            filter,
            event_rx,
            close_tx: Some(close_tx),
            _reader_handle: reader_handle,
            closed: false,
        })
    }

    /// Next change on the channel, `None` once the channel has ended.
    ///
    /// A terminal failure is delivered once as `Some(Err(..))`, followed by `None`.
    pub async fn next(&mut self) -> Option<Result<ChangeEvent>> {
        if self.closed {
            return None;
        }
        match self.event_rx.recv().await {
            Some(item) => Some(item),
            None => {
                self.closed = true;
                None
            },
        }
    }

    /// Leave the channel and close the socket. Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
        debug!("[REALTIME] Closing {}", self.topic);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Phoenix topic, `realtime:<name>`
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("topic", &self.topic)
            .field("filter", &self.filter)
            .field("closed", &self.closed)
            .finish()
    }
}

fn optional(duration: Duration) -> Option<Duration> {
    if LinkTimeouts::is_no_timeout(duration) {
        None
    } else {
        Some(duration)
    }
}

/// `None` on timeout; a zero or huge duration waits forever.
async fn with_timeout<F, T>(duration: Duration, fut: F) -> Option<T>
where
    F: std::future::Future<Output = T>,
{
    match optional(duration) {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

async fn connect(
    request: tokio_tungstenite::tungstenite::http::Request<()>,
    timeouts: &LinkTimeouts,
    event_handlers: &EventHandlers,
) -> Result<WebSocketStream> {
    match with_timeout(timeouts.connection_timeout, connect_async(request)).await {
        Some(Ok((stream, _))) => Ok(stream),
        Some(Err(WsError::Http(response))) => {
            let message = match response.status().as_u16() {
                401 => "Unauthorized: realtime requires a valid API key".to_string(),
                403 => "Forbidden: realtime access denied".to_string(),
                code => {
                    let body = response
                        .into_body()
                        .filter(|b| !b.is_empty())
                        .map(|b| String::from_utf8_lossy(&b).into_owned());
                    match body {
                        Some(body) => format!("WebSocket HTTP error {}: {}", code, body),
                        None => format!("WebSocket HTTP error: {}", code),
                    }
                },
            };
            event_handlers.emit_error(RealtimeError::new(&message, false));
            Err(AtriumLinkError::WebSocketError(message))
        },
        Some(Err(e)) => {
            let msg = format!("Connection failed: {}", e);
            event_handlers.emit_error(RealtimeError::new(&msg, true));
            Err(AtriumLinkError::WebSocketError(msg))
        },
        None => {
            let msg = format!("Connection timeout ({:?})", timeouts.connection_timeout);
            event_handlers.emit_error(RealtimeError::new(&msg, true));
            Err(AtriumLinkError::TimeoutError(msg))
        },
    }
}

/// Read frames until the reply to our join arrives.
async fn wait_for_join_reply(ws_stream: &mut WebSocketStream, topic: &str) -> Result<()> {
    while let Some(frame) = ws_stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                return Err(AtriumLinkError::ChannelError(format!(
                    "Socket closed before {} was joined",
                    topic
                )))
            },
            Ok(_) => continue,
            Err(e) => return Err(AtriumLinkError::WebSocketError(e.to_string())),
        };
        if let Some(outcome) = join_outcome(text.as_str(), topic)? {
            return outcome;
        }
    }
    Err(AtriumLinkError::WebSocketError(format!(
        "Socket ended before {} was joined",
        topic
    )))
}

/// `Some(result)` when `text` settles the join of `topic`, `None` for
/// unrelated frames.
fn join_outcome(text: &str, topic: &str) -> Result<Option<Result<()>>> {
    let msg: PhoenixMessage = serde_json::from_str(text)?;
    if msg.topic != topic {
        return Ok(None);
    }
    match msg.event.as_str() {
        EVENT_REPLY if msg.reference.as_deref() == Some(JOIN_REF) => {
            let reply: ReplyPayload = serde_json::from_value(msg.payload)?;
            if reply.is_ok() {
                Ok(Some(Ok(())))
            } else {
                Ok(Some(Err(AtriumLinkError::ChannelError(format!(
                    "Join of {} rejected: {}",
                    topic,
                    reply.reason()
                )))))
            }
        },
        EVENT_ERROR | EVENT_CLOSE => Ok(Some(Err(AtriumLinkError::ChannelError(format!(
            "Join of {} failed ({})",
            topic, msg.event
        ))))),
        _ => Ok(None),
    }
}
