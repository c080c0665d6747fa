//! Background task owning a joined channel's socket.

use super::WebSocketStream;
use crate::{
    error::{AtriumLinkError, Result},
    event_handlers::{DisconnectReason, EventHandlers, RealtimeError},
    models::{
        phoenix_message::{EVENT_CLOSE, EVENT_ERROR, EVENT_POSTGRES_CHANGES, EVENT_SYSTEM},
        ChangeEvent, ChangeFilter, ChangeKind, PhoenixMessage, PostgresChangeData,
        PostgresChangesPayload,
    },
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::tungstenite::protocol::Message;

const MAX_TEXT_FRAME_BYTES: usize = 16 << 20;

pub(crate) struct ReaderConfig {
    pub topic: String,
    pub filter: ChangeFilter,
    /// `None` disables heartbeats
    pub heartbeat_interval: Option<Duration>,
    /// Silence that ends the channel; `None` disables the watchdog
    pub idle_timeout: Option<Duration>,
    /// First ref used for frames sent by the reader
    pub next_ref: u64,
}

/// Drive the socket until the consumer closes the channel, the peer closes
/// the socket, or an error ends it.
///
/// Events are pushed through `event_tx` in arrival order. Dropping the
/// receiving side stops the task at the next frame.
pub(crate) async fn ws_reader_loop(
    mut ws_stream: WebSocketStream,
    event_tx: mpsc::Sender<Result<ChangeEvent>>,
    close_rx: oneshot::Receiver<()>,
    config: ReaderConfig,
    event_handlers: EventHandlers,
) {
    tokio::pin!(close_rx);

    let ReaderConfig {
        topic,
        filter,
        heartbeat_interval,
        idle_timeout,
        mut next_ref,
    } = config;

    let heartbeat_every = heartbeat_interval.unwrap_or(Duration::MAX);
    let idle_limit = idle_timeout.unwrap_or(Duration::MAX);
    let mut heartbeat_at = deadline_after(heartbeat_every);
    let mut idle_deadline = deadline_after(idle_limit);

    loop {
        let heartbeat_sleep = tokio::time::sleep_until(heartbeat_at);
        let idle_sleep = tokio::time::sleep_until(idle_deadline);
        tokio::pin!(heartbeat_sleep);
        tokio::pin!(idle_sleep);

        let frame = tokio::select! {
            biased;

            _ = &mut close_rx => {
                let leave = PhoenixMessage::leave(topic.as_str(), next_ref.to_string());
                if let Ok(text) = serde_json::to_string(&leave) {
                    let _ = ws_stream.send(Message::text(text)).await;
                }
                let _ = ws_stream.close(None).await;
                debug!("[REALTIME] Left {}", topic);
                event_handlers.emit_disconnect(
                    DisconnectReason::with_code("Channel closed by client", 1000),
                );
                return;
            }

            _ = &mut heartbeat_sleep, if heartbeat_interval.is_some() => {
                let heartbeat = PhoenixMessage::heartbeat(next_ref.to_string());
                next_ref += 1;
                let sent = match serde_json::to_string(&heartbeat) {
                    Ok(text) => ws_stream.send(Message::text(text)).await.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                if let Err(e) = sent {
                    fail(&event_tx, &event_handlers, AtriumLinkError::WebSocketError(format!(
                        "Failed to send heartbeat: {}", e
                    ))).await;
                    return;
                }
                heartbeat_at = deadline_after(heartbeat_every);
                continue;
            }

            _ = &mut idle_sleep, if idle_timeout.is_some() => {
                fail(&event_tx, &event_handlers, AtriumLinkError::TimeoutError(format!(
                    "No frames on {} for {:?}", topic, idle_limit
                ))).await;
                return;
            }

            msg = ws_stream.next() => {
                idle_deadline = deadline_after(idle_limit);
                msg
            }
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                if text.len() > MAX_TEXT_FRAME_BYTES {
                    fail(&event_tx, &event_handlers, AtriumLinkError::WebSocketError(format!(
                        "Text frame too large ({} bytes > {} bytes)",
                        text.len(),
                        MAX_TEXT_FRAME_BYTES
                    )))
                    .await;
                    return;
                }
                event_handlers.emit_frame(text.as_str());
                match parse_frame(text.as_str(), &topic, &filter) {
                    Ok(Some(event)) => {
                        if event_tx.send(Ok(event)).await.is_err() {
                            return;
                        }
                    },
                    Ok(None) => {},
                    Err(e @ AtriumLinkError::ChannelError(_)) => {
                        fail(&event_tx, &event_handlers, e).await;
                        return;
                    },
                    Err(e) => {
                        warn!("[REALTIME] Dropping undecodable frame on {}: {}", topic, e);
                        event_handlers.emit_error(RealtimeError::new(e.to_string(), true));
                        if event_tx.send(Err(e)).await.is_err() {
                            return;
                        }
                    },
                }
            },
            Some(Ok(Message::Close(frame))) => {
                let reason = match frame {
                    Some(f) => DisconnectReason::with_code(f.reason.to_string(), f.code.into()),
                    None => DisconnectReason::new("Server closed connection"),
                };
                event_handlers.emit_disconnect(reason);
                return;
            },
            Some(Ok(Message::Ping(payload))) => {
                let _ = ws_stream.send(Message::Pong(payload)).await;
            },
            Some(Ok(Message::Binary(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {},
            Some(Err(e)) => {
                fail(&event_tx, &event_handlers, AtriumLinkError::WebSocketError(e.to_string())).await;
                return;
            },
            None => {
                event_handlers.emit_disconnect(DisconnectReason::new("WebSocket stream ended"));
                return;
            },
        }
    }
}

fn deadline_after(duration: Duration) -> TokioInstant {
    let now = TokioInstant::now();
    now.checked_add(duration).unwrap_or_else(|| now + Duration::from_secs(86_400 * 365))
}

/// Report a terminal error to the consumer and the handlers.
async fn fail(
    event_tx: &mpsc::Sender<Result<ChangeEvent>>,
    event_handlers: &EventHandlers,
    err: AtriumLinkError,
) {
    let message = err.to_string();
    warn!("[REALTIME] {}", message);
    let recoverable = !matches!(err, AtriumLinkError::ChannelError(_));
    event_handlers.emit_error(RealtimeError::new(&message, recoverable));
    event_handlers.emit_disconnect(DisconnectReason::new(message));
    let _ = event_tx.send(Err(err)).await;
}

/// Decode one text frame.
///
/// `Ok(None)` for frames that carry no row change (replies, presence,
/// other topics, events outside the channel's scope). A channel-level
/// error or close on `topic` is `Err(ChannelError)`.
pub(crate) fn parse_frame(text: &str, topic: &str, filter: &ChangeFilter) -> Result<Option<ChangeEvent>> {
    let msg: PhoenixMessage = serde_json::from_str(text)?;
    if msg.topic != topic {
        return Ok(None);
    }

    match msg.event.as_str() {
        EVENT_POSTGRES_CHANGES => {
            let payload: PostgresChangesPayload = serde_json::from_value(msg.payload)?;
            let data = payload.data;
            if !filter.accepts(&data.schema, &data.table, data.kind) {
                return Ok(None);
            }
            change_event_from(data).map(Some)
        },
        EVENT_ERROR => Err(AtriumLinkError::ChannelError(format!("Channel {} errored", topic))),
        EVENT_CLOSE => Err(AtriumLinkError::ChannelError(format!("Channel {} closed by server", topic))),
        EVENT_SYSTEM => {
            let status = msg.payload.get("status").and_then(JsonValue::as_str);
            if status == Some("error") {
                let message = msg
                    .payload
                    .get("message")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("subscription failed");
                return Err(AtriumLinkError::ChannelError(message.to_string()));
            }
            Ok(None)
        },
        _ => Ok(None),
    }
}

fn change_event_from(data: PostgresChangeData) -> Result<ChangeEvent> {
    let PostgresChangeData {
        schema,
        table,
        kind,
        commit_timestamp,
        record,
        old_record,
        ..
    } = data;

    let missing = |field: &str| {
        AtriumLinkError::SerializationError(format!(
            "{:?} on {}.{} is missing `{}`",
            kind, schema, table, field
        ))
    };

    Ok(match kind {
        ChangeKind::Insert => {
            let row = record.ok_or_else(|| missing("record"))?;
            ChangeEvent::Insert {
                schema,
                table,
                row,
                commit_timestamp,
            }
        },
        ChangeKind::Update => {
            let row = record.ok_or_else(|| missing("record"))?;
            ChangeEvent::Update {
                schema,
                table,
                row,
                old_row: old_record.unwrap_or_default(),
                commit_timestamp,
            }
        },
        ChangeKind::Delete => {
            let old_row = old_record.ok_or_else(|| missing("old_record"))?;
            ChangeEvent::Delete {
                schema,
                table,
                old_row,
                commit_timestamp,
            }
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventFilter;
    use serde_json::json;

    const TOPIC: &str = "realtime:messages-feed";

    fn frame(event: &str, payload: JsonValue) -> String {
        json!({"topic": TOPIC, "event": event, "payload": payload, "ref": null}).to_string()
    }

    fn change(kind: &str, record: JsonValue, old_record: JsonValue) -> String {
        frame(
            "postgres_changes",
            json!({
                "data": {
                    "schema": "public",
                    "table": "messages",
                    "type": kind,
                    "commit_timestamp": "2024-03-01T10:00:00Z",
                    "record": record,
                    "old_record": old_record,
                },
                "ids": [1]
            }),
        )
    }

    #[test]
    fn test_insert_frame_becomes_event() {
        let filter = ChangeFilter::table("messages");
        let event = parse_frame(&change("INSERT", json!({"id": 1, "body": "hi"}), json!(null)), TOPIC, &filter)
            .unwrap()
            .unwrap();
        assert_eq!(event.kind(), ChangeKind::Insert);
        assert_eq!(event.identity("id"), Some(&json!(1)));
    }

    #[test]
    fn test_update_without_old_record_is_accepted() {
        let filter = ChangeFilter::table("messages");
        let event = parse_frame(&change("UPDATE", json!({"id": 1}), json!(null)), TOPIC, &filter)
            .unwrap()
            .unwrap();
        match event {
            ChangeEvent::Update { old_row, .. } => assert!(old_row.is_empty()),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_delete_requires_old_record() {
        let filter = ChangeFilter::table("messages");
        let result = parse_frame(&change("DELETE", json!(null), json!(null)), TOPIC, &filter);
        assert!(matches!(result, Err(AtriumLinkError::SerializationError(_))));
    }

    #[test]
    fn test_out_of_scope_events_are_skipped() {
        let filter = ChangeFilter::table("messages").with_event(EventFilter::Delete);
        let result = parse_frame(&change("INSERT", json!({"id": 1}), json!(null)), TOPIC, &filter).unwrap();
        assert!(result.is_none());

        let other_topic = change("INSERT", json!({"id": 1}), json!(null)).replace(TOPIC, "realtime:other");
        assert!(parse_frame(&other_topic, TOPIC, &ChangeFilter::table("messages")).unwrap().is_none());
    }

    #[test]
    fn test_replies_and_presence_are_ignored() {
        let filter = ChangeFilter::table("messages");
        let reply = frame("phx_reply", json!({"status": "ok", "response": {}}));
        assert!(parse_frame(&reply, TOPIC, &filter).unwrap().is_none());
        let system = frame("system", json!({"status": "ok", "message": "Subscribed"}));
        assert!(parse_frame(&system, TOPIC, &filter).unwrap().is_none());
    }

    #[test]
    fn test_channel_errors_are_terminal() {
        let filter = ChangeFilter::table("messages");
        for raw in [
            frame("phx_error", json!({})),
            frame("phx_close", json!({})),
            frame("system", json!({"status": "error", "message": "invalid filter"})),
        ] {
            assert!(matches!(
                parse_frame(&raw, TOPIC, &filter),
                Err(AtriumLinkError::ChannelError(_))
            ));
        }
    }

    #[test]
    fn test_garbage_is_a_serialization_error() {
        let filter = ChangeFilter::table("messages");
        assert!(matches!(
            parse_frame("not json", TOPIC, &filter),
            Err(AtriumLinkError::SerializationError(_))
        ));
    }
}
