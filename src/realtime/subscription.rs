//! Change-feed subscription over the realtime websocket
//!
//! One websocket task per subscription. The task runs until the returned
//! [`RealtimeSubscription`] is unsubscribed (or dropped), the server closes
//! the channel, or the connection fails. There is no reconnection.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::config::BackendConfig;
use super::protocol::{topic_for, PhoenixMessage, EVENT_CLOSE, EVENT_ERROR, EVENT_REPLY};
use super::RealtimeError;
use crate::data::SensorReading;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Callback invoked for every inserted or changed reading
pub type ReadingHandler = Arc<dyn Fn(SensorReading) + Send + Sync>;

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);

const JOIN_REF: &str = "1";

/// Opens change-feed subscriptions against the hosted backend
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    config: BackendConfig,
    heartbeat: Duration,
}

impl RealtimeClient {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Connect, join the table's channel and start delivering readings.
    ///
    /// Connection failures are returned; anything after the join is only
    /// logged by the background task.
    pub async fn subscribe(
        &self,
        table: &str,
        handler: ReadingHandler,
    ) -> Result<RealtimeSubscription, RealtimeError> {
        let url = self.config.realtime_url()?;
        tracing::debug!(table, "Connecting to realtime endpoint");

        let (mut ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| RealtimeError::Connect(e.to_string()))?;

        let join = PhoenixMessage::join(table, &self.config.anon_key, JOIN_REF);
        send_frame(&mut ws_stream, &join).await?;

        let topic = topic_for(table);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_channel(
            ws_stream,
            topic.clone(),
            handler,
            shutdown_rx,
            self.heartbeat,
        ));

        tracing::info!(topic = %topic, "Realtime subscription started");

        Ok(RealtimeSubscription {
            topic,
            shutdown_tx,
            task,
        })
    }
}

/// Handle to a live subscription.
///
/// [`unsubscribe`](Self::unsubscribe) consumes the handle, so teardown
/// happens at most once. Dropping the handle also ends the task.
pub struct RealtimeSubscription {
    topic: String,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RealtimeSubscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether the background task is still running
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Leave the channel, close the socket and wait for the task to finish
    pub async fn unsubscribe(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            tracing::warn!(topic = %self.topic, error = %e, "Realtime task did not exit cleanly");
        }
        tracing::info!(topic = %self.topic, "Realtime subscription closed");
    }
}

async fn send_frame<S>(sink: &mut S, frame: &PhoenixMessage) -> Result<(), RealtimeError>
where
    S: futures::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let text = serde_json::to_string(frame).map_err(|e| RealtimeError::Protocol(e.to_string()))?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| RealtimeError::Protocol(e.to_string()))
}

async fn run_channel(
    ws_stream: WsStream,
    topic: String,
    handler: ReadingHandler,
    mut shutdown_rx: oneshot::Receiver<()>,
    heartbeat: Duration,
) {
    let (mut write, mut read) = ws_stream.split();
    let mut ticker = interval_at(Instant::now() + heartbeat, heartbeat);
    let mut next_ref: u64 = 2;

    loop {
        tokio::select! {
            // Fires on unsubscribe and when the handle is dropped
            _ = &mut shutdown_rx => {
                let leave = PhoenixMessage::leave(&topic, &next_ref.to_string(), JOIN_REF);
                if let Err(e) = send_frame(&mut write, &leave).await {
                    tracing::debug!(error = %e, "Failed to send leave");
                }
                let _ = write.close().await;
                break;
            }

            _ = ticker.tick() => {
                let frame = PhoenixMessage::heartbeat(&next_ref.to_string());
                next_ref += 1;
                if let Err(e) = send_frame(&mut write, &frame).await {
                    tracing::error!(topic = %topic, error = %e, "Heartbeat failed");
                    break;
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_frame(&topic, &text, &handler) {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            tracing::warn!("Failed to send pong: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(topic = %topic, "Realtime socket closed by server: {:?}", frame);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(topic = %topic, error = %e, "Realtime socket error");
                        break;
                    }
                    None => {
                        tracing::info!(topic = %topic, "Realtime stream ended");
                        break;
                    }
                }
            }
        }
    }
}

/// Process one text frame; `false` means the channel is gone
fn handle_frame(topic: &str, text: &str, handler: &ReadingHandler) -> bool {
    let frame: PhoenixMessage = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unparsable realtime frame");
            return true;
        }
    };

    if frame.topic != topic {
        return true;
    }

    if let Some(change) = frame.change() {
        let Some(record) = change.record else {
            tracing::debug!(kind = ?change.kind, "Change without a row, skipping");
            return true;
        };
        match SensorReading::from_record(&record) {
            Ok(reading) => handler(reading),
            Err(e) => tracing::warn!(error = %e, "Dropping malformed reading"),
        }
        return true;
    }

    match frame.event.as_str() {
        EVENT_REPLY if frame.msg_ref.as_deref() == Some(JOIN_REF) => {
            if frame.reply_status() == Some("ok") {
                tracing::info!(topic = %topic, "Joined realtime channel");
            } else {
                tracing::error!(topic = %topic, response = %frame.payload, "Realtime join rejected");
            }
            true
        }
        EVENT_ERROR | EVENT_CLOSE => {
            tracing::warn!(topic = %topic, event = %frame.event, "Realtime channel closed");
            false
        }
        _ => true,
    }
}
