//! WebSocket transport to the OpenAI Realtime API.
//!
//! [`connect`] opens the socket and spawns two tasks: a writer that serializes
//! [`ClientEvent`]s onto the socket, and a reader that decodes incoming frames
//! into [`TransportEvent`]s. The caller only ever sees the two channel ends.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use openai_realtime_types::{ClientEvent, ServerEvent, parse_server_event};
use secrecy::{ExposeSecret, SecretString};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, protocol::Message as WsMessage},
};
use tracing::{debug, error, info, warn};

pub use openai_realtime_types as types;

pub const DEFAULT_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Connection parameters for a realtime session.
#[derive(Debug)]
pub struct RealtimeConfig {
    pub url: String,
    pub model: String,
    pub api_key: SecretString,
}

impl RealtimeConfig {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_REALTIME_URL.to_string(),
            model: model.into(),
            api_key,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// The socket URL with the model selected through the query string.
    pub fn endpoint(&self) -> String {
        format!("{}?model={}", self.url, self.model)
    }
}

/// Lifecycle and protocol events delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The socket is open and ready to accept client events.
    Opened,
    /// A decoded server event.
    Server(ServerEvent),
    /// A socket-level failure. The connection is unusable afterwards.
    Failed(String),
    /// The socket was closed, by either side.
    Closed,
}

/// Handles to a live realtime connection.
pub struct RealtimeConnection {
    /// Outbound client events.
    pub sender: mpsc::Sender<ClientEvent>,
    /// Inbound transport events, starting with [`TransportEvent::Opened`].
    pub events: mpsc::Receiver<TransportEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl RealtimeConnection {
    /// Tears down both socket tasks.
    pub fn close(self) {
        self.reader.abort();
        self.writer.abort();
        info!("Realtime connection closed.");
    }
}

/// Opens the realtime WebSocket and starts pumping events.
pub async fn connect(config: &RealtimeConfig) -> Result<RealtimeConnection> {
    let mut request = config.endpoint().into_client_request()?;
    request.headers_mut().insert(
        "Authorization",
        format!("Bearer {}", config.api_key.expose_secret()).parse()?,
    );
    request
        .headers_mut()
        .insert("OpenAI-Beta", "realtime=v1".parse()?);

    let (ws_stream, _) = connect_async(request)
        .await
        .context("Failed to connect to OpenAI Realtime WebSocket")?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    info!(model = %config.model, "Connected to OpenAI Realtime API.");

    let (client_tx, mut client_rx) = mpsc::channel::<ClientEvent>(128);
    let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(128);

    // The channel is fresh, so this cannot fail for lack of capacity.
    let _ = event_tx.try_send(TransportEvent::Opened);

    let writer_events = event_tx.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = client_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    error!(kind = event.kind(), "Failed to serialize client event: {}", e);
                    continue;
                }
            };
            if event.kind() != "input_audio_buffer.append" {
                debug!(kind = event.kind(), "-> client event");
            }
            if let Err(e) = ws_tx.send(WsMessage::Text(payload.into())).await {
                error!("Error writing to realtime socket: {}", e);
                let _ = writer_events.send(TransportEvent::Failed(e.to_string())).await;
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let reader = tokio::spawn(async move {
        while let Some(msg_result) = ws_rx.next().await {
            match msg_result {
                Ok(WsMessage::Text(text)) => match parse_server_event(&text) {
                    Ok(event) => {
                        if event_tx.send(TransportEvent::Server(event)).await.is_err() {
                            debug!("Event receiver dropped; stopping reader.");
                            return;
                        }
                    }
                    Err(e) => warn!("Skipping undecodable server event: {}", e),
                },
                Ok(WsMessage::Close(close_frame)) => {
                    info!(?close_frame, "Realtime socket closed by server.");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Error reading from realtime socket: {}", e);
                    let _ = event_tx.send(TransportEvent::Failed(e.to_string())).await;
                    break;
                }
            }
        }
        let _ = event_tx.send(TransportEvent::Closed).await;
    });

    Ok(RealtimeConnection {
        sender: client_tx,
        events: event_rx,
        reader,
        writer,
    })
}
