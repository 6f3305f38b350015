//! Channel relay server
//!
//! Accepts WebSocket connections on `/ws` and fans every valid envelope
//! out to all other connections. The relay never interprets subjects or
//! payloads beyond validating envelope shape; the sender is excluded from
//! its own fan-out so clients never hear their own frames twice.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};
use uuid::Uuid;

use super::Envelope;

/// Capacity of the fan-out hub; a lagging connection skips frames
const HUB_CAPACITY: usize = 256;

/// Shared relay state: the fan-out hub, keyed by sending connection
#[derive(Clone)]
pub struct RelayState {
    hub: broadcast::Sender<(Uuid, String)>,
}

impl RelayState {
    pub fn new() -> Self {
        let (hub, _) = broadcast::channel(HUB_CAPACITY);
        Self { hub }
    }

    /// Number of connected clients
    pub fn connection_count(&self) -> usize {
        self.hub.receiver_count()
    }
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

/// Relay HTTP surface: the WebSocket endpoint plus a liveness probe
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<RelayState>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: RelayState) {
    let conn_id = Uuid::new_v4();
    let mut hub_rx = state.hub.subscribe();
    let (mut sink, mut stream) = socket.split();
    debug!(conn = %conn_id, "relay connection opened");

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    // Validate shape before fanning out; garbage stops here
                    match Envelope::decode(&text) {
                        Ok(envelope) => {
                            debug!(conn = %conn_id, subject = %envelope.subject, "relaying frame");
                            let _ = state.hub.send((conn_id, text.to_string()));
                        }
                        Err(e) => warn!(conn = %conn_id, "dropping malformed frame: {}", e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // axum answers pings itself
                Some(Err(e)) => {
                    warn!(conn = %conn_id, "relay read error: {}", e);
                    break;
                }
            },

            relayed = hub_rx.recv() => match relayed {
                Ok((sender, text)) => {
                    if sender == conn_id {
                        continue;
                    }
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(conn = %conn_id, skipped, "slow relay connection skipped frames");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    debug!(conn = %conn_id, "relay connection closed");
}
