//! Reconnecting channel client
//!
//! One background task owns the WebSocket. It retries the initial connect
//! forever at a fixed cadence and re-enters the same retry loop when an
//! established connection drops, so the [`ChannelHandle`] stays valid
//! across outages. Envelopes submitted while disconnected are dropped,
//! never buffered; liveness is checked with application pings.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{ChannelHandle, Envelope};

/// Delay between reconnect attempts
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Interval between liveness pings on an idle-or-not connection
pub const PING_INTERVAL: Duration = Duration::from_secs(10);

/// A ping unanswered for this long drops the connection
pub const PONG_DEADLINE: Duration = Duration::from_secs(5);

/// Connection tuning; defaults match the production relay
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub reconnect_delay: Duration,
    pub ping_interval: Duration,
    pub pong_deadline: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: RECONNECT_DELAY,
            ping_interval: PING_INTERVAL,
            pong_deadline: PONG_DEADLINE,
        }
    }
}

/// Why a session ended
enum SessionEnd {
    /// Every handle was dropped; the client task should exit
    HandlesDropped,
    /// Socket closed, errored, or went silent; reconnect
    ConnectionLost,
}

/// Connect to the relay at `url` with default tuning
pub fn connect(url: impl Into<String>) -> ChannelHandle {
    connect_with(ClientConfig::new(url))
}

/// Connect with explicit tuning; returns immediately, the connection is
/// established (and re-established) in the background
pub fn connect_with(config: ClientConfig) -> ChannelHandle {
    let (handle, outbound_rx) = ChannelHandle::pair();
    let inbound = handle.inbound_sender();
    tokio::spawn(run(config, outbound_rx, inbound));
    handle
}

async fn run(config: ClientConfig, mut outbound: mpsc::UnboundedReceiver<Envelope>, inbound: broadcast::Sender<Envelope>) {
    loop {
        // At-most-once: anything submitted while we were down is stale
        while outbound.try_recv().is_ok() {}

        match tokio_tungstenite::connect_async(config.url.as_str()).await {
            Ok((ws, _)) => {
                info!(url = %config.url, "channel connected");
                match session(ws, &mut outbound, &inbound, &config).await {
                    SessionEnd::HandlesDropped => {
                        debug!("channel client shutting down");
                        return;
                    }
                    SessionEnd::ConnectionLost => {
                        warn!(url = %config.url, "channel connection lost, reconnecting");
                    }
                }
            }
            Err(e) => {
                warn!(url = %config.url, "channel connect failed: {}", e);
            }
        }

        tokio::time::sleep(config.reconnect_delay).await;
    }
}

async fn session(
    ws: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    outbound: &mut mpsc::UnboundedReceiver<Envelope>,
    inbound: &broadcast::Sender<Envelope>,
    config: &ClientConfig,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();

    let mut ping_timer = tokio::time::interval(config.ping_interval);
    ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ping_timer.tick().await; // consume the immediate first tick

    // Armed while a ping is outstanding; a pong disarms it
    let mut pong_deadline: Option<std::pin::Pin<Box<tokio::time::Sleep>>> = None;

    loop {
        tokio::select! {
            envelope = outbound.recv() => match envelope {
                Some(envelope) => match envelope.encode() {
                    Ok(text) => {
                        if sink.send(Message::text(text)).await.is_err() {
                            return SessionEnd::ConnectionLost;
                        }
                    }
                    Err(e) => warn!("dropping unencodable envelope: {}", e),
                },
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::HandlesDropped;
                }
            },

            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match Envelope::decode(text.as_str()) {
                    Ok(envelope) => {
                        let _ = inbound.send(envelope);
                    }
                    Err(e) => warn!("dropping malformed frame: {}", e),
                },
                Some(Ok(Message::Ping(data))) => {
                    if sink.send(Message::Pong(data)).await.is_err() {
                        return SessionEnd::ConnectionLost;
                    }
                }
                Some(Ok(Message::Pong(_))) => {
                    pong_deadline = None;
                }
                Some(Ok(Message::Close(_))) | None => return SessionEnd::ConnectionLost,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("channel read error: {}", e);
                    return SessionEnd::ConnectionLost;
                }
            },

            _ = ping_timer.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    return SessionEnd::ConnectionLost;
                }
                if pong_deadline.is_none() {
                    pong_deadline = Some(Box::pin(tokio::time::sleep(config.pong_deadline)));
                }
            },

            _ = async {
                match pong_deadline.as_mut() {
                    Some(deadline) => deadline.await,
                    None => std::future::pending().await,
                }
            }, if pong_deadline.is_some() => {
                warn!(url = %config.url, "ping unanswered, dropping connection");
                return SessionEnd::ConnectionLost;
            },
        }
    }
}
