//! Duplex message channel
//!
//! All cross-pane and cross-process traffic rides one WebSocket carrying
//! subject-tagged JSON envelopes. Producers and consumers share a single
//! [`ChannelHandle`]; subjects multiplex independent protocols over the
//! same connection. Delivery is at-most-once: nothing is buffered across
//! a disconnect.

pub mod client;
pub mod relay;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use shadowplay_common::{Error, Result};

/// Capacity of the inbound fan-out buffer; slow subscribers lag and skip
const INBOUND_CAPACITY: usize = 256;

/// One frame on the channel: a subject naming the protocol, and an
/// opaque JSON payload for that protocol to interpret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub subject: String,
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn new(subject: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            subject: subject.into(),
            payload,
        }
    }

    /// Envelope carrying any serializable payload
    pub fn json<T: Serialize>(subject: impl Into<String>, payload: &T) -> Result<Self> {
        let payload = serde_json::to_value(payload).map_err(|e| Error::Channel(format!("encode payload: {}", e)))?;
        Ok(Self::new(subject, payload))
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Channel(format!("encode envelope: {}", e)))
    }

    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Channel(format!("malformed envelope: {}", e)))
    }

    /// Decode the payload as `T`
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| Error::Channel(format!("payload on subject {}: {}", self.subject, e)))
    }
}

/// Handle onto the shared channel: send envelopes out, subscribe to
/// everything that comes in
///
/// Cloneable; every protocol in the process shares one handle. Sends
/// never block; while the connection is down they are silently dropped
/// by the client task.
#[derive(Clone)]
pub struct ChannelHandle {
    outbound: mpsc::UnboundedSender<Envelope>,
    inbound: broadcast::Sender<Envelope>,
}

impl ChannelHandle {
    /// Handle plus the outbound receiver the connection task drains
    pub(crate) fn pair() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, _) = broadcast::channel(INBOUND_CAPACITY);
        (
            Self {
                outbound: outbound_tx,
                inbound: inbound_tx,
            },
            outbound_rx,
        )
    }

    pub(crate) fn inbound_sender(&self) -> broadcast::Sender<Envelope> {
        self.inbound.clone()
    }

    /// In-process channel that reflects every sent envelope straight back
    /// to subscribers. Used when owner and observer live in one process,
    /// and by tests.
    pub fn loopback() -> Self {
        let (handle, mut outbound_rx) = Self::pair();
        let inbound = handle.inbound_sender();
        tokio::spawn(async move {
            while let Some(envelope) = outbound_rx.recv().await {
                let _ = inbound.send(envelope);
            }
        });
        handle
    }

    /// Queue an envelope for the connection task
    pub fn send(&self, envelope: Envelope) -> Result<()> {
        self.outbound
            .send(envelope)
            .map_err(|_| Error::Channel("channel connection task has shut down".into()))
    }

    /// Serialize `payload` and send it on `subject`
    pub fn publish<T: Serialize>(&self, subject: impl Into<String>, payload: &T) -> Result<()> {
        self.send(Envelope::json(subject, payload)?)
    }

    /// Subscribe to all inbound envelopes; subscribers filter by subject
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.inbound.subscribe()
    }
}
