// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session wire schema for the Ripple host (interactions in, page deltas and
//! redirects out). Messages travel as CBOR `OpEnvelope`s inside checksummed
//! packets; see [`wire`].

pub use ripple_page::{Card, EpochId, Hash32, Item, PageDelta, PageOp, Value};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::PathBuf};

pub mod wire;

/// Default Unix socket path for the host.
///
/// Prefers a per-user runtime dir (XDG_RUNTIME_DIR) and falls back to `/tmp`
/// when unavailable.
pub fn default_socket_path() -> PathBuf {
    let base = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    base.join("ripple-host.sock")
}

/// Canonical envelope carried as the payload of a packet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpEnvelope<P> {
    /// Operation name (e.g. "handshake", "interaction", "page_flush").
    pub op: String,
    /// Logical timestamp (monotonic per-host clock).
    pub ts: u64,
    /// Operation-specific body.
    pub payload: P,
}

/// Error payload used in error and handshake_ack responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    /// Numeric error code.
    pub code: u32,
    /// Stable identifier (e.g. "E_BAD_PAYLOAD").
    pub name: String,
    /// Human readable message.
    pub message: String,
}

/// Handshake request payload (client → host).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakePayload {
    /// Implementation version (not wire version).
    pub client_version: u32,
    /// Optional client label for logs.
    pub agent_id: Option<String>,
}

/// Status enumeration for handshake ack.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AckStatus {
    /// Handshake succeeded.
    #[serde(rename = "OK")]
    Ok,
    /// Handshake failed.
    #[serde(rename = "ERROR")]
    Error,
}

/// Handshake acknowledgement payload (host → client).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeAckPayload {
    /// Status of the handshake.
    pub status: AckStatus,
    /// Server implementation version.
    pub server_version: u32,
    /// Name of the app served on this socket.
    pub app: String,
    /// Session identifier assigned to this connection.
    pub session_id: String,
    /// Optional error when status == Error.
    pub error: Option<ErrorPayload>,
}

/// One client interaction: trigger values plus component events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InteractionPayload {
    /// Trigger name → value (`theme_dark: true`, `tab: "heavy"`).
    pub args: BTreeMap<String, Value>,
    /// Event source → event name → value (`dialog_new_image.dismissed`).
    pub events: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Page delta flushed to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageFlushPayload {
    /// Changes since the client's last epoch.
    pub delta: PageDelta,
}

/// Navigation signal (host → client).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedirectPayload {
    /// Target location (e.g. `#home`).
    pub target: String,
}

/// Wire message kinds carried inside OpEnvelope payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Handshake request (op = "handshake").
    Handshake(HandshakePayload),
    /// Handshake acknowledgement (op = "handshake_ack").
    HandshakeAck(HandshakeAckPayload),
    /// Protocol or processing error (op = "error").
    Error(ErrorPayload),
    /// Client interaction (op = "interaction").
    Interaction(InteractionPayload),
    /// Page delta (op = "page_flush").
    PageFlush(PageFlushPayload),
    /// Navigation signal (op = "redirect").
    Redirect(RedirectPayload),
}

impl Message {
    /// Canonical op string for this message variant.
    pub fn op_name(&self) -> &'static str {
        match self {
            Message::Handshake(_) => "handshake",
            Message::HandshakeAck(_) => "handshake_ack",
            Message::Error(_) => "error",
            Message::Interaction(_) => "interaction",
            Message::PageFlush(_) => "page_flush",
            Message::Redirect(_) => "redirect",
        }
    }
}
