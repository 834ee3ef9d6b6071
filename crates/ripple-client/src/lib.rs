// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Client helper for talking to a Ripple host over Unix sockets
//! (CBOR-framed). Keeps a mirror of the served page in sync with the host's
//! flushes.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use anyhow::{bail, Result};
use ripple_page::{Page, Value};
use ripple_proto::{
    wire::{declared_len, decode_message, encode_message, HEADER_LEN},
    AckStatus, HandshakeAckPayload, HandshakePayload, InteractionPayload, Message,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::debug;

/// Protocol version this client speaks.
pub const CLIENT_VERSION: u32 = 1;

/// Minimal async client over Unix sockets.
pub struct SessionClient {
    stream: UnixStream,
    page: Page,
    redirect: Option<String>,
    next_ts: u64,
}

impl SessionClient {
    /// Connect to the host at the given Unix socket path.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = UnixStream::connect(path).await?;
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: UnixStream) -> Self {
        Self {
            stream,
            page: Page::new(),
            redirect: None,
            next_ts: 0,
        }
    }

    /// Local mirror of the served page.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Last navigation target sent by the host, cleared on read.
    pub fn take_redirect(&mut self) -> Option<String> {
        self.redirect.take()
    }

    async fn send(&mut self, msg: Message) -> Result<()> {
        let pkt = encode_message(&msg, self.next_ts)?;
        self.next_ts += 1;
        self.stream.write_all(&pkt).await?;
        Ok(())
    }

    /// Send a handshake message.
    pub async fn send_handshake(&mut self, agent_id: Option<String>) -> Result<()> {
        self.send(Message::Handshake(HandshakePayload {
            client_version: CLIENT_VERSION,
            agent_id,
        }))
        .await
    }

    /// Handshake and wait for the host's acknowledgement.
    pub async fn handshake(&mut self, agent_id: Option<String>) -> Result<HandshakeAckPayload> {
        self.send_handshake(agent_id).await?;
        match self.poll_message().await? {
            Some(Message::HandshakeAck(ack)) if ack.status == AckStatus::Ok => Ok(ack),
            Some(Message::HandshakeAck(ack)) => bail!(
                "handshake refused: {}",
                ack.error.map(|e| e.message).unwrap_or_default()
            ),
            Some(other) => bail!("expected handshake_ack, got {}", other.op_name()),
            None => bail!("host closed the connection during handshake"),
        }
    }

    /// Send one interaction.
    pub async fn send_interaction(
        &mut self,
        args: BTreeMap<String, Value>,
        events: BTreeMap<String, BTreeMap<String, Value>>,
    ) -> Result<()> {
        self.send(Message::Interaction(InteractionPayload { args, events }))
            .await
    }

    /// Send a single trigger, e.g. a button press.
    pub async fn trigger(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let args = BTreeMap::from([(name.to_string(), value.into())]);
        self.send_interaction(args, BTreeMap::new()).await
    }

    /// Poll a single message if available. Returns Ok(None) when the stream is closed before any bytes are read.
    /// Reads until a full frame header is buffered so short reads cannot desynchronize framing.
    pub async fn poll_message(&mut self) -> Result<Option<Message>> {
        let mut header = [0u8; HEADER_LEN];
        let mut read = 0usize;
        while read < header.len() {
            let n = self.stream.read(&mut header[read..]).await?;
            if n == 0 {
                if read == 0 {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("truncated frame header: read {read} of {HEADER_LEN} bytes"),
                )
                .into());
            }
            read += n;
        }
        let len = declared_len(&header)?;
        let mut packet = vec![0u8; ripple_proto::wire::packet_len(len)];
        packet[..HEADER_LEN].copy_from_slice(&header);
        self.stream.read_exact(&mut packet[HEADER_LEN..]).await?;
        let (msg, ts, _) = decode_message(&packet)?;
        debug!(op = msg.op_name(), ts, "received");
        Ok(Some(msg))
    }

    /// Next message, with page flushes applied to the mirror and redirects
    /// recorded before it is returned.
    pub async fn recv(&mut self) -> Result<Option<Message>> {
        let msg = self.poll_message().await?;
        match &msg {
            Some(Message::PageFlush(flush)) => self.page.apply_delta(flush.delta.clone())?,
            Some(Message::Redirect(redirect)) => self.redirect = Some(redirect.target.clone()),
            _ => {}
        }
        Ok(msg)
    }

    /// Expose the underlying stream (e.g., for select!).
    pub fn stream(&mut self) -> &mut UnixStream {
        &mut self.stream
    }
}
