// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic framing and CBOR helpers.
//!
//! Packet layout:
//!
//! ``MAGIC(4) || VERSION(2) || FLAGS(2) || LENGTH(4) || PAYLOAD || CHECKSUM(32)``
//!
//! * PAYLOAD is a CBOR `OpEnvelope`
//! * CHECKSUM = blake3-256 over HEADER (first 12 bytes) || PAYLOAD

use blake3::Hasher;
use ciborium::value::Value as CborValue;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::{
    ErrorPayload, HandshakeAckPayload, HandshakePayload, InteractionPayload, Message, OpEnvelope,
    PageFlushPayload, RedirectPayload,
};

/// Protocol magic constant "RPL!".
pub const MAGIC: [u8; 4] = [0x52, 0x50, 0x4c, 0x21];
/// Wire protocol version (big-endian u16).
pub const VERSION: u16 = 0x0001;
/// Reserved flags (set to zero for v1).
pub const FLAGS: u16 = 0x0000;
/// Header length in bytes.
pub const HEADER_LEN: usize = 12;
/// Trailing checksum length in bytes.
pub const CHECKSUM_LEN: usize = 32;
/// Largest payload accepted by readers.
pub const MAX_PAYLOAD: usize = 8 * 1024 * 1024;

/// Framing and codec errors.
#[derive(Debug, Error)]
pub enum WireError {
    /// Fewer bytes than the header or declared length require.
    #[error("incomplete packet")]
    Incomplete,
    /// Magic bytes did not match.
    #[error("bad magic")]
    BadMagic,
    /// Unknown protocol version.
    #[error("unsupported version {0}")]
    UnsupportedVersion(u16),
    /// Declared payload exceeds [`MAX_PAYLOAD`].
    #[error("payload too large: {0} bytes")]
    TooLarge(usize),
    /// Checksum did not match header||payload.
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// Envelope op not recognised.
    #[error("unknown op {0}")]
    UnknownOp(String),
    /// CBOR encoding failed.
    #[error("encode error: {0}")]
    Encode(String),
    /// CBOR decoding failed.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Encode to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).map_err(|e| WireError::Encode(e.to_string()))?;
    Ok(out)
}

/// Decode from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    ciborium::de::from_reader(bytes).map_err(|e| WireError::Decode(e.to_string()))
}

/// Payload length declared by a packet header, validated against
/// [`MAX_PAYLOAD`]. Readers use it to know how many bytes to wait for.
pub fn declared_len(header: &[u8]) -> Result<usize, WireError> {
    if header.len() < HEADER_LEN {
        return Err(WireError::Incomplete);
    }
    let len = u32::from_be_bytes([header[8], header[9], header[10], header[11]]) as usize;
    if len > MAX_PAYLOAD {
        return Err(WireError::TooLarge(len));
    }
    Ok(len)
}

/// Total packet length for a declared payload length.
pub fn packet_len(payload_len: usize) -> usize {
    HEADER_LEN + payload_len + CHECKSUM_LEN
}

/// A full packet (header + payload + checksum).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Raw header.
    pub header: [u8; HEADER_LEN],
    /// CBOR payload bytes.
    pub payload: Vec<u8>,
    /// blake3 checksum over header||payload.
    pub checksum: [u8; CHECKSUM_LEN],
}

impl Packet {
    /// Build a packet from a CBOR payload.
    pub fn from_payload(payload: Vec<u8>) -> Result<Self, WireError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(WireError::TooLarge(payload.len()));
        }
        let len = u32::try_from(payload.len()).map_err(|_| WireError::TooLarge(payload.len()))?;
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&MAGIC);
        header[4..6].copy_from_slice(&VERSION.to_be_bytes());
        header[6..8].copy_from_slice(&FLAGS.to_be_bytes());
        header[8..12].copy_from_slice(&len.to_be_bytes());

        let mut hasher = Hasher::new();
        hasher.update(&header);
        hasher.update(&payload);
        let checksum = *hasher.finalize().as_bytes();

        Ok(Packet {
            header,
            payload,
            checksum,
        })
    }

    /// Encode an `OpEnvelope` into a full packet byte vector.
    pub fn encode_envelope<P: Serialize>(env: &OpEnvelope<P>) -> Result<Vec<u8>, WireError> {
        let packet = Packet::from_payload(to_cbor(env)?)?;
        let mut out = Vec::with_capacity(packet_len(packet.payload.len()));
        out.extend_from_slice(&packet.header);
        out.extend_from_slice(&packet.payload);
        out.extend_from_slice(&packet.checksum);
        Ok(out)
    }

    /// Decode a packet from a byte slice, returning the envelope and bytes consumed.
    pub fn decode_envelope<P: DeserializeOwned>(
        bytes: &[u8],
    ) -> Result<(OpEnvelope<P>, usize), WireError> {
        if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(WireError::Incomplete);
        }
        if bytes[0..4] != MAGIC {
            return Err(WireError::BadMagic);
        }
        let version = u16::from_be_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(WireError::UnsupportedVersion(version));
        }
        let len = declared_len(bytes)?;
        let total = packet_len(len);
        if bytes.len() < total {
            return Err(WireError::Incomplete);
        }
        let header = &bytes[0..HEADER_LEN];
        let payload = &bytes[HEADER_LEN..HEADER_LEN + len];
        let checksum = &bytes[HEADER_LEN + len..total];

        let mut hasher = Hasher::new();
        hasher.update(header);
        hasher.update(payload);
        if hasher.finalize().as_bytes() != checksum {
            return Err(WireError::ChecksumMismatch);
        }

        let env: OpEnvelope<P> = from_cbor(payload)?;
        Ok((env, total))
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<CborValue, WireError> {
    CborValue::serialized(value).map_err(|e| WireError::Encode(e.to_string()))
}

fn from_value<T: DeserializeOwned>(value: &CborValue) -> Result<T, WireError> {
    value
        .deserialized()
        .map_err(|e| WireError::Decode(e.to_string()))
}

/// Encode a `Message` into a packet with the provided logical timestamp.
pub fn encode_message(msg: &Message, ts: u64) -> Result<Vec<u8>, WireError> {
    let payload = match msg {
        Message::Handshake(p) => to_value(p)?,
        Message::HandshakeAck(p) => to_value(p)?,
        Message::Error(p) => to_value(p)?,
        Message::Interaction(p) => to_value(p)?,
        Message::PageFlush(p) => to_value(p)?,
        Message::Redirect(p) => to_value(p)?,
    };
    let env = OpEnvelope {
        op: msg.op_name().to_string(),
        ts,
        payload,
    };
    Packet::encode_envelope(&env)
}

/// Decode bytes into (Message, ts, bytes_consumed).
pub fn decode_message(bytes: &[u8]) -> Result<(Message, u64, usize), WireError> {
    let (env, used) = Packet::decode_envelope::<CborValue>(bytes)?;
    let msg = match env.op.as_str() {
        "handshake" => Message::Handshake(from_value::<HandshakePayload>(&env.payload)?),
        "handshake_ack" => Message::HandshakeAck(from_value::<HandshakeAckPayload>(&env.payload)?),
        "error" => Message::Error(from_value::<ErrorPayload>(&env.payload)?),
        "interaction" => Message::Interaction(from_value::<InteractionPayload>(&env.payload)?),
        "page_flush" => Message::PageFlush(from_value::<PageFlushPayload>(&env.payload)?),
        "redirect" => Message::Redirect(from_value::<RedirectPayload>(&env.payload)?),
        other => return Err(WireError::UnknownOp(other.to_string())),
    };
    Ok((msg, env.ts, used))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use ripple_page::{FormCard, Item, Page};
    use std::collections::BTreeMap;

    #[test]
    fn interaction_survives_framing() {
        let mut args = BTreeMap::new();
        args.insert("theme_dark".to_string(), Value::Bool(true));
        args.insert("images".to_string(), Value::Int(3));
        let mut dismissed = BTreeMap::new();
        dismissed.insert("dismissed".to_string(), Value::Bool(true));
        let mut events = BTreeMap::new();
        events.insert("dialog_new_image".to_string(), dismissed);
        let msg = Message::Interaction(InteractionPayload { args, events });

        let bytes = encode_message(&msg, 7).unwrap();
        let (decoded, ts, used) = decode_message(&bytes).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(ts, 7);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn page_flush_carries_cards() {
        let mut page = Page::new();
        page.put("home", FormCard::new("main", vec![Item::text("This is dark mode.")]));
        let delta = page.save().unwrap();
        let msg = Message::PageFlush(PageFlushPayload { delta });
        let bytes = encode_message(&msg, 0).unwrap();
        let (decoded, _, _) = decode_message(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let msg = Message::Redirect(RedirectPayload {
            target: "#home".into(),
        });
        let mut bytes = encode_message(&msg, 1).unwrap();
        bytes[HEADER_LEN] ^= 0xff;
        assert!(matches!(
            decode_message(&bytes),
            Err(WireError::ChecksumMismatch)
        ));
    }

    #[test]
    fn oversized_header_is_rejected() {
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&MAGIC);
        header[8..12].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(declared_len(&header), Err(WireError::TooLarge(_))));
    }

    #[test]
    fn unknown_op_is_rejected() {
        let env = OpEnvelope {
            op: "graph_stream".to_string(),
            ts: 0,
            payload: CborValue::Null,
        };
        let bytes = Packet::encode_envelope(&env).unwrap();
        assert!(matches!(
            decode_message(&bytes),
            Err(WireError::UnknownOp(op)) if op == "graph_stream"
        ));
    }
}
