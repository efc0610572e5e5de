use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use uuid::Uuid;

use super::payload::{ConnectPayload, Message, MessageType, MidiPayload, Payload, TextPayload};
use crate::error::ProtocolError;

/// One protocol message on the wire.
///
/// The payload stays an opaque JSON blob until the type tag has been
/// inspected, so the outer envelope decodes without knowing its shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Message identifier, generated by the sender.
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Sender identifier. `null` on the wire decodes as the nil id.
    #[serde(rename = "userId", default, deserialize_with = "nullable_uuid")]
    pub user_id: Uuid,
    payload: Box<RawValue>,
}

fn nullable_uuid<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Uuid>::deserialize(deserializer)?.unwrap_or_default())
}

impl Envelope {
    /// Wrap `payload` in a fresh envelope with a new message id.
    pub fn new<P: Payload>(user_id: Uuid, payload: &P) -> Result<Self, ProtocolError> {
        Self::with_id(Uuid::new_v4(), user_id, payload)
    }

    /// Wrap `payload` under a caller-chosen message id.
    pub fn with_id<P: Payload>(id: Uuid, user_id: Uuid, payload: &P) -> Result<Self, ProtocolError> {
        let payload = serde_json::value::to_raw_value(payload).map_err(ProtocolError::Encode)?;
        Ok(Self {
            id,
            kind: P::KIND,
            user_id,
            payload,
        })
    }

    /// Serialize for the wire.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Parse one wire message. An unknown type tag is an error.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(bytes).map_err(ProtocolError::Malformed)
    }

    /// Raw embedded payload, as it appeared on the wire.
    pub fn raw_payload(&self) -> &str {
        self.payload.get()
    }

    /// Parse the embedded payload as `P`.
    ///
    /// Fails with `PayloadMismatch` when the tag is not `P::KIND` or the
    /// payload does not have the shape of `P`.
    pub fn unwrap_payload<P: Payload>(&self) -> Result<P, ProtocolError> {
        let mismatch = |source: Option<serde_json::Error>| ProtocolError::PayloadMismatch {
            expected: P::KIND,
            found: self.kind,
            source,
        };
        if self.kind != P::KIND {
            return Err(mismatch(None));
        }
        serde_json::from_str(self.payload.get()).map_err(|e| mismatch(Some(e)))
    }

    /// Decode the payload according to the type tag.
    pub fn open(&self) -> Result<Message, ProtocolError> {
        Ok(match self.kind {
            MessageType::Text => self.unwrap_payload::<TextPayload>()?.into(),
            MessageType::Midi => self.unwrap_payload::<MidiPayload>()?.into(),
            MessageType::Connect => self.unwrap_payload::<ConnectPayload>()?.into(),
        })
    }
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.user_id == other.user_id
            && self.payload.get() == other.payload.get()
    }
}

impl Eq for Envelope {}
