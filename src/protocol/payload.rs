use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Type tag of an envelope. Serialized as a short lowercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Midi,
    Connect,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageType::Text => "text",
            MessageType::Midi => "midi",
            MessageType::Connect => "connect",
        })
    }
}

/// A payload shape that can ride inside an envelope.
pub trait Payload: Serialize + DeserializeOwned {
    const KIND: MessageType;
}

/// One chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPayload {
    pub display_name: String,
    pub body: String,
}

impl Payload for TextPayload {
    const KIND: MessageType = MessageType::Text;
}

/// Key state of a MIDI event: 0 = off, 1 = on on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NoteState {
    Off,
    On,
}

impl TryFrom<u8> for NoteState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NoteState::Off),
            1 => Ok(NoteState::On),
            other => Err(format!("invalid note state {other}, expected 0 or 1")),
        }
    }
}

impl From<NoteState> for u8 {
    fn from(state: NoteState) -> Self {
        match state {
            NoteState::Off => 0,
            NoteState::On => 1,
        }
    }
}

/// A note event.
///
/// `number` and `velocity` are kept as wire integers so that out-of-range
/// values decode cleanly and are rejected by the renderer instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiPayload {
    pub state: NoteState,
    /// MIDI note number, C4 = 60. Valid values: 0-127.
    pub number: i32,
    /// MIDI velocity. Valid values: 0-127.
    pub velocity: i32,
}

impl MidiPayload {
    pub fn note_on(number: i32, velocity: i32) -> Self {
        Self {
            state: NoteState::On,
            number,
            velocity,
        }
    }

    pub fn note_off(number: i32) -> Self {
        Self {
            state: NoteState::Off,
            number,
            velocity: 0,
        }
    }
}

impl Payload for MidiPayload {
    const KIND: MessageType = MessageType::Midi;
}

/// Identity announcement, sent by the server when a peer joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectPayload {
    pub user_id: Uuid,
    pub user_name: String,
}

impl Payload for ConnectPayload {
    const KIND: MessageType = MessageType::Connect;
}

/// A decoded payload, selected by the envelope's type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(TextPayload),
    Midi(MidiPayload),
    Connect(ConnectPayload),
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Message::Text(_) => MessageType::Text,
            Message::Midi(_) => MessageType::Midi,
            Message::Connect(_) => MessageType::Connect,
        }
    }
}

impl From<TextPayload> for Message {
    fn from(payload: TextPayload) -> Self {
        Message::Text(payload)
    }
}

impl From<MidiPayload> for Message {
    fn from(payload: MidiPayload) -> Self {
        Message::Midi(payload)
    }
}

impl From<ConnectPayload> for Message {
    fn from(payload: ConnectPayload) -> Self {
        Message::Connect(payload)
    }
}
