//! Wire protocol: a tagged JSON envelope carrying one of three payloads.
//!
//! ```text
//! {"id": "<uuid>", "type": "text"|"midi"|"connect", "userId": "<uuid>", "payload": {...}}
//! ```
//!
//! Decoding is two-step: the envelope first, then the payload selected by
//! the type tag. Encoding and decoding have no side effects.

mod envelope;
mod payload;

pub use envelope::Envelope;
pub use payload::{
    ConnectPayload, Message, MessageType, MidiPayload, NoteState, Payload, TextPayload,
};
