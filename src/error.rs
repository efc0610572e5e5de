use thiserror::Error;
use tokio_tungstenite::tungstenite;
use uuid::Uuid;

use crate::protocol::MessageType;

pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error, wrapping the error of each component.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Rtt(#[from] RttError),
    #[error(transparent)]
    Synth(#[from] SynthError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Malformed envelopes and payloads. The message is dropped, the session lives on.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("payload is not a {expected} message (envelope type: {found})")]
    PayloadMismatch {
        expected: MessageType,
        found: MessageType,
        #[source]
        source: Option<serde_json::Error>,
    },
    #[error("encode: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Transport-level failures of a session connection.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("connect {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: tungstenite::Error,
    },
    #[error("connect {0}: timed out")]
    ConnectTimeout(String),
    #[error("receive: {0}")]
    Receive(#[source] tungstenite::Error),
    #[error("unexpected close: {0}")]
    UnexpectedClose(String),
    #[error("connection closed")]
    Closed,
    #[error("write: {0}")]
    Write(#[source] tungstenite::Error),
    #[error("not connected")]
    NotConnected,
    #[error(transparent)]
    Decode(#[from] ProtocolError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RttError {
    /// Two sends produced the same message id.
    #[error("timer already started for id {0}")]
    DuplicateTimer(Uuid),
}

/// A single note could not be rendered. The note is dropped, the mix keeps playing.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SynthError {
    #[error("note number {0} is outside 0..=127")]
    NoteOutOfRange(i32),
    #[error("velocity {0} is outside 0..=127")]
    VelocityOutOfRange(i32),
    #[error("synthesis engine: {0}")]
    Engine(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AudioError {
    #[error("seek position {pos} is outside 0..={len}")]
    SeekOutOfRange { pos: usize, len: usize },
    #[error("no default output device available")]
    NoOutputDevice,
    #[error("output device does not support f32 samples")]
    UnsupportedFormat,
    #[error("audio device: {0}")]
    Device(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported server scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}
