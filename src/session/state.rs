/*
Session State Machine
=====================

    Disconnected ──Join──> Connecting ──Dialed──> Connected ──Leave──> Closing
         ^                     │                     │                    │
         └───── DialFailed ────┘                     │                   Left
         ^                                           │                    │
         └──────────── connection lost ──────────────┘<───────────────────┘

`transition` is pure. It never touches the network, the clock, the mix or
the RNG: whatever it wants done comes back as a list of effects, and the
outcome of those effects comes back in as the next events. Message ids are
generated by the caller and handed in with `Outgoing`.

Receive discipline: exactly one `ArmReceive` is emitted per delivered
envelope (plus one on connect), so at most one receive is ever in flight.

Identity: the server greets every client with a CONNECT carrying the new
client's id and name. Only the first CONNECT of a session is ours; later
ones announce other peers joining.
*/

use uuid::Uuid;

use crate::{
    error::{ProtocolError, SessionError},
    protocol::{ConnectPayload, Envelope, Message, MidiPayload, TextPayload},
    rtt::RttSnapshot,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    pub session_id: String,
    /// `None` until the server's first CONNECT arrives.
    pub identity: Option<Identity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Disconnected,
    Connecting {
        session_id: String,
    },
    Connected(Joined),
    Closing {
        session_id: String,
    },
}

/// Why the in-flight receive ended without an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveFailure {
    /// The message arrived but could not be decoded.
    Malformed(String),
    /// The connection was closed cleanly.
    Closed,
    /// The connection dropped.
    Lost(String),
}

impl From<&SessionError> for ReceiveFailure {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::Decode(err) => ReceiveFailure::Malformed(err.to_string()),
            SessionError::Closed | SessionError::NotConnected => ReceiveFailure::Closed,
            other => ReceiveFailure::Lost(other.to_string()),
        }
    }
}

/// Something the local user wants sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Midi(MidiPayload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Join { session_id: String },
    Dialed,
    DialFailed(String),
    Received(Envelope),
    ReceiveFailed(ReceiveFailure),
    Outgoing { id: Uuid, message: Outgoing },
    Transmitted(Uuid),
    TransmitFailed { id: Uuid, reason: String },
    Leave,
    Left,
}

/// One decoded chat line, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub id: Uuid,
    pub sender: Uuid,
    pub display_name: String,
    pub body: String,
    /// Sent by the local user (an echo of our own message).
    pub from_self: bool,
}

/// What the UI is told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Connected { session_id: String },
    Identified { user_id: Uuid, user_name: String },
    PeerJoined { user_id: Uuid, user_name: String },
    Text(ChatLine),
    Rtt(RttSnapshot),
    Error(String),
    ConnectionLost(String),
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Dial { session_id: String },
    /// Start the next receive. Never emitted while one is in flight.
    ArmReceive,
    StartTimer(Uuid),
    Transmit(Envelope),
    CancelTimer(Uuid),
    ResolveRtt(Uuid),
    Play(MidiPayload),
    Hangup,
    Notify(Notification),
}

/// Advance the session by one event.
pub fn transition(state: State, event: Event) -> (State, Vec<Effect>) {
    use Effect::*;

    match (state, event) {
        (State::Disconnected, Event::Join { session_id }) => (
            State::Connecting {
                session_id: session_id.clone(),
            },
            vec![Dial { session_id }],
        ),

        (State::Connecting { session_id }, Event::Dialed) => (
            State::Connected(Joined {
                session_id: session_id.clone(),
                identity: None,
            }),
            vec![Notify(Notification::Connected { session_id }), ArmReceive],
        ),

        (State::Connecting { .. }, Event::DialFailed(reason)) => {
            (State::Disconnected, vec![Notify(Notification::Error(reason))])
        }

        (State::Connected(joined), Event::Received(envelope)) => receive(joined, envelope),

        (State::Connected(joined), Event::ReceiveFailed(failure)) => match failure {
            ReceiveFailure::Malformed(reason) => (
                State::Connected(joined),
                vec![
                    Notify(Notification::Error(format!("dropped message: {reason}"))),
                    ArmReceive,
                ],
            ),
            ReceiveFailure::Closed => (
                State::Disconnected,
                vec![Notify(Notification::ConnectionLost(
                    "session closed by server".into(),
                ))],
            ),
            ReceiveFailure::Lost(reason) => (
                State::Disconnected,
                vec![Notify(Notification::ConnectionLost(reason))],
            ),
        },

        (State::Connected(joined), Event::Outgoing { id, message }) => send(joined, id, message),

        (state, Event::Outgoing { .. }) => (
            state,
            vec![Notify(Notification::Error("not connected to a session".into()))],
        ),

        (state @ State::Connected(_), Event::Transmitted(_)) => (state, vec![]),

        (state, Event::TransmitFailed { id, reason }) => (
            state,
            vec![
                CancelTimer(id),
                Notify(Notification::Error(format!("send failed: {reason}"))),
            ],
        ),

        (State::Connected(joined), Event::Leave) => (
            State::Closing {
                session_id: joined.session_id,
            },
            vec![Hangup],
        ),

        (State::Connecting { .. }, Event::Leave) => (State::Disconnected, vec![Notify(Notification::Left)]),

        (State::Closing { .. }, Event::Left) => (State::Disconnected, vec![Notify(Notification::Left)]),

        // The receive released by our own leave, or anything that arrives
        // after it, is of no interest.
        (state @ State::Closing { .. }, Event::Received(_) | Event::ReceiveFailed(_)) => {
            (state, vec![])
        }

        (state, _) => (state, vec![]),
    }
}

fn receive(mut joined: Joined, envelope: Envelope) -> (State, Vec<Effect>) {
    use Effect::*;

    let message = match envelope.open() {
        Ok(message) => message,
        Err(err) => return malformed(joined, err),
    };

    let effects = match message {
        Message::Connect(ConnectPayload { user_id, user_name }) => {
            if joined.identity.is_some() {
                vec![
                    Notify(Notification::PeerJoined { user_id, user_name }),
                    ArmReceive,
                ]
            } else {
                joined.identity = Some(Identity {
                    user_id,
                    user_name: user_name.clone(),
                });
                vec![
                    Notify(Notification::Identified { user_id, user_name }),
                    ArmReceive,
                ]
            }
        }
        Message::Text(TextPayload { display_name, body }) => {
            let from_self = joined
                .identity
                .as_ref()
                .is_some_and(|me| me.user_id == envelope.user_id);
            vec![
                Notify(Notification::Text(ChatLine {
                    id: envelope.id,
                    sender: envelope.user_id,
                    display_name,
                    body,
                    from_self,
                })),
                ResolveRtt(envelope.id),
                ArmReceive,
            ]
        }
        Message::Midi(midi) => vec![ResolveRtt(envelope.id), Play(midi), ArmReceive],
    };

    (State::Connected(joined), effects)
}

fn malformed(joined: Joined, err: ProtocolError) -> (State, Vec<Effect>) {
    (
        State::Connected(joined),
        vec![
            Effect::Notify(Notification::Error(format!("dropped message: {err}"))),
            Effect::ArmReceive,
        ],
    )
}

fn send(joined: Joined, id: Uuid, message: Outgoing) -> (State, Vec<Effect>) {
    let (user_id, user_name) = match &joined.identity {
        Some(me) => (me.user_id, me.user_name.clone()),
        None => (Uuid::nil(), String::new()),
    };

    let envelope = match message {
        Outgoing::Text(body) => Envelope::with_id(
            id,
            user_id,
            &TextPayload {
                display_name: user_name,
                body,
            },
        ),
        Outgoing::Midi(midi) => Envelope::with_id(id, user_id, &midi),
    };

    let effects = match envelope {
        // The timer starts before the write so a fast echo cannot beat it.
        Ok(envelope) => vec![Effect::StartTimer(id), Effect::Transmit(envelope)],
        Err(err) => vec![Effect::Notify(Notification::Error(err.to_string()))],
    };
    (State::Connected(joined), effects)
}

impl State {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            State::Disconnected => None,
            State::Connecting { session_id } | State::Closing { session_id } => Some(session_id),
            State::Connected(joined) => Some(&joined.session_id),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            State::Connected(joined) => joined.identity.as_ref(),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, State::Connected(_))
    }
}
