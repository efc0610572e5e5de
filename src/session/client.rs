use std::{collections::VecDeque, future::Future, pin::Pin, sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use url::Url;
use uuid::Uuid;

use super::{
    connection::{Connection, LinkState},
    state::{transition, Effect, Event, Notification, Outgoing, State},
};
use crate::{
    audio::NotePlayer,
    config::Config,
    error::{ConfigError, SessionError},
    protocol::{Envelope, MidiPayload},
    rtt::{RttStats, RttTimer},
    synth::EngineFactory,
};

/// What the local user can ask of a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SendText(String),
    SendMidi(MidiPayload),
    Leave,
}

type Receiving = Pin<Box<dyn Future<Output = Result<Envelope, SessionError>> + Send>>;

/// Runs one session: executes the state machine's effects against the
/// network, the RTT timer and the audio mix.
pub struct SessionClient<F> {
    endpoint: Url,
    connect_timeout: Duration,
    leave_timeout: Duration,
    connection: Option<Arc<Connection>>,
    timer: Arc<RttTimer>,
    stats: RttStats,
    player: Arc<NotePlayer<F>>,
    notifications: UnboundedSender<Notification>,
}

impl<F> SessionClient<F>
where
    F: EngineFactory + 'static,
{
    pub fn new(
        endpoint: Url,
        player: Arc<NotePlayer<F>>,
        notifications: UnboundedSender<Notification>,
    ) -> Self {
        Self {
            endpoint,
            connect_timeout: Duration::from_secs(10),
            leave_timeout: Duration::from_secs(10),
            connection: None,
            timer: Arc::new(RttTimer::new()),
            stats: RttStats::new(),
            player,
            notifications,
        }
    }

    /// Endpoint and timeouts taken from `config`.
    pub fn from_config(
        config: &Config,
        player: Arc<NotePlayer<F>>,
        notifications: UnboundedSender<Notification>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(config.session_endpoint()?, player, notifications)
            .connect_timeout(config.connect_timeout)
            .leave_timeout(config.leave_timeout))
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn leave_timeout(mut self, timeout: Duration) -> Self {
        self.leave_timeout = timeout;
        self
    }

    pub fn stats(&self) -> RttStats {
        self.stats
    }

    /// Join `session_id` and serve it until the user leaves or the
    /// connection is lost. Dropping the command sender counts as leaving.
    ///
    /// Returns the final state, which is always `Disconnected`.
    pub async fn run(
        &mut self,
        session_id: impl Into<String>,
        mut commands: UnboundedReceiver<Command>,
    ) -> State {
        let mut state = State::default();
        let mut receiving: Option<Receiving> = None;
        let mut events = VecDeque::from([Event::Join {
            session_id: session_id.into(),
        }]);

        loop {
            while let Some(event) = events.pop_front() {
                let (next, effects) = transition(state, event);
                state = next;
                for effect in effects {
                    if let Some(follow_up) = self.execute(effect, &mut receiving).await {
                        events.push_back(follow_up);
                    }
                }
            }

            if state == State::Disconnected {
                break;
            }

            let event = tokio::select! {
                inbound = next_inbound(&mut receiving) => match inbound {
                    Ok(envelope) => {
                        debug!("recv {} {}", envelope.kind, envelope.id);
                        Event::Received(envelope)
                    }
                    Err(err) => {
                        warn!("receive: {err}");
                        Event::ReceiveFailed((&err).into())
                    }
                },
                command = commands.recv() => match command {
                    Some(Command::SendText(body)) => Event::Outgoing {
                        id: Uuid::new_v4(),
                        message: Outgoing::Text(body),
                    },
                    Some(Command::SendMidi(midi)) => Event::Outgoing {
                        id: Uuid::new_v4(),
                        message: Outgoing::Midi(midi),
                    },
                    Some(Command::Leave) | None => Event::Leave,
                },
            };
            events.push_back(event);
        }

        if let Some(connection) = self.connection.take() {
            if connection.state() != LinkState::Disconnected {
                connection.leave(self.leave_timeout).await;
            }
        }
        state
    }

    async fn execute(&mut self, effect: Effect, receiving: &mut Option<Receiving>) -> Option<Event> {
        match effect {
            Effect::Dial { session_id } => {
                match Connection::connect(&self.endpoint, &session_id, self.connect_timeout).await {
                    Ok(connection) => {
                        self.connection = Some(Arc::new(connection));
                        Some(Event::Dialed)
                    }
                    Err(err) => {
                        warn!("join {session_id}: {err}");
                        Some(Event::DialFailed(err.to_string()))
                    }
                }
            }
            Effect::ArmReceive => {
                debug_assert!(receiving.is_none(), "a receive is already in flight");
                if let Some(connection) = self.connection.clone() {
                    *receiving = Some(Box::pin(async move { connection.receive_next().await }));
                }
                None
            }
            Effect::StartTimer(id) => {
                if let Err(err) = self.timer.start(id) {
                    warn!("{err}");
                    self.notify(Notification::Error(err.to_string()));
                }
                None
            }
            Effect::Transmit(envelope) => {
                let id = envelope.id;
                let result = match &self.connection {
                    Some(connection) => connection.send(&envelope).await,
                    None => Err(SessionError::NotConnected),
                };
                Some(match result {
                    Ok(()) => Event::Transmitted(id),
                    Err(err) => {
                        warn!("send {id}: {err}");
                        Event::TransmitFailed {
                            id,
                            reason: err.to_string(),
                        }
                    }
                })
            }
            Effect::CancelTimer(id) => {
                self.timer.cancel(id);
                None
            }
            Effect::ResolveRtt(id) => {
                let sample = self.timer.stop(id);
                if let Some(latency) = sample {
                    self.stats = self.stats.update(sample);
                    debug!("rtt {id}: {latency:?}");
                    self.notify(Notification::Rtt(self.stats.snapshot(self.timer.pending())));
                }
                None
            }
            Effect::Play(midi) => {
                // Rendered beside the session so receives and commands keep flowing.
                let player = self.player.clone();
                let notifications = self.notifications.clone();
                tokio::task::spawn_blocking(move || {
                    if let Err(err) = player.play(&midi) {
                        warn!("dropped note {}: {err}", midi.number);
                        let _ = notifications.send(Notification::Error(format!("dropped note: {err}")));
                    }
                });
                None
            }
            Effect::Hangup => {
                // Release the pending receive before closing.
                *receiving = None;
                if let Some(connection) = self.connection.take() {
                    let outcome = connection.leave(self.leave_timeout).await;
                    info!("leave: {outcome:?}");
                }
                Some(Event::Left)
            }
            Effect::Notify(notification) => {
                self.notify(notification);
                None
            }
        }
    }

    fn notify(&self, notification: Notification) {
        // The UI may already be gone while we shut down.
        let _ = self.notifications.send(notification);
    }
}

/// Wait for the in-flight receive, or forever when none is armed.
async fn next_inbound(receiving: &mut Option<Receiving>) -> Result<Envelope, SessionError> {
    let result = match receiving.as_mut() {
        Some(future) => future.await,
        None => std::future::pending().await,
    };
    *receiving = None;
    result
}
