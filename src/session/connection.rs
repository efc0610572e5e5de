use std::{
    sync::{Mutex as StdMutex, MutexGuard},
    time::Duration,
};

use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use log::{debug, info, warn};
use tokio::{net::TcpStream, sync::watch, sync::Mutex};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        self,
        error::ProtocolError as WsProtocolError,
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use url::Url;

use crate::{error::SessionError, protocol::Envelope};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Where a connection is in its lifecycle.
///
/// `Connecting` has no value here: a `Connection` only exists once the
/// handshake completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Closing,
    Disconnected,
}

/// How a `leave` ended. The connection is `Disconnected` in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The server answered our close frame.
    Acknowledged,
    /// No answer before the deadline.
    TimedOut,
    /// The transport failed while closing.
    Failed,
}

/// One websocket to a jam session.
///
/// Reads and writes go through separate locks: any number of tasks may
/// `send` concurrently (frames never interleave), while `receive_next` is
/// meant for a single consumer.
pub struct Connection {
    endpoint: String,
    writer: Mutex<SplitSink<WsStream, Message>>,
    reader: Mutex<SplitStream<WsStream>>,
    closing: watch::Sender<bool>,
    state: StdMutex<LinkState>,
}

/// The URL of session `session_id` under a websocket base.
pub fn jam_url(base: &Url, session_id: &str) -> String {
    format!("{}/jam/{}", base.as_str().trim_end_matches('/'), session_id)
}

impl Connection {
    /// Open a websocket to `<base>/jam/<session_id>`.
    pub async fn connect(
        base: &Url,
        session_id: &str,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        let endpoint = jam_url(base, session_id);
        debug!("connecting to {endpoint}");

        let (stream, _response) = tokio::time::timeout(timeout, connect_async(endpoint.as_str()))
            .await
            .map_err(|_| SessionError::ConnectTimeout(endpoint.clone()))?
            .map_err(|source| SessionError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;

        info!("connected to {endpoint}");
        let (writer, reader) = stream.split();
        let (closing, _) = watch::channel(false);
        Ok(Self {
            endpoint,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            closing,
            state: StdMutex::new(LinkState::Connected),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> LinkState {
        *self.lock_state()
    }

    /// Wait for the next envelope.
    ///
    /// Returns exactly one message per call and never reads ahead; call it
    /// again to keep receiving. A concurrent `leave` makes a pending call
    /// return `Closed` promptly.
    pub async fn receive_next(&self) -> Result<Envelope, SessionError> {
        let mut closing = self.closing.subscribe();
        if *closing.borrow_and_update() {
            return Err(SessionError::Closed);
        }

        let mut reader = tokio::select! {
            reader = self.reader.lock() => reader,
            _ = closing.changed() => return Err(SessionError::Closed),
        };

        loop {
            let frame = tokio::select! {
                frame = reader.next() => frame,
                _ = closing.changed() => return Err(SessionError::Closed),
            };

            match frame {
                Some(Ok(Message::Text(text))) => return Ok(Envelope::decode(text.as_bytes())?),
                Some(Ok(Message::Binary(bytes))) => return Ok(Envelope::decode(&bytes[..])?),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => return Err(self.closed_by_peer(frame)),
                Some(Err(err)) => return Err(self.receive_failed(err)),
                None => {
                    return Err(self.lost("connection ended without a close frame".into()));
                }
            }
        }
    }

    /// Serialize and write one envelope.
    pub async fn send(&self, envelope: &Envelope) -> Result<(), SessionError> {
        let json = envelope.encode()?;
        let mut writer = self.writer.lock().await;
        // Checked under the writer lock so nothing follows our close frame.
        if self.state() != LinkState::Connected {
            return Err(SessionError::NotConnected);
        }
        debug!("send {} {}", envelope.kind, envelope.id);
        writer.send(Message::text(json)).await.map_err(|err| match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                SessionError::NotConnected
            }
            other => SessionError::Write(other),
        })
    }

    /// Close the session, waiting up to `timeout` for the server's answer.
    ///
    /// A pending `receive_next` is released first. Leaving never fails: the
    /// connection ends up `Disconnected` whatever happens on the wire.
    pub async fn leave(&self, timeout: Duration) -> LeaveOutcome {
        *self.lock_state() = LinkState::Closing;
        self.closing.send_replace(true);

        let outcome = match tokio::time::timeout(timeout, self.close_handshake()).await {
            Ok(Ok(())) => LeaveOutcome::Acknowledged,
            Ok(Err(err)) => {
                warn!("leave {}: {err}", self.endpoint);
                LeaveOutcome::Failed
            }
            Err(_) => {
                warn!("leave {}: no close acknowledgement after {timeout:?}", self.endpoint);
                LeaveOutcome::TimedOut
            }
        };

        *self.lock_state() = LinkState::Disconnected;
        info!("left {} ({outcome:?})", self.endpoint);
        outcome
    }

    async fn close_handshake(&self) -> Result<(), tungstenite::Error> {
        self.writer
            .lock()
            .await
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: String::from("leaving session").into(),
            })))
            .await?;

        let mut reader = self.reader.lock().await;
        while let Some(frame) = reader.next().await {
            match frame {
                Ok(Message::Close(_)) => return Ok(()),
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn closed_by_peer(&self, frame: Option<CloseFrame>) -> SessionError {
        match frame {
            Some(frame) if !matches!(frame.code, CloseCode::Normal | CloseCode::Away) => self.lost(
                format!("closed with code {}: {}", u16::from(frame.code), frame.reason.as_str()),
            ),
            _ => {
                *self.lock_state() = LinkState::Disconnected;
                SessionError::Closed
            }
        }
    }

    fn receive_failed(&self, err: tungstenite::Error) -> SessionError {
        match err {
            tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Protocol(WsProtocolError::ResetWithoutClosingHandshake)
            | tungstenite::Error::Io(_) => {
                if self.state() == LinkState::Closing {
                    SessionError::Closed
                } else {
                    self.lost(err.to_string())
                }
            }
            other => SessionError::Receive(other),
        }
    }

    fn lost(&self, reason: String) -> SessionError {
        *self.lock_state() = LinkState::Disconnected;
        SessionError::UnexpectedClose(reason)
    }

    fn lock_state(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jam_url_joins_base_and_session() {
        let base = Url::parse("ws://127.0.0.1:8080/ws").unwrap();
        assert_eq!(jam_url(&base, "abc"), "ws://127.0.0.1:8080/ws/jam/abc");

        let base = Url::parse("wss://jam.example.com/ws/").unwrap();
        assert_eq!(jam_url(&base, "abc"), "wss://jam.example.com/ws/jam/abc");
    }
}
