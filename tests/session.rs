use std::{
    collections::HashSet,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc::{self, UnboundedReceiver},
};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
    WebSocketStream,
};
use url::Url;
use uuid::Uuid;

use jamwire::{
    audio::{Mix, NotePlayer, NoteRenderer},
    error::{SessionError, SynthError},
    protocol::{ConnectPayload, Envelope, MidiPayload, TextPayload},
    session::{Command, Connection, LeaveOutcome, LinkState, Notification, SessionClient, State},
    synth::{NoteEvent, SynthEngine},
};

const TIMEOUT: Duration = Duration::from_secs(5);

type ServerSocket = WebSocketStream<TcpStream>;

/// Accept websocket clients on a free local port; each one is handed to
/// `handler` in its own task. Returns the websocket base URL.
async fn serve<H, Fut>(handler: H) -> Url
where
    H: Fn(ServerSocket) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = accept_async(stream).await {
                tokio::spawn(handler(ws));
            }
        }
    });
    Url::parse(&format!("ws://{addr}/ws")).unwrap()
}

/// Echo every data frame back, after an optional greeting.
async fn echo(mut ws: ServerSocket, greeting: Option<Envelope>) {
    if let Some(greeting) = greeting {
        ws.send(Message::text(greeting.encode().unwrap())).await.unwrap();
    }
    while let Some(Ok(message)) = ws.next().await {
        if matches!(message, Message::Text(_) | Message::Binary(_)) && ws.send(message).await.is_err() {
            break;
        }
    }
}

fn text(body: &str) -> Envelope {
    Envelope::new(
        Uuid::new_v4(),
        &TextPayload {
            display_name: "tester".into(),
            body: body.into(),
        },
    )
    .unwrap()
}

async fn connect(base: &Url) -> Connection {
    Connection::connect(base, "jam", TIMEOUT).await.unwrap()
}

#[tokio::test]
async fn echoes_arrive_in_send_order() {
    let base = serve(|ws| echo(ws, None)).await;
    let conn = connect(&base).await;
    assert_eq!(conn.state(), LinkState::Connected);

    let sent: Vec<Envelope> = (0..10).map(|i| text(&i.to_string())).collect();
    for envelope in &sent {
        conn.send(envelope).await.unwrap();
    }
    for envelope in &sent {
        assert_eq!(&conn.receive_next().await.unwrap(), envelope);
    }

    assert_eq!(conn.leave(TIMEOUT).await, LeaveOutcome::Acknowledged);
    assert_eq!(conn.state(), LinkState::Disconnected);
}

#[tokio::test]
async fn binary_frames_decode_too() {
    let envelope = text("binary");
    let frame = envelope.encode().unwrap().into_bytes();
    let base = serve(move |mut ws: ServerSocket| {
        let frame = frame.clone();
        async move {
            ws.send(Message::binary(frame)).await.unwrap();
            while ws.next().await.is_some() {}
        }
    })
    .await;
    let conn = connect(&base).await;
    assert_eq!(conn.receive_next().await.unwrap(), envelope);
}

#[tokio::test]
async fn concurrent_sends_do_not_interleave() {
    let base = serve(|ws| echo(ws, None)).await;
    let conn = Arc::new(connect(&base).await);

    let sends: Vec<_> = (0..20)
        .map(|i| {
            let conn = conn.clone();
            tokio::spawn(async move {
                let envelope = text(&"x".repeat(1_000 + i));
                conn.send(&envelope).await.unwrap();
                envelope.id
            })
        })
        .collect();
    let mut sent = HashSet::new();
    for send in sends {
        sent.insert(send.await.unwrap());
    }

    let mut received = HashSet::new();
    for _ in 0..20 {
        // Interleaved frames would fail to decode here.
        received.insert(conn.receive_next().await.unwrap().id);
    }
    assert_eq!(sent, received);
}

#[tokio::test]
async fn malformed_message_is_a_decode_error_and_the_connection_survives() {
    let base = serve(|mut ws: ServerSocket| async move {
        ws.send(Message::text("{\"id\": 12, \"type\": \"chord\"}")).await.unwrap();
        echo(ws, None).await;
    })
    .await;
    let conn = connect(&base).await;

    assert!(matches!(
        conn.receive_next().await,
        Err(SessionError::Decode(_))
    ));

    let envelope = text("still here");
    conn.send(&envelope).await.unwrap();
    assert_eq!(conn.receive_next().await.unwrap(), envelope);
}

#[tokio::test]
async fn dropped_transport_is_an_unexpected_close() {
    let base = serve(|ws: ServerSocket| async move { drop(ws) }).await;
    let conn = connect(&base).await;

    let err = conn.receive_next().await.unwrap_err();
    assert!(matches!(err, SessionError::UnexpectedClose(_)), "got {err:?}");
    assert_eq!(conn.state(), LinkState::Disconnected);
}

#[tokio::test]
async fn abnormal_close_code_is_an_unexpected_close() {
    let base = serve(|mut ws: ServerSocket| async move {
        let _ = ws
            .close(Some(CloseFrame {
                code: CloseCode::Error,
                reason: "server fault".into(),
            }))
            .await;
        while ws.next().await.is_some() {}
    })
    .await;
    let conn = connect(&base).await;

    match conn.receive_next().await {
        Err(SessionError::UnexpectedClose(reason)) => {
            assert!(reason.contains("1011"), "reason: {reason}");
            assert!(reason.contains("server fault"), "reason: {reason}");
        }
        other => panic!("expected unexpected close, got {other:?}"),
    }
}

#[tokio::test]
async fn normal_close_is_a_clean_close() {
    let base = serve(|mut ws: ServerSocket| async move {
        let _ = ws.close(None).await;
        while ws.next().await.is_some() {}
    })
    .await;
    let conn = connect(&base).await;

    assert!(matches!(conn.receive_next().await, Err(SessionError::Closed)));
    assert!(matches!(
        conn.send(&text("too late")).await,
        Err(SessionError::NotConnected)
    ));
}

#[tokio::test]
async fn leave_releases_a_suspended_receive() {
    let base = serve(|ws| echo(ws, None)).await;
    let conn = Arc::new(connect(&base).await);

    let pending = tokio::spawn({
        let conn = conn.clone();
        async move { conn.receive_next().await }
    });
    // Let the receive suspend on an idle connection.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(conn.leave(TIMEOUT).await, LeaveOutcome::Acknowledged);
    let released = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("suspended receive must return promptly")
        .unwrap();
    assert!(matches!(released, Err(SessionError::Closed)), "got {released:?}");
    assert!(matches!(conn.receive_next().await, Err(SessionError::Closed)));
}

#[tokio::test]
async fn leave_gives_up_on_a_silent_server() {
    let base = serve(|ws: ServerSocket| async move {
        // Never read, never answer the close.
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(ws);
    })
    .await;
    let conn = connect(&base).await;

    let started = std::time::Instant::now();
    assert_eq!(
        conn.leave(Duration::from_millis(200)).await,
        LeaveOutcome::TimedOut
    );
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(conn.state(), LinkState::Disconnected);
}

#[tokio::test]
async fn connect_to_a_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    match Connection::connect(&base, "jam", TIMEOUT).await {
        Err(SessionError::Connect { endpoint, .. }) => {
            assert_eq!(endpoint, format!("ws://{addr}/ws/jam/jam"));
        }
        Err(other) => panic!("expected a connect error, got {other:?}"),
        Ok(_) => panic!("connected to a closed port"),
    }
}

/// Fills every frame with a constant.
struct Flat;

impl SynthEngine for Flat {
    fn render(
        &mut self,
        _event: &NoteEvent,
        left: &mut [f32],
        right: &mut [f32],
    ) -> Result<(), SynthError> {
        left.fill(0.5);
        right.fill(0.5);
        Ok(())
    }
}

async fn next_notification(rx: &mut UnboundedReceiver<Notification>) -> Notification {
    tokio::time::timeout(TIMEOUT, rx.recv())
        .await
        .expect("notification in time")
        .expect("client still running")
}

#[tokio::test]
async fn client_runs_a_session_end_to_end() {
    let me = Uuid::from_u128(0xA11CE);
    let greeting = Envelope::new(
        Uuid::nil(),
        &ConnectPayload {
            user_id: me,
            user_name: "alice".into(),
        },
    )
    .unwrap();
    let base = serve(move |ws| echo(ws, Some(greeting.clone()))).await;

    let mix = Arc::new(Mix::new());
    let player = Arc::new(NotePlayer::new(
        NoteRenderer::new(|| Flat, 1_000, Duration::from_millis(100)),
        mix.clone(),
    ));
    let (notify_tx, mut notifications) = mpsc::unbounded_channel();
    let (commands, command_rx) = mpsc::unbounded_channel();
    let mut client = SessionClient::new(base, player, notify_tx).leave_timeout(TIMEOUT);
    let session = tokio::spawn(async move { client.run("jam", command_rx).await });

    assert_eq!(
        next_notification(&mut notifications).await,
        Notification::Connected {
            session_id: "jam".into()
        }
    );
    assert_eq!(
        next_notification(&mut notifications).await,
        Notification::Identified {
            user_id: me,
            user_name: "alice".into()
        }
    );

    commands.send(Command::SendText("hello".into())).unwrap();
    match next_notification(&mut notifications).await {
        Notification::Text(line) => {
            assert!(line.from_self);
            assert_eq!(line.sender, me);
            assert_eq!(line.display_name, "alice");
            assert_eq!(line.body, "hello");
        }
        other => panic!("expected the chat echo, got {other:?}"),
    }
    match next_notification(&mut notifications).await {
        Notification::Rtt(rtt) => {
            assert_eq!(rtt.count, 1);
            assert_eq!(rtt.pending, 0);
        }
        other => panic!("expected an rtt sample, got {other:?}"),
    }

    commands.send(Command::SendMidi(MidiPayload::note_on(60, 100))).unwrap();
    commands.send(Command::SendText("after".into())).unwrap();
    assert!(matches!(
        next_notification(&mut notifications).await,
        Notification::Rtt(rtt) if rtt.count == 2
    ));
    assert!(matches!(
        next_notification(&mut notifications).await,
        Notification::Text(line) if line.body == "after"
    ));
    assert!(matches!(
        next_notification(&mut notifications).await,
        Notification::Rtt(rtt) if rtt.count == 3
    ));

    wait_for_notes(&mix, 1).await;

    commands.send(Command::Leave).unwrap();
    assert_eq!(next_notification(&mut notifications).await, Notification::Left);
    assert_eq!(session.await.unwrap(), State::Disconnected);
}

async fn wait_for_notes(mix: &Mix, count: usize) {
    tokio::time::timeout(TIMEOUT, async {
        while mix.added() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("note rendered in time");
}

/// Renders nothing until the gate opens.
struct Gated(Arc<AtomicBool>);

impl SynthEngine for Gated {
    fn render(
        &mut self,
        _event: &NoteEvent,
        left: &mut [f32],
        right: &mut [f32],
    ) -> Result<(), SynthError> {
        while !self.0.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(1));
        }
        left.fill(0.5);
        right.fill(0.5);
        Ok(())
    }
}

#[tokio::test]
async fn slow_render_does_not_hold_up_the_session() {
    let greeting = Envelope::new(
        Uuid::nil(),
        &ConnectPayload {
            user_id: Uuid::from_u128(0xB0B),
            user_name: "bob".into(),
        },
    )
    .unwrap();
    let base = serve(move |ws| echo(ws, Some(greeting.clone()))).await;

    let gate = Arc::new(AtomicBool::new(false));
    let mix = Arc::new(Mix::new());
    let player = {
        let gate = gate.clone();
        Arc::new(NotePlayer::new(
            NoteRenderer::new(move || Gated(gate.clone()), 1_000, Duration::from_millis(100)),
            mix.clone(),
        ))
    };
    let (notify_tx, mut notifications) = mpsc::unbounded_channel();
    let (commands, command_rx) = mpsc::unbounded_channel();
    let mut client = SessionClient::new(base, player, notify_tx).leave_timeout(TIMEOUT);
    let session = tokio::spawn(async move { client.run("jam", command_rx).await });

    assert!(matches!(
        next_notification(&mut notifications).await,
        Notification::Connected { .. }
    ));
    assert!(matches!(
        next_notification(&mut notifications).await,
        Notification::Identified { .. }
    ));

    // The note echo is stuck rendering while the chat echo behind it arrives.
    commands.send(Command::SendMidi(MidiPayload::note_on(60, 100))).unwrap();
    commands.send(Command::SendText("still here".into())).unwrap();
    assert!(matches!(
        next_notification(&mut notifications).await,
        Notification::Rtt(rtt) if rtt.count == 1
    ));
    assert!(matches!(
        next_notification(&mut notifications).await,
        Notification::Text(line) if line.body == "still here"
    ));
    assert_eq!(mix.added(), 0, "note still rendering");

    gate.store(true, Ordering::Release);
    wait_for_notes(&mix, 1).await;

    commands.send(Command::Leave).unwrap();
    loop {
        if next_notification(&mut notifications).await == Notification::Left {
            break;
        }
    }
    assert_eq!(session.await.unwrap(), State::Disconnected);
}

#[tokio::test]
async fn client_reports_a_failed_join() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let player = Arc::new(NotePlayer::new(
        NoteRenderer::new(|| Flat, 1_000, Duration::from_millis(10)),
        Arc::new(Mix::new()),
    ));
    let (notify_tx, mut notifications) = mpsc::unbounded_channel();
    let (_commands, command_rx) = mpsc::unbounded_channel::<Command>();
    let base = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    let mut client = SessionClient::new(base, player, notify_tx);

    assert_eq!(client.run("jam", command_rx).await, State::Disconnected);
    assert!(matches!(
        next_notification(&mut notifications).await,
        Notification::Error(_)
    ));
}
