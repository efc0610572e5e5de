//! Client state and input handling. Rendering lives in `ui`.

use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use rtrb::Consumer;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver, UnboundedSender};

use jamwire::{
    piano::Keyboard,
    rtt::RttSnapshot,
    session::{ChatLine, Command, Notification},
};

use crate::ui;

/// Longest chat message accepted by the input box.
pub const INPUT_LIMIT: usize = 280;
/// Samples kept for the level meter.
const VIS_BUFFER_SIZE: usize = 1024;
/// How long a played key stays lit.
const KEY_FLASH: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Chat,
    Piano,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Chat => Focus::Piano,
            Focus::Piano => Focus::Chat,
        }
    }
}

/// One entry of the chat view.
#[derive(Debug, Clone)]
pub enum ChatEntry {
    Line(ChatLine),
    System(String),
}

pub struct App {
    commands: UnboundedSender<Command>,
    notifications: UnboundedReceiver<Notification>,
    meter: Consumer<f32>,
    pub keyboard: Keyboard,
    pub session_id: String,
    pub user_name: Option<String>,
    pub connected: bool,
    pub chat: Vec<ChatEntry>,
    pub input: String,
    pub focus: Focus,
    pub error: Option<String>,
    pub rtt: RttSnapshot,
    pub audio_buffer: Vec<f32>,
    pub pressed: Option<(i32, Instant)>,
    should_quit: bool,
}

impl App {
    pub fn new(
        session_id: String,
        keyboard: Keyboard,
        commands: UnboundedSender<Command>,
        notifications: UnboundedReceiver<Notification>,
        meter: Consumer<f32>,
    ) -> Self {
        Self {
            commands,
            notifications,
            meter,
            keyboard,
            session_id,
            user_name: None,
            connected: false,
            chat: Vec::new(),
            input: String::new(),
            focus: Focus::Piano,
            error: None,
            rtt: RttSnapshot::default(),
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            pressed: None,
            should_quit: false,
        }
    }

    /// Run the UI event loop until the user quits.
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_notifications();
            self.poll_audio();

            terminal.draw(|frame| ui::render(frame, self))?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }
        Ok(())
    }

    /// The key currently lit on the piano, if any.
    pub fn lit_key(&self) -> Option<i32> {
        self.pressed
            .filter(|(_, at)| at.elapsed() < KEY_FLASH)
            .map(|(midi, _)| midi)
    }

    fn poll_notifications(&mut self) {
        loop {
            match self.notifications.try_recv() {
                Ok(notification) => self.apply(notification),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.connected = false;
                    break;
                }
            }
        }
    }

    fn apply(&mut self, notification: Notification) {
        match notification {
            Notification::Connected { session_id } => {
                self.connected = true;
                self.system(format!("joined session {session_id}"));
            }
            Notification::Identified { user_name, .. } => {
                self.system(format!("you are {user_name}"));
                self.user_name = Some(user_name);
            }
            Notification::PeerJoined { user_name, .. } => {
                self.system(format!("{user_name} joined"));
            }
            Notification::Text(line) => self.chat.push(ChatEntry::Line(line)),
            Notification::Rtt(snapshot) => self.rtt = snapshot,
            Notification::Error(message) => self.error = Some(message),
            Notification::ConnectionLost(reason) => {
                self.connected = false;
                self.error = Some(format!("connection lost: {reason}"));
            }
            Notification::Left => {
                self.connected = false;
                self.system("left the session".into());
            }
        }
    }

    fn system(&mut self, message: String) {
        self.chat.push(ChatEntry::System(message));
    }

    fn poll_audio(&mut self) {
        let mut fresh = Vec::new();
        while let Ok(sample) = self.meter.pop() {
            fresh.push(sample);
        }

        if !fresh.is_empty() {
            self.audio_buffer.extend(fresh);
            if self.audio_buffer.len() > VIS_BUFFER_SIZE {
                let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
                self.audio_buffer.drain(0..excess);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl_c || key.code == KeyCode::Esc {
            self.send(Command::Leave);
            self.should_quit = true;
            return;
        }
        if key.code == KeyCode::Tab {
            self.focus = self.focus.next();
            return;
        }

        match self.focus {
            Focus::Chat => self.handle_chat_key(key.code),
            Focus::Piano => {
                if let KeyCode::Char(c) = key.code {
                    self.play(c);
                }
            }
        }
    }

    fn handle_chat_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                let body = self.input.trim().to_string();
                if !body.is_empty() {
                    self.send(Command::SendText(body));
                }
                self.input.clear();
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if self.input.chars().count() < INPUT_LIMIT => self.input.push(c),
            _ => {}
        }
    }

    fn play(&mut self, key: char) {
        if let Some(midi) = self.keyboard.press(&key.to_string()) {
            self.pressed = Some((midi.number, Instant::now()));
            self.send(Command::SendMidi(midi));
        }
    }

    fn send(&mut self, command: Command) {
        if self.commands.send(command).is_err() {
            self.connected = false;
            self.error = Some("session is not running".into());
        }
    }
}
