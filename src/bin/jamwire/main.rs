//! jamwire - terminal client for jam sessions
//!
//! Run with: cargo run -- --session <id>

mod app;
mod cli;
mod ui;

use std::{fs::File, sync::Arc};

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use log::{info, warn};
use rtrb::RingBuffer;
use tokio::sync::mpsc;

use app::App;
use cli::Args;
use jamwire::{
    audio::{AudioOutput, Mix, NotePlayer, NoteRenderer},
    piano::Keyboard,
    session::SessionClient,
    synth::ToneEngine,
};

/// Mono samples buffered between the audio callback and the level meter.
const METER_CAPACITY: usize = 8192;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(&args)?;

    let config = args.config().wrap_err("invalid configuration")?;

    // Audio: the mix is drained by the device callback from the start.
    let mix = Arc::new(Mix::new());
    let (meter_tx, meter_rx) = RingBuffer::<f32>::new(METER_CAPACITY);
    let output = match AudioOutput::start(mix.clone(), Some(meter_tx), config.output_buffer) {
        Ok(output) => Some(output),
        Err(err) => {
            warn!("audio output unavailable, notes will be silent: {err}");
            None
        }
    };
    let sample_rate = output
        .as_ref()
        .map_or(config.sample_rate, AudioOutput::sample_rate);
    let waveform = config.waveform;
    let renderer = NoteRenderer::new(
        move || ToneEngine::new(sample_rate as f32, waveform),
        sample_rate,
        config.clip_duration,
    );
    let player = Arc::new(NotePlayer::new(renderer, mix));

    // Session: runs on tokio, talks to the UI over two channels.
    let runtime = tokio::runtime::Runtime::new().wrap_err("failed to start async runtime")?;
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();
    let mut client = SessionClient::from_config(&config, player, notify_tx)
        .wrap_err("invalid session endpoint")?;
    let session_id = args.session.clone();
    let session = runtime.spawn(async move { client.run(session_id, command_rx).await });

    info!("jamwire starting: session {}, {} Hz", args.session, sample_rate);

    let mut terminal = ratatui::init();
    let mut app = App::new(
        args.session.clone(),
        Keyboard::new(config.octave, config.velocity),
        command_tx,
        notify_rx,
        meter_rx,
    );
    let result = app.run(&mut terminal);
    ratatui::restore();

    // Dropping the app drops the command sender, which leaves the session.
    drop(app);
    match runtime.block_on(session) {
        Ok(state) => info!("session ended: {state:?}"),
        Err(err) => warn!("session task failed: {err}"),
    }
    drop(output);

    result
}

/// Logs go to a file, if at all: the terminal belongs to the UI.
fn init_logging(args: &Args) -> EyreResult<()> {
    let Some(path) = args.log_path() else {
        return Ok(());
    };
    let file = File::create(&path)
        .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}
