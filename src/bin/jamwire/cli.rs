use std::{path::PathBuf, time::Duration};

use clap::Parser;
use log::LevelFilter;

use jamwire::{config::Config, error::ConfigError, piano::Octave, synth::Waveform};

/// Terminal client for jam sessions: chat, play the keyboard, hear everyone.
#[derive(Parser, Debug)]
#[command(name = "jamwire", version, about)]
pub struct Args {
    /// HTTP address of the session server
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    pub server: String,

    /// Session to join
    #[arg(long, short)]
    pub session: String,

    /// Octave of the virtual piano, named after its C (4 = middle C)
    #[arg(
        long,
        default_value_t = 4,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i32).range(-2..=7)
    )]
    pub octave: i32,

    /// Velocity of every played note
    #[arg(long, default_value_t = 127, value_parser = clap::value_parser!(u8).range(0..=127))]
    pub velocity: u8,

    /// Tone engine waveform: sine, triangle, saw or square
    #[arg(long, default_value = "triangle")]
    pub waveform: Waveform,

    /// Length of every rendered note in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub clip_ms: u64,

    /// Write logs to this file (the terminal belongs to the UI)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}

impl Args {
    pub fn config(&self) -> Result<Config, ConfigError> {
        Ok(Config::default()
            .server(&self.server)?
            .octave(Octave(self.octave))
            .velocity(self.velocity)
            .waveform(self.waveform)
            .clip_duration(Duration::from_millis(self.clip_ms)))
    }

    /// `--log-file`, or `debug.log` when `DEBUG` is set.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| std::env::var_os("DEBUG").map(|_| PathBuf::from("debug.log")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_config() {
        let args = Args::try_parse_from([
            "jamwire",
            "--session",
            "abc",
            "--octave",
            "-1",
            "--velocity",
            "90",
            "--waveform",
            "saw",
            "--clip-ms",
            "500",
        ])
        .unwrap();
        let config = args.config().unwrap();
        assert_eq!(config.octave, Octave::CNEG1);
        assert_eq!(config.velocity, 90);
        assert_eq!(config.waveform, Waveform::Saw);
        assert_eq!(config.clip_duration, Duration::from_millis(500));
    }

    #[test]
    fn out_of_range_octave_is_rejected() {
        assert!(Args::try_parse_from(["jamwire", "-s", "abc", "--octave", "9"]).is_err());
    }
}
