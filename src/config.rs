use std::time::Duration;

use url::Url;

use crate::{error::ConfigError, piano::Octave, synth::Waveform, DEFAULT_SAMPLE_RATE};

/// Client configuration, built with chained setters.
///
/// ```
/// use std::time::Duration;
/// use jamwire::config::Config;
///
/// let config = Config::default()
///     .clip_duration(Duration::from_secs(1))
///     .velocity(100);
/// assert_eq!(config.velocity, 100);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP address of the session server.
    pub server: String,
    pub sample_rate: u32,
    pub clip_duration: Duration,
    pub output_buffer: Duration,
    pub connect_timeout: Duration,
    pub leave_timeout: Duration,
    pub octave: Octave,
    pub velocity: u8,
    pub waveform: Waveform,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: String::from("http://127.0.0.1:8080"),
            sample_rate: DEFAULT_SAMPLE_RATE,
            clip_duration: Duration::from_secs(2),
            output_buffer: Duration::from_millis(20),
            connect_timeout: Duration::from_secs(10),
            leave_timeout: Duration::from_secs(10),
            octave: Octave::C4,
            velocity: 127,
            waveform: Waveform::Triangle,
        }
    }
}

impl Config {
    /// Set the server address. It must parse as a URL.
    pub fn server(mut self, server: &str) -> Result<Self, ConfigError> {
        parse(server)?;
        self.server = server.to_string();
        Ok(self)
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn clip_duration(mut self, clip_duration: Duration) -> Self {
        self.clip_duration = clip_duration;
        self
    }

    pub fn output_buffer(mut self, output_buffer: Duration) -> Self {
        self.output_buffer = output_buffer;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn leave_timeout(mut self, timeout: Duration) -> Self {
        self.leave_timeout = timeout;
        self
    }

    pub fn octave(mut self, octave: Octave) -> Self {
        self.octave = octave;
        self
    }

    /// Clamped to 127.
    pub fn velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity.min(127);
        self
    }

    pub fn waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    /// Websocket base derived from the HTTP server address.
    ///
    /// The scheme is swapped (`http` to `ws`, `https` to `wss`) and `/ws` is
    /// appended to the server's path, so `https://host/api` becomes
    /// `wss://host/api/ws`.
    pub fn session_endpoint(&self) -> Result<Url, ConfigError> {
        let server = parse(&self.server)?;
        let scheme = match server.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        if server.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!("{server} has no host")));
        }

        let mut endpoint = server.clone();
        endpoint
            .set_scheme(scheme)
            .map_err(|()| ConfigError::InvalidUrl(format!("cannot use {scheme} for {server}")))?;
        endpoint.set_path(&format!("{}/ws", server.path().trim_end_matches('/')));
        endpoint.set_query(None);
        endpoint.set_fragment(None);
        Ok(endpoint)
    }
}

fn parse(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("{url}: {e}")))
}
