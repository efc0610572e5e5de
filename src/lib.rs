pub mod audio; // Note clips, the live mix and the device output
pub mod config;
pub mod error;
pub mod piano; // Note table and key-press input
pub mod protocol; // Wire envelope and payloads
pub mod rtt;
pub mod session; // Connection, state machine and receive loop
pub mod synth; // Engine boundary and the built-in tone engine

pub use error::{Error, Result};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
