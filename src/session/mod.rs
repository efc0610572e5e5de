//! Session connection management.
//!
//! - [`Connection`] is the transport: one websocket, a writer lock, a single
//!   receive consumer and a best-effort `leave`.
//! - [`state::transition`] is the pure session state machine.
//! - [`SessionClient`] executes its effects and owns the receive loop.

mod client;
mod connection;
pub mod state;

pub use client::{Command, SessionClient};
pub use connection::{jam_url, Connection, LeaveOutcome, LinkState};
pub use state::{ChatLine, Notification, State};
