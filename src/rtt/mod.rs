//! Round-trip time measurement.
//!
//! A message id is timed from the local send until the server echoes the same
//! id back. Ids are matched by value, so echoes may arrive in any order.

mod stats;
mod timer;

pub use stats::{round_millis, RttSnapshot, RttStats};
pub use timer::RttTimer;
