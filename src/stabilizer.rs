// src/stabilizer.rs

//! Flight stabilizers built from the dead-band PID controllers.

pub mod cascade;
pub use cascade::*;
pub mod flight_stabilizer;
pub use flight_stabilizer::*;
