//! Thread-level drivers: settle delay and per-channel edge workers.

pub mod delay;
pub mod worker;
