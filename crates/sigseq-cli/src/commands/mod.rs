//! Command implementations.

pub mod generate;
pub mod map;
pub mod play;
pub mod steps;
