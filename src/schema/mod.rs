//! Schema module - Configuration types for the movie player.

mod config;

pub use config::*;
