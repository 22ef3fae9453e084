//! Utility functions

pub mod encoding;
pub mod progress;
