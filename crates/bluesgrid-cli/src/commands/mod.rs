//! CLI command implementations.

pub mod common;
pub mod detect;
pub mod devices;
pub mod play;
pub mod render;
pub mod scale;
