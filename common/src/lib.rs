//! Common utilities for the real-time visualizers
//!
//! This crate provides the shared window and GPU setup, the orbit camera and a
//! few buffer helpers used by the simulation binaries.

pub mod graphics;
pub mod camera;

pub use graphics::*;
pub use camera::*;
