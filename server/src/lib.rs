//! Pong server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod config;
pub mod error;
pub mod physics;
pub mod registry;
pub mod room;
pub mod state;
pub mod ws;
