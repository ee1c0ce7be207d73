//! Types shared between the pong server and its clients.
//!
//! Wire types derive `ts_rs::TS` so the browser client can import them.

pub mod config;
pub mod protocol;
