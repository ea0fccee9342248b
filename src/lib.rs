//! echo-server library: listener, per-connection handler, configuration and
//! the companion client shared by the `echo-server` and `echo-client` binaries.

pub mod client;
pub mod config;
pub mod handler;
pub mod listener;
