//! Cohost service library crate.
//!
//! Configuration, saved settings, the command line and the session runtime
//! that connects the realtime transport to the dialogue engine. The `cohost`
//! binary is a thin wrapper around this library.

pub mod cli;
pub mod config;
pub mod runtime;
pub mod settings;
