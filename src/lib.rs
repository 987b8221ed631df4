//! tvshelf - TV show library scanner
//!
//! This library crate exposes the scanner, configuration and HTTP server
//! for the binary and for integration testing.

pub mod config;
pub mod scanner;
pub mod server;
