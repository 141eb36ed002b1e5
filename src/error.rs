//! Startup error types
//!
//! Everything that stops the server before it begins serving. Request-level
//! failures never reach this type; they become HTTP status codes.

use std::io;
use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to determine working directory: {0}")]
    WorkingDir(#[source] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("{0}")]
    InvalidAddress(String),

    /// The working directory is not a game folder
    #[error("Please run mvix in the game folder.")]
    MissingIndex,

    #[error("Failed to check for index.html: {0}")]
    IndexCheck(#[source] io::Error),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("Failed to open log files: {0}")]
    Logger(#[source] io::Error),
}
