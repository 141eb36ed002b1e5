//! Logger module
//!
//! Provides logging utilities for the server including:
//! - Startup banner
//! - Access logging with multiple formats (debug mode)
//! - Error, warning and debug diagnostics
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::AppState;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(state: &AppState) -> std::io::Result<()> {
    let logging = &state.config.logging;
    writer::init(
        logging.access_log_file.as_deref(),
        logging.error_log_file.as_deref(),
        logging.debug,
    )
}

/// Write to info/access log
pub fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
pub fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(url: &str, state: &AppState) {
    write_info(&format!("Listening on {url}"));

    if state.config.logging.debug {
        let paths = &state.paths;
        write_info(&format!("[CONFIG] Game root: {}", paths.root.display()));
        write_info(&format!("[CONFIG] Save file: {}", paths.save_file.display()));
        write_info(&format!("[CONFIG] Patches: {}", state.patches.patches_dir().display()));
        write_info(&format!(
            "[CONFIG] Patch target: {}",
            state.config.game.target_file
        ));
        if let Some(workers) = state.config.server.workers {
            write_info(&format!("[CONFIG] Worker threads: {workers}"));
        }
        if let Some(ref path) = state.config.logging.access_log_file {
            write_info(&format!("[CONFIG] Access log: {path}"));
        }
        if let Some(ref path) = state.config.logging.error_log_file {
            write_info(&format!("[CONFIG] Error log: {path}"));
        }
    }
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Diagnostics only shown with `DEBUG` set
pub fn log_debug(message: &str) {
    if writer::get().is_some_and(writer::LogWriter::verbose) {
        write_info(&format!("[DEBUG] {message}"));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

pub fn log_shutdown(open_connections: usize) {
    write_info(&format!(
        "Shutting down, no longer accepting connections ({open_connections} still open)"
    ));
}
