//! Logger module
//!
//! Provides logging utilities for the server including:
//! - Server lifecycle and route registration lines
//! - Access logging with multiple formats
//! - Leveled error, warning and debug logging
//! - File-based logging support
//!
//! Before [`init`] runs (tests, early startup) lines go straight to
//! stdout/stderr at the `info` level.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use std::net::SocketAddr;

/// Log verbosity, most severe first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl Level {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" | "trace" => Some(Self::Debug),
            _ => None,
        }
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    let level = Level::parse(&config.level);
    writer::init(&writer::WriterOptions {
        level: level.unwrap_or_default(),
        access_log_file: config.access_log_file.as_deref(),
        error_log_file: config.error_log_file.as_deref(),
        access_format: config
            .access_log
            .then_some(config.access_log_format.as_str()),
    })?;
    if level.is_none() {
        log_warning(&format!(
            "Unknown log level '{}', using info",
            config.level
        ));
    }
    Ok(())
}

fn enabled(level: Level) -> bool {
    let max = writer::get().map_or(Level::Info, writer::LogWriter::level);
    level <= max
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    if !enabled(Level::Info) {
        return;
    }
    write_info("======================================");
    write_info("HTTP trigger started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref root) = config.static_files.root {
        write_info(&format!("Static root: {root}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_route_registered(method: &str, path: &str, handler: &str) {
    log_info(&format!(
        "[Route] {} {path} -> {handler}",
        method.to_ascii_uppercase()
    ));
}

pub fn log_shutdown_requested(signal: &str) {
    log_info(&format!("[Shutdown] {signal} received, draining connections"));
}

pub fn log_shutdown_complete(drained: usize) {
    log_info(&format!("[Shutdown] Complete, {drained} connection(s) drained"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    log_error(&format!("Failed to serve connection: {err:?}"));
}

pub fn log_info(message: &str) {
    if enabled(Level::Info) {
        write_info(message);
    }
}

pub fn log_debug(message: &str) {
    if enabled(Level::Debug) {
        write_info(&format!("[DEBUG] {message}"));
    }
}

pub fn log_warning(message: &str) {
    if enabled(Level::Warn) {
        write_error(&format!("[WARN] {message}"));
    }
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

/// Whether access lines are written at all
pub fn access_log_enabled() -> bool {
    writer::get().map_or(true, |w| w.access_format().is_some())
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry) {
    match writer::get() {
        Some(w) => {
            if let Some(format) = w.access_format() {
                w.write_access(&entry.format(format));
            }
        }
        None => println!("{}", entry.format("combined")),
    }
}
