//! Log writer module
//!
//! Process-wide sink for log lines. Access and info lines go to stdout or an
//! append-mode file; warnings and errors go to stderr or their own file.

use super::Level;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

enum LogTarget {
    Stdout,
    Stderr,
    File(Mutex<File>),
}

impl LogTarget {
    fn open(path: Option<&str>, fallback: Self) -> io::Result<Self> {
        match path {
            Some(path) => Ok(Self::File(Mutex::new(open_log_file(path)?))),
            None => Ok(fallback),
        }
    }

    fn write(&self, message: &str) {
        match self {
            Self::Stdout => println!("{message}"),
            Self::Stderr => eprintln!("{message}"),
            Self::File(file) => {
                let mut f = file.lock().unwrap_or_else(PoisonError::into_inner);
                let _ = writeln!(f, "{message}");
            }
        }
    }
}

/// Startup options for the global writer
#[derive(Debug, Clone, Default)]
pub struct WriterOptions<'a> {
    pub level: Level,
    pub access_log_file: Option<&'a str>,
    pub error_log_file: Option<&'a str>,
    /// Access log format; `None` disables access logging
    pub access_format: Option<&'a str>,
}

pub struct LogWriter {
    level: Level,
    access_format: Option<String>,
    access: LogTarget,
    error: LogTarget,
}

impl LogWriter {
    fn new(options: &WriterOptions<'_>) -> io::Result<Self> {
        Ok(Self {
            level: options.level,
            access_format: options.access_format.map(ToString::to_string),
            access: LogTarget::open(options.access_log_file, LogTarget::Stdout)?,
            error: LogTarget::open(options.error_log_file, LogTarget::Stderr)?,
        })
    }

    pub const fn level(&self) -> Level {
        self.level
    }

    pub fn access_format(&self) -> Option<&str> {
        self.access_format.as_deref()
    }

    pub fn write_access(&self, message: &str) {
        self.access.write(message);
    }

    /// Info and debug lines share the access target
    pub fn write_info(&self, message: &str) {
        self.access.write(message);
    }

    pub fn write_error(&self, message: &str) {
        self.error.write(message);
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global writer; fails if log files cannot be opened or the
/// writer is already installed
pub fn init(options: &WriterOptions<'_>) -> io::Result<()> {
    let writer = LogWriter::new(options)?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

/// The global writer, once installed
pub fn get() -> Option<&'static LogWriter> {
    LOG_WRITER.get()
}
