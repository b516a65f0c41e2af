//! Diagnostics and chat transcripts.
//!
//! Diagnostics go through `tracing` into `crabmux.log` under the data
//! directory, since the terminal belongs to the UI. Transcripts are written
//! per buffer to daily files named `<target>_<date>.log` in the configured
//! log directory (default: `~/.local/share/crabmux/logs/`).

use crate::app::state::{BufferKey, Message, MessageKind};
use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CRABMUX_LOG";

/// Route `tracing` output to `<data dir>/crabmux/crabmux.log`.
pub fn init_tracing() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crabmux");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
    let path = dir.join("crabmux.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open diagnostics log {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("crabmux=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(path)
}

/// Remove mIRC formatting codes so transcripts stay plain text.
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x02' | '\x08' | '\x0f' | '\x16' | '\x1d' | '\x1f' => {}
            '\x03' => {
                for _ in 0..2 {
                    if chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                        chars.next();
                    }
                }
                let mut ahead = chars.clone();
                if ahead.next() == Some(',') && ahead.peek().is_some_and(|d| d.is_ascii_digit()) {
                    chars.next();
                    for _ in 0..2 {
                        if chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                            chars.next();
                        }
                    }
                }
            }
            '\t' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Writes chat messages to per-buffer daily log files.
///
/// File handles are cached for the lifetime of the logger. A file that
/// cannot be opened is reported once and skipped afterwards.
pub struct ChatLogger {
    enabled: bool,
    log_dir: String,
    file_handles: HashMap<String, Option<File>>,
}

impl ChatLogger {
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            enabled: config.enabled,
            log_dir: config.log_dir.clone(),
            file_handles: HashMap::new(),
        }
    }

    fn log_dir(&self) -> PathBuf {
        match self.log_dir.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.log_dir)),
            None => PathBuf::from(&self.log_dir),
        }
    }

    /// Write a message to the appropriate log file. No-op if logging is
    /// disabled or the buffer is a server status buffer.
    pub fn log_message(&mut self, key: &BufferKey, msg: &Message) {
        if !self.enabled {
            return;
        }
        let Some(target) = transcript_name(key) else {
            return;
        };

        let date = chrono::Local::now().format("%Y-%m-%d").to_string();
        let filename = format!("{}_{}.log", sanitize(&target), date);
        let log_dir = self.log_dir();

        let handle = self.file_handles.entry(filename.clone()).or_insert_with(|| {
            let _ = fs::create_dir_all(&log_dir);
            let path = log_dir.join(&filename);
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot open transcript");
                    None
                }
            }
        });

        if let Some(file) = handle {
            let _ = writeln!(file, "{}", transcript_line(msg));
        }
    }
}

fn transcript_name(key: &BufferKey) -> Option<String> {
    match key {
        BufferKey::ServerStatus(_) => None,
        BufferKey::Channel(_, ch) => Some(ch.clone()),
        BufferKey::Query(_, nick) => Some(nick.clone()),
        BufferKey::Group(name) => Some(format!("group-{}", name)),
    }
}

fn sanitize(target: &str) -> String {
    target
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

fn transcript_line(msg: &Message) -> String {
    let text = strip_formatting(&msg.text);
    match msg.kind {
        MessageKind::Normal => format!("[{}] <{}> {}", msg.timestamp, msg.sender, text),
        MessageKind::Notice => format!("[{}] -{}- {}", msg.timestamp, msg.sender, text),
        MessageKind::Action => format!("[{}] * {} {}", msg.timestamp, msg.sender, text),
        MessageKind::Formatted => format!("[{}] {}", msg.timestamp, text),
        MessageKind::Join | MessageKind::Part | MessageKind::Quit | MessageKind::System => {
            format!("[{}] *** {} {}", msg.timestamp, msg.sender, text)
        }
        MessageKind::Error => format!("[{}] !!! {}", msg.timestamp, text),
    }
}
