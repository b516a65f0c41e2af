//! `config.toml` shape. Missing tables and fields fall back to defaults, so
//! an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub servers: Vec<ServerConfig>,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            servers: vec![
                ServerConfig::new("libera", "irc.libera.chat", 6697),
                ServerConfig::new("oftc", "irc.oftc.net", 6697),
            ],
            ui: UiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Server entry by name, ignoring case.
    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// One network. `name` is also the network name group members refer to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub host: String,
    #[serde(default = "tls_port")]
    pub port: u16,
    #[serde(default = "enabled")]
    pub tls: bool,
    #[serde(default = "default_nickname")]
    pub nickname: String,
    #[serde(default)]
    pub realname: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Sent to NickServ after registration.
    #[serde(default)]
    pub nick_password: Option<String>,
    /// Joined on connect.
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub auto_connect: bool,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl ServerConfig {
    pub fn new(name: &str, host: &str, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            tls: port == tls_port(),
            nickname: default_nickname(),
            realname: None,
            password: None,
            nick_password: None,
            channels: vec![],
            auto_connect: false,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// chrono format string for the timestamp column.
    pub timestamp_format: String,
    /// Lines kept per buffer.
    pub max_scrollback: usize,
    pub parse_mirc_colors: bool,
    /// Right-align nicks in a column in group buffers.
    pub indent_nicks: bool,
    /// Drop colour codes from nicks before templating.
    pub strip_nick_colors: bool,
    /// Appended to a nick completed at the start of a line.
    pub completion_suffix: String,
    /// HexChat-style `pevents.conf`; bundled templates when unset.
    pub pevents_path: Option<PathBuf>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            timestamp_format: "%H:%M".into(),
            max_scrollback: 10_000,
            parse_mirc_colors: true,
            indent_nicks: true,
            strip_nick_colors: false,
            completion_suffix: ": ".into(),
            pevents_path: None,
        }
    }
}

/// Daily chat transcripts, off unless enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: "~/.local/share/crabmux/logs".into(),
        }
    }
}

fn default_nickname() -> String {
    "crabmux".into()
}

fn tls_port() -> u16 {
    6697
}

fn enabled() -> bool {
    true
}
