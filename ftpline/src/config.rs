//! # Config
//!
//! Session configuration: where to connect, who to log in as, and how long to wait

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Control port used when none is given
pub const DEFAULT_PORT: u16 = 2121;

/// Deadlines applied to socket operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Control connection establishment
    pub connect: Duration,
    /// Refreshed before every command write
    pub write: Duration,
    /// Refreshed before every reply read
    pub read: Duration,
    /// Data connection establishment
    pub data_connect: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            write: Duration::from_secs(15),
            read: Duration::from_secs(45),
            data_connect: Duration::from_secs(30),
        }
    }
}

/// Keep-alive cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveConfig {
    /// Interval between probes while the connection is young or flaky
    pub interval: Duration,
    /// Interval between probes once the connection proved healthy
    pub extended_interval: Duration,
    /// Consecutive successful probes required before switching to the extended interval
    pub success_threshold: u32,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            extended_interval: Duration::from_secs(120),
            success_threshold: 5,
        }
    }
}

/// Login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new<S: AsRef<str>>(username: S, password: S) -> Self {
        Self {
            username: username.as_ref().to_string(),
            password: password.as_ref().to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Everything a [`crate::Session`] needs to be established
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
    pub timeouts: Timeouts,
    pub keepalive: KeepAliveConfig,
    /// Directory where retrieved files are written
    pub download_dir: PathBuf,
}

impl Config {
    /// Instantiates a new `Config` with default port, timeouts and keep-alive cadence
    pub fn new<S: AsRef<str>>(host: S, username: S, password: S) -> Self {
        Self {
            host: host.as_ref().to_string(),
            port: DEFAULT_PORT,
            credentials: Credentials::new(username, password),
            timeouts: Timeouts::default(),
            keepalive: KeepAliveConfig::default(),
            download_dir: PathBuf::from("."),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_keepalive(mut self, keepalive: KeepAliveConfig) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_download_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// `host:port`, with brackets around IPv6 literals
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
