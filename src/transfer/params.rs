use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::SyncError;

/// Remote protocol variant, chosen once when a connection is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Sftp,
    Ftps,
}

impl Protocol {
    pub const fn default_port(self) -> u16 {
        match self {
            Protocol::Sftp => 22,
            Protocol::Ftps => 990,
        }
    }
}

impl FromStr for Protocol {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sftp" => Ok(Protocol::Sftp),
            "ftps" => Ok(Protocol::Ftps),
            _ => Err(SyncError::UnsupportedProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Sftp => "sftp",
            Protocol::Ftps => "ftps",
        })
    }
}

/// Everything needed to open one authenticated session.
#[derive(Clone)]
pub struct ConnectionParameters {
    pub host: String,
    /// `None` resolves to the protocol default (22 / 990).
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    pub protocol: Protocol,
}

impl ConnectionParameters {
    pub fn new(
        protocol: Protocol,
        host: impl Into<String>,
        port: Option<u16>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            protocol,
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// `host:port`, used for socket resolution and in error messages.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }
}

// Keep the password out of logs.
impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &self.port())
            .field("username", &self.username)
            .field("password", &"***")
            .field("protocol", &self.protocol)
            .finish()
    }
}

/// Socket timeouts applied to every blocking call of a session.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub connect: Duration,
    pub io: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { connect: Duration::from_secs(30), io: Duration::from_secs(60) }
    }
}
