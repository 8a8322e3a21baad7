//! Mailbox settings.

use std::env;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::client_builder::ClientBuilder;

/// Port of an unencrypted POP3 service.
pub const DEFAULT_PORT: u16 = 110;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SIGNATURE_NAME: &str = "Applied Computer Services";

/// Everything needed to sync one shared mailbox.
#[derive(Clone)]
pub struct MailboxConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Limit on opening the TCP connection.
    pub connect_timeout: Duration,
    /// Limit on every read and write once connected.
    pub timeout: Duration,
    /// Token identifying the mailbox's own address in `To` and `From` headers, matched
    /// case-insensitively. Defaults to the local part of `username`.
    pub mailbox_token: String,
    /// Company names whose line starts a signature block.
    pub signature_names: Vec<String>,
}

impl MailboxConfig {
    pub fn new<H, U, P>(host: H, username: U, password: P) -> Self
    where
        H: Into<String>,
        U: Into<String>,
        P: Into<String>,
    {
        let username = username.into();
        MailboxConfig {
            host: host.into(),
            port: DEFAULT_PORT,
            mailbox_token: local_part(&username).to_string(),
            username,
            password: password.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
            signature_names: vec![DEFAULT_SIGNATURE_NAME.to_string()],
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_mailbox_token<S: Into<String>>(mut self, token: S) -> Self {
        self.mailbox_token = token.into();
        self
    }

    pub fn with_signature_names(mut self, names: Vec<String>) -> Self {
        self.signature_names = names;
        self
    }

    /// Reads the configuration from `POP3_*` environment variables.
    ///
    /// `POP3_HOST`, `POP3_USER` and `POP3_PASSWORD` are required. `POP3_PORT`,
    /// `POP3_CONNECT_TIMEOUT` and `POP3_TIMEOUT` (whole non-zero seconds),
    /// `POP3_MAILBOX_TOKEN` and `POP3_SIGNATURE_NAMES` (comma separated) override the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = MailboxConfig::new(
            required("POP3_HOST")?,
            required("POP3_USER")?,
            required("POP3_PASSWORD")?,
        );
        if let Some(port) = parsed("POP3_PORT")? {
            config.port = port;
        }
        if let Some(timeout) = timeout("POP3_CONNECT_TIMEOUT")? {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = timeout("POP3_TIMEOUT")? {
            config.timeout = timeout;
        }
        if let Ok(token) = env::var("POP3_MAILBOX_TOKEN") {
            config.mailbox_token = token;
        }
        if let Ok(names) = env::var("POP3_SIGNATURE_NAMES") {
            config.signature_names = names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(config)
    }

    /// A builder for connections to the configured server.
    pub fn client_builder(&self) -> ClientBuilder<&str> {
        let mut builder = ClientBuilder::new(self.host.as_str(), self.port);
        builder
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout);
        builder
    }

    /// Whether `header` mentions this mailbox.
    pub fn mentions_mailbox(&self, header: &str) -> bool {
        !self.mailbox_token.is_empty()
            && header
                .to_lowercase()
                .contains(&self.mailbox_token.to_lowercase())
    }
}

// keep the password out of logs
impl fmt::Debug for MailboxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"****")
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .field("mailbox_token", &self.mailbox_token)
            .field("signature_names", &self.signature_names)
            .finish()
    }
}

fn local_part(address: &str) -> &str {
    address.split('@').next().unwrap_or(address).trim()
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(None),
    }
}

// sockets refuse a zero timeout, so it is rejected here rather than at connect time
fn timeout(key: &'static str) -> Result<Option<Duration>, ConfigError> {
    match parsed::<u64>(key)? {
        Some(0) => Err(ConfigError::Invalid {
            key,
            value: env::var(key).unwrap_or_default(),
        }),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

/// A problem with the environment-provided configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    Missing(&'static str),
    /// A variable is set but cannot be parsed.
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConfigError::Missing(key) => write!(f, "Missing required environment variable: {}", key),
            ConfigError::Invalid { key, ref value } => {
                write!(f, "Invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl StdError for ConfigError {}
