//! Connection-related data models.
//!
//! This module defines the caller-supplied description of how to reach the
//! database, and the normalisation applied to it before a client is built.

use serde::{Deserialize, Deserializer, Serialize};

/// Default database name used when the caller leaves it empty.
pub const DEFAULT_DATABASE: &str = "default";

/// Default ClickHouse user.
pub const DEFAULT_USER: &str = "default";

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Columnar analytical store, reached over its HTTP interface
    #[default]
    ClickHouse,
    /// Embedded file database
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection URL scheme.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("clickhouse://") || lower.starts_with("clickhouses://") {
            Some(Self::ClickHouse)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ClickHouse => "ClickHouse",
            Self::SQLite => "SQLite",
        }
    }

    /// Get the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::ClickHouse => Some(8123),
            Self::SQLite => None,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// How to reach the database. Immutable once built.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub db_type: DatabaseType,
    #[serde(default)]
    pub host: String,
    /// Accepts a JSON number or a numeric string
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: u16,
    /// For SQLite this is the database file path
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub user: String,
    /// Contains sensitive data - never log
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Use TLS (https) for the connection
    #[serde(default)]
    pub secure: bool,
    /// Verify the server certificate when `secure` is set
    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_verify() -> bool {
    true
}

impl ConnectionConfig {
    /// Create a ClickHouse configuration with default credentials.
    pub fn clickhouse(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            db_type: DatabaseType::ClickHouse,
            host: host.into(),
            port,
            database: database.into(),
            user: DEFAULT_USER.to_string(),
            password: None,
            secure: false,
            verify: true,
        }
    }

    /// Create a SQLite configuration for the given file path.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            db_type: DatabaseType::SQLite,
            host: String::new(),
            port: 0,
            database: path.into(),
            user: String::new(),
            password: None,
            secure: false,
            verify: true,
        }
    }

    /// Set credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.user = user.into();
        self.password = password;
        self
    }

    /// Return a copy with host, port, user and database normalised.
    ///
    /// The host loses any protocol prefix, trailing slash and embedded port
    /// (the port is supplied separately). An empty database becomes "default".
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        if config.db_type == DatabaseType::ClickHouse {
            config.host = normalize_host(&config.host);
            if config.database.trim().is_empty() {
                config.database = DEFAULT_DATABASE.to_string();
            }
            if config.user.trim().is_empty() {
                config.user = DEFAULT_USER.to_string();
            }
            if config.port == 0 {
                config.port = self.db_type.default_port().unwrap_or_default();
            }
        }
        config
    }

    /// Display-safe summary (credentials omitted).
    pub fn describe(&self) -> String {
        match self.db_type {
            DatabaseType::ClickHouse => {
                let scheme = if self.secure { "https" } else { "http" };
                format!(
                    "{}://{}@{}:{}/{}",
                    scheme, self.user, self.host, self.port, self.database
                )
            }
            DatabaseType::SQLite => format!("sqlite:{}", self.database),
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("secure", &self.secure)
            .field("verify", &self.verify)
            .finish()
    }
}

/// Strip protocol prefix, trailing slashes and an embedded `:port` from a host.
///
/// IPv6 literals come back bare (`[::1]:8123` and `::1` both give `::1`).
pub fn normalize_host(raw: &str) -> String {
    let mut host = raw.trim();
    for prefix in ["https://", "http://"] {
        if host.len() >= prefix.len() && host[..prefix.len()].eq_ignore_ascii_case(prefix) {
            host = &host[prefix.len()..];
            break;
        }
    }
    host = host.trim_end_matches('/');
    if let Some((addr, _)) = host.strip_prefix('[').and_then(|rest| rest.split_once(']')) {
        return addr.to_string();
    }
    // More than one ':' is an unbracketed IPv6 literal, which carries no port
    if let Some((name, port)) = host.rsplit_once(':') {
        if !name.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
            host = name;
        }
    }
    host.to_string()
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortInput {
        Number(u16),
        Text(String),
    }

    match PortInput::deserialize(deserializer)? {
        PortInput::Number(port) => Ok(port),
        PortInput::Text(text) if text.trim().is_empty() => Ok(0),
        PortInput::Text(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{}'", text))),
    }
}
