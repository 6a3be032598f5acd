use crate::error::{ClientError, Result};
use std::time::Duration;

pub const ENV_URL: &str = "ZABBIX_URL";
pub const ENV_USER: &str = "ZABBIX_USER";
pub const ENV_PASSWORD: &str = "ZABBIX_PASSWORD";
pub const ENV_TIMEOUT_MS: &str = "ZABBIX_TIMEOUT_MS";
pub const ENV_LOGIN_FIELD: &str = "ZABBIX_LOGIN_FIELD";

/// Name of the `user.login` parameter carrying the user name. Servers before
/// 6.4 expect `user`; 6.4 and later expect `username`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginField {
    #[default]
    User,
    Username,
}

impl LoginField {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginField::User => "user",
            LoginField::Username => "username",
        }
    }
}

impl std::str::FromStr for LoginField {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "user" => Ok(LoginField::User),
            "username" => Ok(LoginField::Username),
            other => Err(ClientError::Config(format!(
                "{} must be \"user\" or \"username\", got {:?}",
                ENV_LOGIN_FIELD, other
            ))),
        }
    }
}

/// Connection settings for one API endpoint.
#[derive(Clone)]
pub struct ClientConfig {
    /// Full URL of the JSON-RPC endpoint, usually `.../api_jsonrpc.php`
    pub url: String,
    pub user: String,
    /// Sent only inside `user.login` parameters
    pub password: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    pub login_field: LoginField,
}

impl ClientConfig {
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Choose the login parameter name for the user
    pub fn with_login_field(mut self, login_field: LoginField) -> Self {
        self.login_field = login_field;
        self
    }

    /// Reads `ZABBIX_URL`, `ZABBIX_USER`, `ZABBIX_PASSWORD`,
    /// `ZABBIX_TIMEOUT_MS` and `ZABBIX_LOGIN_FIELD`; unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let timeout_ms = match lookup(ENV_TIMEOUT_MS) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ClientError::Config(format!(
                    "{} must be a number of milliseconds, got {:?}",
                    ENV_TIMEOUT_MS, raw
                ))
            })?,
            None => defaults.timeout_ms,
        };
        let login_field = match lookup(ENV_LOGIN_FIELD) {
            Some(raw) => raw.parse()?,
            None => defaults.login_field,
        };

        Ok(Self {
            url: lookup(ENV_URL).unwrap_or(defaults.url),
            user: lookup(ENV_USER).unwrap_or(defaults.user),
            password: lookup(ENV_PASSWORD).unwrap_or(defaults.password),
            timeout_ms,
            login_field,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost/api_jsonrpc.php".to_string(),
            user: "Admin".to_string(),
            password: String::new(),
            timeout_ms: 30000,
            login_field: LoginField::User,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("login_field", &self.login_field)
            .finish()
    }
}
