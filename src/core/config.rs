use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

/// API credential triple required for private endpoints.
///
/// Secrets are wrapped so they never show up in `Debug` output or
/// serialized configuration dumps.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: Secret<String>,
    pub api_secret: Secret<String>,
    pub passphrase: Secret<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

// Never expose secrets in serialization
impl Serialize for Credentials {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Credentials", 3)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("api_secret", "[REDACTED]")?;
        state.serialize_field("passphrase", "[REDACTED]")?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Credentials {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct CredentialsHelper {
            api_key: String,
            api_secret: String,
            passphrase: String,
        }

        let helper = CredentialsHelper::deserialize(deserializer)?;
        Ok(Self::new(helper.api_key, helper.api_secret, helper.passphrase))
    }
}

impl Credentials {
    #[must_use]
    pub fn new(api_key: String, api_secret: String, passphrase: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            api_secret: Secret::new(api_secret),
            passphrase: Secret::new(passphrase),
        }
    }

    /// Create credentials from environment variables
    ///
    /// Expected environment variables:
    /// - `BLOFIN_API_KEY`
    /// - `BLOFIN_API_SECRET`
    /// - `BLOFIN_PASSPHRASE`
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("BLOFIN_API_KEY")
            .map_err(|_| ConfigError::MissingEnvironmentVariable("BLOFIN_API_KEY".to_string()))?;
        let api_secret = env::var("BLOFIN_API_SECRET").map_err(|_| {
            ConfigError::MissingEnvironmentVariable("BLOFIN_API_SECRET".to_string())
        })?;
        let passphrase = env::var("BLOFIN_PASSPHRASE").map_err(|_| {
            ConfigError::MissingEnvironmentVariable("BLOFIN_PASSPHRASE".to_string())
        })?;

        Ok(Self::new(api_key, api_secret, passphrase))
    }

    /// Create credentials from a .env file and environment variables
    ///
    /// Loads the .env file first (if present), then reads the standard
    /// `BLOFIN_*` variables.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file() -> Result<Self, ConfigError> {
        match dotenv::dotenv() {
            Ok(_) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // No .env file, fall through to system env vars
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file: {e}"
                )));
            }
        }

        Self::from_env()
    }

    /// Check whether every field of the credential triple is non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
            && !self.api_secret.expose_secret().is_empty()
            && !self.passphrase.expose_secret().is_empty()
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn api_secret(&self) -> &str {
        self.api_secret.expose_secret()
    }

    pub fn passphrase(&self) -> &str {
        self.passphrase.expose_secret()
    }
}

/// Trading environment selector. Fixed per client instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Production,
    Demo,
}

/// WebSocket endpoint kinds, each with its own URL per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsKind {
    Public,
    Private,
    Copytrading,
}

impl WsKind {
    /// Whether sessions of this kind must authenticate before subscribing.
    pub fn requires_auth(self) -> bool {
        !matches!(self, Self::Public)
    }
}

const PROD_REST_URL: &str = "https://openapi.blofin.com";
const DEMO_REST_URL: &str = "https://demo-trading-openapi.blofin.com";
const PROD_WS_HOST: &str = "wss://openapi.blofin.com";
const DEMO_WS_HOST: &str = "wss://demo-trading-openapi.blofin.com";

impl Mode {
    pub fn rest_url(self) -> &'static str {
        match self {
            Self::Production => PROD_REST_URL,
            Self::Demo => DEMO_REST_URL,
        }
    }

    pub fn ws_url(self, kind: WsKind) -> String {
        let host = match self {
            Self::Production => PROD_WS_HOST,
            Self::Demo => DEMO_WS_HOST,
        };
        let path = match kind {
            WsKind::Public => "/ws/public",
            WsKind::Private => "/ws/private",
            WsKind::Copytrading => "/ws/copytrading/private",
        };
        format!("{host}{path}")
    }
}

/// Client configuration resolved once at construction.
///
/// URL overrides take precedence over the mode-derived defaults; everything
/// else is a tuning knob with conservative defaults.
#[derive(Debug, Clone)]
pub struct BlofinConfig {
    pub credentials: Option<Credentials>,
    pub mode: Mode,
    pub rest_url: Option<String>,
    pub ws_public_url: Option<String>,
    pub ws_private_url: Option<String>,
    pub ws_copytrading_url: Option<String>,
    /// Request timeout for REST calls.
    pub rest_timeout: Duration,
    /// Maximum number of retries for transient REST failures.
    pub rest_max_retries: u32,
    /// Initial delay of the REST retry backoff.
    pub rest_retry_delay: Duration,
}

impl Default for BlofinConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            mode: Mode::Production,
            rest_url: None,
            ws_public_url: None,
            ws_private_url: None,
            ws_copytrading_url: None,
            rest_timeout: Duration::from_secs(30),
            rest_max_retries: 3,
            rest_retry_delay: Duration::from_millis(250),
        }
    }
}

impl BlofinConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for public-only usage (market data, public WebSocket).
    #[must_use]
    pub fn read_only() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_rest_url(mut self, url: String) -> Self {
        self.rest_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_ws_url(mut self, kind: WsKind, url: String) -> Self {
        match kind {
            WsKind::Public => self.ws_public_url = Some(url),
            WsKind::Private => self.ws_private_url = Some(url),
            WsKind::Copytrading => self.ws_copytrading_url = Some(url),
        }
        self
    }

    #[must_use]
    pub fn with_rest_timeout(mut self, timeout: Duration) -> Self {
        self.rest_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_rest_max_retries(mut self, retries: u32) -> Self {
        self.rest_max_retries = retries;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.as_ref().is_some_and(Credentials::is_complete)
    }

    /// Resolved REST base URL (override first, then mode default).
    pub fn rest_url(&self) -> String {
        self.rest_url
            .clone()
            .unwrap_or_else(|| self.mode.rest_url().to_string())
    }

    /// Resolved WebSocket URL for the given endpoint kind.
    pub fn ws_url(&self, kind: WsKind) -> String {
        let overridden = match kind {
            WsKind::Public => &self.ws_public_url,
            WsKind::Private => &self.ws_private_url,
            WsKind::Copytrading => &self.ws_copytrading_url,
        };
        overridden.clone().unwrap_or_else(|| self.mode.ws_url(kind))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_selects_rest_url() {
        assert_eq!(Mode::Production.rest_url(), "https://openapi.blofin.com");
        assert_eq!(
            Mode::Demo.rest_url(),
            "https://demo-trading-openapi.blofin.com"
        );
    }

    #[test]
    fn mode_selects_ws_urls() {
        assert_eq!(
            Mode::Production.ws_url(WsKind::Public),
            "wss://openapi.blofin.com/ws/public"
        );
        assert_eq!(
            Mode::Production.ws_url(WsKind::Copytrading),
            "wss://openapi.blofin.com/ws/copytrading/private"
        );
        assert_eq!(
            Mode::Demo.ws_url(WsKind::Private),
            "wss://demo-trading-openapi.blofin.com/ws/private"
        );
    }

    #[test]
    fn overrides_take_precedence() {
        let config = BlofinConfig::new()
            .with_mode(Mode::Demo)
            .with_rest_url("http://localhost:8080".to_string())
            .with_ws_url(WsKind::Private, "ws://localhost:8081".to_string());

        assert_eq!(config.rest_url(), "http://localhost:8080");
        assert_eq!(config.ws_url(WsKind::Private), "ws://localhost:8081");
        // Unset kinds still resolve from the mode
        assert_eq!(
            config.ws_url(WsKind::Public),
            "wss://demo-trading-openapi.blofin.com/ws/public"
        );
    }

    #[test]
    fn credentials_never_leak_via_debug() {
        let creds = Credentials::new(
            "key-value".to_string(),
            "s3cr3t-value".to_string(),
            "phrase-value".to_string(),
        );
        let printed = format!("{creds:?}");
        assert!(!printed.contains("s3cr3t-value"));
        assert!(!printed.contains("phrase-value"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn incomplete_credentials_detected() {
        let creds = Credentials::new("key".to_string(), String::new(), "phrase".to_string());
        assert!(!creds.is_complete());

        let config = BlofinConfig::new().with_credentials(creds);
        assert!(!config.has_credentials());
    }
}
