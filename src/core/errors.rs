use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlofinError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("API error: {code} - {message}")]
    Api { code: String, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::core::config::ConfigError),
}

impl BlofinError {
    /// Whether the retry layer may transparently retry the failed operation.
    ///
    /// Only transport-level failures qualify; application-level rejections
    /// (bad signature, bad parameters) must surface to the caller untouched.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<reqwest::Error> for BlofinError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Configuration(format!("failed to build HTTP request: {err}"))
        } else {
            Self::Connection(format!("HTTP request failed: {err}"))
        }
    }
}

impl From<serde_json::Error> for BlofinError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(format!("JSON error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_errors_are_transient() {
        assert!(BlofinError::Connection("reset by peer".to_string()).is_transient());
        assert!(!BlofinError::Api {
            code: "152401".to_string(),
            message: "insufficient balance".to_string()
        }
        .is_transient());
        assert!(!BlofinError::Authentication("invalid sign".to_string()).is_transient());
        assert!(!BlofinError::Configuration("missing secret".to_string()).is_transient());
    }
}
