use crate::core::errors::BlofinError;
use crate::core::kernel::signer::{generate_nonce, timestamp_ms, Signer};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::{instrument, trace};

/// REST client trait for making HTTP requests
///
/// Implementations return the full response envelope as JSON; endpoint
/// facades unwrap the `{code, msg, data}` envelope themselves.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `query_params` - Query parameters as key-value pairs
    /// * `authenticated` - Whether to sign the request
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, BlofinError>;

    /// Make a POST request
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `body` - Request body as JSON value
    /// * `authenticated` - Whether to sign the request
    async fn post(
        &self,
        endpoint: &str,
        body: &Value,
        authenticated: bool,
    ) -> Result<Value, BlofinError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
    /// Initial delay of the retry backoff; doubles per attempt
    pub retry_delay: Duration,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_millis(250),
            user_agent: "blofin-rs/0.1".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for authenticated requests
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn build(self) -> Result<ReqwestRest, BlofinError> {
        let client = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                BlofinError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: self.signer,
        })
    }
}

/// Implementation of [`RestClient`] using reqwest
///
/// Every call is independent: no session state is kept between requests, and
/// clones share only the connection pool and the read-only signer.
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("has_signer", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    /// Create query string from parameters
    fn create_query_string(params: &[(&str, &str)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Run one attempt of a request, with retry on transient failures only.
    ///
    /// The signature is computed inside each attempt so a retry after a
    /// backoff delay carries a fresh timestamp and nonce; reusing the first
    /// attempt's signature would fall outside the server's clock-skew window.
    #[instrument(skip(self, body), fields(method = %method, endpoint = %endpoint))]
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
        body: &[u8],
        authenticated: bool,
    ) -> Result<Value, BlofinError> {
        let backoff = ExponentialBackoff::from_millis(2)
            .factor(u64::try_from(self.config.retry_delay.as_millis()).unwrap_or(250) / 2)
            .max_delay(Duration::from_secs(10))
            .take(self.config.max_retries as usize);

        RetryIf::spawn(
            backoff,
            || self.execute(&method, endpoint, query_params, body, authenticated),
            BlofinError::is_transient,
        )
        .await
    }

    async fn execute(
        &self,
        method: &Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
        body: &[u8],
        authenticated: bool,
    ) -> Result<Value, BlofinError> {
        let query_string = Self::create_query_string(query_params);
        let request_path = if query_string.is_empty() {
            endpoint.to_string()
        } else {
            format!("{endpoint}?{query_string}")
        };

        // The URL path must be byte-identical to the signed request path.
        let url = format!("{}{}", self.config.base_url, request_path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Content-Type", "application/json");

        if authenticated {
            let signer = self.signer.as_ref().ok_or_else(|| {
                BlofinError::Configuration(
                    "authentication required but no credentials configured".to_string(),
                )
            })?;

            let timestamp = timestamp_ms();
            let nonce = generate_nonce();
            let headers =
                signer.sign_request(method.as_str(), &request_path, body, &timestamp, &nonce)?;
            for (key, value) in headers {
                request = request.header(&key, &value);
            }
        }

        if !body.is_empty() {
            request = request.body(body.to_vec());
        }

        let response = request.send().await?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| BlofinError::Connection(format!("failed to read response body: {e}")))?;

        trace!("response status {status}: {response_text}");

        let value: Value = serde_json::from_str(&response_text).map_err(|e| {
            BlofinError::Protocol(format!("invalid JSON response ({status}): {e}"))
        })?;

        if status.is_success() {
            Ok(value)
        } else {
            // Application-level rejection: surfaced as-is, never retried
            let code = value
                .get("code")
                .and_then(Value::as_str)
                .map_or_else(|| status.as_u16().to_string(), ToString::to_string);
            let message = value
                .get("msg")
                .and_then(Value::as_str)
                .map_or_else(|| response_text.clone(), ToString::to_string);
            Err(BlofinError::Api { code, message })
        }
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, query_params), fields(endpoint = %endpoint))]
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<Value, BlofinError> {
        self.request(Method::GET, endpoint, query_params, &[], authenticated)
            .await
    }

    #[instrument(skip(self, body), fields(endpoint = %endpoint))]
    async fn post(
        &self,
        endpoint: &str,
        body: &Value,
        authenticated: bool,
    ) -> Result<Value, BlofinError> {
        let body_bytes = serde_json::to_vec(body)
            .map_err(|e| BlofinError::Protocol(format!("failed to serialize body: {e}")))?;

        self.request(Method::POST, endpoint, &[], &body_bytes, authenticated)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_preserves_order() {
        let qs = ReqwestRest::create_query_string(&[("instId", "BTC-USDT"), ("limit", "10")]);
        assert_eq!(qs, "instId=BTC-USDT&limit=10");
        assert_eq!(ReqwestRest::create_query_string(&[]), "");
    }

    #[test]
    fn builder_without_signer_serves_public_endpoints() {
        let config = RestClientConfig::new("https://openapi.blofin.com".to_string());
        let rest = RestClientBuilder::new(config).build().unwrap();
        assert!(rest.signer.is_none());
    }
}
