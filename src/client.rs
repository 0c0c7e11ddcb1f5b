use crate::core::config::{BlofinConfig, Credentials, Mode, WsKind};
use crate::core::errors::BlofinError;
use crate::core::kernel::{HmacSigner, ReqwestRest, RestClientBuilder, RestClientConfig};
use crate::rest::{AccountApi, AffiliateApi, CopyTradingApi, MarketApi, TradingApi};
use crate::ws::{BlofinWsCopytradingClient, BlofinWsPrivateClient, BlofinWsPublicClient};
use std::sync::Arc;
use std::time::Duration;

/// REST client composing every endpoint facade over one shared transport.
///
/// Construction resolves the configuration once; mode, URLs and credentials
/// are immutable afterwards. Facade calls are independent and may run
/// concurrently.
pub struct BlofinClient {
    pub market: MarketApi<ReqwestRest>,
    pub account: AccountApi<ReqwestRest>,
    pub trading: TradingApi<ReqwestRest>,
    pub affiliate: AffiliateApi<ReqwestRest>,
    pub copytrading: CopyTradingApi<ReqwestRest>,
    config: BlofinConfig,
}

impl BlofinClient {
    pub fn builder() -> BlofinBuilder {
        BlofinBuilder::new()
    }

    pub fn new(config: BlofinConfig) -> Result<Self, BlofinError> {
        let rest_config = RestClientConfig::new(config.rest_url())
            .with_timeout(config.rest_timeout)
            .with_max_retries(config.rest_max_retries)
            .with_retry_delay(config.rest_retry_delay);

        let mut rest_builder = RestClientBuilder::new(rest_config);

        if let Some(credentials) = &config.credentials {
            if !credentials.is_complete() {
                return Err(BlofinError::Configuration(
                    "API key, secret and passphrase must all be set".to_string(),
                ));
            }
            let signer = Arc::new(HmacSigner::new(credentials.clone()));
            rest_builder = rest_builder.with_signer(signer);
        }

        let rest = rest_builder.build()?;

        Ok(Self {
            market: MarketApi::new(rest.clone()),
            account: AccountApi::new(rest.clone()),
            trading: TradingApi::new(rest.clone()),
            affiliate: AffiliateApi::new(rest.clone()),
            copytrading: CopyTradingApi::new(rest),
            config,
        })
    }

    pub fn config(&self) -> &BlofinConfig {
        &self.config
    }

    /// Public market data WebSocket client sharing this configuration.
    pub fn ws_public(&self) -> BlofinWsPublicClient {
        BlofinWsPublicClient::new(&self.config)
    }

    /// Private WebSocket client sharing this configuration.
    pub fn ws_private(&self) -> Result<BlofinWsPrivateClient, BlofinError> {
        BlofinWsPrivateClient::new(&self.config)
    }

    /// Copytrading WebSocket client sharing this configuration.
    pub fn ws_copytrading(&self) -> Result<BlofinWsCopytradingClient, BlofinError> {
        BlofinWsCopytradingClient::new(&self.config)
    }
}

/// Builder for [`BlofinClient`]
#[derive(Default)]
pub struct BlofinBuilder {
    config: BlofinConfig,
}

impl BlofinBuilder {
    pub fn new() -> Self {
        Self {
            config: BlofinConfig::default(),
        }
    }

    pub fn with_credentials(
        mut self,
        api_key: String,
        api_secret: String,
        passphrase: String,
    ) -> Self {
        self.config.credentials = Some(Credentials::new(api_key, api_secret, passphrase));
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Shortcut for demo-trading mode.
    pub fn demo(mut self) -> Self {
        self.config.mode = Mode::Demo;
        self
    }

    pub fn with_rest_url(mut self, url: String) -> Self {
        self.config.rest_url = Some(url);
        self
    }

    pub fn with_ws_url(mut self, kind: WsKind, url: String) -> Self {
        self.config = self.config.with_ws_url(kind, url);
        self
    }

    pub fn with_rest_timeout(mut self, timeout: Duration) -> Self {
        self.config.rest_timeout = timeout;
        self
    }

    pub fn with_rest_max_retries(mut self, retries: u32) -> Self {
        self.config.rest_max_retries = retries;
        self
    }

    pub fn build(self) -> Result<BlofinClient, BlofinError> {
        BlofinClient::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_credentials_for_public_usage() {
        let client = BlofinBuilder::new().build().unwrap();
        assert_eq!(client.config().rest_url(), "https://openapi.blofin.com");
    }

    #[test]
    fn demo_mode_selects_demo_host() {
        let client = BlofinBuilder::new().demo().build().unwrap();
        assert_eq!(
            client.config().rest_url(),
            "https://demo-trading-openapi.blofin.com"
        );
        assert_eq!(
            client.config().ws_url(WsKind::Private),
            "wss://demo-trading-openapi.blofin.com/ws/private"
        );
    }

    #[test]
    fn builds_with_full_credentials() {
        let result = BlofinBuilder::new()
            .with_credentials(
                "test_key".to_string(),
                "test_secret".to_string(),
                "test_passphrase".to_string(),
            )
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn partial_credentials_are_rejected() {
        let result = BlofinBuilder::new()
            .with_credentials("test_key".to_string(), "test_secret".to_string(), String::new())
            .build();
        assert!(matches!(result, Err(BlofinError::Configuration(_))));
    }

    #[test]
    fn url_override_wins_over_mode() {
        let client = BlofinBuilder::new()
            .demo()
            .with_rest_url("http://localhost:9999".to_string())
            .build()
            .unwrap();
        assert_eq!(client.config().rest_url(), "http://localhost:9999");
    }
}
