use crate::core::config::{BlofinConfig, WsKind};
use crate::core::errors::BlofinError;
use crate::core::kernel::HmacSigner;
use crate::ws::codec::WsDataFrame;
use crate::ws::session::{SessionEvent, WsHandle, WsSession, WsSessionConfig};

/// Order book depth options of the public `books` channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookDepth {
    /// 200 levels: initial snapshot, then incremental updates.
    Books,
    /// 5 levels: full snapshot on every push.
    Books5,
}

impl BookDepth {
    fn channel(self) -> &'static str {
        match self {
            Self::Books => "books",
            Self::Books5 => "books5",
        }
    }
}

fn spawn_session(
    config: &BlofinConfig,
    kind: WsKind,
    ws_config: WsSessionConfig,
) -> Result<WsHandle, BlofinError> {
    let signer = if kind.requires_auth() {
        let credentials = config.credentials.clone().ok_or_else(|| {
            BlofinError::Configuration(
                "credentials are required for private WebSocket endpoints".to_string(),
            )
        })?;
        Some(HmacSigner::new(credentials))
    } else {
        None
    };

    Ok(WsSession::spawn(config.ws_url(kind), kind, signer, ws_config))
}

/// Public market data WebSocket client.
///
/// No authentication; one session per client instance.
pub struct BlofinWsPublicClient {
    handle: WsHandle,
}

impl BlofinWsPublicClient {
    pub fn new(config: &BlofinConfig) -> Self {
        Self::with_session_config(config, WsSessionConfig::default())
    }

    pub fn with_session_config(config: &BlofinConfig, ws_config: WsSessionConfig) -> Self {
        // Public sessions carry no credentials and cannot fail to build
        let handle = WsSession::spawn(
            config.ws_url(WsKind::Public),
            WsKind::Public,
            None,
            ws_config,
        );
        Self { handle }
    }

    pub async fn connect(&self) -> Result<(), BlofinError> {
        self.handle.connect().await
    }

    /// Trades channel: one push per trade.
    pub fn subscribe_trades<H>(&self, inst_id: &str, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        self.handle.subscribe("trades", &[("instId", inst_id)], handler)
    }

    /// Tickers channel: pushed at most once per second.
    pub fn subscribe_tickers<H>(&self, inst_id: &str, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        self.handle.subscribe("tickers", &[("instId", inst_id)], handler)
    }

    /// Order book channel at the chosen depth.
    pub fn subscribe_order_book<H>(
        &self,
        inst_id: &str,
        depth: BookDepth,
        handler: H,
    ) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        self.handle
            .subscribe(depth.channel(), &[("instId", inst_id)], handler)
    }

    /// Candlestick channel, e.g. interval `"1m"`, `"4H"`, `"1D"`.
    pub fn subscribe_candles<H>(
        &self,
        inst_id: &str,
        interval: &str,
        handler: H,
    ) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        let channel = format!("candle{interval}");
        self.handle.subscribe(&channel, &[("instId", inst_id)], handler)
    }

    /// Funding rate channel: pushed at most every 30 seconds.
    pub fn subscribe_funding_rate<H>(&self, inst_id: &str, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        self.handle
            .subscribe("funding-rate", &[("instId", inst_id)], handler)
    }

    pub fn on_event<H>(&self, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(SessionEvent) + Send + 'static,
    {
        self.handle.on_event(handler)
    }

    pub fn handle(&self) -> &WsHandle {
        &self.handle
    }

    pub async fn close(&self) {
        self.handle.close().await;
    }
}

/// Private WebSocket client for account, order and position updates.
pub struct BlofinWsPrivateClient {
    handle: WsHandle,
}

impl BlofinWsPrivateClient {
    pub fn new(config: &BlofinConfig) -> Result<Self, BlofinError> {
        Self::with_session_config(config, WsSessionConfig::default())
    }

    pub fn with_session_config(
        config: &BlofinConfig,
        ws_config: WsSessionConfig,
    ) -> Result<Self, BlofinError> {
        let handle = spawn_session(config, WsKind::Private, ws_config)?;
        Ok(Self { handle })
    }

    pub async fn connect(&self) -> Result<(), BlofinError> {
        self.handle.connect().await
    }

    /// Order updates; all instruments when `inst_id` is `None`.
    pub fn subscribe_orders<H>(
        &self,
        inst_id: Option<&str>,
        handler: H,
    ) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        subscribe_scoped(&self.handle, "orders", inst_id, handler)
    }

    /// Position updates; initial snapshot on subscription.
    pub fn subscribe_positions<H>(
        &self,
        inst_id: Option<&str>,
        handler: H,
    ) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        subscribe_scoped(&self.handle, "positions", inst_id, handler)
    }

    /// Account balance updates.
    pub fn subscribe_account<H>(&self, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        self.handle.subscribe("account", &[], handler)
    }

    /// Algo order updates (trigger and TP/SL orders).
    pub fn subscribe_algo_orders<H>(
        &self,
        inst_id: Option<&str>,
        handler: H,
    ) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        subscribe_scoped(&self.handle, "orders-algo", inst_id, handler)
    }

    pub fn on_event<H>(&self, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(SessionEvent) + Send + 'static,
    {
        self.handle.on_event(handler)
    }

    pub fn handle(&self) -> &WsHandle {
        &self.handle
    }

    pub async fn close(&self) {
        self.handle.close().await;
    }
}

/// Copytrading WebSocket client.
pub struct BlofinWsCopytradingClient {
    handle: WsHandle,
}

impl BlofinWsCopytradingClient {
    pub fn new(config: &BlofinConfig) -> Result<Self, BlofinError> {
        Self::with_session_config(config, WsSessionConfig::default())
    }

    pub fn with_session_config(
        config: &BlofinConfig,
        ws_config: WsSessionConfig,
    ) -> Result<Self, BlofinError> {
        let handle = spawn_session(config, WsKind::Copytrading, ws_config)?;
        Ok(Self { handle })
    }

    pub async fn connect(&self) -> Result<(), BlofinError> {
        self.handle.connect().await
    }

    pub fn subscribe_positions<H>(&self, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        self.handle.subscribe("copytrading-positions", &[], handler)
    }

    pub fn subscribe_orders<H>(&self, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        self.handle.subscribe("copytrading-orders", &[], handler)
    }

    pub fn subscribe_sub_positions<H>(&self, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        self.handle
            .subscribe("copytrading-sub-positions", &[], handler)
    }

    pub fn subscribe_account<H>(&self, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        self.handle.subscribe("copytrading-account", &[], handler)
    }

    pub fn on_event<H>(&self, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(SessionEvent) + Send + 'static,
    {
        self.handle.on_event(handler)
    }

    pub fn handle(&self) -> &WsHandle {
        &self.handle
    }

    pub async fn close(&self) {
        self.handle.close().await;
    }
}

fn subscribe_scoped<H>(
    handle: &WsHandle,
    channel: &str,
    inst_id: Option<&str>,
    handler: H,
) -> Result<(), BlofinError>
where
    H: FnMut(&WsDataFrame) + Send + 'static,
{
    match inst_id {
        Some(id) => handle.subscribe(channel, &[("instId", id)], handler),
        None => handle.subscribe(channel, &[], handler),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Credentials;

    #[test]
    fn private_client_requires_credentials() {
        let config = BlofinConfig::new();
        let result = BlofinWsPrivateClient::new(&config);
        assert!(matches!(result, Err(BlofinError::Configuration(_))));

        let result = BlofinWsCopytradingClient::new(&config);
        assert!(matches!(result, Err(BlofinError::Configuration(_))));
    }

    #[tokio::test]
    async fn public_client_builds_without_credentials() {
        let config = BlofinConfig::new();
        let client = BlofinWsPublicClient::new(&config);
        assert_eq!(
            client.handle().state(),
            crate::ws::session::ConnectionState::Disconnected
        );
        client.close().await;
    }
}
