use crate::core::errors::BlofinError;
use crate::core::kernel::RestClient;
use crate::rest::types::{Candle, FundingRate, Instrument, MarkPrice, MarketTrade, OrderBook, Ticker};
use crate::rest::{first_item, take_data};
use serde_json::Value;

/// Public market data endpoints. None of these are signed.
#[derive(Debug, Clone)]
pub struct MarketApi<R: RestClient> {
    rest: R,
}

impl<R: RestClient> MarketApi<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    /// Server time in epoch milliseconds. Useful for checking clock skew
    /// before sending signed requests.
    pub async fn get_server_time(&self) -> Result<u64, BlofinError> {
        let value = self.rest.get("/api/v1/public/time", &[], false).await?;
        let data: Value = take_data(value)?;

        let ts = data
            .get("ts")
            .and_then(Value::as_str)
            .ok_or_else(|| BlofinError::Protocol("missing ts in time response".to_string()))?;

        ts.parse::<u64>()
            .map_err(|e| BlofinError::Protocol(format!("invalid server timestamp: {e}")))
    }

    /// List tradable instruments, optionally filtered to one contract.
    pub async fn get_instruments(
        &self,
        inst_id: Option<&str>,
    ) -> Result<Vec<Instrument>, BlofinError> {
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }

        let value = self
            .rest
            .get("/api/v1/market/instruments", &params, false)
            .await?;
        take_data(value)
    }

    /// Latest tickers; all instruments when `inst_id` is `None`.
    pub async fn get_tickers(&self, inst_id: Option<&str>) -> Result<Vec<Ticker>, BlofinError> {
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }

        let value = self
            .rest
            .get("/api/v1/market/tickers", &params, false)
            .await?;
        take_data(value)
    }

    /// Order book snapshot; `size` is the number of levels (max 100).
    pub async fn get_order_book(
        &self,
        inst_id: &str,
        size: Option<u32>,
    ) -> Result<OrderBook, BlofinError> {
        let size_str = size.map(|s| s.to_string());
        let mut params = vec![("instId", inst_id)];
        if let Some(ref size_val) = size_str {
            params.push(("size", size_val.as_str()));
        }

        let value = self.rest.get("/api/v1/market/books", &params, false).await?;
        let books: Vec<OrderBook> = take_data(value)?;
        first_item(books, "order book")
    }

    /// Recent public trades, newest first.
    pub async fn get_trades(
        &self,
        inst_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<MarketTrade>, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = vec![("instId", inst_id)];
        if let Some(ref limit_val) = limit_str {
            params.push(("limit", limit_val.as_str()));
        }

        let value = self.rest.get("/api/v1/market/trades", &params, false).await?;
        take_data(value)
    }

    /// Current mark and index prices.
    pub async fn get_mark_price(
        &self,
        inst_id: Option<&str>,
    ) -> Result<Vec<MarkPrice>, BlofinError> {
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }

        let value = self
            .rest
            .get("/api/v1/market/mark-price", &params, false)
            .await?;
        take_data(value)
    }

    /// Current funding rates.
    pub async fn get_funding_rate(
        &self,
        inst_id: Option<&str>,
    ) -> Result<Vec<FundingRate>, BlofinError> {
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }

        let value = self
            .rest
            .get("/api/v1/market/funding-rate", &params, false)
            .await?;
        take_data(value)
    }

    /// Funding rate history, paginated by funding time.
    pub async fn get_funding_rate_history(
        &self,
        inst_id: &str,
        before: Option<&str>,
        after: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = vec![("instId", inst_id)];
        if let Some(ts) = before {
            params.push(("before", ts));
        }
        if let Some(ts) = after {
            params.push(("after", ts));
        }
        if let Some(ref limit_val) = limit_str {
            params.push(("limit", limit_val.as_str()));
        }

        let value = self
            .rest
            .get("/api/v1/market/funding-rate-history", &params, false)
            .await?;
        take_data(value)
    }

    /// Candlesticks; `bar` is the interval (`1m`, `4H`, `1D`, ...).
    pub async fn get_candlesticks(
        &self,
        inst_id: &str,
        bar: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Candle>, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = vec![("instId", inst_id)];
        if let Some(b) = bar {
            params.push(("bar", b));
        }
        if let Some(ts) = after {
            params.push(("after", ts));
        }
        if let Some(ts) = before {
            params.push(("before", ts));
        }
        if let Some(ref limit_val) = limit_str {
            params.push(("limit", limit_val.as_str()));
        }

        let value = self
            .rest
            .get("/api/v1/market/candles", &params, false)
            .await?;
        let rows: Vec<Vec<String>> = take_data(value)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| Candle::try_from(row).ok())
            .collect())
    }
}
