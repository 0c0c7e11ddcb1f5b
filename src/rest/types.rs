use crate::core::errors::BlofinError;
use serde::{Deserialize, Serialize};

/// Standard response envelope wrapping every REST payload.
#[derive(Debug, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// Trading instrument metadata
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub inst_id: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub inst_type: String,          // SWAP
    pub contract_type: Option<String>, // linear, inverse
    pub contract_value: Option<String>,
    pub list_time: Option<String>,
    pub expire_time: Option<String>,
    pub max_leverage: Option<String>,
    pub min_size: Option<String>,
    pub lot_size: Option<String>,
    pub tick_size: Option<String>,
    pub max_limit_size: Option<String>,
    pub max_market_size: Option<String>,
    pub state: String, // live, suspend
}

/// 24h ticker
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub inst_id: String,
    pub last: String,
    pub last_size: Option<String>,
    pub ask_price: String,
    pub ask_size: Option<String>,
    pub bid_price: String,
    pub bid_size: Option<String>,
    pub high_24h: Option<String>,
    pub open_24h: Option<String>,
    pub low_24h: Option<String>,
    pub vol_currency_24h: Option<String>,
    pub vol_24h: Option<String>,
    pub ts: String,
}

/// Order book snapshot: levels are `[price, size]` arrays
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OrderBook {
    pub asks: Vec<Vec<String>>,
    pub bids: Vec<Vec<String>>,
    pub ts: String,
}

/// Public trade
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MarketTrade {
    pub trade_id: String,
    pub inst_id: String,
    pub price: String,
    pub size: String,
    pub side: String,
    pub ts: String,
}

/// Mark and index price
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MarkPrice {
    pub inst_id: String,
    pub index_price: Option<String>,
    pub mark_price: String,
    pub ts: String,
}

/// Funding rate of a perpetual contract
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FundingRate {
    pub inst_id: String,
    pub funding_rate: String,
    pub funding_time: String,
}

/// Candlestick; the API returns these as positional string arrays
#[derive(Debug, Serialize, Clone)]
pub struct Candle {
    pub ts: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub vol: String,
    pub vol_currency: String,
    pub vol_currency_quote: String,
    /// "0" while the candle is still forming, "1" once complete
    pub confirm: String,
}

impl TryFrom<Vec<String>> for Candle {
    type Error = BlofinError;

    fn try_from(row: Vec<String>) -> Result<Self, Self::Error> {
        if row.len() < 9 {
            return Err(BlofinError::Protocol(format!(
                "candlestick row has {} fields, expected 9",
                row.len()
            )));
        }
        let mut it = row.into_iter();
        Ok(Self {
            ts: it.next().unwrap_or_default(),
            open: it.next().unwrap_or_default(),
            high: it.next().unwrap_or_default(),
            low: it.next().unwrap_or_default(),
            close: it.next().unwrap_or_default(),
            vol: it.next().unwrap_or_default(),
            vol_currency: it.next().unwrap_or_default(),
            vol_currency_quote: it.next().unwrap_or_default(),
            confirm: it.next().unwrap_or_default(),
        })
    }
}

/// Funding account balance (`/api/v1/asset/balances`)
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub currency: String,
    pub balance: String,
    pub available: String,
    pub frozen: String,
    pub bonus: Option<String>,
}

/// Futures account balance with per-currency details
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub ts: String,
    pub total_equity: String,
    pub isolated_equity: String,
    pub details: Vec<BalanceDetail>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDetail {
    pub currency: String,
    pub equity: String,
    pub balance: String,
    pub ts: String,
    pub isolated_equity: Option<String>,
    pub available: String,
    pub available_equity: Option<String>,
    pub frozen: Option<String>,
    pub order_frozen: Option<String>,
    pub equity_usd: Option<String>,
    pub unrealized_pnl: Option<String>,
    pub isolated_unrealized_pnl: Option<String>,
    pub coin_usd_price: Option<String>,
    pub margin_ratio: Option<String>,
    pub spot_available: Option<String>,
    pub liability: Option<String>,
    pub borrow_frozen: Option<String>,
}

/// Open position
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub position_id: String,
    pub inst_id: String,
    pub inst_type: Option<String>,
    pub margin_mode: String,
    pub position_side: String,
    pub positions: String,
    pub available_positions: Option<String>,
    pub average_price: String,
    pub unrealized_pnl: Option<String>,
    pub unrealized_pnl_ratio: Option<String>,
    pub leverage: Option<String>,
    pub liquidation_price: Option<String>,
    pub mark_price: Option<String>,
    pub initial_margin: Option<String>,
    pub margin: Option<String>,
    pub margin_ratio: Option<String>,
    pub maintenance_margin: Option<String>,
    pub adl: Option<String>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
}

/// Order details as returned by pending/history queries
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub inst_id: String,
    pub inst_type: Option<String>,
    pub margin_mode: String,
    pub position_side: String,
    pub side: String,
    pub order_type: String,
    pub price: String,
    pub size: String,
    pub reduce_only: Option<String>,
    pub leverage: Option<String>,
    pub state: String,
    pub filled_size: Option<String>,
    pub filled_amount: Option<String>,
    pub average_price: Option<String>,
    pub fee: Option<String>,
    pub pnl: Option<String>,
    pub cancel_source: Option<String>,
    pub order_category: Option<String>,
    pub tp_trigger_price: Option<String>,
    pub tp_order_price: Option<String>,
    pub sl_trigger_price: Option<String>,
    pub sl_order_price: Option<String>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
    pub broker_id: Option<String>,
}

/// New order request
#[derive(Debug, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub inst_id: String,
    pub margin_mode: String,   // cross, isolated
    pub position_side: String, // net, long, short
    pub side: String,          // buy, sell
    pub order_type: String,    // market, limit, post_only, fok, ioc
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce_only: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tp_trigger_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tp_order_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl_trigger_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl_order_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<String>,
}

/// TP/SL order request
#[derive(Debug, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaceTpslRequest {
    pub inst_id: String,
    pub margin_mode: String,
    pub position_side: String,
    pub side: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tp_trigger_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tp_order_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl_trigger_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl_order_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce_only: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<String>,
}

/// Per-order acknowledgement of place/cancel calls
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub order_id: Option<String>,
    pub client_order_id: Option<String>,
    pub code: Option<String>,
    pub msg: Option<String>,
}

/// TP/SL acknowledgement
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TpslAck {
    pub tpsl_id: Option<String>,
    pub client_order_id: Option<String>,
    pub code: Option<String>,
    pub msg: Option<String>,
}

/// Leverage setting of one instrument/side
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LeverageInfo {
    pub inst_id: String,
    pub leverage: String,
    pub margin_mode: String,
    pub position_side: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MarginMode {
    pub margin_mode: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PositionMode {
    pub position_mode: String,
}

/// Funds transfer between accounts
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub currency: String,
    pub amount: String,
    pub from_account: String, // funding, futures, copy_trading, earn, spot
    pub to_account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_converts_from_row() {
        let row: Vec<String> = [
            "1700000000000", "35000", "35100", "34900", "35050", "120", "4.2", "147210", "1",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        let candle = Candle::try_from(row).unwrap();
        assert_eq!(candle.ts, "1700000000000");
        assert_eq!(candle.close, "35050");
        assert_eq!(candle.confirm, "1");
    }

    #[test]
    fn short_candle_row_is_a_protocol_error() {
        let row = vec!["1700000000000".to_string(), "35000".to_string()];
        assert!(matches!(
            Candle::try_from(row),
            Err(BlofinError::Protocol(_))
        ));
    }

    #[test]
    fn order_request_omits_unset_fields() {
        let request = PlaceOrderRequest {
            inst_id: "BTC-USDT".to_string(),
            margin_mode: "cross".to_string(),
            position_side: "net".to_string(),
            side: "buy".to_string(),
            order_type: "market".to_string(),
            size: "0.1".to_string(),
            ..Default::default()
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["instId"], "BTC-USDT");
        assert!(value.get("price").is_none());
        assert!(value.get("clientOrderId").is_none());
    }

    #[test]
    fn envelope_parses_error_without_data() {
        let raw = r#"{"code":"152401","msg":"Insufficient balance"}"#;
        let response: ApiResponse<Vec<Ticker>> = serde_json::from_str(raw).unwrap();
        assert_eq!(response.code, "152401");
        assert!(response.data.is_none());
    }
}
