use crate::core::errors::BlofinError;
use crate::core::kernel::RestClient;
use crate::rest::types::{
    AccountBalance, LeverageInfo, Order, OrderAck, PlaceOrderRequest, PlaceTpslRequest, Position,
    PositionMode,
};
use crate::rest::{first_item, take_data};
use serde_json::{json, Value};

/// Copytrading endpoints. All of these are signed.
#[derive(Debug, Clone)]
pub struct CopyTradingApi<R: RestClient> {
    rest: R,
}

impl<R: RestClient> CopyTradingApi<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    /// Instruments available for copytrading.
    pub async fn get_instruments(&self) -> Result<Value, BlofinError> {
        let value = self
            .rest
            .get("/api/v1/copytrading/instruments", &[], true)
            .await?;
        take_data(value)
    }

    /// Copytrading account configuration (roles, nickname).
    pub async fn get_config(&self) -> Result<Value, BlofinError> {
        let value = self
            .rest
            .get("/api/v1/copytrading/config", &[], true)
            .await?;
        take_data(value)
    }

    /// Copytrading account balance.
    pub async fn get_account_balance(&self) -> Result<AccountBalance, BlofinError> {
        let value = self
            .rest
            .get("/api/v1/copytrading/account/balance", &[], true)
            .await?;
        take_data(value)
    }

    pub async fn get_position_mode(&self) -> Result<PositionMode, BlofinError> {
        let value = self
            .rest
            .get("/api/v1/copytrading/account/position-mode", &[], true)
            .await?;
        take_data(value)
    }

    pub async fn set_position_mode(
        &self,
        position_mode: &str,
    ) -> Result<PositionMode, BlofinError> {
        let body = json!({ "positionMode": position_mode });
        let value = self
            .rest
            .post("/api/v1/copytrading/account/set-position-mode", &body, true)
            .await?;
        take_data(value)
    }

    pub async fn get_leverage_info(
        &self,
        inst_id: &str,
        margin_mode: &str,
    ) -> Result<LeverageInfo, BlofinError> {
        let params = [("instId", inst_id), ("marginMode", margin_mode)];
        let value = self
            .rest
            .get("/api/v1/copytrading/account/leverage-info", &params, true)
            .await?;
        take_data(value)
    }

    pub async fn set_leverage(
        &self,
        inst_id: &str,
        leverage: &str,
        margin_mode: &str,
        position_side: &str,
    ) -> Result<Value, BlofinError> {
        let body = json!({
            "instId": inst_id,
            "leverage": leverage,
            "marginMode": margin_mode,
            "positionSide": position_side,
        });
        let value = self
            .rest
            .post("/api/v1/copytrading/account/set-leverage", &body, true)
            .await?;
        take_data(value)
    }

    /// Open positions aggregated per contract.
    pub async fn get_positions_by_contract(
        &self,
        inst_id: Option<&str>,
    ) -> Result<Vec<Position>, BlofinError> {
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }

        let value = self
            .rest
            .get(
                "/api/v1/copytrading/account/positions-by-contract",
                &params,
                true,
            )
            .await?;
        take_data(value)
    }

    /// Open positions tracked per order.
    pub async fn get_positions_by_order(
        &self,
        inst_id: Option<&str>,
        order_id: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }
        if let Some(id) = order_id {
            params.push(("orderId", id));
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
            .get(
                "/api/v1/copytrading/account/positions-by-order",
                &params,
                true,
            )
            .await?;
        take_data(value)
    }

    /// Detail view of one position-by-order entry.
    pub async fn get_positions_details_by_order(
        &self,
        order_id: &str,
    ) -> Result<Value, BlofinError> {
        let params = [("orderId", order_id)];
        let value = self
            .rest
            .get(
                "/api/v1/copytrading/account/positions-details-by-order",
                &params,
                true,
            )
            .await?;
        take_data(value)
    }

    /// Active copytrading orders.
    pub async fn get_orders_pending(
        &self,
        inst_id: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Order>, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
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
            .get("/api/v1/copytrading/trade/orders-pending", &params, true)
            .await?;
        take_data(value)
    }

    /// Completed copytrading order history.
    pub async fn get_orders_history(
        &self,
        inst_id: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        begin: Option<&str>,
        end: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }
        if let Some(ts) = after {
            params.push(("after", ts));
        }
        if let Some(ts) = before {
            params.push(("before", ts));
        }
        if let Some(ts) = begin {
            params.push(("begin", ts));
        }
        if let Some(ts) = end {
            params.push(("end", ts));
        }
        if let Some(ref limit_val) = limit_str {
            params.push(("limit", limit_val.as_str()));
        }

        let value = self
            .rest
            .get("/api/v1/copytrading/trade/orders-history", &params, true)
            .await?;
        take_data(value)
    }

    /// Closed-position history tracked per order.
    pub async fn get_position_history_by_order(
        &self,
        inst_id: Option<&str>,
        order_id: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }
        if let Some(id) = order_id {
            params.push(("orderId", id));
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
            .get(
                "/api/v1/copytrading/trade/position-history-by-order",
                &params,
                true,
            )
            .await?;
        take_data(value)
    }

    /// Place a copytrading order.
    pub async fn place_order(
        &self,
        request: &PlaceOrderRequest,
    ) -> Result<OrderAck, BlofinError> {
        let body = serde_json::to_value(request)
            .map_err(|e| BlofinError::Protocol(format!("failed to serialize order: {e}")))?;

        let value = self
            .rest
            .post("/api/v1/copytrading/trade/place-order", &body, true)
            .await?;
        let acks: Vec<OrderAck> = take_data(value)?;
        first_item(acks, "order acknowledgement")
    }

    /// Cancel a copytrading order.
    pub async fn cancel_order(&self, order_id: &str) -> Result<Value, BlofinError> {
        let body = json!({ "orderId": order_id });
        let value = self
            .rest
            .post("/api/v1/copytrading/trade/cancel-order", &body, true)
            .await?;
        take_data(value)
    }

    /// Close a position tracked per order, at market price.
    pub async fn close_position_by_order(
        &self,
        order_id: &str,
        size: &str,
        broker_id: Option<&str>,
    ) -> Result<Value, BlofinError> {
        let mut body = json!({ "orderId": order_id, "size": size });
        if let Some(id) = broker_id {
            body["brokerId"] = Value::String(id.to_string());
        }

        let value = self
            .rest
            .post(
                "/api/v1/copytrading/trade/close-position-by-order",
                &body,
                true,
            )
            .await?;
        take_data(value)
    }

    /// Close the whole position of a contract at market price.
    pub async fn close_position_by_contract(
        &self,
        inst_id: &str,
        margin_mode: &str,
        position_side: &str,
        close_type: &str,
        size: Option<&str>,
    ) -> Result<Value, BlofinError> {
        let mut body = json!({
            "instId": inst_id,
            "marginMode": margin_mode,
            "positionSide": position_side,
            "closeType": close_type,
        });
        if let Some(sz) = size {
            body["size"] = Value::String(sz.to_string());
        }

        let value = self
            .rest
            .post(
                "/api/v1/copytrading/trade/close-position-by-contract",
                &body,
                true,
            )
            .await?;
        take_data(value)
    }

    /// Attach a TP/SL to a contract position.
    pub async fn place_tpsl_by_contract(
        &self,
        request: &PlaceTpslRequest,
    ) -> Result<Value, BlofinError> {
        let body = serde_json::to_value(request)
            .map_err(|e| BlofinError::Protocol(format!("failed to serialize tpsl: {e}")))?;

        let value = self
            .rest
            .post("/api/v1/copytrading/trade/place-tpsl-by-contract", &body, true)
            .await?;
        take_data(value)
    }

    /// Attach a TP/SL to a position tracked per order.
    pub async fn place_tpsl_by_order(
        &self,
        order_id: &str,
        tp_trigger_price: Option<&str>,
        sl_trigger_price: Option<&str>,
        size: Option<&str>,
    ) -> Result<Value, BlofinError> {
        let mut body = json!({ "orderId": order_id });
        if let Some(price) = tp_trigger_price {
            body["tpTriggerPrice"] = Value::String(price.to_string());
        }
        if let Some(price) = sl_trigger_price {
            body["slTriggerPrice"] = Value::String(price.to_string());
        }
        if let Some(sz) = size {
            body["size"] = Value::String(sz.to_string());
        }

        let value = self
            .rest
            .post("/api/v1/copytrading/trade/place-tpsl-by-order", &body, true)
            .await?;
        take_data(value)
    }

    /// Active TP/SL orders attached per contract.
    pub async fn get_pending_tpsl_by_contract(
        &self,
        inst_id: Option<&str>,
        algo_id: Option<&str>,
    ) -> Result<Value, BlofinError> {
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }
        if let Some(id) = algo_id {
            params.push(("algoId", id));
        }

        let value = self
            .rest
            .get(
                "/api/v1/copytrading/trade/pending-tpsl-by-contract",
                &params,
                true,
            )
            .await?;
        take_data(value)
    }

    /// Active TP/SL orders attached to one position-by-order.
    pub async fn get_pending_tpsl_by_order(
        &self,
        order_id: &str,
    ) -> Result<Value, BlofinError> {
        let params = [("orderId", order_id)];
        let value = self
            .rest
            .get(
                "/api/v1/copytrading/trade/pending-tpsl-by-order",
                &params,
                true,
            )
            .await?;
        take_data(value)
    }

    pub async fn cancel_tpsl_by_contract(&self, algo_id: &str) -> Result<Value, BlofinError> {
        let body = json!({ "algoId": algo_id });
        let value = self
            .rest
            .post("/api/v1/copytrading/trade/cancel-tpsl-by-contract", &body, true)
            .await?;
        take_data(value)
    }

    pub async fn cancel_tpsl_by_order(&self, order_id: &str) -> Result<Value, BlofinError> {
        let body = json!({ "orderId": order_id });
        let value = self
            .rest
            .post("/api/v1/copytrading/trade/cancel-tpsl-by-order", &body, true)
            .await?;
        take_data(value)
    }
}
