use crate::core::errors::BlofinError;
use crate::core::kernel::RestClient;
use crate::rest::types::{Order, OrderAck, PlaceOrderRequest, PlaceTpslRequest, TpslAck};
use crate::rest::{first_item, take_data};
use serde_json::{json, Value};

/// Futures trading endpoints. All of these are signed.
#[derive(Debug, Clone)]
pub struct TradingApi<R: RestClient> {
    rest: R,
}

impl<R: RestClient> TradingApi<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    /// Active (unfilled) orders.
    pub async fn get_orders_pending(
        &self,
        inst_id: Option<&str>,
        order_type: Option<&str>,
        state: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Order>, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }
        if let Some(t) = order_type {
            params.push(("orderType", t));
        }
        if let Some(s) = state {
            params.push(("state", s));
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
            .get("/api/v1/trade/orders-pending", &params, true)
            .await?;
        take_data(value)
    }

    /// Completed order history.
    pub async fn get_orders_history(
        &self,
        inst_id: Option<&str>,
        order_type: Option<&str>,
        state: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Order>, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }
        if let Some(t) = order_type {
            params.push(("orderType", t));
        }
        if let Some(s) = state {
            params.push(("state", s));
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
            .get("/api/v1/trade/orders-history", &params, true)
            .await?;
        take_data(value)
    }

    /// Active TP/SL orders.
    pub async fn get_orders_tpsl_pending(
        &self,
        inst_id: Option<&str>,
        tpsl_id: Option<&str>,
        client_order_id: Option<&str>,
    ) -> Result<Value, BlofinError> {
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }
        if let Some(id) = tpsl_id {
            params.push(("tpslId", id));
        }
        if let Some(id) = client_order_id {
            params.push(("clientOrderId", id));
        }

        let value = self
            .rest
            .get("/api/v1/trade/orders-tpsl-pending", &params, true)
            .await?;
        take_data(value)
    }

    /// TP/SL order history.
    pub async fn get_orders_tpsl_history(
        &self,
        inst_id: Option<&str>,
        tpsl_id: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }
        if let Some(id) = tpsl_id {
            params.push(("tpslId", id));
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
            .get("/api/v1/trade/orders-tpsl-history", &params, true)
            .await?;
        take_data(value)
    }

    /// Active algo (trigger) orders.
    pub async fn get_orders_algo_pending(
        &self,
        inst_id: Option<&str>,
        algo_id: Option<&str>,
        order_type: Option<&str>,
    ) -> Result<Value, BlofinError> {
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }
        if let Some(id) = algo_id {
            params.push(("algoId", id));
        }
        if let Some(t) = order_type {
            params.push(("orderType", t));
        }

        let value = self
            .rest
            .get("/api/v1/trade/orders-algo-pending", &params, true)
            .await?;
        take_data(value)
    }

    /// Trade fills, newest first.
    pub async fn get_fills_history(
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
            .get("/api/v1/trade/fills-history", &params, true)
            .await?;
        take_data(value)
    }

    /// Price band inside which an order would currently be accepted.
    pub async fn get_order_price_range(
        &self,
        inst_id: &str,
        side: &str,
    ) -> Result<Value, BlofinError> {
        let params = [("instId", inst_id), ("side", side)];
        let value = self
            .rest
            .get("/api/v1/trade/order/price-range", &params, true)
            .await?;
        take_data(value)
    }

    /// Place a new order.
    pub async fn place_order(
        &self,
        request: &PlaceOrderRequest,
    ) -> Result<OrderAck, BlofinError> {
        let body = serde_json::to_value(request)
            .map_err(|e| BlofinError::Protocol(format!("failed to serialize order: {e}")))?;

        let value = self.rest.post("/api/v1/trade/order", &body, true).await?;
        let acks: Vec<OrderAck> = take_data(value)?;
        first_item(acks, "order acknowledgement")
    }

    /// Place up to 20 orders in one call.
    pub async fn place_batch_orders(
        &self,
        orders: &[PlaceOrderRequest],
    ) -> Result<Vec<OrderAck>, BlofinError> {
        let body = serde_json::to_value(orders)
            .map_err(|e| BlofinError::Protocol(format!("failed to serialize orders: {e}")))?;

        let value = self
            .rest
            .post("/api/v1/trade/batch-orders", &body, true)
            .await?;
        take_data(value)
    }

    /// Place a TP/SL order.
    pub async fn place_tpsl(&self, request: &PlaceTpslRequest) -> Result<TpslAck, BlofinError> {
        let body = serde_json::to_value(request)
            .map_err(|e| BlofinError::Protocol(format!("failed to serialize tpsl: {e}")))?;

        let value = self
            .rest
            .post("/api/v1/trade/order-tpsl", &body, true)
            .await?;
        take_data(value)
    }

    /// Place an algo (trigger) order; the payload follows the exchange's
    /// algo order schema.
    pub async fn place_algo_order(&self, request: &Value) -> Result<Value, BlofinError> {
        let value = self
            .rest
            .post("/api/v1/trade/order-algo", request, true)
            .await?;
        take_data(value)
    }

    /// Cancel one order by order id or client order id.
    pub async fn cancel_order(
        &self,
        order_id: Option<&str>,
        inst_id: Option<&str>,
        client_order_id: Option<&str>,
    ) -> Result<OrderAck, BlofinError> {
        let mut body = json!({});
        if let Some(id) = order_id {
            body["orderId"] = Value::String(id.to_string());
        }
        if let Some(id) = inst_id {
            body["instId"] = Value::String(id.to_string());
        }
        if let Some(id) = client_order_id {
            body["clientOrderId"] = Value::String(id.to_string());
        }

        let value = self
            .rest
            .post("/api/v1/trade/cancel-order", &body, true)
            .await?;
        let acks: Vec<OrderAck> = take_data(value)?;
        first_item(acks, "cancel acknowledgement")
    }

    /// Cancel several orders; each entry carries `orderId`/`instId`/
    /// `clientOrderId` as for [`Self::cancel_order`].
    pub async fn cancel_batch_orders(
        &self,
        orders: &[Value],
    ) -> Result<Vec<OrderAck>, BlofinError> {
        let body = Value::Array(orders.to_vec());
        let value = self
            .rest
            .post("/api/v1/trade/cancel-batch-orders", &body, true)
            .await?;
        take_data(value)
    }

    /// Cancel TP/SL orders; each entry carries `tpslId` or `clientOrderId`.
    pub async fn cancel_tpsl(&self, orders: &[Value]) -> Result<Value, BlofinError> {
        let body = Value::Array(orders.to_vec());
        let value = self
            .rest
            .post("/api/v1/trade/cancel-tpsl", &body, true)
            .await?;
        take_data(value)
    }

    /// Cancel an algo order.
    pub async fn cancel_algo_order(
        &self,
        inst_id: Option<&str>,
        algo_id: Option<&str>,
        client_order_id: Option<&str>,
    ) -> Result<Value, BlofinError> {
        let mut body = json!({});
        if let Some(id) = inst_id {
            body["instId"] = Value::String(id.to_string());
        }
        if let Some(id) = algo_id {
            body["algoId"] = Value::String(id.to_string());
        }
        if let Some(id) = client_order_id {
            body["clientOrderId"] = Value::String(id.to_string());
        }

        let value = self
            .rest
            .post("/api/v1/trade/cancel-algo", &body, true)
            .await?;
        take_data(value)
    }

    /// Close a position at market price.
    pub async fn close_position(
        &self,
        inst_id: &str,
        margin_mode: &str,
        position_side: &str,
        client_order_id: Option<&str>,
    ) -> Result<Value, BlofinError> {
        let mut body = json!({
            "instId": inst_id,
            "marginMode": margin_mode,
            "positionSide": position_side,
        });
        if let Some(id) = client_order_id {
            body["clientOrderId"] = Value::String(id.to_string());
        }

        let value = self
            .rest
            .post("/api/v1/trade/close-position", &body, true)
            .await?;
        take_data(value)
    }
}
