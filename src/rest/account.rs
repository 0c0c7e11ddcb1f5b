use crate::core::errors::BlofinError;
use crate::core::kernel::RestClient;
use crate::rest::take_data;
use crate::rest::types::{
    AccountBalance, AssetBalance, LeverageInfo, MarginMode, Position, PositionMode,
    TransferRequest,
};
use serde_json::{json, Value};

/// Account and asset endpoints. All of these are signed.
#[derive(Debug, Clone)]
pub struct AccountApi<R: RestClient> {
    rest: R,
}

impl<R: RestClient> AccountApi<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    /// Funding account balances, optionally filtered by account type.
    pub async fn get_balances(
        &self,
        account_type: Option<&str>,
    ) -> Result<Vec<AssetBalance>, BlofinError> {
        let mut params = Vec::new();
        if let Some(kind) = account_type {
            params.push(("accountType", kind));
        }

        let value = self.rest.get("/api/v1/asset/balances", &params, true).await?;
        take_data(value)
    }

    /// Asset bills (funding flow records).
    pub async fn get_bills(
        &self,
        currency: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(ccy) = currency {
            params.push(("currency", ccy));
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

        let value = self.rest.get("/api/v1/asset/bills", &params, true).await?;
        take_data(value)
    }

    pub async fn get_withdrawal_history(
        &self,
        currency: Option<&str>,
        state: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(ccy) = currency {
            params.push(("currency", ccy));
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
            .get("/api/v1/asset/withdrawal-history", &params, true)
            .await?;
        take_data(value)
    }

    pub async fn get_deposit_history(
        &self,
        currency: Option<&str>,
        state: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(ccy) = currency {
            params.push(("currency", ccy));
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
            .get("/api/v1/asset/deposit-history", &params, true)
            .await?;
        take_data(value)
    }

    /// Transfer funds between accounts.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<Value, BlofinError> {
        let body = serde_json::to_value(request)
            .map_err(|e| BlofinError::Protocol(format!("failed to serialize transfer: {e}")))?;

        let value = self.rest.post("/api/v1/asset/transfer", &body, true).await?;
        take_data(value)
    }

    /// Futures account balance with per-currency details.
    pub async fn get_account_balance(&self) -> Result<AccountBalance, BlofinError> {
        let value = self.rest.get("/api/v1/account/balance", &[], true).await?;
        take_data(value)
    }

    /// Open positions; all instruments when `inst_id` is `None`.
    pub async fn get_positions(
        &self,
        inst_id: Option<&str>,
    ) -> Result<Vec<Position>, BlofinError> {
        let mut params = Vec::new();
        if let Some(id) = inst_id {
            params.push(("instId", id));
        }

        let value = self
            .rest
            .get("/api/v1/account/positions", &params, true)
            .await?;
        take_data(value)
    }

    pub async fn get_margin_mode(&self) -> Result<MarginMode, BlofinError> {
        let value = self
            .rest
            .get("/api/v1/account/margin-mode", &[], true)
            .await?;
        take_data(value)
    }

    /// Set the account margin mode (`cross` or `isolated`).
    pub async fn set_margin_mode(&self, margin_mode: &str) -> Result<MarginMode, BlofinError> {
        let body = json!({ "marginMode": margin_mode });
        let value = self
            .rest
            .post("/api/v1/account/set-margin-mode", &body, true)
            .await?;
        take_data(value)
    }

    pub async fn get_position_mode(&self) -> Result<PositionMode, BlofinError> {
        let value = self
            .rest
            .get("/api/v1/account/position-mode", &[], true)
            .await?;
        take_data(value)
    }

    /// Set the position mode (`net_mode` or `long_short_mode`).
    pub async fn set_position_mode(
        &self,
        position_mode: &str,
    ) -> Result<PositionMode, BlofinError> {
        let body = json!({ "positionMode": position_mode });
        let value = self
            .rest
            .post("/api/v1/account/set-position-mode", &body, true)
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
            .get("/api/v1/account/leverage-info", &params, true)
            .await?;
        take_data(value)
    }

    /// Leverage settings for several instruments at once.
    pub async fn get_batch_leverage_info(
        &self,
        inst_ids: &[&str],
        margin_mode: &str,
    ) -> Result<Vec<LeverageInfo>, BlofinError> {
        let joined = inst_ids.join(",");
        let params = [("instId", joined.as_str()), ("marginMode", margin_mode)];
        let value = self
            .rest
            .get("/api/v1/account/batch-leverage-info", &params, true)
            .await?;
        take_data(value)
    }

    pub async fn set_leverage(
        &self,
        inst_id: &str,
        leverage: &str,
        margin_mode: &str,
        position_side: Option<&str>,
    ) -> Result<LeverageInfo, BlofinError> {
        let mut body = json!({
            "instId": inst_id,
            "leverage": leverage,
            "marginMode": margin_mode,
        });
        if let Some(side) = position_side {
            body["positionSide"] = Value::String(side.to_string());
        }

        let value = self
            .rest
            .post("/api/v1/account/set-leverage", &body, true)
            .await?;
        take_data(value)
    }

    /// Information about the API key making the request.
    pub async fn query_apikey(&self) -> Result<Value, BlofinError> {
        let value = self
            .rest
            .get("/api/v1/user/query-apikey", &[], true)
            .await?;
        take_data(value)
    }
}
