use crate::core::errors::BlofinError;
use crate::core::kernel::RestClient;
use crate::rest::take_data;
use serde_json::Value;

/// Affiliate program endpoints. All of these are signed and require an
/// affiliate-enabled API key.
#[derive(Debug, Clone)]
pub struct AffiliateApi<R: RestClient> {
    rest: R,
}

impl<R: RestClient> AffiliateApi<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    /// Basic affiliate account information (commission rates, cashbacks).
    pub async fn get_basic_info(&self) -> Result<Value, BlofinError> {
        let value = self.rest.get("/api/v1/affiliate/basic", &[], true).await?;
        take_data(value)
    }

    /// Referral code of the affiliate account.
    pub async fn get_referral_code(&self) -> Result<Value, BlofinError> {
        let value = self
            .rest
            .get("/api/v1/affiliate/referral-code", &[], true)
            .await?;
        take_data(value)
    }

    /// Direct invitees, paginated by invitee uid.
    pub async fn get_invitees(
        &self,
        uid: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        begin: Option<&str>,
        end: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(id) = uid {
            params.push(("uid", id));
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
            .get("/api/v1/affiliate/invitees", &params, true)
            .await?;
        take_data(value)
    }

    /// Invitees of sub-affiliates.
    pub async fn get_sub_invitees(
        &self,
        uid: Option<&str>,
        sub_affiliate_uid: Option<&str>,
        sub_affiliate_level: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(id) = uid {
            params.push(("uid", id));
        }
        if let Some(id) = sub_affiliate_uid {
            params.push(("subAffiliateUid", id));
        }
        if let Some(level) = sub_affiliate_level {
            params.push(("subAffiliateLevel", level));
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
            .get("/api/v1/affiliate/sub-invitees", &params, true)
            .await?;
        take_data(value)
    }

    /// Sub-affiliate accounts.
    pub async fn get_sub_affiliates(
        &self,
        sub_affiliate_level: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(level) = sub_affiliate_level {
            params.push(("subAffiliateLevel", level));
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
            .get("/api/v1/affiliate/sub-affiliates", &params, true)
            .await?;
        take_data(value)
    }

    /// Daily commission earned from direct invitees.
    pub async fn get_invitees_daily_commission(
        &self,
        uid: Option<&str>,
        begin: Option<&str>,
        end: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, BlofinError> {
        let limit_str = limit.map(|l| l.to_string());
        let mut params = Vec::new();
        if let Some(id) = uid {
            params.push(("uid", id));
        }
        if let Some(ts) = begin {
            params.push(("begin", ts));
        }
        if let Some(ts) = end {
            params.push(("end", ts));
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
            .get("/api/v1/affiliate/invitees/daily", &params, true)
            .await?;
        take_data(value)
    }
}
