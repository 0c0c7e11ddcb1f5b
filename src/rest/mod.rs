/// REST endpoint facades: thin typed wrappers over the transport kernel.
///
/// Each facade builds a path, query and body, hands them to the
/// [`RestClient`](crate::core::kernel::RestClient) and unwraps the response
/// envelope.
pub mod account;
pub mod affiliate;
pub mod copytrading;
pub mod market;
pub mod trading;
pub mod types;

pub use account::AccountApi;
pub use affiliate::AffiliateApi;
pub use copytrading::CopyTradingApi;
pub use market::MarketApi;
pub use trading::TradingApi;

use crate::core::errors::BlofinError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use types::ApiResponse;

/// Unwrap the `{code, msg, data}` envelope, surfacing non-zero codes as
/// [`BlofinError::Api`].
pub(crate) fn take_data<T: DeserializeOwned>(value: Value) -> Result<T, BlofinError> {
    let response: ApiResponse<T> = serde_json::from_value(value)
        .map_err(|e| BlofinError::Protocol(format!("failed to parse response: {e}")))?;

    if response.code != "0" {
        return Err(BlofinError::Api {
            code: response.code,
            message: response.msg,
        });
    }

    response
        .data
        .ok_or_else(|| BlofinError::Protocol("response missing data".to_string()))
}

/// Unwrap responses that return a single-element array.
pub(crate) fn first_item<T>(items: Vec<T>, context: &str) -> Result<T, BlofinError> {
    items
        .into_iter()
        .next()
        .ok_or_else(|| BlofinError::Protocol(format!("no {context} in response")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn take_data_unwraps_success() {
        let value = json!({"code": "0", "msg": "success", "data": [{"a": 1}]});
        let data: Vec<Value> = take_data(value).unwrap();
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn take_data_surfaces_api_errors() {
        let value = json!({"code": "152401", "msg": "Insufficient balance"});
        let err = take_data::<Value>(value).unwrap_err();
        match err {
            BlofinError::Api { code, message } => {
                assert_eq!(code, "152401");
                assert_eq!(message, "Insufficient balance");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn take_data_rejects_missing_data() {
        let value = json!({"code": "0", "msg": "success"});
        let err = take_data::<Value>(value).unwrap_err();
        assert!(matches!(err, BlofinError::Protocol(_)));
    }
}
