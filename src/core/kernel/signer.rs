use crate::core::config::Credentials;
use crate::core::errors::BlofinError;
use base64::engine::general_purpose;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Request path signed into every WebSocket login frame.
const WS_LOGIN_PATH: &str = "/users/self/verify";

/// Signer trait for request authentication
///
/// Computes the authentication header set for a single request. The
/// signature must be a pure function of the inputs; callers are responsible
/// for supplying a fresh timestamp and nonce per request.
pub trait Signer: Send + Sync {
    /// Sign a request and return the headers to attach to it
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, PUT, DELETE)
    /// * `request_path` - Endpoint path, including the query string for GET
    /// * `body` - Exact serialized request body (empty slice if none)
    /// * `timestamp` - Milliseconds since epoch, as a string
    /// * `nonce` - Fresh random string, unique per request
    fn sign_request(
        &self,
        method: &str,
        request_path: &str,
        body: &[u8],
        timestamp: &str,
        nonce: &str,
    ) -> Result<HashMap<String, String>, BlofinError>;
}

/// Arguments of the WebSocket `{"op":"login"}` frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginArgs {
    pub api_key: String,
    pub passphrase: String,
    pub timestamp: String,
    pub sign: String,
    pub nonce: String,
}

/// HMAC-SHA256 signer implementing the exchange's signing scheme.
///
/// The canonical string is `requestPath + METHOD + timestamp + nonce + body`.
/// The HMAC digest is hex-encoded first and that hex string is then
/// base64-encoded; the exchange validates this exact double encoding.
pub struct HmacSigner {
    credentials: Credentials,
}

impl HmacSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    fn ensure_complete(&self) -> Result<(), BlofinError> {
        if self.credentials.is_complete() {
            Ok(())
        } else {
            Err(BlofinError::Configuration(
                "API key, secret and passphrase are required for authenticated endpoints"
                    .to_string(),
            ))
        }
    }

    fn signature(
        &self,
        method: &str,
        request_path: &str,
        body: &str,
        timestamp: &str,
        nonce: &str,
    ) -> Result<String, BlofinError> {
        let prehash = format!("{request_path}{method}{timestamp}{nonce}{body}");

        let mut mac = HmacSha256::new_from_slice(self.credentials.api_secret().as_bytes())
            .map_err(|e| BlofinError::Signature(format!("failed to create HMAC: {e}")))?;
        mac.update(prehash.as_bytes());

        let hex_signature = hex::encode(mac.finalize().into_bytes());
        Ok(general_purpose::STANDARD.encode(hex_signature.as_bytes()))
    }

    /// Build the argument block of a WebSocket login frame.
    ///
    /// The login signature covers `GET /users/self/verify` with no body, and
    /// the nonce equals the timestamp.
    pub fn login_args(&self, timestamp: &str) -> Result<LoginArgs, BlofinError> {
        self.ensure_complete()?;

        let nonce = timestamp;
        let sign = self.signature("GET", WS_LOGIN_PATH, "", timestamp, nonce)?;

        Ok(LoginArgs {
            api_key: self.credentials.api_key().to_string(),
            passphrase: self.credentials.passphrase().to_string(),
            timestamp: timestamp.to_string(),
            sign,
            nonce: nonce.to_string(),
        })
    }
}

impl Signer for HmacSigner {
    fn sign_request(
        &self,
        method: &str,
        request_path: &str,
        body: &[u8],
        timestamp: &str,
        nonce: &str,
    ) -> Result<HashMap<String, String>, BlofinError> {
        self.ensure_complete()?;

        let body_str = std::str::from_utf8(body)
            .map_err(|e| BlofinError::Signature(format!("invalid body encoding: {e}")))?;

        let signature = self.signature(method, request_path, body_str, timestamp, nonce)?;

        let mut headers = HashMap::new();
        headers.insert(
            "ACCESS-KEY".to_string(),
            self.credentials.api_key().to_string(),
        );
        headers.insert("ACCESS-SIGN".to_string(), signature);
        headers.insert("ACCESS-TIMESTAMP".to_string(), timestamp.to_string());
        headers.insert("ACCESS-NONCE".to_string(), nonce.to_string());
        headers.insert(
            "ACCESS-PASSPHRASE".to_string(),
            self.credentials.passphrase().to_string(),
        );

        Ok(headers)
    }
}

/// Current wall-clock time in milliseconds since epoch, as a string.
pub fn timestamp_ms() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

/// Fresh random nonce, unique per request within the signature window.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer() -> HmacSigner {
        HmacSigner::new(Credentials::new(
            "k".to_string(),
            "s".to_string(),
            "p".to_string(),
        ))
    }

    #[test]
    fn signature_matches_golden_value() {
        let signer = test_signer();
        let headers = signer
            .sign_request("GET", "/api/v1/account/balance", b"", "1700000000000", "abc123")
            .unwrap();

        assert_eq!(
            headers["ACCESS-SIGN"],
            "YTUwMTZmMmI4NjA5MmNkNDI0NTBhNzM4MTE3NzFkOGU5OTVmODRkMGVkODkyODdjODkyNDljYzBlMmZjZDNiYg=="
        );
    }

    #[test]
    fn all_access_headers_present() {
        let signer = test_signer();
        let headers = signer
            .sign_request("GET", "/api/v1/account/balance", b"", "1700000000000", "abc123")
            .unwrap();

        for key in [
            "ACCESS-KEY",
            "ACCESS-SIGN",
            "ACCESS-TIMESTAMP",
            "ACCESS-NONCE",
            "ACCESS-PASSPHRASE",
        ] {
            assert!(headers.contains_key(key), "missing header {key}");
        }
        assert_eq!(headers["ACCESS-KEY"], "k");
        assert_eq!(headers["ACCESS-PASSPHRASE"], "p");
        assert_eq!(headers["ACCESS-TIMESTAMP"], "1700000000000");
        assert_eq!(headers["ACCESS-NONCE"], "abc123");
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = test_signer();
        let a = signer
            .sign_request("POST", "/api/v1/trade/order", b"{}", "1700000000000", "n1")
            .unwrap();
        let b = signer
            .sign_request("POST", "/api/v1/trade/order", b"{}", "1700000000000", "n1")
            .unwrap();
        assert_eq!(a["ACCESS-SIGN"], b["ACCESS-SIGN"]);
    }

    #[test]
    fn changing_any_input_changes_signature() {
        let signer = test_signer();
        let base = signer
            .sign_request("GET", "/api/v1/account/balance", b"", "1700000000000", "abc123")
            .unwrap()["ACCESS-SIGN"]
            .clone();

        let variants = [
            signer
                .sign_request("POST", "/api/v1/account/balance", b"", "1700000000000", "abc123")
                .unwrap(),
            signer
                .sign_request("GET", "/api/v1/account/positions", b"", "1700000000000", "abc123")
                .unwrap(),
            signer
                .sign_request("GET", "/api/v1/account/balance", b"x", "1700000000000", "abc123")
                .unwrap(),
            signer
                .sign_request("GET", "/api/v1/account/balance", b"", "1700000000001", "abc123")
                .unwrap(),
            signer
                .sign_request("GET", "/api/v1/account/balance", b"", "1700000000000", "abc124")
                .unwrap(),
        ];

        for headers in &variants {
            assert_ne!(headers["ACCESS-SIGN"], base);
        }
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        let signer = HmacSigner::new(Credentials::new(
            "k".to_string(),
            String::new(),
            "p".to_string(),
        ));
        let err = signer
            .sign_request("GET", "/api/v1/account/balance", b"", "1700000000000", "abc123")
            .unwrap_err();
        assert!(matches!(err, BlofinError::Configuration(_)));

        let err = signer.login_args("1700000000000").unwrap_err();
        assert!(matches!(err, BlofinError::Configuration(_)));
    }

    #[test]
    fn login_args_sign_the_verify_path() {
        let signer = test_signer();
        let args = signer.login_args("1700000000000").unwrap();

        assert_eq!(args.api_key, "k");
        assert_eq!(args.passphrase, "p");
        assert_eq!(args.nonce, args.timestamp);
        assert_eq!(
            args.sign,
            "MzBkN2MzNjY0ODFiZjg4NWQ5MTU1Y2ZhZDdlZjA1NWQ2ODExMTUzYzk1MDQ4MDQ1NWU2ZWIwNTg4OGE4OTExOQ=="
        );
    }

    #[test]
    fn nonces_are_unique() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
