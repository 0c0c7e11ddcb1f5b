use blofin::core::kernel::{HmacSigner, Signer};
use blofin::{
    BlofinBuilder, BlofinConfig, BlofinError, BlofinWsPrivateClient, BlofinWsPublicClient,
    Credentials, Mode, WsKind,
};

fn test_credentials() -> Credentials {
    Credentials::new(
        "test_api_key".to_string(),
        "test_api_secret".to_string(),
        "test_passphrase".to_string(),
    )
}

#[test]
fn production_client_uses_production_urls() {
    let client = BlofinBuilder::new().build().unwrap();

    assert_eq!(client.config().rest_url(), "https://openapi.blofin.com");
    assert_eq!(
        client.config().ws_url(WsKind::Public),
        "wss://openapi.blofin.com/ws/public"
    );
    assert_eq!(
        client.config().ws_url(WsKind::Copytrading),
        "wss://openapi.blofin.com/ws/copytrading/private"
    );
}

#[test]
fn demo_client_uses_demo_urls() {
    let client = BlofinBuilder::new()
        .with_mode(Mode::Demo)
        .build()
        .unwrap();

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
fn authenticated_client_builds_with_full_credentials() {
    let result = BlofinBuilder::new()
        .with_credentials(
            "test_api_key".to_string(),
            "test_api_secret".to_string(),
            "test_passphrase".to_string(),
        )
        .build();

    assert!(result.is_ok());
}

#[test]
fn missing_passphrase_is_rejected() {
    let result = BlofinBuilder::new()
        .with_credentials(
            "test_api_key".to_string(),
            "test_api_secret".to_string(),
            String::new(),
        )
        .build();

    assert!(matches!(result, Err(BlofinError::Configuration(_))));
}

#[test]
fn signed_headers_carry_the_full_access_set() {
    let signer = HmacSigner::new(test_credentials());
    let headers = signer
        .sign_request(
            "POST",
            "/api/v1/trade/order",
            br#"{"instId":"BTC-USDT"}"#,
            "1700000000000",
            "nonce-1",
        )
        .unwrap();

    assert_eq!(headers.len(), 5);
    assert_eq!(headers["ACCESS-KEY"], "test_api_key");
    assert_eq!(headers["ACCESS-PASSPHRASE"], "test_passphrase");
    assert!(!headers["ACCESS-SIGN"].is_empty());
}

#[tokio::test]
async fn ws_clients_construct_from_shared_config() {
    let config = BlofinConfig::new().with_credentials(test_credentials());

    let public = BlofinWsPublicClient::new(&config);
    public.close().await;

    let private = BlofinWsPrivateClient::new(&config).unwrap();
    private.close().await;
}

#[test]
fn ws_private_client_needs_credentials() {
    let config = BlofinConfig::new();
    assert!(matches!(
        BlofinWsPrivateClient::new(&config),
        Err(BlofinError::Configuration(_))
    ));
}
