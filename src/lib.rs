//! Rust SDK for the BloFin cryptocurrency exchange.
//!
//! The crate is organized around a transport kernel and thin endpoint
//! facades:
//!
//! - [`core::kernel`] holds the protocol layer: HMAC request signing, the
//!   reqwest-based REST transport with transient-failure retry, and the
//!   WebSocket transport seam.
//! - [`rest`] contains the typed endpoint facades (market, account, trading,
//!   affiliate, copytrading).
//! - [`ws`] contains the WebSocket session state machine with subscription
//!   replay, heartbeat and reconnection, plus per-endpoint-kind clients.
//!
//! # REST example
//!
//! ```rust,no_run
//! use blofin::{BlofinClient, Mode};
//!
//! # async fn example() -> Result<(), blofin::BlofinError> {
//! let client = BlofinClient::builder()
//!     .with_credentials(
//!         "api_key".to_string(),
//!         "api_secret".to_string(),
//!         "passphrase".to_string(),
//!     )
//!     .with_mode(Mode::Demo)
//!     .build()?;
//!
//! let tickers = client.market.get_tickers(Some("BTC-USDT")).await?;
//! let balance = client.account.get_account_balance().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # WebSocket example
//!
//! ```rust,no_run
//! use blofin::{BlofinConfig, BlofinWsPublicClient};
//!
//! # async fn example() -> Result<(), blofin::BlofinError> {
//! let ws = BlofinWsPublicClient::new(&BlofinConfig::new());
//! ws.subscribe_trades("BTC-USDT", |frame| {
//!     println!("trade push: {}", frame.data);
//! })?;
//! ws.connect().await?;
//! # Ok(())
//! # }
//! ```
pub mod client;
pub mod core;
pub mod logging;
pub mod rest;
pub mod ws;

pub use client::{BlofinBuilder, BlofinClient};
pub use core::config::{BlofinConfig, Credentials, Mode, WsKind};
pub use core::errors::BlofinError;
pub use ws::{
    BlofinWsCopytradingClient, BlofinWsPrivateClient, BlofinWsPublicClient, BookDepth,
    ConnectionState, SessionEvent, WsDataFrame,
};
