/// Transport kernel: signing, REST transport and the WebSocket seam.
///
/// The kernel contains the protocol layer only - no endpoint knowledge.
/// Endpoint facades supply a path, method and body; the kernel turns them
/// into a signed request. The WebSocket session in [`crate::ws`] drives the
/// [`WsTransport`] seam defined here.
pub mod rest;
pub mod signer;
pub mod ws;

// Re-export key types for convenience
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{generate_nonce, timestamp_ms, HmacSigner, LoginArgs, Signer};
pub use ws::{TungsteniteWs, WsTransport};
