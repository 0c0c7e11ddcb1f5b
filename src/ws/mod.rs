/// WebSocket layer: frame codec, session state machine and channel clients.
pub mod client;
pub mod codec;
pub mod session;

pub use client::{
    BlofinWsCopytradingClient, BlofinWsPrivateClient, BlofinWsPublicClient, BookDepth,
};
pub use codec::{BlofinCodec, ChannelArg, WsDataFrame, WsFrame};
pub use session::{
    ConnectionState, SessionEvent, WsHandle, WsSession, WsSessionConfig,
};
