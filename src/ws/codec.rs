use crate::core::errors::BlofinError;
use crate::core::kernel::LoginArgs;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tokio_tungstenite::tungstenite::Message;

/// Channel identity of a frame: the channel name plus its string parameters
/// (e.g. `instId`). Subscription identity is the (channel, params) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelArg {
    pub channel: String,
    pub params: BTreeMap<String, String>,
}

impl ChannelArg {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("channel".to_string(), Value::String(self.channel.clone()));
        for (key, value) in &self.params {
            map.insert(key.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }

    fn from_json(value: &Value) -> Result<Self, BlofinError> {
        let obj = value
            .as_object()
            .ok_or_else(|| BlofinError::Protocol("channel arg is not an object".to_string()))?;

        let channel = obj
            .get("channel")
            .and_then(Value::as_str)
            .ok_or_else(|| BlofinError::Protocol("channel arg missing channel".to_string()))?
            .to_string();

        let params = obj
            .iter()
            .filter(|(key, _)| key.as_str() != "channel")
            .filter_map(|(key, value)| {
                value.as_str().map(|v| (key.clone(), v.to_string()))
            })
            .collect();

        Ok(Self { channel, params })
    }
}

/// A data push: `{arg: {channel, ...}, action?, data}`.
#[derive(Debug, Clone)]
pub struct WsDataFrame {
    pub arg: ChannelArg,
    /// `snapshot` or `update` on channels that distinguish the two.
    pub action: Option<String>,
    pub data: Value,
}

/// Decoded inbound frame.
#[derive(Debug, Clone)]
pub enum WsFrame {
    Pong,
    LoginOk,
    LoginFailed { code: String, message: String },
    SubscribeAck(ChannelArg),
    UnsubscribeAck(ChannelArg),
    ErrorEvent { code: String, message: String },
    Data(WsDataFrame),
}

/// Encoder/decoder for the exchange's WebSocket frame shapes.
///
/// Outbound frames are `{op, args}` JSON text plus the literal `"ping"`
/// heartbeat; inbound frames are `"pong"`, `{event, ...}` control frames and
/// `{arg, data}` pushes.
#[derive(Debug, Default)]
pub struct BlofinCodec;

impl BlofinCodec {
    pub fn new() -> Self {
        Self
    }

    pub fn encode_login(&self, args: &LoginArgs) -> Result<Message, BlofinError> {
        let frame = json!({ "op": "login", "args": [args] });
        Ok(Message::Text(serde_json::to_string(&frame)?))
    }

    pub fn encode_subscribe(&self, arg: &ChannelArg) -> Result<Message, BlofinError> {
        let frame = json!({ "op": "subscribe", "args": [arg.to_json()] });
        Ok(Message::Text(serde_json::to_string(&frame)?))
    }

    pub fn encode_unsubscribe(&self, arg: &ChannelArg) -> Result<Message, BlofinError> {
        let frame = json!({ "op": "unsubscribe", "args": [arg.to_json()] });
        Ok(Message::Text(serde_json::to_string(&frame)?))
    }

    pub fn encode_ping(&self) -> Message {
        Message::Text("ping".to_string())
    }

    /// Decode an inbound message.
    ///
    /// Returns `Ok(None)` for frames the codec ignores (non-text control
    /// frames handled at transport level). Malformed text is a
    /// [`BlofinError::Protocol`]; the session logs and drops it.
    pub fn decode(&self, message: Message) -> Result<Option<WsFrame>, BlofinError> {
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(data) => String::from_utf8(data).map_err(|e| {
                BlofinError::Protocol(format!("invalid UTF-8 in binary frame: {e}"))
            })?,
            _ => return Ok(None),
        };

        if text == "pong" {
            return Ok(Some(WsFrame::Pong));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| BlofinError::Protocol(format!("malformed frame: {e}")))?;

        if let Some(event) = value.get("event").and_then(Value::as_str) {
            return Self::decode_event(event, &value).map(Some);
        }

        if let Some(arg) = value.get("arg") {
            let arg = ChannelArg::from_json(arg)?;
            let action = value
                .get("action")
                .and_then(Value::as_str)
                .map(ToString::to_string);
            let data = value
                .get("data")
                .cloned()
                .ok_or_else(|| BlofinError::Protocol("data frame missing data".to_string()))?;

            return Ok(Some(WsFrame::Data(WsDataFrame { arg, action, data })));
        }

        Err(BlofinError::Protocol(format!("unknown frame shape: {text}")))
    }

    fn decode_event(event: &str, value: &Value) -> Result<WsFrame, BlofinError> {
        let code = value
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("0")
            .to_string();
        let message = value
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match event {
            "login" => {
                if code == "0" {
                    Ok(WsFrame::LoginOk)
                } else {
                    Ok(WsFrame::LoginFailed { code, message })
                }
            }
            "subscribe" => {
                let arg = value
                    .get("arg")
                    .map(ChannelArg::from_json)
                    .transpose()?
                    .ok_or_else(|| {
                        BlofinError::Protocol("subscribe ack missing arg".to_string())
                    })?;
                Ok(WsFrame::SubscribeAck(arg))
            }
            "unsubscribe" => {
                let arg = value
                    .get("arg")
                    .map(ChannelArg::from_json)
                    .transpose()?
                    .ok_or_else(|| {
                        BlofinError::Protocol("unsubscribe ack missing arg".to_string())
                    })?;
                Ok(WsFrame::UnsubscribeAck(arg))
            }
            "error" => Ok(WsFrame::ErrorEvent { code, message }),
            other => Err(BlofinError::Protocol(format!("unknown event: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_subscribe_includes_channel_and_params() {
        let codec = BlofinCodec::new();
        let arg = ChannelArg::new("trades").with_param("instId", "BTC-USDT");

        let message = codec.encode_subscribe(&arg).unwrap();
        let Message::Text(text) = message else {
            panic!("expected text frame");
        };

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["op"], "subscribe");
        assert_eq!(value["args"][0]["channel"], "trades");
        assert_eq!(value["args"][0]["instId"], "BTC-USDT");
    }

    #[test]
    fn encode_unsubscribe_uses_unsubscribe_op() {
        let codec = BlofinCodec::new();
        let arg = ChannelArg::new("account");

        let Message::Text(text) = codec.encode_unsubscribe(&arg).unwrap() else {
            panic!("expected text frame");
        };
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["op"], "unsubscribe");
        assert_eq!(value["args"][0]["channel"], "account");
        assert!(value["args"][0].get("instId").is_none());
    }

    #[test]
    fn decode_pong() {
        let codec = BlofinCodec::new();
        let frame = codec
            .decode(Message::Text("pong".to_string()))
            .unwrap()
            .unwrap();
        assert!(matches!(frame, WsFrame::Pong));
    }

    #[test]
    fn decode_login_result() {
        let codec = BlofinCodec::new();

        let ok = codec
            .decode(Message::Text(r#"{"event":"login","code":"0"}"#.to_string()))
            .unwrap()
            .unwrap();
        assert!(matches!(ok, WsFrame::LoginOk));

        let failed = codec
            .decode(Message::Text(
                r#"{"event":"login","code":"1","msg":"invalid sign"}"#.to_string(),
            ))
            .unwrap()
            .unwrap();
        match failed {
            WsFrame::LoginFailed { code, message } => {
                assert_eq!(code, "1");
                assert_eq!(message, "invalid sign");
            }
            other => panic!("expected login failure, got {other:?}"),
        }
    }

    #[test]
    fn decode_error_event() {
        let codec = BlofinCodec::new();
        let frame = codec
            .decode(Message::Text(
                r#"{"event":"error","code":"60012","msg":"Invalid request"}"#.to_string(),
            ))
            .unwrap()
            .unwrap();
        match frame {
            WsFrame::ErrorEvent { code, message } => {
                assert_eq!(code, "60012");
                assert_eq!(message, "Invalid request");
            }
            other => panic!("expected error event, got {other:?}"),
        }
    }

    #[test]
    fn decode_data_frame() {
        let codec = BlofinCodec::new();
        let text = r#"{
            "arg": {"channel": "trades", "instId": "ETH-USDT"},
            "data": [{"instId": "ETH-USDT", "tradeId": "106074994", "price": "1640.4"}]
        }"#;

        let frame = codec.decode(Message::Text(text.to_string())).unwrap().unwrap();
        match frame {
            WsFrame::Data(data) => {
                assert_eq!(data.arg.channel, "trades");
                assert_eq!(data.arg.params.get("instId").unwrap(), "ETH-USDT");
                assert!(data.action.is_none());
                assert_eq!(data.data[0]["tradeId"], "106074994");
            }
            other => panic!("expected data frame, got {other:?}"),
        }
    }

    #[test]
    fn decode_snapshot_action() {
        let codec = BlofinCodec::new();
        let text = r#"{
            "arg": {"channel": "books", "instId": "BTC-USDT"},
            "action": "snapshot",
            "data": {"asks": [], "bids": [], "ts": "1696670727520"}
        }"#;

        let frame = codec.decode(Message::Text(text.to_string())).unwrap().unwrap();
        match frame {
            WsFrame::Data(data) => assert_eq!(data.action.as_deref(), Some("snapshot")),
            other => panic!("expected data frame, got {other:?}"),
        }
    }

    #[test]
    fn malformed_frame_is_a_protocol_error() {
        let codec = BlofinCodec::new();
        let err = codec
            .decode(Message::Text("{not json".to_string()))
            .unwrap_err();
        assert!(matches!(err, BlofinError::Protocol(_)));
    }
}
