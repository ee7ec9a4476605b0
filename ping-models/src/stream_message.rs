use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder used when the service does not resolve a location for a target.
pub const UNKNOWN_ADDRESS: &str = "unknown";

const TYPE_KEY: &str = "type";
const FINISHED_TYPE: &str = "finished";

/// First (and, on receive timeout, repeated) message sent on the stream. Grants access to the
/// result feed of exactly one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeMessage {
    pub task_id: String,
    pub task_token: String,
}

impl SubscribeMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A message pushed by the service, classified by its `type` discriminator.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Terminal marker; no further results follow for this job.
    Finished,
    /// Anything else, passed on untouched.
    Event(Map<String, Value>),
}

impl InboundMessage {
    /// Parses a raw payload. Only JSON objects are accepted, everything else (including valid
    /// JSON scalars and arrays) is an error.
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        Self::parse_bytes(raw.as_bytes())
    }

    /// Same as [InboundMessage::parse], for binary frames. Invalid UTF-8 is an error.
    pub fn parse_bytes(raw: &[u8]) -> serde_json::Result<Self> {
        match serde_json::from_slice::<Value>(raw)? {
            Value::Object(map) => Ok(Self::classify(map)),
            other => Err(serde_json::Error::custom(format!(
                "expected a JSON object, got: {}",
                other
            ))),
        }
    }

    fn classify(map: Map<String, Value>) -> Self {
        match map.get(TYPE_KEY).and_then(Value::as_str) {
            Some(FINISHED_TYPE) => Self::Finished,
            _ => Self::Event(map),
        }
    }
}

/// Typed view of one result event. The stream itself hands out raw payloads; this is what
/// consumers usually map them into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingEvent {
    pub ip: String,
    /// Latency as reported, usually milliseconds but may be non-numeric, e.g. `timeout`
    pub result: String,
    #[serde(default = "unknown_address")]
    pub address: String,
}

fn unknown_address() -> String {
    UNKNOWN_ADDRESS.to_string()
}

impl PingEvent {
    pub fn from_payload(payload: &Value) -> serde_json::Result<Self> {
        Self::deserialize(payload)
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn subscribe_serializes_both_fields() -> serde_json::Result<()> {
        // given
        let msg = SubscribeMessage {
            task_id: "abc".to_string(),
            task_token: "0123456789abcdef".to_string(),
        };
        // when
        let raw = msg.to_json()?;
        // then
        let parsed: Value = serde_json::from_str(&raw)?;
        assert_eq!(parsed, json!({"task_id": "abc", "task_token": "0123456789abcdef"}));
        Ok(())
    }

    #[test]
    fn finished_detected() -> serde_json::Result<()> {
        let msg = InboundMessage::parse(r#"{"type":"finished"}"#)?;
        assert_eq!(msg, InboundMessage::Finished);
        Ok(())
    }

    #[test]
    fn other_type_is_event() -> serde_json::Result<()> {
        let msg = InboundMessage::parse(r#"{"type":"progress","done":3}"#)?;
        assert_that!(matches!(msg, InboundMessage::Event(_))).is_true();
        Ok(())
    }

    #[test]
    fn result_is_event_with_all_fields() -> serde_json::Result<()> {
        // given
        let raw = r#"{"ip":"8.8.8.8","result":"15","address":"Mountain View"}"#;
        // when
        let msg = InboundMessage::parse(raw)?;
        // then
        let InboundMessage::Event(map) = msg else {
            panic!("expected an event, got {:?}", msg);
        };
        assert_eq!(Value::Object(map), serde_json::from_str::<Value>(raw)?);
        Ok(())
    }

    #[test]
    fn garbage_rejected() {
        assert_that!(InboundMessage::parse("not json")).is_err();
        assert_that!(InboundMessage::parse("[1, 2]")).is_err();
        assert_that!(InboundMessage::parse("42")).is_err();
    }

    #[test]
    fn binary_payload_must_be_utf8() -> serde_json::Result<()> {
        // given
        let valid = br#"{"ip":"1.1.1.1","result":"5"}"#;
        let broken = b"{\"ip\":\"1.1.1.1\",\"address\":\"X\xff\"}";
        // when
        let parsed = InboundMessage::parse_bytes(valid)?;
        // then
        assert_that!(matches!(parsed, InboundMessage::Event(_))).is_true();
        assert_that!(InboundMessage::parse_bytes(broken)).is_err();
        Ok(())
    }

    #[test]
    fn event_address_defaults_to_unknown() -> serde_json::Result<()> {
        // given
        let payload = json!({"ip": "1.1.1.1", "result": "timeout"});
        // when
        let event = PingEvent::from_payload(&payload)?;
        // then
        assert_eq!(event.address, UNKNOWN_ADDRESS);
        assert_eq!(event.result, "timeout");
        Ok(())
    }

    #[test]
    fn event_without_ip_rejected() {
        let payload = json!({"result": "12"});
        assert_that!(PingEvent::from_payload(&payload)).is_err();
    }
}
