//! Typed codec for opaque event payloads.
//!
//! The envelope stores payloads as opaque bytes keyed by the event type;
//! this module is the single place where those bytes are produced and
//! interpreted. Payloads are JSON with stable snake_case field names.
//! Decoding ignores unknown fields so that older readers can consume
//! events written by newer writers.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CorruptEventError;
use crate::event::Event;

/// A payload schema bound to exactly one event type tag.
pub trait Payload: Serialize + DeserializeOwned {
    /// The event type tag this payload is stored under.
    const EVENT_TYPE: &'static str;
}

/// Encode a payload to its stored byte form.
///
/// # Errors
///
/// Returns the serializer error if the payload cannot be encoded.
pub fn encode<P: Payload>(payload: &P) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(payload)
}

/// Decode an event's payload as `P`.
///
/// # Errors
///
/// Returns [`CorruptEventError`] if the event type does not match `P` or the
/// bytes are not a structurally valid `P`.
pub fn decode<P: Payload>(event: &Event) -> Result<P, CorruptEventError> {
    if event.event_type != P::EVENT_TYPE {
        return Err(CorruptEventError {
            seq: event.seq,
            event_type: event.event_type.clone(),
            message: format!("payload decoder for {} used on wrong event type", P::EVENT_TYPE),
        });
    }
    serde_json::from_slice(&event.payload).map_err(|e| CorruptEventError {
        seq: event.seq,
        event_type: event.event_type.clone(),
        message: format!("decode payload: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde::Deserialize;

    use super::*;
    use crate::event::NewEvent;
    use crate::ids::CampaignId;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ping {
        count: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    }

    impl Payload for Ping {
        const EVENT_TYPE: &'static str = "test.ping";
    }

    fn stored(event_type: &str, payload: &[u8]) -> Event {
        let mut event = NewEvent::new(CampaignId::new(), event_type, Utc::now());
        event.payload = payload.to_vec();
        event.into_stored(3)
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let event = stored("test.ping", br#"{"count":2,"added_later":true}"#);
        let ping: Result<Ping, _> = decode(&event);
        assert_eq!(ping.ok(), Some(Ping { count: 2, note: None }));
    }

    #[test]
    fn absent_optional_is_not_serialized() {
        let bytes = encode(&Ping { count: 0, note: None }).unwrap_or_default();
        assert_eq!(bytes, br#"{"count":0}"#.to_vec());
    }

    #[test]
    fn malformed_bytes_are_corrupt() {
        let event = stored("test.ping", b"{broken");
        let err = decode::<Ping>(&event).err();
        assert!(err.is_some_and(|e| e.seq == 3 && e.message.contains("decode payload")));
    }

    #[test]
    fn wrong_type_is_corrupt() {
        let event = stored("test.pong", br#"{"count":1}"#);
        assert!(decode::<Ping>(&event).is_err());
    }
}
