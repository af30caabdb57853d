//! JSON payload codec.
//!
//! Leaf-measurement payloads decode to a generic JSON object that the
//! per-domain decoders pick apart. Flat payloads (BLE, RTD and ESP status)
//! decode straight into their typed record.

use serde_json::{Map, Value};
use thiserror::Error;

use sensorhub_core::domain::{BleTemperature, EspStatus, PhyTemperature};
use sensorhub_core::{Domain, SensorRecord};

/// Errors that can occur during payload encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload is not valid JSON for the expected shape.
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload parsed but is not a JSON object.
    #[error("Expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// The domain does not publish flat payloads.
    #[error("{0} is not a flat-payload domain")]
    NotFlat(Domain),

    /// Line protocol needs at least one field.
    #[error("Point for {0} has no fields")]
    NoFields(String),
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode a leaf-measurement payload into its top-level object.
pub fn decode_leaf(payload: &[u8]) -> Result<Map<String, Value>, CodecError> {
    match serde_json::from_slice::<Value>(payload)? {
        Value::Object(map) => Ok(map),
        other => Err(CodecError::NotAnObject(kind(&other))),
    }
}

/// Decode a flat payload directly into the record for `domain`.
pub fn decode_flat(domain: Domain, payload: &[u8]) -> Result<SensorRecord, CodecError> {
    let record = match domain {
        Domain::BleTemperature => serde_json::from_slice::<BleTemperature>(payload)?.into(),
        Domain::PhyTemperature => serde_json::from_slice::<PhyTemperature>(payload)?.into(),
        Domain::EspStatus => serde_json::from_slice::<EspStatus>(payload)?.into(),
        other => return Err(CodecError::NotFlat(other)),
    };
    Ok(record)
}

/// Encode a record for republishing.
pub fn encode_record(record: &SensorRecord) -> Result<String, CodecError> {
    record.to_json().map_err(CodecError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorhub_core::domain::Steering;

    #[test]
    fn test_decode_leaf() {
        let map = decode_leaf(br#"{"$source":"s","value":3.14159}"#).unwrap();
        assert_eq!(map.get("$source"), Some(&Value::String("s".to_string())));
        assert!(map.contains_key("value"));
    }

    #[test]
    fn test_decode_leaf_rejects_garbage() {
        assert!(matches!(decode_leaf(b"{not json"), Err(CodecError::Malformed(_))));
        assert!(matches!(decode_leaf(b""), Err(CodecError::Malformed(_))));
        assert!(matches!(decode_leaf(b"[1,2]"), Err(CodecError::NotAnObject("array"))));
        assert!(matches!(decode_leaf(b"42"), Err(CodecError::NotAnObject("number"))));
    }

    #[test]
    fn test_decode_flat() {
        let record = decode_flat(
            Domain::BleTemperature,
            br#"{"MAC":"A4:C1:38:00:11:22","TempF":"71.6"}"#,
        )
        .unwrap();
        assert_eq!(record.domain(), Domain::BleTemperature);
        assert_eq!(record.mac(), Some("A4:C1:38:00:11:22"));

        let record = decode_flat(Domain::EspStatus, br#"{"MAC":"aa","BLEEnabled":true}"#).unwrap();
        assert_eq!(record.domain(), Domain::EspStatus);

        assert!(matches!(
            decode_flat(Domain::PhyTemperature, b"nope"),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            decode_flat(Domain::Wind, b"{}"),
            Err(CodecError::NotFlat(Domain::Wind))
        ));
    }

    #[test]
    fn test_encode_record_uses_wire_names() {
        let record = SensorRecord::from(Steering {
            autopilot_state: "engaged".to_string(),
            ..Default::default()
        });
        let json = encode_record(&record).unwrap();
        assert_eq!(json, r#"{"AutoPilotState":"engaged"}"#);
    }
}
