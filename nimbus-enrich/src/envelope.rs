//! Normalizer for the `{body: ...}` envelope some backends wrap around
//! their JSON responses.
//!
//! The same pattern recurs at every remote boundary: the payload arrives
//! either flat, nested under `body` as an object, or nested under `body` as
//! a JSON-encoded string. One classification here replaces ad hoc shape
//! checks at each call site. Exactly one envelope layer is unwrapped and
//! string bodies are parsed exactly once.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The response itself is the payload.
    Direct(Value),
    /// `body` held a nested JSON object.
    EnvelopeObject(Value),
    /// `body` held a JSON-encoded string, parsed here.
    EnvelopeString(Value),
}

impl Payload {
    pub fn classify(raw: Value) -> Result<Self, serde_json::Error> {
        let body = match raw {
            Value::Object(mut map) => match map.remove("body") {
                Some(body) => body,
                None => return Ok(Self::Direct(Value::Object(map))),
            },
            other => return Ok(Self::Direct(other)),
        };
        match body {
            Value::String(s) => Ok(Self::EnvelopeString(serde_json::from_str(&s)?)),
            other => Ok(Self::EnvelopeObject(other)),
        }
    }

    /// The effective JSON body, whatever shape it arrived in.
    pub fn into_value(self) -> Value {
        match self {
            Self::Direct(v) | Self::EnvelopeObject(v) | Self::EnvelopeString(v) => v,
        }
    }
}

/// Classify and unwrap in one step.
pub fn unwrap_body(raw: Value) -> Result<Value, serde_json::Error> {
    Payload::classify(raw).map(Payload::into_value)
}
