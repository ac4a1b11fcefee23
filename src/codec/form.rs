//! URL-encoded form codec.
//!
//! Decoding yields an object of strings; repeated keys become arrays.
//! Scalars are left as strings and coerced later against the endpoint's
//! argument type. Encoding only accepts flat objects.

use serde_json::{Map, Value};
use url::form_urlencoded;

use super::{Codec, CodecError};

#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

impl Codec for FormCodec {
    fn name(&self) -> &'static str {
        "form"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let mut map = Map::new();
        for (key, value) in form_urlencoded::parse(bytes) {
            let value = Value::String(value.into_owned());
            match map.get_mut(key.as_ref()) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(key.into_owned(), value);
                }
            }
        }
        Ok(Value::Object(map))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let Value::Object(map) = value else {
            return Err(CodecError::Encode("form payload must be an object".into()));
        };
        let mut out = form_urlencoded::Serializer::new(String::new());
        for (key, value) in map {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        out.append_pair(key, &scalar(key, item)?);
                    }
                }
                other => {
                    out.append_pair(key, &scalar(key, other)?);
                }
            }
        }
        Ok(out.finish().into_bytes())
    }
}

fn scalar(key: &str, value: &Value) -> Result<String, CodecError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(CodecError::Encode(format!("field {key:?} is not a scalar"))),
    }
}
