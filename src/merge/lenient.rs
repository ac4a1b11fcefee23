//! A `serde_json::Value` deserializer that coerces strings on demand.
//!
//! Query strings, path variables and form bodies carry every value as a
//! string. `Lenient` lets those land in typed fields: a string becomes a
//! bool or number when the target asks for one, a scalar becomes a one
//! element list, and a list feeding a scalar yields its last element.

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Unexpected, Visitor};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Value};

use super::apply::parse_bool;

/// Deserialize `T` from `value`, coercing strings where needed.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    T::deserialize(Lenient(value))
}

#[derive(Debug, Clone)]
pub struct Lenient(pub Value);

impl Lenient {
    /// The value a scalar target should see.
    fn scalar(self) -> Value {
        match self.0 {
            Value::Array(mut items) if !items.is_empty() => items.pop().unwrap_or(Value::Null),
            other => other,
        }
    }
}

fn invalid(raw: &str, expected: &'static str) -> serde_json::Error {
    de::Error::invalid_value(Unexpected::Str(raw), &expected)
}

fn visit_array<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> Result<V::Value, serde_json::Error> {
    let mut seq = SeqDeserializer::<_, serde_json::Error>::new(items.into_iter().map(Lenient));
    let value = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(value)
}

fn visit_object<'de, V: Visitor<'de>>(
    map: Map<String, Value>,
    visitor: V,
) -> Result<V::Value, serde_json::Error> {
    let mut access: MapDeserializer<'de, _, serde_json::Error> =
        MapDeserializer::new(map.into_iter().map(|(k, v)| (k, Lenient(v))));
    let value = visitor.visit_map(&mut access)?;
    access.end()?;
    Ok(value)
}

macro_rules! deserialize_number {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                match self.scalar() {
                    Value::String(s) => {
                        let n: $ty = s
                            .trim()
                            .parse()
                            .map_err(|_| invalid(&s, concat!("a value of type ", stringify!($ty))))?;
                        visitor.$visit(n)
                    }
                    other => other.$method(visitor),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Lenient {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Array(items) => visit_array(items, visitor),
            Value::Object(map) => visit_object(map, visitor),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.scalar() {
            Value::String(s) => match parse_bool(&s) {
                Some(b) => visitor.visit_bool(b),
                None => Err(invalid(&s, "a boolean")),
            },
            other => other.deserialize_bool(visitor),
        }
    }

    deserialize_number! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.scalar() {
            Value::Number(n) => visitor.visit_string(n.to_string()),
            Value::Bool(b) => visitor.visit_string(b.to_string()),
            other => other.deserialize_string(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(Lenient(other)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Array(items) => visit_array(items, visitor),
            Value::Null => visit_array(Vec::new(), visitor),
            other => visit_array(vec![other], visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.scalar() {
            Value::String(s) => {
                visitor.visit_enum(IntoDeserializer::<'de, serde_json::Error>::into_deserializer(s))
            }
            other => other.deserialize_enum(name, variants, visitor),
        }
    }

    forward_to_deserialize_any! {
        i128 u128 bytes byte_buf unit unit_struct map struct
        identifier ignored_any tuple_struct
    }
}

impl<'de> IntoDeserializer<'de, serde_json::Error> for Lenient {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Kind {
        #[default]
        Book,
        Film,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Query {
        id: u64,
        ratio: f32,
        active: bool,
        name: String,
        tags: Vec<String>,
        ids: Vec<i32>,
        limit: Option<u16>,
        kind: Kind,
        filter: Filter,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Filter {
        label: String,
        min: i64,
    }

    #[test]
    fn test_strings_coerced_to_fields() {
        let q: Query = from_value(json!({
            "id": "42",
            "ratio": " 0.5",
            "active": "t",
            "name": 7,
            "tags": "solo",
            "ids": ["1", "2"],
            "limit": "10",
            "kind": "film",
            "filter": {"label": true, "min": "-3"},
            "unknown": "ignored"
        }))
        .unwrap();

        assert_eq!(
            q,
            Query {
                id: 42,
                ratio: 0.5,
                active: true,
                name: "7".into(),
                tags: vec!["solo".into()],
                ids: vec![1, 2],
                limit: Some(10),
                kind: Kind::Film,
                filter: Filter {
                    label: "true".into(),
                    min: -3
                },
            }
        );
    }

    #[test]
    fn test_last_element_feeds_scalar() {
        let q: Query = from_value(json!({"id": ["1", "2"], "name": ["a", "b"]})).unwrap();
        assert_eq!(q.id, 2);
        assert_eq!(q.name, "b");
    }

    #[test]
    fn test_null_option_and_native_values() {
        let q: Query = from_value(json!({"limit": null, "id": 9, "active": false})).unwrap();
        assert_eq!(q.limit, None);
        assert_eq!(q.id, 9);
        assert!(!q.active);
    }

    #[test]
    fn test_invalid_string_rejected() {
        let err = from_value::<Query>(json!({"id": "abc"})).unwrap_err();
        assert!(err.to_string().contains("u64"));
        assert!(from_value::<Query>(json!({"active": "maybe"})).is_err());
        assert!(from_value::<Query>(json!({"id": "-1"})).is_err());
    }
}
