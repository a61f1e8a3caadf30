//! Structural validation of JSON frames.
//!
//! A [`Schema`] describes the shape a parsed value must have: types, required fields, enumerations,
//! string patterns, integer ranges and fixed values. Validation reports the first violation found,
//! together with the JSON path where it occurred. Fields not described by an object schema are
//! allowed.

use std::fmt;

use serde_json::Value;

use crate::error::Result;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct SchemaError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum Schema {
    Null,
    Boolean,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// An integer within `min..=max`.
    IntegerRange(i128, i128),
    String,
    /// A string accepted by the predicate; the label names the pattern in error messages.
    Pattern(&'static str, fn(&str) -> bool),
    /// A string from a fixed set.
    Enum(&'static [&'static str]),
    /// Exactly this value. Numbers compare by value, so `0` and `0.0` are the same constant.
    Const(Value),
    /// Either null or the inner schema.
    Nullable(Box<Schema>),
    /// A schema with an additional fixed value, `{"type": ..., "const": ...}`.
    TypedConst(Box<Schema>, Value),
    Array(Box<Schema>),
    Object(Vec<Property>),
}

#[derive(Debug, Clone)]
pub struct Property {
    name: &'static str,
    schema: Schema,
    required: bool,
}

pub fn required(name: &'static str, schema: Schema) -> Property {
    Property {
        name,
        schema,
        required: true,
    }
}

pub fn optional(name: &'static str, schema: Schema) -> Property {
    Property {
        name,
        schema,
        required: false,
    }
}

impl Schema {
    pub fn object(properties: impl IntoIterator<Item = Property>) -> Self {
        Schema::Object(properties.into_iter().collect())
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    pub fn nullable(inner: Schema) -> Self {
        Schema::Nullable(Box::new(inner))
    }

    pub fn typed_const(inner: Schema, value: Value) -> Self {
        Schema::TypedConst(Box::new(inner), value)
    }

    /// An integer that fits the range of `T`.
    pub fn integer_of<T: Into<i128> + Bounded>() -> Self {
        Schema::IntegerRange(T::MIN.into(), T::MAX.into())
    }

    /// Check an already parsed value.
    pub fn check(&self, value: &Value) -> std::result::Result<(), SchemaError> {
        self.check_at(value, &mut Path::root())
    }

    fn check_at(&self, value: &Value, path: &mut Path) -> std::result::Result<(), SchemaError> {
        match self {
            Schema::Null if value.is_null() => Ok(()),
            Schema::Boolean if value.is_boolean() => Ok(()),
            Schema::Number if value.is_number() => Ok(()),
            Schema::Integer if value.is_i64() || value.is_u64() => Ok(()),
            Schema::IntegerRange(min, max) => match as_integer(value) {
                Some(n) if (*min..=*max).contains(&n) => Ok(()),
                Some(n) => Err(path.error(format!("{n} is out of range {min}..={max}"))),
                None => Err(path.error(format!("expected integer, found {}", kind_of(value)))),
            },
            Schema::String if value.is_string() => Ok(()),
            Schema::Pattern(label, matches) => match value.as_str() {
                Some(s) if matches(s) => Ok(()),
                Some(s) => Err(path.error(format!("{s:?} does not match {label}"))),
                None => Err(path.error(format!(
                    "expected {label} string, found {}",
                    kind_of(value)
                ))),
            },
            Schema::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.iter().any(|a| *a == s) => Ok(()),
                _ => Err(path.error(format!("expected one of {allowed:?}, found {value}"))),
            },
            Schema::Const(expected) if same_value(value, expected) => Ok(()),
            Schema::Const(expected) => {
                Err(path.error(format!("expected {expected}, found {value}")))
            }
            Schema::Nullable(_) if value.is_null() => Ok(()),
            Schema::Nullable(inner) => inner.check_at(value, path),
            Schema::TypedConst(inner, expected) => {
                inner.check_at(value, path)?;
                if same_value(value, expected) {
                    Ok(())
                } else {
                    Err(path.error(format!("expected {expected}, found {value}")))
                }
            }
            Schema::Array(items) => {
                let entries = value.as_array().ok_or_else(|| {
                    path.error(format!("expected array, found {}", kind_of(value)))
                })?;
                for (i, entry) in entries.iter().enumerate() {
                    path.push(Segment::Index(i));
                    items.check_at(entry, path)?;
                    path.pop();
                }
                Ok(())
            }
            Schema::Object(properties) => {
                let map = value.as_object().ok_or_else(|| {
                    path.error(format!("expected object, found {}", kind_of(value)))
                })?;

                // a missing field is reported before a bad one
                let missing = properties
                    .iter()
                    .find(|p| p.required && !map.contains_key(p.name));
                if let Some(missing) = missing {
                    return Err(path.error(format!("missing required field {:?}", missing.name)));
                }

                for property in properties {
                    if let Some(field) = map.get(property.name) {
                        path.push(Segment::Field(property.name));
                        property.schema.check_at(field, path)?;
                        path.pop();
                    }
                }
                Ok(())
            }
            _ => Err(path.error(format!(
                "expected {}, found {}",
                self.describe(),
                kind_of(value)
            ))),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Number => "number",
            Schema::Integer | Schema::IntegerRange(..) => "integer",
            Schema::String | Schema::Pattern(..) | Schema::Enum(_) => "string",
            Schema::Const(_) | Schema::TypedConst(..) => "constant",
            Schema::Nullable(_) => "nullable value",
            Schema::Array(_) => "array",
            Schema::Object(_) => "object",
        }
    }
}

/// Integer types whose range an [`Schema::IntegerRange`] can be built from.
pub trait Bounded {
    const MIN: Self;
    const MAX: Self;
}

macro_rules! bounded {
    ($($t:ty),*) => {
        $(impl Bounded for $t {
            const MIN: Self = <$t>::MIN;
            const MAX: Self = <$t>::MAX;
        })*
    };
}

bounded!(u32, u64, i32, i64);

/// Parse `raw` and check it against `schema`, returning the parsed value on success.
pub fn validate(raw: &str, schema: &Schema) -> Result<Value> {
    let value: Value = serde_json::from_str(raw)?;
    schema.check(&value)?;
    Ok(value)
}

fn as_integer(value: &Value) -> Option<i128> {
    value
        .as_i64()
        .map(i128::from)
        .or_else(|| value.as_u64().map(i128::from))
}

#[allow(clippy::float_cmp)]
fn same_value(value: &Value, expected: &Value) -> bool {
    match (value, expected) {
        (Value::Number(a), Value::Number(b)) => match (as_integer(value), as_integer(expected)) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => value == expected,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

enum Segment {
    Field(&'static str),
    Index(usize),
}

struct Path(Vec<Segment>);

impl Path {
    fn root() -> Self {
        Path(Vec::new())
    }

    fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    fn pop(&mut self) {
        self.0.pop();
    }

    fn error(&self, message: String) -> SchemaError {
        SchemaError {
            path: self.to_string(),
            message,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::Error;

    fn sample() -> Schema {
        Schema::object([
            required("id", Schema::Pattern("id", |s| s.len() == 2)),
            required("kind", Schema::Enum(&["IN", "OUT"])),
            optional("count", Schema::Integer),
            optional("linked", Schema::typed_const(Schema::Boolean, json!(false))),
            optional("expired", Schema::typed_const(Schema::Number, json!(0))),
            optional(
                "items",
                Schema::array(Schema::object([required("n", Schema::Number)])),
            ),
            optional("note", Schema::nullable(Schema::String)),
        ])
    }

    #[test]
    fn accepts_matching_value() {
        let raw = json!({
            "id": "ab",
            "kind": "IN",
            "count": 3,
            "linked": false,
            "items": [{"n": 1.5}],
            "note": null,
            "x": 1
        })
        .to_string();
        let value = validate(&raw, &sample()).unwrap();
        assert_eq!(value["count"], 3);
    }

    #[test]
    fn malformed_text_is_not_a_schema_error() {
        assert!(matches!(
            validate("{\"id\":", &sample()),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn reports_missing_field() {
        let err = sample().check(&json!({"id": "ab"})).unwrap_err();
        assert_eq!(err.path, "$");
        assert!(err.message.contains("\"kind\""), "{err}");
    }

    #[test]
    fn reports_first_violation_with_path() {
        let err = sample()
            .check(&json!({"id": "ab", "kind": "IN", "items": [{"n": 1}, {"n": "x"}]}))
            .unwrap_err();
        assert_eq!(err.path, "$.items[1].n");
    }

    #[test]
    fn enforces_constants_enums_and_patterns() {
        let base = json!({"id": "ab", "kind": "IN"});

        let mut linked = base.clone();
        linked["linked"] = json!(true);
        assert_eq!(sample().check(&linked).unwrap_err().path, "$.linked");

        let mut kind = base.clone();
        kind["kind"] = json!("MAYBE");
        assert_eq!(sample().check(&kind).unwrap_err().path, "$.kind");

        let mut id = base;
        id["id"] = json!("abc");
        let err = sample().check(&id).unwrap_err();
        assert!(err.message.contains("does not match id"));
    }

    #[test]
    fn numeric_constants_compare_by_value() {
        let base = json!({"id": "ab", "kind": "IN"});

        for zero in [json!(0), json!(0.0), json!(-0.0)] {
            let mut value = base.clone();
            value["expired"] = zero;
            sample().check(&value).unwrap();
        }

        let mut value = base;
        value["expired"] = json!(0.5);
        assert_eq!(sample().check(&value).unwrap_err().path, "$.expired");
        assert!(Schema::Const(json!(1)).check(&json!(1.0)).is_ok());
        assert!(Schema::Const(json!(1)).check(&json!("1")).is_err());
    }

    #[test]
    fn integer_rejects_fractions() {
        assert!(Schema::Integer.check(&json!(1.5)).is_err());
        assert!(Schema::Integer.check(&json!(-4)).is_ok());
        assert!(Schema::Number.check(&json!(1.5)).is_ok());
    }

    #[test]
    fn integer_ranges() {
        let unsigned = Schema::integer_of::<u32>();
        assert!(unsigned.check(&json!(0)).is_ok());
        assert!(unsigned.check(&json!(u32::MAX)).is_ok());
        assert!(unsigned.check(&json!(-1)).is_err());
        assert!(unsigned.check(&json!(u64::from(u32::MAX) + 1)).is_err());
        assert!(unsigned.check(&json!(1.5)).is_err());

        let signed = Schema::integer_of::<i32>();
        assert!(signed.check(&json!(-5)).is_ok());
        assert!(signed.check(&json!(i64::from(i32::MIN) - 1)).is_err());

        let wide = Schema::integer_of::<u64>();
        assert!(wide.check(&json!(u64::MAX)).is_ok());
        assert!(wide.check(&json!(-1)).is_err());
    }
}
