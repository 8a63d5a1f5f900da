//! Tri-state attribute values
//!
//! Every attribute seen while planning is either known, explicitly null, or
//! not yet determined. Unknown values exist only at plan time: every path
//! that persists a value rejects them.

use crate::error::{Error, Result};
use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Literal the orchestrator uses for a value that is unknown at plan time
pub const UNKNOWN_MARKER: &str = "(known after apply)";

/// An attribute value that is known, null, or not yet known
///
/// Equality follows the planning rules: values with different tags are never
/// equal, and `Unknown` is not equal to anything, itself included. Use
/// [`Value::semantic_eq`] when the caller needs to tell "different" apart
/// from "not yet comparable".
#[derive(Debug, Clone)]
pub enum Value<T> {
    /// Concrete value
    Known(T),
    /// Explicitly absent
    Null,
    /// Not resolved until apply
    Unknown,
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Self::Null
    }
}

impl<T> Value<T> {
    pub const fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Borrow the known value, if any
    pub const fn as_known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Take the known value, if any
    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_ref(&self) -> Value<&T> {
        match self {
            Self::Known(v) => Value::Known(v),
            Self::Null => Value::Null,
            Self::Unknown => Value::Unknown,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Value<U> {
        match self {
            Self::Known(v) => Value::Known(f(v)),
            Self::Null => Value::Null,
            Self::Unknown => Value::Unknown,
        }
    }

    /// Substitute `default` for `Null`; `Unknown` stays unknown
    pub fn or_default(self, default: T) -> Self {
        match self {
            Self::Null => Self::Known(default),
            other => other,
        }
    }

    /// Render into the textual form used by plans and records
    pub fn render_with<F: FnOnce(&T) -> String>(&self, f: F) -> Value<String> {
        match self {
            Self::Known(v) => Value::Known(f(v)),
            Self::Null => Value::Null,
            Self::Unknown => Value::Unknown,
        }
    }
}

impl<T: PartialEq> Value<T> {
    /// Compare two values, returning `None` while either side is unknown
    pub fn semantic_eq(&self, other: &Self) -> Option<bool> {
        match (self, other) {
            (Self::Unknown, _) | (_, Self::Unknown) => None,
            (Self::Known(a), Self::Known(b)) => Some(a == b),
            (Self::Null, Self::Null) => Some(true),
            _ => Some(false),
        }
    }
}

impl<T: ToString> Value<T> {
    pub fn render(&self) -> Value<String> {
        self.render_with(ToString::to_string)
    }
}

impl<T: PartialEq> PartialEq for Value<T> {
    fn eq(&self, other: &Self) -> bool {
        self.semantic_eq(other).unwrap_or(false)
    }
}

impl<T> From<Option<T>> for Value<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }
}

impl<T: fmt::Display> fmt::Display for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
            Self::Unknown => write!(f, "{UNKNOWN_MARKER}"),
        }
    }
}

impl<T: Serialize> Serialize for Value<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Known(v) => v.serialize(serializer),
            Self::Null => serializer.serialize_none(),
            Self::Unknown => Err(ser::Error::custom(
                "unknown values are plan-time only and cannot be persisted",
            )),
        }
    }
}

/// Matches only the [`UNKNOWN_MARKER`] string
struct UnknownMarker;

impl<'de> Deserialize<'de> for UnknownMarker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == UNKNOWN_MARKER {
            Ok(Self)
        } else {
            Err(de::Error::custom("not the unknown marker"))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr<T> {
    Unknown(UnknownMarker),
    Known(T),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Value<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Option::<Repr<T>>::deserialize(deserializer)? {
            None => Self::Null,
            Some(Repr::Unknown(_)) => Self::Unknown,
            Some(Repr::Known(v)) => Self::Known(v),
        })
    }
}

/// Persisted form of a resource: only known values survive
pub type Record = BTreeMap<String, String>;

/// Plan-time projection of a resource, attribute name to textual value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(BTreeMap<String, Value<String>>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value<String>) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value<String>) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value<String>> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value<String>> {
        self.0.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value<String>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_unknown(&self) -> bool {
        self.0.values().any(Value::is_unknown)
    }

    /// Convert to a persistable record
    ///
    /// Null attributes are omitted. Fails on the first unknown attribute.
    pub fn to_record(&self) -> Result<Record> {
        let mut record = Record::new();
        for (name, value) in &self.0 {
            match value {
                Value::Known(v) => {
                    record.insert(name.clone(), v.clone());
                }
                Value::Null => {}
                Value::Unknown => {
                    return Err(Error::UnknownValue {
                        attribute: name.clone(),
                    });
                }
            }
        }
        Ok(record)
    }

    pub fn from_record(record: Record) -> Self {
        Self(
            record
                .into_iter()
                .map(|(k, v)| (k, Value::Known(v)))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value<String>)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Value<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
