//! Static attribute schemas
//!
//! A [`ResourceSchema`] is the typed counterpart of a resource's
//! configuration: attribute names, kinds, and declared defaults. Constraint
//! rules consult it for defaults, and misconfigured lookups surface as
//! [`RuleError`] rather than panics.

use crate::constraint::{RuleError, Violation};
use crate::path::AttributePath;
use crate::value::{Attributes, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Bool,
    Int,
    Set,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "a string",
            Self::Bool => "a bool",
            Self::Int => "an integer",
            Self::Set => "a set of strings",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    String(&'static str),
    Bool(bool),
    Int(i64),
}

impl DefaultValue {
    pub const fn kind(&self) -> AttributeKind {
        match self {
            Self::String(_) => AttributeKind::String,
            Self::Bool(_) => AttributeKind::Bool,
            Self::Int(_) => AttributeKind::Int,
        }
    }

    /// Textual form used in plans and records
    pub fn render(&self) -> String {
        match self {
            Self::String(s) => (*s).to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSchema {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
}

impl AttributeSchema {
    pub const fn required(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
        }
    }

    #[must_use]
    pub const fn with_default(self, default: DefaultValue) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }
}

#[derive(Debug)]
pub struct ResourceSchema {
    pub resource: &'static str,
    pub attributes: &'static [AttributeSchema],
}

impl ResourceSchema {
    pub const fn new(resource: &'static str, attributes: &'static [AttributeSchema]) -> Self {
        Self {
            resource,
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Look up an attribute a rule depends on
    pub fn lookup(&self, name: &str) -> Result<&AttributeSchema, RuleError> {
        self.attribute(name).ok_or_else(|| RuleError::UnknownAttribute {
            resource: self.resource,
            attribute: name.to_string(),
        })
    }

    /// Look up an attribute and check its declared kind
    pub fn expect_kind(&self, name: &str, kind: AttributeKind) -> Result<&AttributeSchema, RuleError> {
        let attr = self.lookup(name)?;
        if attr.kind == kind {
            Ok(attr)
        } else {
            Err(RuleError::TypeMismatch {
                resource: self.resource,
                attribute: name.to_string(),
                expected: kind,
                declared: attr.kind,
            })
        }
    }

    fn missing_default(&self, name: &str) -> RuleError {
        RuleError::MissingDefault {
            resource: self.resource,
            attribute: name.to_string(),
        }
    }

    fn mismatched_default(&self, name: &str, expected: AttributeKind, found: DefaultValue) -> RuleError {
        RuleError::TypeMismatch {
            resource: self.resource,
            attribute: name.to_string(),
            expected,
            declared: found.kind(),
        }
    }

    pub fn default_string(&self, name: &str) -> Result<&'static str, RuleError> {
        match self.expect_kind(name, AttributeKind::String)?.default {
            Some(DefaultValue::String(s)) => Ok(s),
            Some(other) => Err(self.mismatched_default(name, AttributeKind::String, other)),
            None => Err(self.missing_default(name)),
        }
    }

    pub fn default_bool(&self, name: &str) -> Result<bool, RuleError> {
        match self.expect_kind(name, AttributeKind::Bool)?.default {
            Some(DefaultValue::Bool(b)) => Ok(b),
            Some(other) => Err(self.mismatched_default(name, AttributeKind::Bool, other)),
            None => Err(self.missing_default(name)),
        }
    }

    /// Replace null attributes with their declared defaults
    pub fn apply_defaults(&self, attributes: &mut Attributes) {
        for attr in self.attributes {
            let Some(default) = attr.default else {
                continue;
            };
            match attributes.get_mut(attr.name) {
                Some(value) if value.is_null() => *value = Value::Known(default.render()),
                None => attributes.set(attr.name, Value::Known(default.render())),
                Some(_) => {}
            }
        }
    }

    /// Violations for required attributes that are null
    pub fn missing_required(&self, attributes: &Attributes) -> Vec<Violation> {
        self.attributes
            .iter()
            .filter(|a| a.required)
            .filter(|a| attributes.get(a.name).is_none_or(Value::is_null))
            .map(|a| {
                Violation::new(
                    AttributePath::root(a.name),
                    "Missing required attribute",
                    format!("`{}` must be set on every {}", a.name, self.resource),
                )
            })
            .collect()
    }
}
