//! Cross-attribute constraint rules
//!
//! Rules evaluate a typed resource configuration whose attributes are
//! [`Value`]s. They follow a few shared conventions:
//!
//! - A rule never judges an `Unknown` input; it passes until the value is
//!   resolved.
//! - A `Null` toggle or selector counts as false or "not selected".
//! - Every violation names the attribute a user has to change.
//! - A rule that references an attribute the schema does not declare, or
//!   declares with another kind, fails with [`RuleError`]. That is a provider
//!   bug, never a user mistake.
//!
//! [`ConstraintSet`] runs all rules and reports every violation at once.
//! Any `Fn(&C) -> Result<Vec<Violation>, RuleError>` closure is a rule too.

use crate::path::AttributePath;
use crate::schema::{AttributeKind, ResourceSchema};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Results
// ============================================================================

/// A user-facing configuration error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub path: AttributePath,
    pub title: String,
    pub detail: String,
}

impl Violation {
    pub fn new(path: AttributePath, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            path,
            title: title.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.path, self.title, self.detail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A diagnostic in the shape the orchestrator reports to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<AttributePath>,
}

impl From<Violation> for Diagnostic {
    fn from(violation: Violation) -> Self {
        Self {
            severity: Severity::Error,
            summary: violation.title,
            detail: violation.detail,
            attribute: Some(violation.path),
        }
    }
}

impl From<&RuleError> for Diagnostic {
    fn from(err: &RuleError) -> Self {
        Self {
            severity: Severity::Error,
            summary: "Provider rule misconfigured".to_string(),
            detail: err.to_string(),
            attribute: None,
        }
    }
}

/// A rule that cannot be evaluated because it disagrees with its schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error(
        "rule references `{attribute}`, which the {resource} schema does not declare (provider bug)"
    )]
    UnknownAttribute {
        resource: &'static str,
        attribute: String,
    },

    #[error(
        "rule expects `{attribute}` of the {resource} schema to be {expected}, but it is {declared} (provider bug)"
    )]
    TypeMismatch {
        resource: &'static str,
        attribute: String,
        expected: AttributeKind,
        declared: AttributeKind,
    },

    #[error(
        "rule needs the default of `{attribute}`, but the {resource} schema declares none (provider bug)"
    )]
    MissingDefault {
        resource: &'static str,
        attribute: String,
    },
}

// ============================================================================
// Rule framework
// ============================================================================

/// Typed accessor for one attribute of a configuration `C`
pub struct Field<C, T> {
    name: &'static str,
    get: fn(&C) -> &Value<T>,
}

impl<C, T> Clone for Field<C, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, T> Copy for Field<C, T> {}

impl<C, T> fmt::Debug for Field<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.name).finish()
    }
}

impl<C, T> Field<C, T> {
    pub const fn new(name: &'static str, get: fn(&C) -> &Value<T>) -> Self {
        Self { name, get }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub fn get<'c>(&self, config: &'c C) -> &'c Value<T> {
        (self.get)(config)
    }

    pub fn path(&self) -> AttributePath {
        AttributePath::root(self.name)
    }
}

impl<C, T> fmt::Display for Field<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.name)
    }
}

pub trait Constraint<C>: Send + Sync {
    /// Evaluate the rule; an empty list means the configuration passes
    fn check(&self, config: &C) -> Result<Vec<Violation>, RuleError>;
}

impl<C, F> Constraint<C> for F
where
    F: Fn(&C) -> Result<Vec<Violation>, RuleError> + Send + Sync,
{
    fn check(&self, config: &C) -> Result<Vec<Violation>, RuleError> {
        self(config)
    }
}

/// A named one-off rule
///
/// For invariants that fit none of the built-in shapes. The name shows up in
/// debug logs so a misbehaving rule can be found.
pub struct Rule<C> {
    name: &'static str,
    check: Box<dyn Fn(&C) -> Result<Vec<Violation>, RuleError> + Send + Sync>,
}

impl<C> Rule<C> {
    pub fn new(
        name: &'static str,
        check: impl Fn(&C) -> Result<Vec<Violation>, RuleError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            check: Box::new(check),
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<C> fmt::Debug for Rule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rule").field(&self.name).finish()
    }
}

impl<C> Constraint<C> for Rule<C> {
    fn check(&self, config: &C) -> Result<Vec<Violation>, RuleError> {
        let violations = (self.check)(config)?;
        if !violations.is_empty() {
            log::debug!("Rule {} reported {} violation(s)", self.name, violations.len());
        }
        Ok(violations)
    }
}

/// An ordered list of rules evaluated together
pub struct ConstraintSet<C> {
    rules: Vec<Box<dyn Constraint<C>>>,
}

impl<C> Default for ConstraintSet<C> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<C> fmt::Debug for ConstraintSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintSet")
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl<C> ConstraintSet<C> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rule(mut self, rule: impl Constraint<C> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule and collect all violations
    pub fn validate(&self, config: &C) -> Result<Vec<Violation>, RuleError> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            violations.extend(rule.check(config)?);
        }
        Ok(violations)
    }
}

// ============================================================================
// Built-in rules
// ============================================================================

/// `when` enabled requires `then` enabled
pub struct Requires<C> {
    when: Field<C, bool>,
    then: Field<C, bool>,
}

impl<C> Requires<C> {
    pub const fn new(when: Field<C, bool>, then: Field<C, bool>) -> Self {
        Self { when, then }
    }
}

impl<C> Constraint<C> for Requires<C> {
    fn check(&self, config: &C) -> Result<Vec<Violation>, RuleError> {
        let Value::Known(true) = self.when.get(config) else {
            return Ok(Vec::new());
        };
        match self.then.get(config) {
            Value::Known(true) | Value::Unknown => Ok(Vec::new()),
            Value::Known(false) | Value::Null => Ok(vec![Violation::new(
                self.then.path(),
                "Invalid attribute combination",
                format!("{} must be enabled when {} is enabled", self.then, self.when),
            )]),
        }
    }
}

/// Attributes that keep their defaults unless a toggle is on
///
/// With the toggle off, each dependent must equal its schema default. With
/// the toggle on, each dependent must differ from it. A null dependent
/// counts as its default; a null toggle counts as the toggle's default.
pub struct DefaultsUnless<C> {
    schema: &'static ResourceSchema,
    toggle: Field<C, bool>,
    dependents: Vec<Field<C, String>>,
}

impl<C> DefaultsUnless<C> {
    pub fn new(
        schema: &'static ResourceSchema,
        toggle: Field<C, bool>,
        dependents: impl IntoIterator<Item = Field<C, String>>,
    ) -> Self {
        Self {
            schema,
            toggle,
            dependents: dependents.into_iter().collect(),
        }
    }
}

impl<C> Constraint<C> for DefaultsUnless<C> {
    fn check(&self, config: &C) -> Result<Vec<Violation>, RuleError> {
        let enabled = match self.toggle.get(config) {
            Value::Unknown => return Ok(Vec::new()),
            Value::Known(on) => *on,
            Value::Null => self.schema.default_bool(self.toggle.name())?,
        };

        let mut violations = Vec::new();
        for dependent in &self.dependents {
            // Resolved up front so a misconfigured rule fails on every input
            let default = self.schema.default_string(dependent.name())?;
            let value = match dependent.get(config) {
                Value::Unknown => continue,
                Value::Null => default,
                Value::Known(v) => v.as_str(),
            };
            let at_default = value == default;

            if !enabled && !at_default {
                violations.push(Violation::new(
                    dependent.path(),
                    "Attribute requires toggle",
                    format!(
                        "{dependent} can only be changed from its default ({default}) when {} is true",
                        self.toggle
                    ),
                ));
            } else if enabled && at_default {
                violations.push(Violation::new(
                    dependent.path(),
                    "Attribute must be customized",
                    format!(
                        "{dependent} must differ from its default ({default}) when {} is true",
                        self.toggle
                    ),
                ));
            }
        }
        Ok(violations)
    }
}

/// A selector value that requires a member to be present in a set
///
/// For every `(selected, member)` pair: when the selector equals `selected`
/// the set must contain `member`; otherwise the set must not contain it.
pub struct SetMembership<C> {
    selector: Field<C, String>,
    set: Field<C, BTreeSet<String>>,
    pairs: Vec<(&'static str, &'static str)>,
}

impl<C> SetMembership<C> {
    pub fn new(
        selector: Field<C, String>,
        set: Field<C, BTreeSet<String>>,
        pairs: impl IntoIterator<Item = (&'static str, &'static str)>,
    ) -> Self {
        Self {
            selector,
            set,
            pairs: pairs.into_iter().collect(),
        }
    }
}

impl<C> Constraint<C> for SetMembership<C> {
    fn check(&self, config: &C) -> Result<Vec<Violation>, RuleError> {
        let selected = match self.selector.get(config) {
            Value::Unknown => return Ok(Vec::new()),
            Value::Null => None,
            Value::Known(v) => Some(v.as_str()),
        };
        let set = match self.set.get(config) {
            Value::Unknown => return Ok(Vec::new()),
            Value::Null => None,
            Value::Known(set) => Some(set),
        };

        let mut violations = Vec::new();
        for &(value, member) in &self.pairs {
            let contains = set.is_some_and(|s| s.contains(member));
            let is_selected = selected == Some(value);
            if is_selected && !contains {
                violations.push(Violation::new(
                    self.set.path(),
                    "Missing required value",
                    format!(
                        "{} must contain \"{member}\" when {} is {value}",
                        self.set, self.selector
                    ),
                ));
            } else if !is_selected && contains {
                violations.push(Violation::new(
                    self.set.path(),
                    "Unexpected value",
                    format!(
                        "{} may only contain \"{member}\" when {} is {value}",
                        self.set, self.selector
                    ),
                ));
            }
        }
        Ok(violations)
    }
}

/// A string attribute that must not end with a suffix
///
/// Optionally restricted to configurations whose discriminator is one of a
/// fixed set of values.
pub struct ForbiddenSuffix<C> {
    field: Field<C, String>,
    suffix: &'static str,
    when: Option<(Field<C, String>, &'static [&'static str])>,
}

impl<C> ForbiddenSuffix<C> {
    pub const fn new(field: Field<C, String>, suffix: &'static str) -> Self {
        Self {
            field,
            suffix,
            when: None,
        }
    }

    #[must_use]
    pub fn when_in(
        mut self,
        discriminator: Field<C, String>,
        values: &'static [&'static str],
    ) -> Self {
        self.when = Some((discriminator, values));
        self
    }
}

impl<C> Constraint<C> for ForbiddenSuffix<C> {
    fn check(&self, config: &C) -> Result<Vec<Violation>, RuleError> {
        let context = match &self.when {
            None => None,
            Some((discriminator, values)) => match discriminator.get(config) {
                Value::Known(v) if values.contains(&v.as_str()) => {
                    Some(format!(" for {discriminator} {v}"))
                }
                _ => return Ok(Vec::new()),
            },
        };

        match self.field.get(config) {
            Value::Known(v) if v.ends_with(self.suffix) => Ok(vec![Violation::new(
                self.field.path(),
                "Invalid value",
                format!(
                    "{} must not end with \"{}\"{}",
                    self.field,
                    self.suffix,
                    context.unwrap_or_default()
                ),
            )]),
            _ => Ok(Vec::new()),
        }
    }
}

type Condition<C> = Box<dyn Fn(&C) -> Value<bool> + Send + Sync>;

/// A string attribute that must be set and not blank
pub struct NonEmpty<C> {
    field: Field<C, String>,
    detail: String,
    condition: Option<Condition<C>>,
}

impl<C> NonEmpty<C> {
    pub fn new(field: Field<C, String>, detail: impl Into<String>) -> Self {
        Self {
            field,
            detail: detail.into(),
            condition: None,
        }
    }

    /// Only enforce while `condition` is known to be true
    #[must_use]
    pub fn when(mut self, condition: impl Fn(&C) -> Value<bool> + Send + Sync + 'static) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }
}

impl<C> Constraint<C> for NonEmpty<C> {
    fn check(&self, config: &C) -> Result<Vec<Violation>, RuleError> {
        if let Some(condition) = &self.condition
            && !matches!(condition(config), Value::Known(true))
        {
            return Ok(Vec::new());
        }
        match self.field.get(config) {
            Value::Unknown => Ok(Vec::new()),
            Value::Known(v) if !v.trim().is_empty() => Ok(Vec::new()),
            _ => Ok(vec![Violation::new(
                self.field.path(),
                "Missing required value",
                self.detail.clone(),
            )]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, DefaultValue};

    #[derive(Debug, Default, Clone)]
    struct Zone {
        custom: Value<bool>,
        ns1: Value<String>,
        ns2: Value<String>,
        log_enabled: Value<bool>,
        log_anonymized: Value<bool>,
    }

    static ZONE: ResourceSchema = ResourceSchema::new(
        "zone",
        &[
            AttributeSchema::optional("custom", AttributeKind::Bool)
                .with_default(DefaultValue::Bool(false)),
            AttributeSchema::optional("ns1", AttributeKind::String)
                .with_default(DefaultValue::String("kiki.bunny.net")),
            AttributeSchema::optional("ns2", AttributeKind::String)
                .with_default(DefaultValue::String("coco.bunny.net")),
            AttributeSchema::optional("plain", AttributeKind::String),
            AttributeSchema::optional("log_enabled", AttributeKind::Bool),
        ],
    );

    const CUSTOM: Field<Zone, bool> = Field::new("custom", |z| &z.custom);
    const NS1: Field<Zone, String> = Field::new("ns1", |z| &z.ns1);
    const NS2: Field<Zone, String> = Field::new("ns2", |z| &z.ns2);
    const LOG_ENABLED: Field<Zone, bool> = Field::new("log_enabled", |z| &z.log_enabled);
    const LOG_ANONYMIZED: Field<Zone, bool> = Field::new("log_anonymized", |z| &z.log_anonymized);

    fn known(s: &str) -> Value<String> {
        Value::Known(s.to_string())
    }

    fn nameservers() -> DefaultsUnless<Zone> {
        DefaultsUnless::new(&ZONE, CUSTOM, [NS1, NS2])
    }

    #[test]
    fn test_defaults_unless_toggle_off() {
        let rule = nameservers();

        // Both at default or null: valid
        let zone = Zone {
            custom: Value::Known(false),
            ns1: known("kiki.bunny.net"),
            ..Zone::default()
        };
        assert!(rule.check(&zone).unwrap().is_empty());

        // Customized without the toggle
        let zone = Zone {
            custom: Value::Known(false),
            ns1: known("ns1.example.com"),
            ..Zone::default()
        };
        let violations = rule.check(&zone).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path.to_string(), "ns1");
        assert_eq!(violations[0].title, "Attribute requires toggle");
        assert!(violations[0].detail.contains("kiki.bunny.net"));

        // Null toggle falls back to the schema default (false)
        let zone = Zone {
            ns2: known("ns2.example.com"),
            ..Zone::default()
        };
        assert_eq!(rule.check(&zone).unwrap().len(), 1);
    }

    #[test]
    fn test_defaults_unless_toggle_on() {
        let rule = nameservers();

        let zone = Zone {
            custom: Value::Known(true),
            ns1: known("ns1.example.com"),
            ns2: known("ns2.example.com"),
            ..Zone::default()
        };
        assert!(rule.check(&zone).unwrap().is_empty());

        // Toggle on with a dependent left at (null) default
        let zone = Zone {
            custom: Value::Known(true),
            ns1: known("ns1.example.com"),
            ..Zone::default()
        };
        let violations = rule.check(&zone).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path.to_string(), "ns2");
        assert_eq!(violations[0].title, "Attribute must be customized");
    }

    #[test]
    fn test_defaults_unless_reports_every_dependent() {
        let zone = Zone {
            custom: Value::Known(false),
            ns1: known("a.example.com"),
            ns2: known("b.example.com"),
            ..Zone::default()
        };
        let paths: Vec<String> = nameservers()
            .check(&zone)
            .unwrap()
            .iter()
            .map(|v| v.path.to_string())
            .collect();
        assert_eq!(paths, ["ns1", "ns2"]);
    }

    #[test]
    fn test_defaults_unless_skips_unknown() {
        let rule = nameservers();
        let zone = Zone {
            custom: Value::Unknown,
            ns1: known("ns1.example.com"),
            ..Zone::default()
        };
        assert!(rule.check(&zone).unwrap().is_empty());

        let zone = Zone {
            custom: Value::Known(true),
            ns1: Value::Unknown,
            ns2: known("ns2.example.com"),
            ..Zone::default()
        };
        assert!(rule.check(&zone).unwrap().is_empty());
    }

    #[test]
    fn test_defaults_unless_misconfigured() {
        const PLAIN: Field<Zone, String> = Field::new("plain", |z| &z.ns1);
        const MISSING: Field<Zone, String> = Field::new("nope", |z| &z.ns1);
        const WRONG_KIND: Field<Zone, String> = Field::new("custom", |z| &z.ns1);

        let zone = Zone::default();
        let err = DefaultsUnless::new(&ZONE, CUSTOM, [PLAIN]).check(&zone).unwrap_err();
        assert!(matches!(err, RuleError::MissingDefault { .. }));
        let err = DefaultsUnless::new(&ZONE, CUSTOM, [MISSING]).check(&zone).unwrap_err();
        assert!(matches!(err, RuleError::UnknownAttribute { .. }));
        let err = DefaultsUnless::new(&ZONE, CUSTOM, [WRONG_KIND]).check(&zone).unwrap_err();
        assert!(matches!(err, RuleError::TypeMismatch { .. }));
        assert!(err.to_string().contains("provider bug"));

        // Toggle without a default is only needed when the toggle is null
        let zone = Zone {
            custom: Value::Known(false),
            ..Zone::default()
        };
        assert!(DefaultsUnless::new(&ZONE, LOG_ENABLED, [NS1]).check(&zone).is_err());
        let zone = Zone {
            log_enabled: Value::Known(false),
            ..Zone::default()
        };
        assert!(DefaultsUnless::new(&ZONE, LOG_ENABLED, [NS1]).check(&zone).is_ok());
    }

    #[test]
    fn test_requires() {
        let rule = Requires::new(LOG_ANONYMIZED, LOG_ENABLED);
        let cases = [
            (Value::Known(true), Value::Known(true), true),
            (Value::Known(true), Value::Known(false), false),
            (Value::Known(true), Value::Null, false),
            (Value::Known(true), Value::Unknown, true),
            (Value::Known(false), Value::Known(false), true),
            (Value::Null, Value::Known(false), true),
            (Value::Unknown, Value::Known(false), true),
        ];
        for (anonymized, enabled, valid) in cases {
            let zone = Zone {
                log_anonymized: anonymized.clone(),
                log_enabled: enabled.clone(),
                ..Zone::default()
            };
            let violations = rule.check(&zone).unwrap();
            assert_eq!(violations.is_empty(), valid, "{anonymized:?} -> {enabled:?}");
            if let Some(v) = violations.first() {
                assert_eq!(v.path.to_string(), "log_enabled");
            }
        }
    }

    #[test]
    fn test_set_aggregates_and_is_idempotent() {
        let set = ConstraintSet::new()
            .rule(nameservers())
            .rule(Requires::new(LOG_ANONYMIZED, LOG_ENABLED));
        assert_eq!(set.len(), 2);

        let zone = Zone {
            ns1: known("ns1.example.com"),
            log_anonymized: Value::Known(true),
            log_enabled: Value::Known(false),
            ..Zone::default()
        };
        let first = set.validate(&zone).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(set.validate(&zone).unwrap(), first);
    }

    #[derive(Debug, Default)]
    struct Pullzone {
        format: Value<String>,
        vary: Value<BTreeSet<String>>,
        record_type: Value<String>,
        value: Value<String>,
        link: Value<String>,
    }

    const FORMAT: Field<Pullzone, String> = Field::new("format", |p| &p.format);
    const VARY: Field<Pullzone, BTreeSet<String>> = Field::new("vary", |p| &p.vary);
    const TYPE: Field<Pullzone, String> = Field::new("type", |p| &p.record_type);
    const VALUE: Field<Pullzone, String> = Field::new("value", |p| &p.value);
    const LINK: Field<Pullzone, String> = Field::new("link", |p| &p.link);

    fn vary(items: &[&str]) -> Value<BTreeSet<String>> {
        Value::Known(items.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn test_set_membership() {
        let rule = SetMembership::new(FORMAT, VARY, [("WebP", "webp"), ("Avif", "avif")]);
        let check = |format: Value<String>, set: Value<BTreeSet<String>>| {
            rule.check(&Pullzone {
                format,
                vary: set,
                ..Pullzone::default()
            })
            .unwrap()
        };

        assert!(check(known("WebP"), vary(&["webp", "hostname"])).is_empty());
        assert!(check(known("Original"), vary(&["hostname"])).is_empty());
        assert!(check(Value::Null, Value::Null).is_empty());
        assert!(check(Value::Unknown, vary(&["avif"])).is_empty());

        let missing = check(known("Avif"), vary(&["webp"]));
        let titles: Vec<&str> = missing.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, ["Unexpected value", "Missing required value"]);

        let missing = check(known("WebP"), Value::Null);
        assert_eq!(missing.len(), 1);
        assert!(missing[0].detail.contains("\"webp\""));
    }

    #[test]
    fn test_forbidden_suffix() {
        const TYPES: &[&str] = &["CNAME", "MX"];
        let rule = ForbiddenSuffix::new(VALUE, ".").when_in(TYPE, TYPES);
        let check = |record_type: &str, value: &str| {
            rule.check(&Pullzone {
                record_type: known(record_type),
                value: known(value),
                ..Pullzone::default()
            })
            .unwrap()
        };

        assert_eq!(check("CNAME", "target.example.com.").len(), 1);
        assert!(check("CNAME", "target.example.com").is_empty());
        assert!(check("TXT", "ends with a dot.").is_empty());
        let violation = &check("MX", "mail.example.com.")[0];
        assert!(violation.detail.contains("for `type` MX"));

        let unconditional = ForbiddenSuffix::new(VALUE, ".");
        assert!(unconditional
            .check(&Pullzone {
                value: Value::Unknown,
                ..Pullzone::default()
            })
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_non_empty_with_condition() {
        let rule = NonEmpty::new(LINK, "PullZone records must name the linked pull zone")
            .when(|p: &Pullzone| p.record_type.as_ref().map(|t| t == "PullZone"));

        let check = |record_type: Value<String>, link: Value<String>| {
            rule.check(&Pullzone {
                record_type,
                link,
                ..Pullzone::default()
            })
            .unwrap()
            .len()
        };

        assert_eq!(check(known("PullZone"), Value::Null), 1);
        assert_eq!(check(known("PullZone"), known("  ")), 1);
        assert_eq!(check(known("PullZone"), known("cdn")), 0);
        assert_eq!(check(known("PullZone"), Value::Unknown), 0);
        assert_eq!(check(known("A"), Value::Null), 0);
        assert_eq!(check(Value::Unknown, Value::Null), 0);
    }

    #[test]
    fn test_named_rule() {
        let rule = Rule::new("format-lowercase", |p: &Pullzone| {
            Ok(match p.format.as_known() {
                Some(f) if f.chars().any(char::is_uppercase) => {
                    vec![Violation::new(FORMAT.path(), "Uppercase", "use lowercase")]
                }
                _ => Vec::new(),
            })
        });
        assert_eq!(rule.name(), "format-lowercase");
        let set = ConstraintSet::new().rule(rule);
        let bad = Pullzone {
            format: known("WebP"),
            ..Pullzone::default()
        };
        assert_eq!(set.validate(&bad).unwrap().len(), 1);
        assert!(set.validate(&Pullzone::default()).unwrap().is_empty());
    }

    #[test]
    fn test_closure_rule_and_diagnostic() {
        let set = ConstraintSet::new().rule(|p: &Pullzone| {
            Ok::<_, RuleError>(match p.format.as_known() {
                Some(f) if f.is_empty() => {
                    vec![Violation::new(FORMAT.path(), "Empty", "format is empty")]
                }
                _ => Vec::new(),
            })
        });
        let violations = set
            .validate(&Pullzone {
                format: known(""),
                ..Pullzone::default()
            })
            .unwrap();
        let diagnostic = Diagnostic::from(violations[0].clone());
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.attribute, Some(AttributePath::root("format")));
        assert_eq!(violations[0].to_string(), "format: Empty: format is empty");
    }
}
