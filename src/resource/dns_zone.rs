//! DNS zone resource

use anyhow::Result;
use declarative::{
    AttributeKind, AttributePath, AttributeSchema, Attributes, ConstraintSet, DefaultValue,
    DefaultsUnless, EntityKey, Field, Location, Record, Requires, Resource, ResourceSchema,
    ResourceState, RuleError, Value, Violation,
};
use std::sync::LazyLock;

use super::{check, known_enum, zone_lock};
use crate::config::DnsZoneConfig;
use crate::enums::{self, LOG_ANONYMIZED_STYLE};

pub const TYPE: &str = "dns_zone";

pub static SCHEMA: ResourceSchema = ResourceSchema::new(
    TYPE,
    &[
        AttributeSchema::required("domain", AttributeKind::String),
        AttributeSchema::optional("nameserver_custom", AttributeKind::Bool)
            .with_default(DefaultValue::Bool(false)),
        AttributeSchema::optional("nameserver1", AttributeKind::String)
            .with_default(DefaultValue::String("kiki.bunny.net")),
        AttributeSchema::optional("nameserver2", AttributeKind::String)
            .with_default(DefaultValue::String("coco.bunny.net")),
        AttributeSchema::optional("soa_email", AttributeKind::String)
            .with_default(DefaultValue::String("hostmaster@bunny.net")),
        AttributeSchema::optional("log_enabled", AttributeKind::Bool)
            .with_default(DefaultValue::Bool(false)),
        AttributeSchema::optional("log_anonymized", AttributeKind::Bool)
            .with_default(DefaultValue::Bool(false)),
        AttributeSchema::optional("log_anonymized_style", AttributeKind::String)
            .with_default(DefaultValue::String("OneDigit")),
    ],
);

const NAMESERVER_CUSTOM: Field<DnsZoneConfig, bool> =
    Field::new("nameserver_custom", |c| &c.nameserver_custom);
const NAMESERVER1: Field<DnsZoneConfig, String> = Field::new("nameserver1", |c| &c.nameserver1);
const NAMESERVER2: Field<DnsZoneConfig, String> = Field::new("nameserver2", |c| &c.nameserver2);
const SOA_EMAIL: Field<DnsZoneConfig, String> = Field::new("soa_email", |c| &c.soa_email);
const LOG_ENABLED: Field<DnsZoneConfig, bool> = Field::new("log_enabled", |c| &c.log_enabled);
const LOG_ANONYMIZED: Field<DnsZoneConfig, bool> =
    Field::new("log_anonymized", |c| &c.log_anonymized);
const LOG_ANONYMIZED_STYLE_FIELD: Field<DnsZoneConfig, String> =
    Field::new("log_anonymized_style", |c| &c.log_anonymized_style);

static RULES: LazyLock<ConstraintSet<DnsZoneConfig>> = LazyLock::new(|| {
    ConstraintSet::new()
        .rule(DefaultsUnless::new(
            &SCHEMA,
            NAMESERVER_CUSTOM,
            [NAMESERVER1, NAMESERVER2, SOA_EMAIL],
        ))
        .rule(Requires::new(LOG_ANONYMIZED, LOG_ENABLED))
        .rule(known_enum(LOG_ANONYMIZED_STYLE_FIELD, &LOG_ANONYMIZED_STYLE))
});

/// A DNS zone, stored as its own entity; records live inside it
#[derive(Debug, Clone)]
pub struct DnsZone {
    address: String,
    config: DnsZoneConfig,
}

impl DnsZone {
    pub fn new(address: impl Into<String>, config: DnsZoneConfig) -> Self {
        Self {
            address: address.into(),
            config,
        }
    }

    fn attributes(&self) -> Attributes {
        let c = &self.config;
        let mut attributes = Attributes::new()
            .with("domain", Value::Known(c.domain.clone()))
            .with("nameserver_custom", c.nameserver_custom.render())
            .with("nameserver1", c.nameserver1.clone())
            .with("nameserver2", c.nameserver2.clone())
            .with("soa_email", c.soa_email.clone())
            .with("log_enabled", c.log_enabled.render())
            .with("log_anonymized", c.log_anonymized.render())
            .with("log_anonymized_style", c.log_anonymized_style.clone());
        SCHEMA.apply_defaults(&mut attributes);
        attributes
    }
}

impl Resource for DnsZone {
    fn id(&self) -> String {
        format!("{TYPE}.{}", self.address)
    }

    fn description(&self) -> String {
        format!("DNS zone {}", self.config.domain)
    }

    fn resource_type(&self) -> &'static str {
        TYPE
    }

    fn location(&self) -> Location {
        Location::entity(TYPE, &self.config.domain)
    }

    // Entity writes rewrite the record the zone's DNS records live in
    fn lock_key(&self) -> Option<EntityKey> {
        Some(zone_lock(&self.config.domain))
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present(self.attributes())
    }

    fn validate(&self) -> Result<Vec<Violation>, RuleError> {
        let mut violations = check(&RULES, &SCHEMA, &self.config, &self.attributes())?;
        if self.config.domain.trim().is_empty() {
            violations.push(Violation::new(
                AttributePath::root("domain"),
                "Missing required value",
                "`domain` must not be empty",
            ));
        }
        Ok(violations)
    }

    fn encode(&self, attributes: &Attributes) -> Result<Record> {
        let mut record = attributes.to_record()?;
        enums::encode_field(&mut record, "log_anonymized_style", &LOG_ANONYMIZED_STYLE)?;
        Ok(record)
    }

    fn decode(&self, mut record: Record) -> Result<Attributes> {
        enums::decode_field(&mut record, "log_anonymized_style", &LOG_ANONYMIZED_STYLE)?;
        Ok(Attributes::from_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{MemoryRemote, ResourceDiff};

    fn zone(config: DnsZoneConfig) -> DnsZone {
        DnsZone::new(
            "main",
            DnsZoneConfig {
                domain: "example.com".into(),
                ..config
            },
        )
    }

    fn titles(zone: &DnsZone) -> Vec<String> {
        zone.validate()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_defaults_fill_desired_state() {
        let zone = zone(DnsZoneConfig::default());
        let ResourceState::Present(attrs) = zone.desired_state() else {
            panic!("zone should be present");
        };
        assert_eq!(attrs.get("nameserver1"), Some(&Value::Known("kiki.bunny.net".into())));
        assert_eq!(attrs.get("nameserver_custom"), Some(&Value::Known("false".into())));
        assert_eq!(attrs.get("log_anonymized_style"), Some(&Value::Known("OneDigit".into())));
        assert!(zone.validate().unwrap().is_empty());
    }

    #[test]
    fn test_custom_nameservers_need_toggle() {
        let zone = zone(DnsZoneConfig {
            nameserver1: Value::Known("ns1.example.net".into()),
            ..DnsZoneConfig::default()
        });
        let found = titles(&zone);
        assert_eq!(found.len(), 1);
        assert!(found[0].starts_with("nameserver1: Attribute requires toggle"));
    }

    #[test]
    fn test_toggle_needs_every_nameserver_customized() {
        let zone = zone(DnsZoneConfig {
            nameserver_custom: Value::Known(true),
            nameserver1: Value::Known("ns1.example.net".into()),
            ..DnsZoneConfig::default()
        });
        let found = titles(&zone);
        assert_eq!(found.len(), 2, "{found:?}");
        assert!(found.iter().all(|v| v.contains("Attribute must be customized")));
    }

    #[test]
    fn test_anonymized_logs_require_logging() {
        let zone = zone(DnsZoneConfig {
            log_anonymized: Value::Known(true),
            log_anonymized_style: Value::Known("Drop".into()),
            ..DnsZoneConfig::default()
        });
        let found = titles(&zone);
        assert_eq!(found.len(), 1);
        assert!(found[0].starts_with("log_enabled: Invalid attribute combination"));
    }

    #[test]
    fn test_unknown_style_is_rejected() {
        let zone = zone(DnsZoneConfig {
            log_anonymized_style: Value::Known("TwoDigits".into()),
            ..DnsZoneConfig::default()
        });
        let found = titles(&zone);
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("TwoDigits is not a known log anonymization style"));
    }

    #[test]
    fn test_blank_domain() {
        let zone = DnsZone::new("main", DnsZoneConfig::default());
        assert!(titles(&zone).iter().any(|v| v.starts_with("domain:")));
    }

    #[test]
    fn test_style_crosses_the_wire_as_integer() {
        let remote = MemoryRemote::new();
        let zone = zone(DnsZoneConfig {
            log_enabled: Value::Known(true),
            log_anonymized: Value::Known(true),
            log_anonymized_style: Value::Known("Drop".into()),
            ..DnsZoneConfig::default()
        });
        let ResourceState::Present(attrs) = zone.desired_state() else {
            panic!("zone should be present");
        };
        zone.write(&remote, Some(zone.encode(&attrs).unwrap())).unwrap();

        let stored = zone.read(&remote).unwrap().unwrap();
        assert_eq!(stored["log_anonymized_style"], "1");
        assert!(ResourceDiff::from_resource(&zone, &remote).unwrap().is_none());
    }
}
