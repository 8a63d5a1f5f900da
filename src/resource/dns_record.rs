//! DNS record resource
//!
//! Records are items of their zone's record collection. Writing one rewrites
//! the zone, so every record write holds the zone's lock.

use anyhow::Result;
use declarative::{
    AttributeKind, AttributeSchema, Attributes, ConstraintSet, DefaultValue, EntityKey, Field,
    ForbiddenSuffix, Location, NonEmpty, NormalizedUrl, Record, Resource, ResourceSchema,
    ResourceState, Rule, RuleError, SemanticEquality, URL, Value, Violation,
};
use std::sync::LazyLock;

use super::{check, known_enum, zone_lock};
use crate::config::DnsRecordConfig;
use crate::enums::{self, DNS_RECORD_TYPE};

pub const TYPE: &str = "dns_record";

/// Collection of the zone entity holding its records
const COLLECTION: &str = "records";

/// Types whose value is a host name that bunny.net stores without the root dot
const HOST_VALUED: &[&str] = &["CNAME", "MX", "NS", "PTR", "SRV"];

pub static SCHEMA: ResourceSchema = ResourceSchema::new(
    TYPE,
    &[
        AttributeSchema::required("type", AttributeKind::String),
        AttributeSchema::optional("name", AttributeKind::String)
            .with_default(DefaultValue::String("")),
        AttributeSchema::optional("value", AttributeKind::String),
        AttributeSchema::optional("ttl", AttributeKind::Int).with_default(DefaultValue::Int(300)),
        AttributeSchema::optional("priority", AttributeKind::Int),
        AttributeSchema::optional("weight", AttributeKind::Int),
        AttributeSchema::optional("port", AttributeKind::Int),
        AttributeSchema::optional("link_name", AttributeKind::String),
    ],
);

const RECORD_TYPE: Field<DnsRecordConfig, String> = Field::new("type", |c| &c.record_type);
const VALUE: Field<DnsRecordConfig, String> = Field::new("value", |c| &c.value);
const LINK_NAME: Field<DnsRecordConfig, String> = Field::new("link_name", |c| &c.link_name);

static RULES: LazyLock<ConstraintSet<DnsRecordConfig>> = LazyLock::new(|| {
    ConstraintSet::new()
        .rule(known_enum(RECORD_TYPE, &DNS_RECORD_TYPE))
        .rule(ForbiddenSuffix::new(VALUE, ".").when_in(RECORD_TYPE, HOST_VALUED))
        .rule(
            NonEmpty::new(LINK_NAME, "PullZone records must name the pull zone they point at")
                .when(|c: &DnsRecordConfig| c.record_type.as_ref().map(|t| t == "PullZone")),
        )
        .rule(Rule::new("redirect-target", redirect_target))
});

fn is_redirect(config: &DnsRecordConfig) -> bool {
    config
        .record_type
        .as_known()
        .is_some_and(|t| t == "Redirect")
}

fn redirect_target(config: &DnsRecordConfig) -> Result<Vec<Violation>, RuleError> {
    if !is_redirect(config) {
        return Ok(Vec::new());
    }
    Ok(match config.value.as_known().map(|v| NormalizedUrl::parse(v)) {
        Some(Err(e)) => vec![Violation::new(VALUE.path(), "Invalid redirect target", e.to_string())],
        _ => Vec::new(),
    })
}

/// One record inside a DNS zone
#[derive(Debug, Clone)]
pub struct DnsRecord {
    address: String,
    config: DnsRecordConfig,
}

impl DnsRecord {
    pub fn new(address: impl Into<String>, config: DnsRecordConfig) -> Self {
        Self {
            address: address.into(),
            config,
        }
    }

    fn attributes(&self) -> Attributes {
        let c = &self.config;
        let mut attributes = Attributes::new()
            .with("type", c.record_type.clone())
            .with("name", c.name.clone())
            .with("value", c.value.clone())
            .with("ttl", c.ttl.render())
            .with("priority", c.priority.render())
            .with("weight", c.weight.render())
            .with("port", c.port.render())
            .with("link_name", c.link_name.clone());
        SCHEMA.apply_defaults(&mut attributes);
        attributes
    }
}

impl Resource for DnsRecord {
    fn id(&self) -> String {
        format!("{TYPE}.{}", self.address)
    }

    fn description(&self) -> String {
        let name = match self.config.name.as_known() {
            Some(n) if !n.is_empty() => n.as_str(),
            _ => "@",
        };
        format!(
            "{} record {name} in {}",
            self.config.record_type, self.config.zone
        )
    }

    fn resource_type(&self) -> &'static str {
        TYPE
    }

    fn location(&self) -> Location {
        Location::nested(super::dns_zone::TYPE, &self.config.zone, COLLECTION, &self.address)
    }

    fn lock_key(&self) -> Option<EntityKey> {
        Some(zone_lock(&self.config.zone))
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present(self.attributes())
    }

    fn validate(&self) -> Result<Vec<Violation>, RuleError> {
        check(&RULES, &SCHEMA, &self.config, &self.attributes())
    }

    fn comparator(&self, attribute: &str) -> Option<&'static dyn SemanticEquality> {
        (attribute == "value" && is_redirect(&self.config)).then_some(&URL as &dyn SemanticEquality)
    }

    fn encode(&self, attributes: &Attributes) -> Result<Record> {
        let mut record = attributes.to_record()?;
        enums::encode_field(&mut record, "type", &DNS_RECORD_TYPE)?;
        Ok(record)
    }

    fn decode(&self, mut record: Record) -> Result<Attributes> {
        enums::decode_field(&mut record, "type", &DNS_RECORD_TYPE)?;
        Ok(Attributes::from_record(record))
    }
}
