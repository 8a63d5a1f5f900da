//! Pull zone resource

use anyhow::Result;
use declarative::{
    AttributeKind, AttributeSchema, Attributes, ConstraintSet, DefaultValue, EntityKey, Field,
    Location, NonEmpty, NormalizedUrl, Record, Resource, ResourceSchema, ResourceState, Rule,
    RuleError, SemanticEquality, SetMembership, URL, Value, Violation,
};
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::{check, known_enum, pullzone_lock};
use crate::config::PullzoneConfig;
use crate::enums::{self, IMAGE_FORMAT};

pub const TYPE: &str = "pullzone";

pub static SCHEMA: ResourceSchema = ResourceSchema::new(
    TYPE,
    &[
        AttributeSchema::required("name", AttributeKind::String),
        AttributeSchema::required("origin_url", AttributeKind::String),
        AttributeSchema::optional("cache_vary", AttributeKind::Set),
        AttributeSchema::optional("optimizer_image_format", AttributeKind::String)
            .with_default(DefaultValue::String("Original")),
    ],
);

const ORIGIN_URL: Field<PullzoneConfig, String> = Field::new("origin_url", |c| &c.origin_url);
const CACHE_VARY: Field<PullzoneConfig, BTreeSet<String>> =
    Field::new("cache_vary", |c| &c.cache_vary);
const IMAGE_FORMAT_FIELD: Field<PullzoneConfig, String> =
    Field::new("optimizer_image_format", |c| &c.optimizer_image_format);

static RULES: LazyLock<ConstraintSet<PullzoneConfig>> = LazyLock::new(|| {
    ConstraintSet::new()
        .rule(NonEmpty::new(
            ORIGIN_URL,
            "`origin_url` must point at the server content is pulled from",
        ))
        .rule(Rule::new("origin-url-grammar", origin_url_grammar))
        .rule(known_enum(IMAGE_FORMAT_FIELD, &IMAGE_FORMAT))
        .rule(SetMembership::new(
            IMAGE_FORMAT_FIELD,
            CACHE_VARY,
            [("WebP", "webp"), ("Avif", "avif")],
        ))
});

fn origin_url_grammar(config: &PullzoneConfig) -> Result<Vec<Violation>, RuleError> {
    Ok(match config.origin_url.as_known() {
        Some(url) if !url.trim().is_empty() => match NormalizedUrl::parse(url) {
            Ok(_) => Vec::new(),
            Err(e) => vec![Violation::new(ORIGIN_URL.path(), "Invalid URL", e.to_string())],
        },
        _ => Vec::new(),
    })
}

/// A CDN pull zone; its hostnames live inside it
#[derive(Debug, Clone)]
pub struct Pullzone {
    address: String,
    config: PullzoneConfig,
}

impl Pullzone {
    pub fn new(address: impl Into<String>, config: PullzoneConfig) -> Self {
        Self {
            address: address.into(),
            config,
        }
    }

    fn attributes(&self) -> Attributes {
        let c = &self.config;
        let mut attributes = Attributes::new()
            .with("name", Value::Known(c.name.clone()))
            .with("origin_url", c.origin_url.clone())
            .with(
                "cache_vary",
                c.cache_vary
                    .render_with(|vary| vary.iter().cloned().collect::<Vec<_>>().join(",")),
            )
            .with("optimizer_image_format", c.optimizer_image_format.clone());
        SCHEMA.apply_defaults(&mut attributes);
        attributes
    }
}

impl Resource for Pullzone {
    fn id(&self) -> String {
        format!("{TYPE}.{}", self.address)
    }

    fn description(&self) -> String {
        format!("Pull zone {}", self.config.name)
    }

    fn resource_type(&self) -> &'static str {
        TYPE
    }

    fn location(&self) -> Location {
        Location::entity(TYPE, &self.config.name)
    }

    fn lock_key(&self) -> Option<EntityKey> {
        Some(pullzone_lock(&self.config.name))
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present(self.attributes())
    }

    fn validate(&self) -> Result<Vec<Violation>, RuleError> {
        check(&RULES, &SCHEMA, &self.config, &self.attributes())
    }

    fn comparator(&self, attribute: &str) -> Option<&'static dyn SemanticEquality> {
        (attribute == "origin_url").then_some(&URL as &dyn SemanticEquality)
    }

    fn encode(&self, attributes: &Attributes) -> Result<Record> {
        let mut record = attributes.to_record()?;
        enums::encode_field(&mut record, "optimizer_image_format", &IMAGE_FORMAT)?;
        Ok(record)
    }

    fn decode(&self, mut record: Record) -> Result<Attributes> {
        enums::decode_field(&mut record, "optimizer_image_format", &IMAGE_FORMAT)?;
        Ok(Attributes::from_record(record))
    }
}
