//! Custom hostname of a pull zone

use anyhow::Result;
use declarative::{
    AttributeKind, AttributeSchema, Attributes, CASE_INSENSITIVE, ConstraintSet, DefaultValue,
    EntityKey, Field, ForbiddenSuffix, Location, Requires, Resource, ResourceSchema,
    ResourceState, RuleError, SemanticEquality, Violation,
};
use std::sync::LazyLock;

use super::{check, pullzone_lock};
use crate::config::PullzoneHostnameConfig;

pub const TYPE: &str = "pullzone_hostname";

const COLLECTION: &str = "hostnames";

pub static SCHEMA: ResourceSchema = ResourceSchema::new(
    TYPE,
    &[
        AttributeSchema::required("name", AttributeKind::String),
        AttributeSchema::optional("tls_enabled", AttributeKind::Bool)
            .with_default(DefaultValue::Bool(false)),
        AttributeSchema::optional("force_ssl", AttributeKind::Bool)
            .with_default(DefaultValue::Bool(false)),
    ],
);

const NAME: Field<PullzoneHostnameConfig, String> = Field::new("name", |c| &c.name);
const TLS_ENABLED: Field<PullzoneHostnameConfig, bool> =
    Field::new("tls_enabled", |c| &c.tls_enabled);
const FORCE_SSL: Field<PullzoneHostnameConfig, bool> = Field::new("force_ssl", |c| &c.force_ssl);

static RULES: LazyLock<ConstraintSet<PullzoneHostnameConfig>> = LazyLock::new(|| {
    ConstraintSet::new()
        .rule(ForbiddenSuffix::new(NAME, "."))
        .rule(Requires::new(FORCE_SSL, TLS_ENABLED))
});

#[derive(Debug, Clone)]
pub struct PullzoneHostname {
    address: String,
    config: PullzoneHostnameConfig,
}

impl PullzoneHostname {
    pub fn new(address: impl Into<String>, config: PullzoneHostnameConfig) -> Self {
        Self {
            address: address.into(),
            config,
        }
    }

    fn attributes(&self) -> Attributes {
        let c = &self.config;
        let mut attributes = Attributes::new()
            .with("name", c.name.clone())
            .with("tls_enabled", c.tls_enabled.render())
            .with("force_ssl", c.force_ssl.render());
        SCHEMA.apply_defaults(&mut attributes);
        attributes
    }
}

impl Resource for PullzoneHostname {
    fn id(&self) -> String {
        format!("{TYPE}.{}", self.address)
    }

    fn description(&self) -> String {
        format!("Hostname {} of pull zone {}", self.config.name, self.config.pullzone)
    }

    fn resource_type(&self) -> &'static str {
        TYPE
    }

    fn location(&self) -> Location {
        Location::nested(super::pullzone::TYPE, &self.config.pullzone, COLLECTION, &self.address)
    }

    fn lock_key(&self) -> Option<EntityKey> {
        Some(pullzone_lock(&self.config.pullzone))
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present(self.attributes())
    }

    fn validate(&self) -> Result<Vec<Violation>, RuleError> {
        check(&RULES, &SCHEMA, &self.config, &self.attributes())
    }

    // Host names are case-insensitive
    fn comparator(&self, attribute: &str) -> Option<&'static dyn SemanticEquality> {
        (attribute == "name").then_some(&CASE_INSENSITIVE as &dyn SemanticEquality)
    }
}
