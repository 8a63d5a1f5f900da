//! bunny.net resource kinds
//!
//! Zones and pull zones are entities of their own. DNS records and pull
//! zone hostnames are stored inside their parent, so writing one is a
//! read-modify-write of the parent record. Parent and children therefore
//! share the parent's lock key.

mod dns_record;
mod dns_zone;
mod pullzone;
mod pullzone_hostname;

pub use dns_record::DnsRecord;
pub use dns_zone::DnsZone;
pub use pullzone::Pullzone;
pub use pullzone_hostname::PullzoneHostname;

use declarative::{
    Attributes, BoxedResource, ConstraintSet, EntityKey, EnumRegistry, Field, Location, Resource,
    ResourceSchema, ResourceState, Rule, RuleError, Value, Violation,
};
use std::collections::BTreeMap;

use crate::state::{ManagedResource, ProviderState, displaced_id};

/// Every resource type, in the order parents precede children
pub const RESOURCE_TYPES: [&str; 4] = [
    dns_zone::TYPE,
    dns_record::TYPE,
    pullzone::TYPE,
    pullzone_hostname::TYPE,
];

/// Types stored as entities of their own
pub const ENTITY_TYPES: [&str; 2] = [dns_zone::TYPE, pullzone::TYPE];

pub fn zone_lock(domain: &str) -> EntityKey {
    EntityKey::Name(format!("{}/{domain}", dns_zone::TYPE))
}

pub fn pullzone_lock(name: &str) -> EntityKey {
    EntityKey::Name(format!("{}/{name}", pullzone::TYPE))
}

/// Schema requirements first, then the resource's rules
fn check<C>(
    rules: &ConstraintSet<C>,
    schema: &ResourceSchema,
    config: &C,
    attributes: &Attributes,
) -> Result<Vec<Violation>, RuleError> {
    let mut violations = schema.missing_required(attributes);
    violations.extend(rules.validate(config)?);
    Ok(violations)
}

/// Rule rejecting display names the registry does not know
fn known_enum<C: 'static>(field: Field<C, String>, registry: &'static EnumRegistry) -> Rule<C> {
    Rule::new(field.name(), move |config: &C| {
        Ok(match field.get(config) {
            Value::Known(v) => match registry.to_wire(v) {
                Ok(_) => Vec::new(),
                Err(e) => vec![Violation::new(field.path(), "Invalid value", e.to_string())],
            },
            Value::Null | Value::Unknown => Vec::new(),
        })
    })
}

// ============================================================================
// Managed State
// ============================================================================

/// What the state file remembers about a resource
pub fn managed(resource: &dyn Resource) -> ManagedResource {
    ManagedResource {
        resource_type: resource.resource_type().to_string(),
        location: resource.location(),
        lock_key: resource.lock_key(),
    }
}

/// A managed resource that is no longer configured
///
/// Its desired state is absence, so planning it yields a deletion.
#[derive(Debug)]
pub struct Orphan {
    id: String,
    resource_type: &'static str,
    managed: ManagedResource,
}

impl Orphan {
    pub fn new(id: impl Into<String>, managed: ManagedResource) -> Self {
        let resource_type = RESOURCE_TYPES
            .into_iter()
            .find(|t| *t == managed.resource_type)
            .unwrap_or("unknown");
        Self {
            id: id.into(),
            resource_type,
            managed,
        }
    }
}

impl Resource for Orphan {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn description(&self) -> String {
        format!("{} (no longer configured)", self.managed.location)
    }

    fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    fn location(&self) -> Location {
        self.managed.location.clone()
    }

    fn lock_key(&self) -> Option<EntityKey> {
        self.managed.lock_key.clone()
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Absent
    }
}

/// Resources to plan: the configured ones plus orphans from the state
///
/// A configured resource that now lives somewhere else leaves an orphan at
/// its previous location, addressed by [`displaced_id`].
pub fn with_orphans(configured: Vec<BoxedResource>, state: &ProviderState) -> Vec<BoxedResource> {
    let locations: BTreeMap<String, Location> =
        configured.iter().map(|r| (r.id(), r.location())).collect();
    let mut resources = configured;
    for (id, managed) in &state.resources {
        match locations.get(id) {
            None => {
                log::debug!("{id} is managed but no longer configured");
                resources.push(Box::new(Orphan::new(id, managed.clone())));
            }
            Some(location) if *location != managed.location => {
                log::debug!("{id} moved from {} to {location}", managed.location);
                resources.push(Box::new(Orphan::new(
                    displaced_id(id, &managed.location),
                    managed.clone(),
                )));
            }
            Some(_) => {}
        }
    }
    resources
}

/// Managed-state entries for every resource, keyed by id
pub fn managed_index(resources: &[BoxedResource]) -> BTreeMap<String, ManagedResource> {
    resources
        .iter()
        .map(|r| (r.id(), managed(r.as_ref())))
        .collect()
}
