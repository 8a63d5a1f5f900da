//! Resource trait for remote reconciliation
//!
//! A Resource is one configured remote object. It knows where it lives
//! ([`Location`]), which entity lock serializes its writes, how to project
//! its configuration into [`Attributes`], and which rules the configuration
//! has to satisfy.

use crate::constraint::{RuleError, Violation};
use crate::context::ApplyContext;
use crate::diff::Action;
use crate::lock::EntityKey;
use crate::remote::{Location, RemoteClient};
use crate::semantic::SemanticEquality;
use crate::types::{ApplyResult, ResourceState};
use crate::value::{Attributes, Record};
use anyhow::{Result, bail};
use std::fmt;

/// Core trait for reconciled resources
///
/// Implementors provide identity, location and desired state. Reading,
/// writing, and the default codec (attribute text stored verbatim) come for
/// free; override [`Resource::encode`] and [`Resource::decode`] when the
/// remote stores some attributes differently, e.g. enums as integers.
///
/// # Example
///
/// ```
/// use declarative::{Attributes, Location, Resource, ResourceState, Value};
///
/// #[derive(Debug)]
/// struct Tag { name: String }
///
/// impl Resource for Tag {
///     fn id(&self) -> String { format!("tag.{}", self.name) }
///     fn description(&self) -> String { format!("Tag {}", self.name) }
///     fn resource_type(&self) -> &'static str { "tag" }
///     fn location(&self) -> Location { Location::entity("tag", &self.name) }
///     fn desired_state(&self) -> ResourceState {
///         ResourceState::Present(Attributes::new().with("name", Value::Known(self.name.clone())))
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique address of this resource, e.g. `dns_record.www`
    fn id(&self) -> String;

    /// Human-readable description
    fn description(&self) -> String;

    /// Resource type, used for grouping and target filters
    fn resource_type(&self) -> &'static str;

    /// Where the resource is stored remotely
    fn location(&self) -> Location;

    /// Entity lock held while this resource is written
    ///
    /// Resources that read-modify-write a shared parent must return the
    /// parent's key.
    fn lock_key(&self) -> Option<EntityKey> {
        None
    }

    fn desired_state(&self) -> ResourceState;

    /// Check the configuration against the resource's rules
    fn validate(&self) -> Result<Vec<Violation>, RuleError> {
        Ok(Vec::new())
    }

    /// Semantic comparator for an attribute, if its values follow a grammar
    fn comparator(&self, _attribute: &str) -> Option<&'static dyn SemanticEquality> {
        None
    }

    /// Convert desired attributes into the remote record
    fn encode(&self, attributes: &Attributes) -> Result<Record> {
        Ok(attributes.to_record()?)
    }

    /// Convert a remote record into comparable attributes
    fn decode(&self, record: Record) -> Result<Attributes> {
        Ok(Attributes::from_record(record))
    }

    /// Fetch the raw record at this resource's location
    fn read(&self, remote: &dyn RemoteClient) -> Result<Option<Record>> {
        self.location().read(remote)
    }

    /// Store `record` at this resource's location, or remove it on `None`
    fn write(&self, remote: &dyn RemoteClient, record: Option<Record>) -> Result<()> {
        self.location().write(remote, record)
    }

    /// Read the current state from the remote
    fn current_state(&self, remote: &dyn RemoteClient) -> Result<ResourceState> {
        match self.read(remote)? {
            Some(record) => Ok(ResourceState::Present(self.decode(record)?)),
            None => Ok(ResourceState::Absent),
        }
    }

    /// Converge the remote for a planned action
    ///
    /// The executor holds [`Resource::lock_key`] around this call.
    fn apply(&self, ctx: &ApplyContext, action: Action) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".into(),
            });
        }
        match action {
            Action::Create | Action::Update => {
                let ResourceState::Present(attributes) = self.desired_state() else {
                    bail!("{} has no desired attributes to write", self.id());
                };
                let record = self.encode(&attributes)?;
                self.write(ctx.remote, Some(record))?;
                Ok(if action == Action::Create {
                    ApplyResult::Created
                } else {
                    ApplyResult::Modified
                })
            }
            Action::Delete => {
                self.write(ctx.remote, None)?;
                Ok(ApplyResult::Removed)
            }
        }
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;
