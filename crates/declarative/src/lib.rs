//! # Declarative
//!
//! Reconciliation support for providers that converge remote APIs to a
//! declared configuration.
//!
//! ## Core Concepts
//!
//! - **Value**: tri-state attribute (`Known`, `Null`, `Unknown` until apply)
//! - **Resource**: one configured remote object with a location, an optional
//!   entity lock, a desired state, and validation rules
//! - **LockTable**: per-entity exclusive locks for read-modify-write updates
//!   of shared parent records
//! - **SemanticEquality**: grammar-aware comparison that suppresses cosmetic
//!   drift (e.g. equivalent URLs)
//! - **ConstraintSet**: cross-attribute rules that report every violation
//! - **ExecutionPlan** / **Reconciler**: diff against the remote, then apply
//!   in parallel stages
//!
//! ## Example
//!
//! ```
//! use declarative::{
//!     Attributes, AutoConfirm, Location, LockTable, MemoryRemote, NoProgress, Reconciler,
//!     Resource, ResourceState, Value,
//! };
//!
//! #[derive(Debug)]
//! struct Zone { domain: String }
//!
//! impl Resource for Zone {
//!     fn id(&self) -> String { format!("dns_zone.{}", self.domain) }
//!     fn description(&self) -> String { format!("DNS zone {}", self.domain) }
//!     fn resource_type(&self) -> &'static str { "dns_zone" }
//!     fn location(&self) -> Location { Location::entity("dns_zone", &self.domain) }
//!     fn desired_state(&self) -> ResourceState {
//!         ResourceState::Present(Attributes::new().with("domain", Value::Known(self.domain.clone())))
//!     }
//! }
//!
//! let remote = MemoryRemote::new();
//! let locks = LockTable::new();
//! let reconciler = Reconciler::new(&remote, &locks);
//!
//! let zone: Box<dyn Resource> = Box::new(Zone { domain: "example.com".into() });
//! let plan = reconciler.plan(vec![zone]);
//! let summary = reconciler.apply(plan, &mut NoProgress, &mut AutoConfirm)?;
//! assert_eq!(summary.created, 1);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Provider Traits
//!
//! - [`RemoteClient`]: the API boundary
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles user confirmations
//!
//! This keeps the crate free of HTTP clients and terminal UI.

pub mod constraint;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod lock;
pub mod path;
pub mod planner;
pub mod registry;
pub mod remote;
pub mod resource;
pub mod schema;
pub mod semantic;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use constraint::{
    Constraint, ConstraintSet, DefaultsUnless, Diagnostic, Field, ForbiddenSuffix, NonEmpty,
    Requires, Rule, RuleError, SetMembership, Severity, Violation,
};
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{
    Action, AttributeChange, ChangeKind, DiffSummary, ResourceDiff, diff_attributes, group_by_type,
};
pub use error::{Error, Result};
pub use executor::{Reconciler, Validation, execute, execute_simple};
pub use lock::{EntityKey, KeyGuard, LockError, LockKey, LockTable};
pub use path::AttributePath;
pub use planner::{ExecutionPlan, PlanFailure, PlannedChange, Stage, matches_target};
pub use registry::{EnumRegistry, NotFoundError, RegistryError};
pub use remote::{Location, MemoryRemote, RemoteClient};
pub use resource::{BoxedResource, Resource};
pub use schema::{AttributeKind, AttributeSchema, DefaultValue, ResourceSchema};
pub use semantic::{
    CASE_INSENSITIVE, CaseInsensitive, ComparisonError, NormalizedUrl, SemanticEquality, URL,
    UrlEquality,
};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, Outcome, ResourceState};
pub use value::{Attributes, Record, UNKNOWN_MARKER, Value};
