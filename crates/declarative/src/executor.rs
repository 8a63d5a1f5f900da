//! Execution engine - applies planned changes with parallelism and entity locks
//!
//! Each change is validated, then written while holding its resource's entity
//! lock. Changes run stage by stage (see [`Stage`]); within a stage they run
//! in parallel on a dedicated rayon pool.

use crate::constraint::Diagnostic;
use crate::context::{ApplyContext, AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback};
use crate::diff::Action;
use crate::lock::{KeyGuard, LockTable};
use crate::planner::{ExecutionPlan, PlannedChange, Stage};
use crate::remote::RemoteClient;
use crate::resource::BoxedResource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::{Context, Result};
use rayon::prelude::*;

/// Execute a plan with the given options and callbacks
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `opts` - Execution options (dry_run, jobs, lock timeout)
/// * `remote` - Store the changes are written to
/// * `locks` - Entity locks shared by everything writing to `remote`
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: &ExecuteOptions,
    remote: &dyn RemoteClient,
    locks: &LockTable,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let total_changes = plan.total_resources();
    if total_changes == 0 {
        return Ok(ExecuteSummary::default());
    }

    // Confirm before proceeding (unless dry_run)
    if !opts.dry_run && !confirm.confirm("Apply changes?")? {
        let mut summary = ExecuteSummary::default();
        for change in &plan.changes {
            summary.record(
                change.diff.resource_id.clone(),
                ApplyResult::Skipped {
                    reason: "Declined".into(),
                },
            );
        }
        return Ok(summary);
    }

    if opts.dry_run {
        return Ok(ExecuteSummary::default());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .context("Failed to create thread pool")?;
    let ctx = ApplyContext::new(remote).verbose(opts.verbose);

    let mut summary = ExecuteSummary::default();
    for stage in Stage::ALL {
        let batch: Vec<&PlannedChange> = plan.stage(stage).collect();
        if batch.is_empty() {
            continue;
        }
        log::debug!("Applying {} changes ({})", batch.len(), stage.label());
        progress.on_batch_start(batch.len(), stage.label());
        summary.merge(execute_batch(&batch, &pool, &ctx, locks, opts, progress));
        progress.on_batch_complete();
    }

    Ok(summary)
}

/// Execute one stage
fn execute_batch<P: ProgressCallback>(
    batch: &[&PlannedChange],
    pool: &rayon::ThreadPool,
    ctx: &ApplyContext,
    locks: &LockTable,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> ExecuteSummary {
    let mut summary = ExecuteSummary::default();

    if opts.jobs <= 1 || batch.len() == 1 {
        for change in batch {
            progress.on_resource_start(&change.diff.resource_id, &change.diff.description);
            let result = apply_change(change, ctx, locks, opts);
            progress.on_resource_complete(&change.diff.resource_id, &result);
            summary.record(change.diff.resource_id.clone(), result);
        }
        return summary;
    }

    // The progress callback is not thread-safe; collect results and report after
    let results: Vec<(String, ApplyResult)> = pool.install(|| {
        batch
            .par_iter()
            .map(|change| {
                (
                    change.diff.resource_id.clone(),
                    apply_change(change, ctx, locks, opts),
                )
            })
            .collect()
    });

    for (id, result) in results {
        progress.on_resource_complete(&id, &result);
        summary.record(id, result);
    }
    summary
}

/// Validate, lock, and apply a single change
///
/// The lock guard is dropped when this function returns or unwinds.
fn apply_change(
    change: &PlannedChange,
    ctx: &ApplyContext,
    locks: &LockTable,
    opts: &ExecuteOptions,
) -> ApplyResult {
    let resource = change.resource.as_ref();

    // Deletions are not judged by the rules of the configuration they remove
    if change.diff.action != Action::Delete {
        match resource.validate() {
            Ok(violations) if !violations.is_empty() => {
                log::info!("{} is invalid, not applying", change.diff.resource_id);
                return ApplyResult::Invalid { violations };
            }
            Ok(_) => {}
            Err(e) => {
                return ApplyResult::Failed {
                    error: e.to_string(),
                };
            }
        }
    }

    let _guard: Option<KeyGuard<'_>> = match resource.lock_key() {
        None => None,
        Some(key) => match opts.lock_timeout {
            None => Some(locks.lock(key)),
            Some(timeout) => match locks.lock_timeout(key, timeout) {
                Ok(guard) => Some(guard),
                Err(e) => {
                    return ApplyResult::Failed {
                        error: e.to_string(),
                    };
                }
            },
        },
    };

    match resource.apply(ctx, change.diff.action) {
        Ok(result) => result,
        Err(e) => ApplyResult::Failed {
            error: format!("{e:#}"),
        },
    }
}

/// Simple execution without callbacks
///
/// For callers that need neither progress nor confirmation.
pub fn execute_simple(
    plan: ExecutionPlan,
    opts: &ExecuteOptions,
    remote: &dyn RemoteClient,
    locks: &LockTable,
) -> Result<ExecuteSummary> {
    execute(plan, opts, remote, locks, &mut NoProgress, &mut AutoConfirm)
}

/// Problems found while validating one resource
#[derive(Debug, Clone)]
pub struct Validation {
    pub resource_id: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Whether a rule itself is broken rather than the configuration
    pub rule_error: bool,
}

/// Plans and applies resources against one remote
///
/// Bundles the remote, the entity locks shared by every writer of that
/// remote, and the execution options.
pub struct Reconciler<'a> {
    remote: &'a dyn RemoteClient,
    locks: &'a LockTable,
    options: ExecuteOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(remote: &'a dyn RemoteClient, locks: &'a LockTable) -> Self {
        Self {
            remote,
            locks,
            options: ExecuteOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ExecuteOptions) -> Self {
        self.options = options;
        self
    }

    pub const fn options(&self) -> &ExecuteOptions {
        &self.options
    }

    /// Run every resource's rules; only resources with findings are returned
    pub fn validate(&self, resources: &[BoxedResource]) -> Vec<Validation> {
        resources
            .iter()
            .filter_map(|resource| {
                let (diagnostics, rule_error) = match resource.validate() {
                    Ok(violations) => (violations.into_iter().map(Diagnostic::from).collect(), false),
                    Err(e) => (vec![Diagnostic::from(&e)], true),
                };
                (!diagnostics.is_empty()).then(|| Validation {
                    resource_id: resource.id(),
                    diagnostics,
                    rule_error,
                })
            })
            .collect()
    }

    pub fn plan(&self, resources: Vec<BoxedResource>) -> ExecutionPlan {
        ExecutionPlan::build(resources, self.remote)
    }

    pub fn apply<P, C>(&self, plan: ExecutionPlan, progress: &mut P, confirm: &mut C) -> Result<ExecuteSummary>
    where
        P: ProgressCallback,
        C: ConfirmCallback,
    {
        execute(plan, &self.options, self.remote, self.locks, progress, confirm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{RuleError, Violation};
    use crate::context::AutoDecline;
    use crate::lock::EntityKey;
    use crate::path::AttributePath;
    use crate::remote::{Location, MemoryRemote};
    use crate::resource::Resource;
    use crate::types::ResourceState;
    use crate::value::{Attributes, Value};
    use std::time::Duration;

    #[derive(Debug)]
    struct ZoneRecord {
        zone: &'static str,
        name: String,
        invalid: bool,
    }

    impl ZoneRecord {
        fn new(zone: &'static str, name: impl Into<String>) -> Self {
            Self {
                zone,
                name: name.into(),
                invalid: false,
            }
        }
    }

    impl Resource for ZoneRecord {
        fn id(&self) -> String {
            format!("dns_record.{}", self.name)
        }

        fn description(&self) -> String {
            format!("Record {} in {}", self.name, self.zone)
        }

        fn resource_type(&self) -> &'static str {
            "dns_record"
        }

        fn location(&self) -> Location {
            Location::nested("dns_zone", self.zone, "records", &self.name)
        }

        fn lock_key(&self) -> Option<EntityKey> {
            Some(EntityKey::from(self.zone))
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::Present(
                Attributes::new().with("value", Value::Known(format!("{}.example.com", self.name))),
            )
        }

        fn validate(&self) -> Result<Vec<Violation>, RuleError> {
            Ok(if self.invalid {
                vec![Violation::new(AttributePath::root("value"), "Invalid value", "bad")]
            } else {
                Vec::new()
            })
        }
    }

    fn zone(remote: &MemoryRemote, name: &str) {
        Location::entity("dns_zone", name)
            .write(remote, Some([("domain".to_string(), name.to_string())].into()))
            .unwrap();
    }

    fn plan(remote: &MemoryRemote, records: Vec<ZoneRecord>) -> ExecutionPlan {
        let resources: Vec<BoxedResource> = records
            .into_iter()
            .map(|r| Box::new(r) as BoxedResource)
            .collect();
        ExecutionPlan::build(resources, remote)
    }

    fn records_in(remote: &MemoryRemote, zone: &str) -> usize {
        remote
            .get("dns_zone", zone)
            .unwrap()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with("records["))
            .count()
    }

    #[test]
    fn test_execute_empty_plan() {
        let remote = MemoryRemote::new();
        let locks = LockTable::new();
        let summary = execute_simple(ExecutionPlan::new(), &ExecuteOptions::default(), &remote, &locks)
            .unwrap();
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_concurrent_children_of_one_parent_all_land() {
        let remote = MemoryRemote::new().with_latency(Duration::from_millis(2));
        zone(&remote, "example.com");
        let locks = LockTable::new();

        let records = (0..24).map(|i| ZoneRecord::new("example.com", format!("r{i}"))).collect();
        let opts = ExecuteOptions {
            jobs: 8,
            ..ExecuteOptions::default()
        };
        let summary = execute_simple(plan(&remote, records), &opts, &remote, &locks).unwrap();

        assert_eq!(summary.created, 24);
        assert!(summary.is_success());
        assert_eq!(records_in(&remote, "example.com"), 24);
        assert_eq!(locks.tracked_keys(), 0);

        // Converged: a second plan has nothing to do
        let records = (0..24).map(|i| ZoneRecord::new("example.com", format!("r{i}"))).collect();
        assert!(plan(&remote, records).is_empty());
    }

    #[test]
    fn test_invalid_resources_are_not_written() {
        let remote = MemoryRemote::new();
        zone(&remote, "example.com");
        let locks = LockTable::new();

        let records = vec![
            ZoneRecord::new("example.com", "good"),
            ZoneRecord {
                invalid: true,
                ..ZoneRecord::new("example.com", "bad")
            },
        ];
        let summary = execute_simple(plan(&remote, records), &ExecuteOptions::default(), &remote, &locks)
            .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.invalid, 1);
        assert!(!summary.is_success());
        assert_eq!(records_in(&remote, "example.com"), 1);
        let bad = summary
            .outcomes
            .iter()
            .find(|o| o.resource_id == "dns_record.bad")
            .unwrap();
        assert!(matches!(&bad.result, ApplyResult::Invalid { violations } if violations.len() == 1));
    }

    #[test]
    fn test_missing_parent_fails_and_releases_lock() {
        let remote = MemoryRemote::new();
        let locks = LockTable::new();
        let summary = execute_simple(
            plan(&remote, vec![ZoneRecord::new("missing.com", "www")]),
            &ExecuteOptions::default(),
            &remote,
            &locks,
        )
        .unwrap();

        assert_eq!(summary.failed, 1);
        let ApplyResult::Failed { error } = &summary.outcomes[0].result else {
            panic!("expected failure");
        };
        assert!(error.contains("does not exist"));
        assert_eq!(locks.tracked_keys(), 0);
    }

    #[test]
    fn test_lock_timeout_fails_change() {
        let remote = MemoryRemote::new();
        zone(&remote, "example.com");
        let locks = LockTable::new();
        let held = locks.lock(EntityKey::from("example.com"));

        let opts = ExecuteOptions {
            lock_timeout: Some(Duration::from_millis(20)),
            ..ExecuteOptions::default()
        };
        let summary = execute_simple(
            plan(&remote, vec![ZoneRecord::new("example.com", "www")]),
            &opts,
            &remote,
            &locks,
        )
        .unwrap();

        assert_eq!(summary.failed, 1);
        drop(held);
        assert_eq!(locks.tracked_keys(), 0);
    }

    #[test]
    fn test_declined_and_dry_run() {
        let remote = MemoryRemote::new();
        zone(&remote, "example.com");
        let locks = LockTable::new();

        let summary = execute(
            plan(&remote, vec![ZoneRecord::new("example.com", "www")]),
            &ExecuteOptions::default(),
            &remote,
            &locks,
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();
        assert_eq!(summary.skipped, 1);

        let opts = ExecuteOptions {
            dry_run: true,
            ..ExecuteOptions::default()
        };
        let summary =
            execute_simple(plan(&remote, vec![ZoneRecord::new("example.com", "www")]), &opts, &remote, &locks)
                .unwrap();
        assert_eq!(summary.total(), 0);
        assert_eq!(records_in(&remote, "example.com"), 0);
    }

    #[test]
    fn test_reconciler_validates_plans_and_applies() {
        let remote = MemoryRemote::new();
        zone(&remote, "example.com");
        let locks = LockTable::new();
        let reconciler = Reconciler::new(&remote, &locks).with_options(ExecuteOptions {
            jobs: 2,
            ..ExecuteOptions::default()
        });

        let resources: Vec<BoxedResource> = vec![
            Box::new(ZoneRecord::new("example.com", "www")),
            Box::new(ZoneRecord {
                invalid: true,
                ..ZoneRecord::new("example.com", "bad")
            }),
        ];
        let findings = reconciler.validate(&resources);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].resource_id, "dns_record.bad");
        assert!(!findings[0].rule_error);

        let plan = reconciler.plan(resources).filter_by_target(Some("dns_record.www"));
        let summary = reconciler.apply(plan, &mut NoProgress, &mut AutoConfirm).unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(records_in(&remote, "example.com"), 1);
    }
}
