//! `bunnyform apply`

use anyhow::{Result, bail};
use declarative::{ExecuteOptions, ExecuteSummary, LockTable, Reconciler, UNKNOWN_MARKER};
use std::time::Duration;

use super::{Workspace, plan, select, unresolved};
use crate::Context;
use crate::engine::{self, BarProgress, PromptConfirm};
use crate::resource::managed_index;
use crate::ui;

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub dry_run: bool,
    pub yes: bool,
    pub jobs: usize,
    /// Seconds to wait for a contended entity lock
    pub lock_timeout: Option<u64>,
}

pub fn run(ctx: &Context, target: Option<&str>, opts: &ApplyOptions) -> Result<()> {
    let mut workspace = Workspace::load(ctx)?;
    let summary = apply(ctx, &mut workspace, target, opts)?;
    if !summary.is_success() {
        bail!(
            "{} failed, {} invalid",
            ui::plural(summary.failed, "resource"),
            summary.invalid
        );
    }
    Ok(())
}

/// Plan, confirm, execute, and record what is now managed
pub fn apply(
    ctx: &Context,
    workspace: &mut Workspace,
    target: Option<&str>,
    opts: &ApplyOptions,
) -> Result<ExecuteSummary> {
    if opts.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    // Planning consumes the resources; remember where each one lives first
    let known = managed_index(&workspace.config.resources());
    let plan = plan::build(workspace, target)?;
    let pending: usize = unresolved(&select(workspace.config.resources(), target))
        .iter()
        .map(|v| v.diagnostics.len())
        .sum();
    if pending > 0 && !opts.dry_run {
        bail!(
            "{} still {UNKNOWN_MARKER}; give it a value before applying",
            ui::plural(pending, "value")
        );
    }
    let unchanged = plan.unchanged.clone();

    let locks = LockTable::new();
    let reconciler = Reconciler::new(&workspace.remote, &locks).with_options(ExecuteOptions {
        dry_run: opts.dry_run,
        jobs: opts.jobs,
        verbose: ctx.verbose > 0,
        lock_timeout: opts.lock_timeout.map(Duration::from_secs),
    });
    let total = plan.total_resources();
    let summary = reconciler.apply(
        plan,
        &mut BarProgress::new(ctx.verbose > 0, ctx.quiet),
        &mut PromptConfirm { yes: opts.yes },
    )?;

    if opts.dry_run {
        println!();
        ui::info("Dry run - no changes made");
        return Ok(summary);
    }

    workspace.state.retire_moved(&summary.outcomes);
    workspace.state.record_outcomes(&summary.outcomes, &known);
    workspace.state.adopt(&unchanged, &known);
    workspace.state.touch(&workspace.state_path)?;
    log::debug!(
        "{} managed resources recorded in {}",
        workspace.state.resources.len(),
        workspace.state_path.display()
    );

    if total > 0 {
        engine::print_summary(&summary);
    }
    Ok(summary)
}
