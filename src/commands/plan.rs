//! `bunnyform plan`

use anyhow::{Result, bail};
use declarative::{ExecutionPlan, LockTable, Reconciler};

use super::{Workspace, report, select, unresolved};
use crate::Context;
use crate::engine;
use crate::resource::with_orphans;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let workspace = Workspace::load(ctx)?;
    let plan = build(&workspace, target)?;
    if plan.has_failures() {
        bail!("{} could not be planned", ui::plural(plan.failures.len(), "resource"));
    }
    Ok(())
}

/// Validate, then plan and display the changes for the selected resources
pub fn build(workspace: &Workspace, target: Option<&str>) -> Result<ExecutionPlan> {
    ui::header("Planning");
    if workspace.config.is_empty() {
        ui::warn("The configuration declares no resources; everything managed will be deleted");
    }

    // Orphans are found against the whole configuration, then targeted
    let resources = select(
        with_orphans(workspace.config.resources(), &workspace.state),
        target,
    );
    let locks = LockTable::new();
    let reconciler = Reconciler::new(&workspace.remote, &locks);

    let mut findings = reconciler.validate(&resources);
    findings.extend(unresolved(&resources));
    let errors = report(&findings);
    if errors > 0 {
        println!();
        bail!("Configuration has {}", ui::plural(errors, "violation"));
    }

    let plan = reconciler.plan(resources);
    engine::display_plan(&plan);
    Ok(plan)
}
