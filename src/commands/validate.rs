//! `bunnyform validate`

use anyhow::{Result, bail};
use declarative::{LockTable, Reconciler};

use super::{Workspace, report, select, unresolved};
use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let workspace = Workspace::load(ctx)?;
    check(&workspace, target)
}

/// Validate the selected resources, failing if any rule is broken
pub fn check(workspace: &Workspace, target: Option<&str>) -> Result<()> {
    ui::header("Validating Configuration");

    let resources = select(workspace.config.resources(), target);
    if resources.is_empty() {
        ui::warn("No resources match");
        return Ok(());
    }

    let locks = LockTable::new();
    let mut findings = Reconciler::new(&workspace.remote, &locks).validate(&resources);
    findings.extend(unresolved(&resources));
    let errors = report(&findings);
    if errors > 0 {
        println!();
        bail!(
            "{} in {}",
            ui::plural(errors, "violation"),
            ui::plural(findings.len(), "resource")
        );
    }

    ui::success(&format!("{} valid", ui::plural(resources.len(), "resource")));
    Ok(())
}
