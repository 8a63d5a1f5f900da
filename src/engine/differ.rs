//! Plan display

use colored::{ColoredString, Colorize};
use declarative::{Action, AttributeChange, ChangeKind, ExecutionPlan, ResourceDiff, group_by_type};

use crate::resource::RESOURCE_TYPES;
use crate::ui;

fn type_heading(resource_type: &str) -> &str {
    match resource_type {
        "dns_zone" => "DNS zones",
        "dns_record" => "DNS records",
        "pullzone" => "Pull zones",
        "pullzone_hostname" => "Pull zone hostnames",
        other => other,
    }
}

fn symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => "+".green(),
        Action::Update => "~".yellow(),
        Action::Delete => "-".red(),
    }
}

/// One attribute line of a resource diff
fn change_line(change: &AttributeChange) -> String {
    match change.kind {
        ChangeKind::Added => format!("+ {} = {}", change.name, change.new),
        ChangeKind::Removed => format!("- {} = {}", change.name, change.old),
        ChangeKind::Modified | ChangeKind::KnownAfterApply => {
            format!("~ {}: {} → {}", change.name, change.old, change.new)
        }
    }
}

/// The one-line verdict closing a plan
pub fn summary_line(plan: &ExecutionPlan) -> String {
    let summary = plan.summary();
    let mut line = format!(
        "Plan: {} to add, {} to change, {} to destroy",
        summary.additions, summary.modifications, summary.removals
    );
    if summary.deferred > 0 {
        line.push_str(&format!(" ({} known after apply)", ui::plural(summary.deferred, "value")));
    }
    line
}

fn display_resource(diff: &ResourceDiff) {
    println!(
        "│   {} {:<32} {}",
        symbol(diff.action),
        diff.resource_id,
        diff.description.dimmed()
    );
    // Deletions only name the resource
    if diff.action == Action::Delete {
        return;
    }
    for change in &diff.changes {
        let line = change_line(change);
        if change.kind == ChangeKind::KnownAfterApply {
            println!("│       {}", line.cyan());
        } else {
            println!("│       {}", line.dimmed());
        }
    }
}

/// Display a plan in a user-friendly format
pub fn display_plan(plan: &ExecutionPlan) {
    for failure in &plan.failures {
        ui::error(&format!("{}: could not be planned: {}", failure.resource_id, failure.error));
    }

    if plan.is_empty() {
        println!();
        println!("  {} No changes. Remote matches the configuration.", "✓".green());
        return;
    }

    let groups = group_by_type(plan.diffs());
    let mut types: Vec<&String> = groups.keys().collect();
    types.sort_by_key(|t| {
        RESOURCE_TYPES
            .iter()
            .position(|known| *known == t.as_str())
            .unwrap_or(RESOURCE_TYPES.len())
    });

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");
    for resource_type in types {
        println!("│ {}", type_heading(resource_type).bold());
        for diff in &groups[resource_type] {
            display_resource(diff);
        }
        println!("│");
    }
    println!("├─────────────────────────────────────────────────────┤");
    println!("│ {}", summary_line(plan).bold());
    println!("└─────────────────────────────────────────────────────┘");
}
