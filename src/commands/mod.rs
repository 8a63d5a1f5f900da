//! Subcommand implementations
//!
//! Every command works against a [`Workspace`]: the desired configuration,
//! the managed-resource state, and the remote store.

pub mod apply;
pub mod plan;
pub mod state;
pub mod validate;

use anyhow::Result;
use colored::Colorize;
use declarative::{
    AttributePath, BoxedResource, Diagnostic, ResourceState, Severity, UNKNOWN_MARKER, Validation,
    matches_target,
};
use std::path::{Path, PathBuf};

use crate::Context;
use crate::config::DesiredConfig;
use crate::paths;
use crate::remote::{FileRemote, REMOTE_FILE};
use crate::state::{ProviderState, STATE_FILE};

pub struct Workspace {
    pub config: DesiredConfig,
    pub state: ProviderState,
    pub state_path: PathBuf,
    pub remote: FileRemote,
}

impl Workspace {
    /// Open the workspace from the configured locations
    pub fn load(ctx: &Context) -> Result<Self> {
        let config_path = DesiredConfig::path(ctx.config.as_deref())?;
        Self::open(&config_path, &paths::state_dir()?)
    }

    /// Open a workspace from an explicit config file and state directory
    pub fn open(config_path: &Path, state_dir: &Path) -> Result<Self> {
        let state_path = state_dir.join(STATE_FILE);
        Ok(Self {
            config: DesiredConfig::load(config_path)?,
            state: ProviderState::load(&state_path)?,
            state_path,
            remote: FileRemote::open(&state_dir.join(REMOTE_FILE))?,
        })
    }
}

/// Keep only the resources a target selects
pub fn select(resources: Vec<BoxedResource>, target: Option<&str>) -> Vec<BoxedResource> {
    match target {
        None => resources,
        Some(t) => resources
            .into_iter()
            .filter(|r| matches_target(r.as_ref(), t))
            .collect(),
    }
}

/// Configured values left as `(known after apply)`
///
/// Nothing resolves them before a write, so every apply of such a resource
/// would fail. They are warnings for `validate` and `plan`.
pub fn unresolved(resources: &[BoxedResource]) -> Vec<Validation> {
    resources
        .iter()
        .filter_map(|resource| {
            let ResourceState::Present(attributes) = resource.desired_state() else {
                return None;
            };
            let diagnostics: Vec<Diagnostic> = attributes
                .iter()
                .filter(|(_, value)| value.is_unknown())
                .map(|(name, _)| Diagnostic {
                    severity: Severity::Warning,
                    summary: "Value is never known".to_string(),
                    detail: format!("`{name}` is {UNKNOWN_MARKER}; apply refuses until it is set"),
                    attribute: Some(AttributePath::root(name)),
                })
                .collect();
            (!diagnostics.is_empty()).then(|| Validation {
                resource_id: resource.id(),
                diagnostics,
                rule_error: false,
            })
        })
        .collect()
}

/// Print validation findings, returning how many are errors
pub fn report(validations: &[Validation]) -> usize {
    let mut errors = 0;
    for validation in validations {
        println!();
        let failing = validation
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error);
        let mark = if failing { "✗".red() } else { "!".yellow() };
        println!("  {mark} {}", validation.resource_id.bold());
        for diagnostic in &validation.diagnostics {
            let summary = match &diagnostic.attribute {
                Some(path) => format!("{path}: {}", diagnostic.summary),
                None => diagnostic.summary.clone(),
            };
            if diagnostic.severity == Severity::Error {
                errors += 1;
                println!("      {}", summary.red());
            } else {
                println!("      {}", summary.yellow());
            }
            println!("        {}", diagnostic.detail.dimmed());
        }
        if validation.rule_error {
            println!("        {}", "this is a bug in bunnyform, not in the configuration".dimmed());
        }
    }
    errors
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_select_by_target() {
        let (_dir, workspace) = workspace(CONFIG);
        assert_eq!(select(workspace.config.resources(), None).len(), 4);
        assert_eq!(select(workspace.config.resources(), Some("dns")).len(), 2);
        assert_eq!(select(workspace.config.resources(), Some("cdn")).len(), 2);

        let www = select(workspace.config.resources(), Some("dns_record.www"));
        assert_eq!(www.len(), 1);
        assert_eq!(www[0].id(), "dns_record.www");
    }

    #[test]
    fn test_unresolved_values_are_warnings() {
        let (_dir, workspace) = workspace(CONFIG);
        assert!(unresolved(&workspace.config.resources()).is_empty());

        let config = CONFIG.replace("\"cdn.example.net\"", "\"(known after apply)\"");
        let (_dir, workspace) = super::testing::workspace(&config);
        let findings = unresolved(&workspace.config.resources());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].resource_id, "dns_record.www");
        let diagnostic = &findings[0].diagnostics[0];
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert_eq!(diagnostic.attribute, Some(AttributePath::root("value")));
        assert_eq!(report(&findings), 0);
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Workspace::open(&dir.path().join("missing.toml"), dir.path())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Could not read config file"));
    }
}
