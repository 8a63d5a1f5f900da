//! `bunnyform state`

use anyhow::Result;
use colored::Colorize;
use declarative::{Location, RemoteClient};

use crate::Context;
use crate::remote::FileRemote;
use crate::resource::ENTITY_TYPES;
use crate::state::ProviderState;
use crate::ui;

/// One managed resource and whether the remote still has it
#[derive(Debug, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub resource_type: String,
    pub location: Location,
    pub present: bool,
}

pub fn run(_ctx: &Context) -> Result<()> {
    let path = ProviderState::default_path()?;
    let state = ProviderState::load(&path)?;
    let remote = FileRemote::open_default()?;

    ui::header("Managed Resources");
    ui::kv("State", &path.display().to_string());
    ui::kv("Remote", &remote.path().display().to_string());
    ui::kv("Last updated", &state.last_updated.to_rfc3339());
    println!();

    let entries = entries(&state, &remote)?;
    if entries.is_empty() {
        ui::info("Nothing is managed yet. Run `bunnyform apply` first.");
    }
    for entry in &entries {
        let marker = if entry.present {
            "●".green()
        } else {
            "○".red()
        };
        println!(
            "  {marker} {:<36} {:<18} {}",
            entry.id,
            entry.resource_type.dimmed(),
            entry.location
        );
    }

    let missing = entries.iter().filter(|e| !e.present).count();
    if missing > 0 {
        println!();
        ui::warn(&format!(
            "{} missing from the remote; the next apply recreates them",
            ui::plural(missing, "resource")
        ));
    }

    let unmanaged = unmanaged(&state, &remote);
    if !unmanaged.is_empty() {
        println!();
        ui::info("Remote entities not managed by bunnyform:");
        for location in &unmanaged {
            ui::dim(&location.to_string());
        }
    }
    Ok(())
}

/// Every managed resource, checked against the remote
pub fn entries(state: &ProviderState, remote: &dyn RemoteClient) -> Result<Vec<Entry>> {
    state
        .resources
        .iter()
        .map(|(id, managed)| {
            Ok(Entry {
                id: id.clone(),
                resource_type: managed.resource_type.clone(),
                location: managed.location.clone(),
                present: managed.location.read(remote)?.is_some(),
            })
        })
        .collect()
}

/// Standalone remote entities that no managed resource points at
pub fn unmanaged(state: &ProviderState, remote: &FileRemote) -> Vec<Location> {
    ENTITY_TYPES
        .into_iter()
        .flat_map(|kind| {
            remote
                .ids(kind)
                .into_iter()
                .map(move |id| Location::entity(kind, id))
        })
        .filter(|location| !state.resources.values().any(|m| &m.location == location))
        .collect()
}
