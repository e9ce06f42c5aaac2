//! High-level command orchestration for the CLI.
//!
//! Handler functions for each subcommand (`list`, `use`, `save`, ...).
//! All state changes go through [`crate::manager::Manager`]; this layer
//! only decides presentation and collects interactive input. The core
//! never prompts or prints.

use anstyle::AnsiColor;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use inquire::{Confirm, Select, Text};
use std::time::{Duration, SystemTime};

use crate::duration::parse_retention;
use crate::manager::Manager;
use crate::storage::LiveFileStatus;
use crate::store::ProfileStatus;
use crate::ui::Ui;
use crate::validate;

const NEW_SETTINGS_LABEL: &str = "[New settings]";
const UNSAVED_LABEL: &str = "(current settings.json is unsaved)";

/// List all stored profiles with their status.
pub fn list(mgr: &Manager, ui: &Ui) -> Result<()> {
    let entries = mgr.list_entries()?;

    if entries.is_empty() {
        ui.warn("No saved settings found.");
        ui.newline();
        ui.println("Save the current settings.json with:");
        ui.println(format!("  {} save <name>", ui.bold("ccswitch")));
        return Ok(());
    }

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Settings"),
        ui.header_cell("Status"),
    ]);

    for entry in &entries {
        let (icon, name_cell, status_cell) = match &entry.status {
            ProfileStatus::Inactive => (" ", ui.cell(&entry.name), ui.cell("-")),
            ProfileStatus::Active { modified: false } => (
                ui.icon_ok(),
                ui.cell(&entry.name),
                ui.colored_cell("active", AnsiColor::Green),
            ),
            ProfileStatus::Active { modified: true } => (
                ui.icon_ok(),
                ui.cell(&entry.name),
                ui.colored_cell("active, modified", AnsiColor::Yellow),
            ),
            ProfileStatus::ActiveMissing => (
                ui.icon_warn(),
                ui.cell(&entry.name),
                ui.colored_cell("active, missing!", AnsiColor::Red),
            ),
            ProfileStatus::Unsaved => (
                ui.icon_warn(),
                ui.cell(ui.dim(UNSAVED_LABEL)),
                ui.cell(""),
            ),
        };
        table.add_row(vec![ui.cell(icon), name_cell, status_cell]);
    }

    ui.section("Settings");
    ui.println(table.to_string());
    Ok(())
}

/// Show the active pointer and the live settings file status.
pub fn current(mgr: &Manager, ui: &Ui) -> Result<()> {
    ui.section("Current Settings");
    ui.newline();

    let mut table = ui.simple_table();

    let active = mgr.store().active_name();
    if active.is_empty() {
        table.add_row(vec![ui.cell("Active settings:"), ui.cell("(none)")]);
    } else {
        table.add_row(vec![ui.cell("Active settings:"), ui.header_cell(&active)]);
    }

    let status_cell = match LiveFileStatus::detect(&mgr.paths().live_settings) {
        LiveFileStatus::Missing => ui.colored_cell("missing", AnsiColor::Yellow),
        LiveFileStatus::RegularFile => ui.cell("regular file"),
        LiveFileStatus::Symlink { target } => ui.colored_cell(
            format!("symlink → {} (refused by ccswitch)", target.display()),
            AnsiColor::Red,
        ),
    };
    table.add_row(vec![ui.cell("settings.json:"), status_cell]);

    ui.println(table.to_string());
    Ok(())
}

/// Activate a stored profile, prompting for one when no name was given.
pub fn use_profile(mgr: &Manager, ui: &Ui, name: Option<&str>) -> Result<()> {
    let name = match name {
        Some(name) => {
            // Validate the CLI argument before touching the filesystem.
            mgr.validate_name(name)?;
            name.to_string()
        }
        None => {
            let names = mgr.list_stored()?;
            if names.is_empty() {
                bail!(
                    "No stored settings available in {}",
                    mgr.paths().store_dir.display()
                );
            }
            let names = reorder_with_default(names, &mgr.store().active_name());
            Select::new("Select settings to activate", names)
                .prompt()
                .context("selection cancelled")?
        }
    };

    let name = mgr.use_profile(&name)?;
    ui.ok(format!("Switched to settings: {}", ui.bold(&name)));
    Ok(())
}

/// Save the live settings under a name, prompting when none was given.
pub fn save(mgr: &Manager, ui: &Ui, name: Option<&str>, assume_yes: bool) -> Result<()> {
    let target = match name {
        Some(name) => {
            mgr.validate_name(name)?;
            let name = name.trim().to_string();
            if mgr.store().exists(&name) && !assume_yes {
                let overwrite = Confirm::new(&format!("Overwrite '{}'?", name))
                    .with_default(false)
                    .prompt()
                    .context("confirmation cancelled")?;
                if !overwrite {
                    ui.println("Aborted saving settings.");
                    return Ok(());
                }
            }
            name
        }
        None => {
            let names = mgr.list_stored()?;
            let mut items = vec![NEW_SETTINGS_LABEL.to_string()];
            items.extend(reorder_with_default(names, &mgr.store().active_name()));
            let selection = Select::new("Select destination to save current settings", items)
                .prompt()
                .context("selection cancelled")?;

            if selection == NEW_SETTINGS_LABEL {
                prompt_new_name(mgr, ui)?
            } else {
                if !assume_yes {
                    let overwrite = Confirm::new(&format!("Overwrite '{}'?", selection))
                        .with_default(false)
                        .prompt()
                        .context("confirmation cancelled")?;
                    if !overwrite {
                        ui.println("Aborted saving settings.");
                        return Ok(());
                    }
                }
                selection
            }
        }
    };

    let name = mgr.save(&target)?;
    ui.ok(format!("Saved and activated settings: {}", ui.bold(&name)));
    Ok(())
}

/// Keep asking until the user supplies a valid, unused name.
fn prompt_new_name(mgr: &Manager, ui: &Ui) -> Result<String> {
    loop {
        let input = Text::new("Enter a name for the new settings")
            .prompt()
            .context("prompt cancelled")?;
        let name = match validate::normalize_name(&input) {
            Ok(name) => name,
            Err(err) => {
                ui.err(err.to_string());
                continue;
            }
        };
        if mgr.store().exists(&name) {
            ui.err(format!("Settings '{}' already exists.", name));
            continue;
        }
        return Ok(name);
    }
}

/// Delete backups that have not been observed within the retention window.
pub fn prune_backups(
    mgr: &Manager,
    ui: &Ui,
    older_than: Option<&str>,
    force: bool,
) -> Result<()> {
    let duration = match older_than {
        Some(value) => parse_retention(value)?,
        None => {
            let options = vec!["30d", "90d", "180d", "Cancel"];
            let choice = Select::new("Prune backups older than", options)
                .prompt()
                .context("selection cancelled")?;
            if choice == "Cancel" {
                ui.println("Prune cancelled.");
                return Ok(());
            }
            parse_retention(choice)?
        }
    };

    if !force {
        let cutoff = cutoff_label(duration);
        let confirm = Confirm::new(&format!("Delete backups last used before {}?", cutoff))
            .with_default(false)
            .prompt()
            .context("confirmation cancelled")?;
        if !confirm {
            ui.println("Prune cancelled.");
            return Ok(());
        }
    }

    let deleted = mgr.prune_backups(duration)?;
    if deleted == 0 {
        ui.info("No backups old enough to delete.");
    } else {
        ui.ok(format!("Deleted {} backup(s).", deleted));
    }
    Ok(())
}

fn cutoff_label(older_than: Duration) -> String {
    let cutoff = SystemTime::now()
        .checked_sub(older_than)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Local>::from(cutoff)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Move the active name to the front of the selection list.
fn reorder_with_default(mut items: Vec<String>, default: &str) -> Vec<String> {
    if let Some(idx) = items.iter().position(|item| item == default) {
        if idx > 0 {
            let item = items.remove(idx);
            items.insert(0, item);
        }
    }
    items
}
