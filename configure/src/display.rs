use std::io::{self, Write};

use trsync_config_core::{
    config::ServerSettings,
    instance::{Instance, InstanceState},
    selection::{WorkspaceEntry, WorkspaceLists},
};

pub fn write_settings(out: &mut dyn Write, settings: &ServerSettings) -> io::Result<()> {
    writeln!(
        out,
        "Local folder: {}",
        settings
            .local_folder
            .as_deref()
            .unwrap_or("(not set, please choose one)")
    )?;
    writeln!(
        out,
        "Prevent remote deletion at startup: {}",
        if settings.prevent_delete_sync {
            "yes"
        } else {
            "no"
        }
    )
}

pub fn write_instance(
    out: &mut dyn Write,
    instance: &Instance,
    state: InstanceState,
) -> io::Result<()> {
    writeln!(
        out,
        "{} ({}, {}, {})",
        instance.address,
        instance.username,
        instance.scheme(),
        state
    )?;
    write_lists(out, instance, &WorkspaceLists::from_instance(instance))
}

pub fn write_lists(
    out: &mut dyn Write,
    instance: &Instance,
    lists: &WorkspaceLists,
) -> io::Result<()> {
    write_entries(out, "Not synchronized workspaces", lists.left())?;
    write_entries(out, "Synchronized workspaces", lists.right())?;

    let stale = instance.stale_workspaces();
    if !stale.is_empty() {
        writeln!(
            out,
            "  Selected but unknown by server: {}",
            stale
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        )?;
    }

    Ok(())
}

fn write_entries(out: &mut dyn Write, title: &str, entries: &[WorkspaceEntry]) -> io::Result<()> {
    writeln!(out, "  {}:", title)?;
    if entries.is_empty() {
        writeln!(out, "    -")?;
    }
    for entry in entries {
        writeln!(out, "    [{}] {}", entry.id, entry.label)?;
    }
    Ok(())
}
