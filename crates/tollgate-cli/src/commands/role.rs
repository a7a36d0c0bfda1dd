// ABOUTME: Implementation of 'tollgate role' commands
// ABOUTME: Writes role records from JSON files and lists stored roles

use anyhow::{Context as _, Result};
use std::path::Path;
use tollgate_core::admin;
use tollgate_core::RoleEntry;

use super::RoleCommand;
use crate::Context;

pub async fn run(ctx: &Context, cmd: RoleCommand) -> Result<()> {
    match cmd {
        RoleCommand::Write { name, file } => write_role(ctx, &name, &file).await,
        RoleCommand::List => list_roles(ctx).await,
    }
}

/// Read a role record from a JSON file.
pub fn read_entry(path: &Path) -> Result<RoleEntry> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read role from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse role from {}", path.display()))
}

async fn write_role(ctx: &Context, name: &str, file: &Path) -> Result<()> {
    let entry = read_entry(file)?;
    let role = admin::write_role(ctx.storage.as_ref(), name, entry).await?;
    println!("Role '{}' written ({})", role.name, role.key_type.as_str());
    Ok(())
}

async fn list_roles(ctx: &Context) -> Result<()> {
    let names = admin::list_roles(ctx.storage.as_ref()).await?;
    if names.is_empty() {
        println!("No roles found");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
