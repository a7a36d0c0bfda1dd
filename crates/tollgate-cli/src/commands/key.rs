// ABOUTME: Implementation of 'tollgate key' commands
// ABOUTME: Stores the administrative private keys dynamic roles connect with

use anyhow::{Context as _, Result};
use tollgate_core::admin;

use super::KeyCommand;
use crate::Context;

pub async fn run(ctx: &Context, cmd: KeyCommand) -> Result<()> {
    match cmd {
        KeyCommand::Write { name, file } => {
            let key = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read key from {}", file.display()))?;
            admin::write_host_key(ctx.storage.as_ref(), &name, key).await?;
            println!("Key '{name}' written");
            Ok(())
        }
    }
}
