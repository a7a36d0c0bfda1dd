// ABOUTME: Implementation of 'tollgate lease' commands
// ABOUTME: Sets the mount-level lease policy applied to every issued credential

use anyhow::Result;
use tollgate_core::{admin, LeaseConfig};

use super::LeaseCommand;
use crate::Context;

pub async fn run(ctx: &Context, cmd: LeaseCommand) -> Result<()> {
    match cmd {
        LeaseCommand::Write { lease, lease_max } => {
            admin::write_lease(ctx.storage.as_ref(), LeaseConfig { lease, lease_max }).await?;
            println!("Lease set: {lease}s, max {lease_max}s");
            Ok(())
        }
    }
}
