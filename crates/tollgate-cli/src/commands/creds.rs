// ABOUTME: Implementation of 'tollgate creds'
// ABOUTME: Issues an OTP or dynamic key for creds/<role> and prints the leased secret as JSON

use anyhow::Result;
use std::sync::Arc;
use tollgate_core::{CredsBackend, CredsResponse, IssuerSettings};
use tollgate_ssh::RusshRemote;

use crate::Context;

pub async fn run(
    ctx: &Context,
    role: String,
    ip: String,
    username: Option<String>,
    show_internal: bool,
) -> Result<()> {
    let salt = ctx.salt().await?;
    let remote = RusshRemote::new(ctx.config.connect_timeout());
    let backend = CredsBackend::new(
        ctx.storage.clone(),
        salt,
        Arc::new(remote),
        IssuerSettings {
            max_otp_attempts: ctx.config.otp.max_attempts,
        },
    );

    let response = backend
        .issue_path(&format!("creds/{role}"), username, ip)
        .await?;

    println!("{}", render(&response, show_internal)?);
    Ok(())
}

/// Pretty JSON for a response. Revocation metadata only when asked for.
pub fn render(response: &CredsResponse, show_internal: bool) -> Result<String> {
    let mut value = serde_json::to_value(response)?;
    if !show_internal {
        if let Some(fields) = value.as_object_mut() {
            fields.remove("internal");
        }
    }
    Ok(serde_json::to_string_pretty(&value)?)
}
