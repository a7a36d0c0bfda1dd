// ABOUTME: Shared logging setup for tollgate binaries
// ABOUTME: init_for() scopes INFO (or DEBUG) to one crate and keeps everything else at WARN

use tracing_subscriber::EnvFilter;

/// Crate-filtered logging to stderr. Default: INFO for the named crate, WARN for everything else.
///
/// Keeps `russh` and `sqlx` chatter out of the way while issuance steps stay visible.
/// `verbose` raises the named crate to DEBUG.
pub fn init_for(crate_name: &str, verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let directive = format!("{crate_name}={level}");
    let filter = EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into())
        .add_directive(
            directive
                .parse()
                .unwrap_or_else(|_| tracing::Level::INFO.into()),
        );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn exports_init_for() {
        let _ = super::init_for as fn(&str, bool);
    }
}
