// ABOUTME: Entry point for the tollgate CLI
// ABOUTME: Request errors exit with status 2, everything else with status 1

use clap::Parser;
use tollgate_cli::commands::Cli;
use tollgate_core::CredsError;

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    tollgate_log::init_for("tollgate", cli.verbose);

    if let Err(err) = tollgate_cli::run_command(cli.command, cli.config).await {
        let request_error = err
            .downcast_ref::<CredsError>()
            .is_some_and(CredsError::is_request_error);

        eprintln!("Error: {err:#}");
        std::process::exit(if request_error { 2 } else { 1 });
    }
}
