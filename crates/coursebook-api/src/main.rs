// crates/coursebook-api/src/main.rs
// ============================================================================
// Module: Coursebook API Entry Point
// Description: Binary entry for the Coursebook HTTP server.
// Purpose: Load configuration, assemble the server, and run it.
// Dependencies: coursebook-api, coursebook-config, tokio
// ============================================================================

//! ## Overview
//! The binary takes one optional argument: a config file path. Without it,
//! the `COURSEBOOK_CONFIG` environment variable and then `coursebook.toml`
//! in the working directory are tried. Startup failures print one line and
//! exit non-zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use coursebook_api::ApiServer;
use coursebook_config::CoursebookConfig;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Loads configuration and runs the server.
#[tokio::main]
#[allow(clippy::print_stderr, reason = "startup failures are reported on stderr")]
async fn main() -> ExitCode {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = match CoursebookConfig::load(path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("coursebook-api: {err}");
            return ExitCode::FAILURE;
        }
    };
    let server = match ApiServer::from_config(&config).await {
        Ok(server) => server,
        Err(err) => {
            eprintln!("coursebook-api: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = server.serve().await {
        eprintln!("coursebook-api: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
