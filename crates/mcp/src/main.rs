use anyhow::{Context, Result};
use clap::Parser;
use std::io;

use weather_mcp::config::Config;
use weather_mcp::server::McpServer;
use weather_mcp::{logging, transport};

fn main() -> Result<()> {
    let config = Config::parse();

    logging::init(&config.log_file, &config.log_filter)?;
    logging::log_startup();
    transport::install_panic_hook();

    let server = McpServer::from_config(&config).context("failed to build tool registry")?;

    let stdin = io::stdin();
    let stdout = io::stdout();

    server
        .serve(stdin.lock(), stdout.lock())
        .context("stdio transport failed")
        .inspect_err(|e| tracing::error!(error = ?e, "fatal error"))
}
