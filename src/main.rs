use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use gma_lua_api::{ApiRegistry, ToolConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use cli::Cli;

const DEFAULT_LOG_FILTER: &str = "gma_lua=info,gma_lua_api=info";

fn main() -> ExitCode {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::builder().parse_lossy(directives))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = ToolConfig::load(cli.config.as_deref()).context("error loading config")?;
    debug!("lint policy: {:?}", config.lint);

    let registry = ApiRegistry::gma2().context("built-in API schema is invalid")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let success = commands::execute(&cli.command, &registry, &config, &mut out)?;
    out.flush()?;
    Ok(success)
}
