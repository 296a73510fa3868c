//! coverd service binary

use anyhow::Context as _;
use clap::Parser as _;
use coverd::{cl, server};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before parsing, it may hold credentials
    let dotenv = dotenvy::dotenv();

    // Parse CL args
    let cl_args = cl::ServeArgs::parse();

    // Init logger
    simple_logger::init_with_level(cl_args.verbosity).context("Failed to setup logger")?;
    match dotenv {
        Ok(path) => log::debug!("Loaded environment from {path:?}"),
        Err(err) if err.not_found() => {}
        Err(err) => log::warn!("Failed to load .env file: {err}"),
    }

    // Run
    server::run(cl_args).await
}
