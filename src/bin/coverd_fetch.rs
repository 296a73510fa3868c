//! Fetch a cover thumbnail from a running coverd service

use anyhow::Context as _;
use clap::Parser as _;
use coverd::{SearchStatus, cl, fetch_and_save};

#[tokio::main]
async fn main() -> anyhow::Result<SearchStatus> {
    // Parse CL args
    let cl_args = cl::FetchArgs::parse();

    // Init logger
    simple_logger::init_with_level(cl_args.verbosity).context("Failed to setup logger")?;

    // Run
    fetch_and_save(
        &cl_args.api_url,
        cl_args.timeout(),
        &cl_args.track,
        &cl_args.artist,
        &cl_args.output_filepath,
    )
    .await
}
