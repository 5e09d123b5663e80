use crate::operations::op_helper::{print_catalog, OpContext};
use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;
use std::time::Instant;

pub async fn handle_fetch_cli(ctx: &OpContext, args: &ArgMatches) -> Result<()> {
    let start_time = Instant::now();
    let data = ctx
        .fetcher()
        .fetch()
        .await
        .context("Could not fetch data. Check the connection and that credentials are saved")?;
    print_catalog(&data, args.get_one::<String>("filter").map(String::as_str));
    info!("📥 Lists fetched in {:?}.", start_time.elapsed());
    Ok(())
}
