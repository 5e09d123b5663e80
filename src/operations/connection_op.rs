use crate::core::bridge_supervisor::run_connection_test;
use crate::core::milestone_fetcher::{discover_with_scripts, DiscoveryOutcome, DISCOVERY_CANDIDATES};
use crate::operations::op_helper::{print_catalog, OpContext};
use anyhow::{Context, Result};
use clap::ArgMatches;
use log::{debug, error, info};
use std::time::{Duration, Instant};

pub async fn handle_test_connection_cli(ctx: &OpContext, _args: &ArgMatches) -> Result<()> {
    let start_time = Instant::now();
    if ctx.store.load_credentials().is_none() {
        anyhow::bail!("No credentials saved. Run `credentials save` first.");
    }
    info!("🔌 Testing connection...");
    let timeout = Duration::from_secs(ctx.settings.test_connection_timeout_seconds);
    match run_connection_test(&ctx.runner, &ctx.settings.test_connection_script, timeout).await {
        Ok(output) => {
            debug!("Connection test output:\n{}", output.combined());
            info!("✅ Connection test finished in {:?}.", start_time.elapsed());
            println!("Connection succeeded.");
            Ok(())
        }
        Err(e) => {
            error!("❌ Connection test failed after {:?}.", start_time.elapsed());
            Err(e).context("Connection test failed")
        }
    }
}

pub async fn handle_discover_cli(ctx: &OpContext, _args: &ArgMatches) -> Result<()> {
    let start_time = Instant::now();
    let fetcher = ctx.fetcher();
    let outcome = discover_with_scripts(&ctx.store, &fetcher, &DISCOVERY_CANDIDATES)
        .await
        .context("Discovery could not run")?;

    match outcome {
        DiscoveryOutcome::Found { api_base_url, data } => {
            let mut manager = ctx.camera_manager();
            manager.set_api_base_url(&api_base_url);
            manager.save().context("Failed to store the discovered API address")?;
            info!("🔎 Discovery finished in {:?}.", start_time.elapsed());
            println!("Connection found: {}", api_base_url);
            print_catalog(&data, None);
            Ok(())
        }
        DiscoveryOutcome::Exhausted { tried } => {
            anyhow::bail!(
                "None of the usual addresses answered ({}). The saved credentials were left unchanged. Check that the Milestone Management Server is running and that the address is correct.",
                tried.join(", ")
            )
        }
    }
}
