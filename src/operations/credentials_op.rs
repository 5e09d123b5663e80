use crate::camera_config::CredentialsFile;
use crate::operations::op_helper::OpContext;
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use log::{debug, info};
use std::time::Instant;

pub fn handle_credentials_cli(ctx: &OpContext, args: &ArgMatches) -> Result<()> {
    match args.subcommand() {
        Some(("show", _)) => show_credentials(ctx),
        Some(("save", save_args)) => save_credentials(ctx, save_args),
        Some((other, _)) => bail!("Unknown credentials action '{}'.", other),
        None => show_credentials(ctx),
    }
}

fn show_credentials(ctx: &OpContext) -> Result<()> {
    match ctx.store.load_credentials() {
        Some(creds) => {
            println!("API address: {}", creds.api_base_url);
            println!("Username:    {}", creds.username);
            println!(
                "Password:    {}",
                if creds.password.as_deref().is_some_and(|p| !p.is_empty()) { "********" } else { "(not set)" }
            );
        }
        None => println!(
            "No credentials saved in '{}'. Use `credentials save` first.",
            ctx.config_dir().display()
        ),
    }
    Ok(())
}

fn save_credentials(ctx: &OpContext, args: &ArgMatches) -> Result<()> {
    let start_time = Instant::now();
    let existing = ctx.store.load_credentials().unwrap_or_default();
    let creds = CredentialsFile {
        api_base_url: args
            .get_one::<String>("api-url")
            .cloned()
            .unwrap_or(existing.api_base_url),
        username: args
            .get_one::<String>("username")
            .cloned()
            .unwrap_or(existing.username),
        password: args.get_one::<String>("password").cloned().or(existing.password),
    };
    debug!("Saving credentials for user '{}' at '{}'", creds.username, creds.api_base_url);
    ctx.store.save_credentials(&creds).context("Failed to save credentials")?;

    // Keep the webhook config's API address in step with the credentials.
    let mut manager = ctx.camera_manager();
    manager.set_api_base_url(&creds.api_base_url);
    manager.save().context("Failed to update the webhook configuration")?;

    info!("✅ Credentials saved in {:?}.", start_time.elapsed());
    println!("Credentials saved. You can now add cameras and start the bridge.");
    Ok(())
}
