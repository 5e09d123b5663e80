use anyhow::{bail, Result};
use clap::ArgMatches;
use log::{debug, error, info};
use std::process::ExitCode;
use std::time::Instant;
use webhook_manager::app_config::ManagerSettings;
use webhook_manager::cli;
use webhook_manager::common::{error_report, file_utils, logging_setup};
use webhook_manager::config_loader;
use webhook_manager::operations::{self, op_helper::OpContext};

#[tokio::main]
async fn main() -> ExitCode {
    let main_start_time = Instant::now();
    let matches = cli::build_cli().get_matches();

    let config_dir = file_utils::resolve_config_dir(matches.get_one::<String>("config-dir").map(|s| s.as_str()));
    let settings_arg = matches.get_one::<String>("settings").map(|s| s.as_str());

    let settings = match config_loader::load_settings(&config_dir, settings_arg) {
        Ok(settings) => {
            logging_setup::initialize_logging(Some(&settings), &matches);
            settings
        }
        Err(e) => {
            logging_setup::initialize_logging(None, &matches);
            error_report::install(config_dir.join(ManagerSettings::default().error_log_file));
            error_report::report_failure("Loading settings", &e);
            return ExitCode::FAILURE;
        }
    };
    error_report::install(config_dir.join(&settings.error_log_file));
    info!("🚀 Webhook manager using config directory '{}'", config_dir.display());

    let ctx = OpContext::new(&config_dir, settings);
    let Some((operation_name, sub_matches)) = matches.subcommand() else {
        info!("🤔 No subcommand provided. Nothing to do.");
        return ExitCode::SUCCESS;
    };

    debug!("🎬 Dispatching to subcommand: {}", operation_name);
    let op_start_time = Instant::now();
    let op_result = dispatch(&ctx, operation_name, sub_matches).await;

    let code = match op_result {
        Ok(()) => {
            info!("✅ Operation '{}' completed successfully in {:?}.", operation_name, op_start_time.elapsed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Operation '{}' failed after {:?}.", operation_name, op_start_time.elapsed());
            error_report::report_failure(&format!("Operation '{}'", operation_name), &e);
            ExitCode::FAILURE
        }
    };
    debug!("🏁 Finished in {:?}.", main_start_time.elapsed());
    code
}

async fn dispatch(ctx: &OpContext, operation_name: &str, args: &ArgMatches) -> Result<()> {
    match operation_name {
        "credentials" => operations::credentials_op::handle_credentials_cli(ctx, args),
        "test-connection" => operations::connection_op::handle_test_connection_cli(ctx, args).await,
        "discover" => operations::connection_op::handle_discover_cli(ctx, args).await,
        "fetch" => operations::fetch_op::handle_fetch_cli(ctx, args).await,
        "list" => operations::camera_edit_op::handle_list_cli(ctx, args),
        "add" => operations::camera_edit_op::handle_add_cli(ctx, args).await,
        "edit" => operations::camera_edit_op::handle_edit_cli(ctx, args).await,
        "remove" => operations::camera_edit_op::handle_remove_cli(ctx, args),
        "enable" => operations::camera_edit_op::handle_set_enabled_cli(ctx, args, true),
        "disable" => operations::camera_edit_op::handle_set_enabled_cli(ctx, args, false),
        "require-io-active" => operations::camera_edit_op::handle_require_io_active_cli(ctx, args),
        "run" => operations::bridge_op::handle_run_cli(ctx, args).await,
        "console" => operations::bridge_op::handle_console_cli(ctx, args).await,
        other => bail!("Subcommand '{}' not implemented.", other),
    }
}
