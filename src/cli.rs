use clap::{Arg, ArgAction, Command};
use log::debug;
use std::time::Instant;

fn index_arg() -> Arg {
    Arg::new("index")
        .value_name("INDEX")
        .required(true)
        .help("Entry number as shown by `list`")
        .action(ArgAction::Set)
}

// Selection flags shared by `add` and `edit`.
fn editor_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("camera").long("camera").value_name("ID|TEXT").help("Camera id, or text matching exactly one camera name").action(ArgAction::Set))
        .arg(Arg::new("event-type").long("event-type").value_name("ID|TEXT").help("Event type id or name filter").action(ArgAction::Set))
        .arg(Arg::new("webhook-url").long("webhook-url").value_name("URL").help("Webhook URL to call").action(ArgAction::Set))
        .arg(Arg::new("io").long("io").value_name("ID|TEXT").help("Input/output point id or '[type] name' filter").conflicts_with("user-defined").action(ArgAction::Set))
        .arg(Arg::new("user-defined").long("user-defined").help("Use user-defined alarm events instead of an IO point").action(ArgAction::SetTrue))
        .arg(Arg::new("alarm-active").long("alarm-active").value_name("ID|TEXT").help("Event raised when the alarm becomes active").action(ArgAction::Set))
        .arg(Arg::new("alarm-inactive").long("alarm-inactive").value_name("ID|TEXT").help("Event raised when the alarm becomes inactive").action(ArgAction::Set))
        .arg(Arg::new("interactive").short('i').long("interactive").help("Fill in the entry with interactive prompts").action(ArgAction::SetTrue))
}

pub fn build_cli() -> Command {
    debug!("⚙️ Building CLI interface...");
    let start_time = Instant::now();
    let cmd = Command::new("webhook-manager")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Manages camera-to-webhook bindings for the Milestone webhook bridge and runs the bridge script.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding WebhookConfig.json, credentials and scripts")
                .global(true)
                .action(ArgAction::Set)
        )
        .arg(
            Arg::new("settings")
                .short('s')
                .long("settings")
                .value_name("FILE")
                .help("Sets a custom settings file")
                .global(true)
                .action(ArgAction::Set)
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Enable debug logging")
                .global(true)
                .action(ArgAction::SetTrue)
        )
        .subcommand(
            Command::new("credentials")
                .about("Shows or saves the Milestone API credentials")
                .subcommand(Command::new("show").about("Shows the saved API address and username"))
                .subcommand(
                    Command::new("save")
                        .about("Saves credentials (JSON and the script-readable Credentials.ps1)")
                        .arg(Arg::new("api-url").long("api-url").value_name("URL").help("Milestone API base address").action(ArgAction::Set))
                        .arg(Arg::new("username").long("username").value_name("USER").action(ArgAction::Set))
                        .arg(Arg::new("password").long("password").value_name("PASSWORD").action(ArgAction::Set))
                )
        )
        .subcommand(Command::new("test-connection").about("Runs the connection test script"))
        .subcommand(Command::new("discover").about("Tries the usual local API addresses until one answers"))
        .subcommand(
            Command::new("fetch")
                .about("Fetches cameras, event types and IO points from Milestone")
                .arg(Arg::new("filter").long("filter").value_name("TEXT").help("Only show items whose name contains TEXT").action(ArgAction::Set))
        )
        .subcommand(Command::new("list").about("Lists the configured camera entries"))
        .subcommand(editor_args(Command::new("add").about("Adds a camera entry")))
        .subcommand(editor_args(Command::new("edit").about("Edits a camera entry").arg(index_arg())))
        .subcommand(Command::new("remove").about("Removes a camera entry").arg(index_arg()))
        .subcommand(Command::new("enable").about("Enables a camera entry").arg(index_arg()))
        .subcommand(Command::new("disable").about("Disables a camera entry").arg(index_arg()))
        .subcommand(
            Command::new("require-io-active")
                .about("Sets whether the bridge requires the IO point to be active")
                .arg(Arg::new("value").value_name("BOOL").required(true).value_parser(clap::value_parser!(bool)).action(ArgAction::Set))
        )
        .subcommand(Command::new("run").about("Starts the bridge and streams its log until it exits"))
        .subcommand(Command::new("console").about("Interactive console to start and stop the bridge"));
    debug!("✅ CLI interface built in {:?}", start_time.elapsed());
    cmd
}
