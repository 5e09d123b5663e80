use env_logger::Builder;
use log::LevelFilter;
use crate::app_config::ManagerSettings;

pub fn initialize_logging(settings: Option<&ManagerSettings>, cli_matches: &clap::ArgMatches) {
    let mut builder = Builder::new();

    // Determine log level from CLI, then settings file, then default
    let log_level_str = if cli_matches.get_flag("debug") {
        "debug".to_string()
    } else {
        settings
            .and_then(|s| s.log_level.clone())
            .unwrap_or_else(|| "info".to_string())
    };

    let mut unrecognized = None;
    match log_level_str.to_lowercase().as_str() {
        "error" => builder.filter_level(LevelFilter::Error),
        "warn" => builder.filter_level(LevelFilter::Warn),
        "info" => builder.filter_level(LevelFilter::Info),
        "debug" => builder.filter_level(LevelFilter::Debug),
        "trace" => builder.filter_level(LevelFilter::Trace),
        s => {
            unrecognized = Some(s.to_string());
            builder.filter_level(LevelFilter::Info)
        }
    };

    builder.try_init().unwrap_or_else(|e| {
        eprintln!("Failed to initialize logger: {}. Logging might not work as expected.", e);
    });
    if let Some(level) = unrecognized {
        log::warn!("Unrecognized log level '{}', defaulting to info.", level);
    }
}
