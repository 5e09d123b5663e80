use crate::app_config::ManagerSettings;
use crate::camera_config::{CameraEntry, MilestoneData};
use crate::config_loader::ConfigStore;
use crate::core::bridge_log::BridgeLog;
use crate::core::bridge_supervisor::BridgeSupervisor;
use crate::core::camera_editor::filter_by_display;
use crate::core::camera_manager::CameraManager;
use crate::core::milestone_fetcher::MilestoneFetcher;
use crate::core::script_runner::ScriptRunner;
use anyhow::{bail, Context, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything an operation needs: settings, file locations and a script
/// runner rooted in the config directory.
pub struct OpContext {
    pub settings: ManagerSettings,
    pub store: ConfigStore,
    pub runner: ScriptRunner,
}

impl OpContext {
    pub fn new(config_dir: &Path, settings: ManagerSettings) -> Self {
        debug!("Operation context rooted at '{}'", config_dir.display());
        OpContext {
            runner: ScriptRunner::new(&settings, config_dir),
            store: ConfigStore::new(config_dir),
            settings,
        }
    }

    pub fn config_dir(&self) -> &Path {
        self.store.config_dir()
    }

    pub fn fetcher(&self) -> MilestoneFetcher {
        MilestoneFetcher::new(
            self.runner.clone(),
            &self.settings.fetch_script,
            self.store.credentials_script_path().to_path_buf(),
            Duration::from_secs(self.settings.fetch_timeout_seconds),
        )
    }

    pub fn camera_manager(&self) -> CameraManager {
        CameraManager::load(self.store.clone())
    }

    pub fn bridge_log_path(&self) -> Option<PathBuf> {
        self.settings
            .bridge_log_file
            .as_ref()
            .map(|name| self.config_dir().join(name))
    }

    pub fn bridge_supervisor(&self) -> Result<BridgeSupervisor> {
        let mut log = BridgeLog::new().with_echo(true);
        if let Some(path) = self.bridge_log_path() {
            log = log
                .with_file(&path)
                .with_context(|| format!("Failed to open bridge log file '{}'", path.display()))?;
        }
        Ok(BridgeSupervisor::new(self.runner.clone(), &self.settings.bridge_script, log))
    }
}

/// Resolves a user-supplied selector to one item: an exact id wins, then a
/// filter that must match exactly one display name (or one exactly, ignoring
/// case).
pub fn resolve_choice<'a, T, I, D>(all: &'a [T], arg: &str, id_of: I, display_of: D, what: &str) -> Result<&'a T>
where
    I: Fn(&T) -> &str,
    D: Fn(&T) -> String,
{
    if let Some(item) = all.iter().find(|item| id_of(item) == arg) {
        return Ok(item);
    }
    let matches = filter_by_display(all, arg, &display_of);
    match matches.len() {
        0 => bail!("No {} matches '{}'.", what, arg),
        1 => Ok(matches[0]),
        _ => {
            let exact: Vec<&T> = matches
                .iter()
                .copied()
                .filter(|item| display_of(item).eq_ignore_ascii_case(arg.trim()))
                .collect();
            if exact.len() == 1 {
                return Ok(exact[0]);
            }
            let names: Vec<String> = matches.iter().map(|item| format!("{} ({})", display_of(item), id_of(item))).collect();
            bail!("'{}' matches several {}s: {}. Use the id instead.", arg, what, names.join(", "))
        }
    }
}

pub fn print_catalog(data: &MilestoneData, filter: Option<&str>) {
    let query = filter.unwrap_or("");
    let cameras = filter_by_display(&data.cameras, query, |c| c.name.clone());
    let event_types = filter_by_display(&data.event_types, query, |e| e.name.clone());
    let io_points = filter_by_display(&data.io_list, query, |io| io.display_name());

    println!("Cameras ({}):", cameras.len());
    for camera in cameras {
        println!("  {:<40} {}", camera.name, camera.id);
    }
    println!("Event types ({}):", event_types.len());
    for event_type in event_types {
        println!("  {:<40} {}", event_type.name, event_type.id);
    }
    println!("IO points ({}):", io_points.len());
    for io in io_points {
        println!("  {:<40} {}", io.display_name(), io.id);
    }
}

pub fn print_entries(entries: &[CameraEntry]) {
    if entries.is_empty() {
        println!("No cameras configured yet.");
        return;
    }
    println!("{:>3}  {:<3}  {:<24} {:<20} {:<12} {:<28} {}", "#", "on", "camera", "event", "type", "trigger", "webhook");
    for (idx, entry) in entries.iter().enumerate() {
        println!(
            "{:>3}  {:<3}  {:<24} {:<20} {:<12} {:<28} {}",
            idx + 1,
            if entry.enabled { "yes" } else { "no" },
            entry.camera_name,
            entry.event_type_name,
            entry.io_type.to_string(),
            entry.trigger_summary(),
            entry.webhook_url
        );
    }
}
