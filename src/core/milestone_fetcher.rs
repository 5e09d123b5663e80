use crate::camera_config::{CredentialsFile, MilestoneData};
use crate::common::file_utils::write_file_replacing;
use crate::config_loader::ConfigStore;
use crate::core::script_runner::ScriptRunner;
use crate::errors::AppError;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Addresses tried by discovery, in order.
pub const DISCOVERY_CANDIDATES: [&str; 4] = [
    "https://localhost",
    "https://127.0.0.1",
    "http://localhost",
    "http://127.0.0.1",
];

/// Runs the list-fetch script and parses its JSON stdout.
#[derive(Debug, Clone)]
pub struct MilestoneFetcher {
    runner: ScriptRunner,
    script_path: PathBuf,
    credentials_path: PathBuf,
    timeout: Duration,
}

impl MilestoneFetcher {
    pub fn new(runner: ScriptRunner, script_name: &str, credentials_path: PathBuf, timeout: Duration) -> Self {
        let script_path = runner.script_path(script_name);
        MilestoneFetcher { runner, script_path, credentials_path, timeout }
    }

    /// Fetches the camera/event/IO catalog. Any failure is reported as
    /// `AppError::Fetch`.
    pub async fn fetch(&self) -> Result<MilestoneData, AppError> {
        if !self.credentials_path.is_file() {
            return Err(AppError::Fetch(format!(
                "No saved credentials at '{}'. Save credentials first.",
                self.credentials_path.display()
            )));
        }
        let start_time = Instant::now();
        let output = self
            .runner
            .run_to_completion(&self.script_path, self.timeout)
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        if !output.success() {
            let detail = output.combined();
            return Err(AppError::Fetch(format!(
                "'{}' exited with code {:?}{}",
                self.script_path.display(),
                output.exit_code,
                if detail.is_empty() { String::new() } else { format!(": {}", detail) }
            )));
        }
        let data: MilestoneData = serde_json::from_str(output.stdout.trim())
            .map_err(|e| AppError::Fetch(format!("Unexpected output from fetch script: {}", e)))?;
        info!(
            "📥 Fetched {} cameras, {} event types, {} IO points in {:?}",
            data.cameras.len(),
            data.event_types.len(),
            data.io_list.len(),
            start_time.elapsed()
        );
        Ok(data)
    }
}

/// Something that can attempt a catalog fetch against a given API address.
#[async_trait]
pub trait CatalogSource {
    async fn fetch_with_api_url(&mut self, api_base_url: &str) -> Result<MilestoneData, AppError>;
}

/// Rewrites the saved credentials with each candidate address, then runs
/// the fetch script against them. The credential files as they were on
/// creation can be put back with `restore`.
pub struct ScriptCatalogSource<'a> {
    store: &'a ConfigStore,
    fetcher: &'a MilestoneFetcher,
    credentials: CredentialsFile,
    saved_json: Option<Vec<u8>>,
    saved_script: Option<Vec<u8>>,
}

impl<'a> ScriptCatalogSource<'a> {
    /// Fails without touching any file when no credentials are saved.
    pub fn new(store: &'a ConfigStore, fetcher: &'a MilestoneFetcher) -> Result<Self, AppError> {
        let credentials = store.load_credentials().ok_or_else(|| {
            AppError::Fetch(format!(
                "No saved credentials in '{}'. Save credentials first.",
                store.config_dir().display()
            ))
        })?;
        Ok(ScriptCatalogSource {
            saved_json: fs::read(store.credentials_json_path()).ok(),
            saved_script: fs::read(store.credentials_script_path()).ok(),
            store,
            fetcher,
            credentials,
        })
    }

    pub fn credentials(&self) -> &CredentialsFile {
        &self.credentials
    }

    /// Puts both credential files back byte for byte.
    pub fn restore(&self) -> Result<(), AppError> {
        restore_file(self.store.credentials_json_path(), self.saved_json.as_deref())?;
        restore_file(self.store.credentials_script_path(), self.saved_script.as_deref())?;
        debug!("Credentials restored after discovery.");
        Ok(())
    }
}

fn restore_file(path: &Path, contents: Option<&[u8]>) -> Result<(), AppError> {
    match contents {
        Some(bytes) => write_file_replacing(path, bytes),
        None if path.exists() => fs::remove_file(path)
            .map_err(|e| AppError::Io(format!("Failed to remove '{}': {}", path.display(), e))),
        None => Ok(()),
    }
}

#[async_trait]
impl<'a> CatalogSource for ScriptCatalogSource<'a> {
    async fn fetch_with_api_url(&mut self, api_base_url: &str) -> Result<MilestoneData, AppError> {
        self.credentials.api_base_url = api_base_url.to_string();
        self.store
            .save_credentials(&self.credentials)
            .map_err(|e| AppError::Fetch(e.to_string()))?;
        self.fetcher.fetch().await
    }
}

#[derive(Debug)]
pub enum DiscoveryOutcome {
    Found { api_base_url: String, data: MilestoneData },
    Exhausted { tried: Vec<String> },
}

/// Tries each candidate in order and stops at the first successful fetch.
pub async fn discover_api_url<S: CatalogSource + Send>(source: &mut S, candidates: &[&str]) -> DiscoveryOutcome {
    let mut tried = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        info!("🔎 Trying {} ...", candidate);
        tried.push(candidate.to_string());
        match source.fetch_with_api_url(candidate).await {
            Ok(data) => {
                info!("✅ Connection found: {}", candidate);
                return DiscoveryOutcome::Found { api_base_url: candidate.to_string(), data };
            }
            Err(e) => debug!("{} did not answer: {}", candidate, e),
        }
    }
    warn!("No candidate address answered ({} tried).", tried.len());
    DiscoveryOutcome::Exhausted { tried }
}

/// Discovery against the real scripts. Refuses to run without saved
/// credentials, and leaves the credential files as they were when no
/// candidate answers.
pub async fn discover_with_scripts(
    store: &ConfigStore,
    fetcher: &MilestoneFetcher,
    candidates: &[&str],
) -> Result<DiscoveryOutcome, AppError> {
    let mut source = ScriptCatalogSource::new(store, fetcher)?;
    let outcome = discover_api_url(&mut source, candidates).await;
    if let DiscoveryOutcome::Exhausted { .. } = outcome {
        source.restore()?;
    }
    Ok(outcome)
}
