use crate::camera_config::{CameraEntry, WebhookConfigRoot};
use crate::config_loader::ConfigStore;
use crate::errors::AppError;
use log::{debug, info};
use std::time::Instant;

/// In-memory camera list. Every mutation is written straight back through
/// the store.
pub struct CameraManager {
    store: ConfigStore,
    root: WebhookConfigRoot,
    api_base_url: String,
}

impl CameraManager {
    /// Loads the webhook config and merges the API address: the config
    /// file's `apiBaseUrl` wins when set, else the saved credentials' one.
    pub fn load(store: ConfigStore) -> Self {
        debug!("🛠️ Initializing CameraManager...");
        let start_time = Instant::now();
        let root = store.load();
        let api_base_url = if root.api_base_url.trim().is_empty() {
            store
                .load_credentials()
                .map(|c| c.api_base_url)
                .unwrap_or_default()
        } else {
            root.api_base_url.clone()
        };
        info!(
            "✅ CameraManager loaded {} camera entries ({} enabled) in {:?}.",
            root.cameras.len(),
            root.cameras.iter().filter(|c| c.enabled).count(),
            start_time.elapsed()
        );
        CameraManager { store, root, api_base_url }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn entries(&self) -> &[CameraEntry] {
        &self.root.cameras
    }

    pub fn entry(&self, index: usize) -> Result<&CameraEntry, AppError> {
        self.root.cameras.get(index).ok_or_else(|| self.missing(index))
    }

    pub fn enabled_count(&self) -> usize {
        self.root.cameras.iter().filter(|c| c.enabled).count()
    }

    pub fn require_io_active(&self) -> bool {
        self.root.require_io_active
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn set_api_base_url(&mut self, url: &str) {
        self.api_base_url = url.trim().to_string();
    }

    /// Writes the current state to `WebhookConfig.json`.
    pub fn save(&mut self) -> Result<(), AppError> {
        self.root.api_base_url = self.api_base_url.trim().to_string();
        self.store.save(&self.root)
    }

    pub fn add(&mut self, entry: CameraEntry) -> Result<usize, AppError> {
        info!("➕ Adding webhook for camera '{}' -> {}", entry.camera_name, entry.webhook_url);
        self.root.cameras.push(entry);
        self.save()?;
        Ok(self.root.cameras.len() - 1)
    }

    pub fn replace(&mut self, index: usize, entry: CameraEntry) -> Result<(), AppError> {
        let slot = self
            .root
            .cameras
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("No camera entry #{}", index + 1)))?;
        info!("✏️ Updating camera entry #{} ('{}')", index + 1, entry.camera_name);
        *slot = entry;
        self.save()
    }

    pub fn remove(&mut self, index: usize) -> Result<CameraEntry, AppError> {
        if index >= self.root.cameras.len() {
            return Err(self.missing(index));
        }
        let removed = self.root.cameras.remove(index);
        info!("🗑️ Removed camera entry #{} ('{}')", index + 1, removed.camera_name);
        self.save()?;
        Ok(removed)
    }

    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> Result<(), AppError> {
        let slot = self
            .root
            .cameras
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("No camera entry #{}", index + 1)))?;
        slot.enabled = enabled;
        self.save()
    }

    pub fn set_require_io_active(&mut self, value: bool) -> Result<(), AppError> {
        self.root.require_io_active = value;
        self.save()
    }

    fn missing(&self, index: usize) -> AppError {
        AppError::NotFound(format!(
            "No camera entry #{} ({} configured)",
            index + 1,
            self.root.cameras.len()
        ))
    }
}

// Helper to parse a 1-based entry index from the CLI
pub fn parse_camera_index_arg(index_str: &str) -> Result<usize, AppError> {
    debug!("📝 Parsing camera index argument: {:?}", index_str);
    match index_str.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(AppError::Validation(format!(
            "'{}' is not a valid entry number (use the numbers shown by `list`).",
            index_str
        ))),
    }
}
