use crate::app_config::{ManagerSettings, SETTINGS_FILE_NAME};
use crate::camera_config::{CredentialsFile, WebhookConfigRoot};
use crate::common::file_utils;
use crate::errors::AppError;
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

pub const WEBHOOK_CONFIG_FILE: &str = "WebhookConfig.json";
pub const CREDENTIALS_JSON_FILE: &str = "Credentials.json";
pub const CREDENTIALS_SCRIPT_FILE: &str = "Credentials.ps1";

const URL_VAR: &str = "MilestoneApiBaseUrl";
const USER_VAR: &str = "MilestoneUsername";
const PASSWORD_VAR: &str = "MilestonePassword";

/// Loads manager settings. An explicit path must load; the default file in
/// the config directory is optional.
pub fn load_settings(config_dir: &Path, explicit_path: Option<&str>) -> Result<ManagerSettings> {
    let start_time = Instant::now();
    let path = match explicit_path {
        Some(p) => PathBuf::from(p),
        None => {
            let default_path = config_dir.join(SETTINGS_FILE_NAME);
            if !default_path.is_file() {
                debug!("No settings file at '{}', using defaults.", default_path.display());
                return Ok(ManagerSettings::default());
            }
            default_path
        }
    };
    debug!("📄 Attempting to load settings from: {}", path.display());

    let settings_str = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read settings file '{}'. 📖", path.display()))?;
    let settings: ManagerSettings = serde_yaml::from_str(&settings_str)
        .with_context(|| format!("Failed to parse YAML settings from '{}'. 💔", path.display()))?;

    validate_settings(&settings).with_context(|| "Settings validation failed 👎")?;
    info!("✅ Loaded settings from '{}' in {:?}", path.display(), start_time.elapsed());
    Ok(settings)
}

fn validate_settings(settings: &ManagerSettings) -> Result<()> {
    if settings.script_interpreter.trim().is_empty() {
        bail!("❌ script_interpreter cannot be empty.");
    }
    for (key, value) in [
        ("bridge_script", &settings.bridge_script),
        ("fetch_script", &settings.fetch_script),
        ("test_connection_script", &settings.test_connection_script),
        ("error_log_file", &settings.error_log_file),
    ] {
        if value.trim().is_empty() {
            bail!("❌ {} cannot be empty.", key);
        }
    }
    if settings.fetch_timeout_seconds == 0 {
        bail!("❌ fetch_timeout_seconds must be greater than zero.");
    }
    if settings.test_connection_timeout_seconds == 0 {
        bail!("❌ test_connection_timeout_seconds must be greater than zero.");
    }
    Ok(())
}

/// File locations inside one config directory plus the load/save routines
/// for the webhook config and the two credential forms.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_dir: PathBuf,
    config_path: PathBuf,
    credentials_json_path: PathBuf,
    credentials_script_path: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        ConfigStore {
            config_path: config_dir.join(WEBHOOK_CONFIG_FILE),
            credentials_json_path: config_dir.join(CREDENTIALS_JSON_FILE),
            credentials_script_path: config_dir.join(CREDENTIALS_SCRIPT_FILE),
            config_dir,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn credentials_json_path(&self) -> &Path {
        &self.credentials_json_path
    }

    /// The legacy file the external scripts read.
    pub fn credentials_script_path(&self) -> &Path {
        &self.credentials_script_path
    }

    /// Reads `WebhookConfig.json`. Missing or unreadable files degrade to the
    /// empty default.
    pub fn load(&self) -> WebhookConfigRoot {
        let path = &self.config_path;
        if !path.is_file() {
            debug!("No webhook config at '{}', starting empty.", path.display());
            return WebhookConfigRoot::default();
        }
        let parsed = fs::read_to_string(path)
            .map_err(AppError::from)
            .and_then(|s| serde_json::from_str::<WebhookConfigRoot>(&s).map_err(AppError::from));
        match parsed {
            Ok(root) => {
                debug!("Loaded {} camera entries from '{}'", root.cameras.len(), path.display());
                root
            }
            Err(e) => {
                warn!("⚠️ Could not read '{}' ({}). Starting with an empty configuration.", path.display(), e);
                WebhookConfigRoot::default()
            }
        }
    }

    pub fn save(&self, root: &WebhookConfigRoot) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(root)?;
        file_utils::write_file_replacing(&self.config_path, json.as_bytes())?;
        debug!("💾 Saved {} camera entries to '{}'", root.cameras.len(), self.config_path.display());
        Ok(())
    }

    /// JSON credentials win when present; the legacy script file is only
    /// consulted when the JSON form is missing or unparseable.
    pub fn load_credentials(&self) -> Option<CredentialsFile> {
        if self.credentials_json_path.is_file() {
            match fs::read_to_string(&self.credentials_json_path)
                .map_err(AppError::from)
                .and_then(|s| serde_json::from_str::<CredentialsFile>(&s).map_err(AppError::from))
            {
                Ok(creds) => return Some(creds),
                Err(e) => warn!(
                    "⚠️ Ignoring unreadable '{}': {}",
                    self.credentials_json_path.display(),
                    e
                ),
            }
        }
        if self.credentials_script_path.is_file() {
            match fs::read_to_string(&self.credentials_script_path) {
                Ok(content) => return parse_legacy_credentials(&content),
                Err(e) => warn!(
                    "⚠️ Ignoring unreadable '{}': {}",
                    self.credentials_script_path.display(),
                    e
                ),
            }
        }
        None
    }

    /// Writes both credential forms. The URL is stored trimmed.
    pub fn save_credentials(&self, creds: &CredentialsFile) -> Result<(), AppError> {
        let url = creds.api_base_url.trim();
        if url.is_empty() {
            return Err(AppError::Validation("Enter the API address.".to_string()));
        }
        let normalized = CredentialsFile {
            api_base_url: url.to_string(),
            username: creds.username.clone(),
            password: creds.password.clone(),
        };
        file_utils::write_file_replacing(
            &self.credentials_script_path,
            render_legacy_credentials(&normalized).as_bytes(),
        )?;
        let json = serde_json::to_string_pretty(&normalized)?;
        file_utils::write_file_replacing(&self.credentials_json_path, json.as_bytes())?;
        info!("🔑 Credentials saved to '{}'", self.config_dir.display());
        Ok(())
    }
}

fn escape_script_string(value: &str) -> String {
    value.replace('"', "`\"")
}

fn unescape_script_string(value: &str) -> String {
    value.replace("`\"", "\"")
}

/// Renders the variable-assignment file consumed by the bridge scripts.
pub fn render_legacy_credentials(creds: &CredentialsFile) -> String {
    format!(
        "# Created by Milestone Webhook Manager\r\n${} = \"{}\"\r\n${} = \"{}\"\r\n${} = \"{}\"\r\n",
        URL_VAR,
        escape_script_string(&creds.api_base_url),
        USER_VAR,
        escape_script_string(&creds.username),
        PASSWORD_VAR,
        escape_script_string(creds.password.as_deref().unwrap_or("")),
    )
}

static ASSIGNMENT_REGEX: OnceLock<Regex> = OnceLock::new();

fn assignment_regex() -> &'static Regex {
    ASSIGNMENT_REGEX.get_or_init(|| {
        Regex::new(r#"\$(\w+)\s*=\s*"((?:`.|[^"`])*)""#).expect("assignment pattern is valid")
    })
}

// First `$var = "..."` assignment to `var`, unescaped.
fn extract_assignment(content: &str, var: &str) -> Option<String> {
    assignment_regex()
        .captures_iter(content)
        .find(|c| c.get(1).is_some_and(|name| name.as_str().eq_ignore_ascii_case(var)))
        .and_then(|c| c.get(2))
        .map(|m| unescape_script_string(m.as_str()))
}

/// Extracts `$Name = "value"` assignments from the legacy credentials file.
pub fn parse_legacy_credentials(content: &str) -> Option<CredentialsFile> {
    let url = extract_assignment(content, URL_VAR);
    let username = extract_assignment(content, USER_VAR);
    if url.is_none() && username.is_none() {
        return None;
    }
    Some(CredentialsFile {
        api_base_url: url.unwrap_or_default(),
        username: username.unwrap_or_default(),
        password: extract_assignment(content, PASSWORD_VAR).filter(|p| !p.is_empty()),
    })
}
