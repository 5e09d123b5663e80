use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

fn default_true() -> bool {
    true
}

/// Reference to a remote camera or event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IdName {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A physical input or output point. `kind` is "input" or "output" as
/// reported by the fetch script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IoItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl IoItem {
    pub fn display_name(&self) -> String {
        format!("[{}] {}", self.kind, self.name)
    }

    pub fn io_type(&self) -> IoType {
        if self.kind.eq_ignore_ascii_case("input") {
            IoType::Input
        } else {
            IoType::Output
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum IoType {
    Input,
    #[default]
    Output,
    UserDefined,
}

impl IoType {
    /// Case-insensitive parse. Values written by older tools, such as
    /// "Input" or an empty string, never fail; anything unknown is `Output`.
    pub fn parse_lenient(raw: &str) -> IoType {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("input") {
            IoType::Input
        } else if raw.eq_ignore_ascii_case("userDefined") || raw.eq_ignore_ascii_case("user_defined") {
            IoType::UserDefined
        } else {
            IoType::Output
        }
    }
}

impl<'de> Deserialize<'de> for IoType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(IoType::parse_lenient(raw.as_deref().unwrap_or("")))
    }
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IoType::Input => "input",
            IoType::Output => "output",
            IoType::UserDefined => "userDefined",
        };
        f.write_str(s)
    }
}

/// One webhook binding as stored in `WebhookConfig.json`.
///
/// Field order here is the on-disk field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CameraEntry {
    #[serde(default)]
    pub camera_id: String,
    #[serde(default)]
    pub camera_name: String,
    #[serde(default)]
    pub event_type_id: String,
    #[serde(default)]
    pub event_type_name: String,
    #[serde(default)]
    pub io_source_id: String,
    #[serde(default)]
    pub io_source_name: String,
    #[serde(default)]
    pub io_type: IoType,
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_active_event_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_inactive_event_type_id: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CameraEntry {
    /// True when either alarm field carries an id.
    pub fn uses_user_defined_events(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        set(&self.alarm_active_event_type_id) || set(&self.alarm_inactive_event_type_id)
    }

    /// Checks that exactly one of the IO pair or the alarm pair is populated,
    /// matching `io_type`.
    pub fn binding_is_consistent(&self) -> bool {
        let has_io = !self.io_source_id.is_empty();
        let has_alarms = self.alarm_active_event_type_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.alarm_inactive_event_type_id.as_deref().is_some_and(|s| !s.is_empty());
        match self.io_type {
            IoType::UserDefined => has_alarms && !has_io && self.io_source_name.is_empty(),
            IoType::Input | IoType::Output => {
                has_io
                    && self.alarm_active_event_type_id.is_none()
                    && self.alarm_inactive_event_type_id.is_none()
            }
        }
    }

    /// Short human description of what triggers this binding.
    pub fn trigger_summary(&self) -> String {
        match self.io_type {
            IoType::UserDefined => format!(
                "alarm active={} inactive={}",
                self.alarm_active_event_type_id.as_deref().unwrap_or("-"),
                self.alarm_inactive_event_type_id.as_deref().unwrap_or("-")
            ),
            _ => self.io_source_name.clone(),
        }
    }
}

/// Root document of `WebhookConfig.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfigRoot {
    #[serde(default)]
    pub api_base_url: String,
    #[serde(default)]
    pub cameras: Vec<CameraEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_active_event_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_inactive_event_type_id: Option<String>,
    #[serde(default = "default_true")]
    pub require_io_active: bool,
}

impl Default for WebhookConfigRoot {
    fn default() -> Self {
        WebhookConfigRoot {
            api_base_url: String::new(),
            cameras: Vec::new(),
            alarm_active_event_type_id: None,
            alarm_inactive_event_type_id: None,
            require_io_active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsFile {
    #[serde(default)]
    pub api_base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Catalog returned by the fetch script. Held in memory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneData {
    #[serde(default)]
    pub cameras: Vec<IdName>,
    #[serde(default)]
    pub event_types: Vec<IdName>,
    #[serde(default)]
    pub io_list: Vec<IoItem>,
}
