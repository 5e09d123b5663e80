use crate::camera_config::{CameraEntry, IdName, IoItem, IoType, MilestoneData};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Io,
    UserDefined,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("Select a camera.")]
    MissingCamera,
    #[error("Select an event type.")]
    MissingEventType,
    #[error("Enter a webhook URL.")]
    MissingWebhookUrl,
    #[error("Select an input or output.")]
    MissingIoPoint,
    #[error("Select both the alarm-active and alarm-inactive events.")]
    MissingAlarmEvents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOutcome {
    Saved(CameraEntry),
    Cancelled,
}

/// Returns the items whose display name contains `query`, ignoring case.
/// A blank query returns everything. The source slice is never touched.
pub fn filter_by_display<'a, T, F>(source: &'a [T], query: &str, display: F) -> Vec<&'a T>
where
    F: Fn(&T) -> String,
{
    let query = query.trim();
    if query.is_empty() {
        return source.iter().collect();
    }
    let needle = query.to_lowercase();
    source
        .iter()
        .filter(|item| display(item).to_lowercase().contains(&needle))
        .collect()
}

/// Form state for creating or editing one `CameraEntry`.
pub struct CameraEditor<'a> {
    data: &'a MilestoneData,
    existing_enabled: Option<bool>,
    mode: EditorMode,
    camera: Option<IdName>,
    event_type: Option<IdName>,
    io_point: Option<IoItem>,
    alarm_active: Option<IdName>,
    alarm_inactive: Option<IdName>,
    webhook_url: String,
}

impl<'a> CameraEditor<'a> {
    pub fn new(data: &'a MilestoneData, existing: Option<&CameraEntry>) -> Self {
        let mut editor = CameraEditor {
            data,
            existing_enabled: existing.map(|e| e.enabled),
            mode: EditorMode::Io,
            camera: None,
            event_type: None,
            io_point: None,
            alarm_active: None,
            alarm_inactive: None,
            webhook_url: String::new(),
        };
        if let Some(entry) = existing {
            if entry.uses_user_defined_events() {
                editor.mode = EditorMode::UserDefined;
            }
            // Ids that vanished from the catalog simply stay unselected.
            editor.select_camera(&entry.camera_id);
            editor.select_event_type(&entry.event_type_id);
            editor.select_io_point(&entry.io_source_id);
            if let Some(id) = &entry.alarm_active_event_type_id {
                editor.select_alarm_active(id);
            }
            if let Some(id) = &entry.alarm_inactive_event_type_id {
                editor.select_alarm_inactive(id);
            }
            editor.webhook_url = entry.webhook_url.clone();
        }
        editor
    }

    pub fn data(&self) -> &'a MilestoneData {
        self.data
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    pub fn camera(&self) -> Option<&IdName> {
        self.camera.as_ref()
    }

    pub fn event_type(&self) -> Option<&IdName> {
        self.event_type.as_ref()
    }

    pub fn io_point(&self) -> Option<&IoItem> {
        self.io_point.as_ref()
    }

    pub fn alarm_active(&self) -> Option<&IdName> {
        self.alarm_active.as_ref()
    }

    pub fn alarm_inactive(&self) -> Option<&IdName> {
        self.alarm_inactive.as_ref()
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    pub fn set_webhook_url(&mut self, url: &str) {
        self.webhook_url = url.to_string();
    }

    pub fn select_camera(&mut self, id: &str) -> bool {
        self.camera = find_by_id(&self.data.cameras, id);
        self.camera.is_some()
    }

    pub fn select_event_type(&mut self, id: &str) -> bool {
        self.event_type = find_by_id(&self.data.event_types, id);
        self.event_type.is_some()
    }

    pub fn select_io_point(&mut self, id: &str) -> bool {
        self.io_point = self.data.io_list.iter().find(|io| io.id == id).cloned();
        self.io_point.is_some()
    }

    pub fn select_alarm_active(&mut self, id: &str) -> bool {
        self.alarm_active = find_by_id(&self.data.event_types, id);
        self.alarm_active.is_some()
    }

    pub fn select_alarm_inactive(&mut self, id: &str) -> bool {
        self.alarm_inactive = find_by_id(&self.data.event_types, id);
        self.alarm_inactive.is_some()
    }

    pub fn cameras_matching(&self, query: &str) -> Vec<&'a IdName> {
        let data: &'a MilestoneData = self.data;
        filter_by_display(&data.cameras, query, |c| c.name.clone())
    }

    pub fn event_types_matching(&self, query: &str) -> Vec<&'a IdName> {
        let data: &'a MilestoneData = self.data;
        filter_by_display(&data.event_types, query, |e| e.name.clone())
    }

    pub fn io_points_matching(&self, query: &str) -> Vec<&'a IoItem> {
        let data: &'a MilestoneData = self.data;
        filter_by_display(&data.io_list, query, IoItem::display_name)
    }

    /// Validates the form and builds the entry. On error the form is left
    /// as it was so the caller can correct it and submit again.
    pub fn submit(&self) -> Result<CameraEntry, EditorError> {
        let camera = self.camera.as_ref().ok_or(EditorError::MissingCamera)?;
        let event_type = self.event_type.as_ref().ok_or(EditorError::MissingEventType)?;
        let url = self.webhook_url.trim();
        if url.is_empty() {
            return Err(EditorError::MissingWebhookUrl);
        }

        let mut entry = CameraEntry {
            camera_id: camera.id.clone(),
            camera_name: camera.name.clone(),
            event_type_id: event_type.id.clone(),
            event_type_name: event_type.name.clone(),
            webhook_url: url.to_string(),
            enabled: self.existing_enabled.unwrap_or(true),
            ..Default::default()
        };
        match self.mode {
            EditorMode::Io => {
                let io = self.io_point.as_ref().ok_or(EditorError::MissingIoPoint)?;
                entry.io_source_id = io.id.clone();
                entry.io_source_name = io.display_name();
                entry.io_type = io.io_type();
            }
            EditorMode::UserDefined => {
                let (active, inactive) = match (&self.alarm_active, &self.alarm_inactive) {
                    (Some(a), Some(i)) => (a, i),
                    _ => return Err(EditorError::MissingAlarmEvents),
                };
                entry.io_type = IoType::UserDefined;
                entry.alarm_active_event_type_id = Some(active.id.clone());
                entry.alarm_inactive_event_type_id = Some(inactive.id.clone());
            }
        }
        Ok(entry)
    }
}

fn find_by_id(list: &[IdName], id: &str) -> Option<IdName> {
    if id.is_empty() {
        return None;
    }
    list.iter().find(|item| item.id == id).cloned()
}
