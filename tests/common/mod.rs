// Shared helpers for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use webhook_manager::app_config::ManagerSettings;
use webhook_manager::camera_config::{CameraEntry, IoType};

pub const BRIDGE_SCRIPT: &str = "bridge.sh";
pub const FETCH_SCRIPT: &str = "fetch.sh";
pub const TEST_SCRIPT: &str = "test-connection.sh";

/// Settings that run scripts with `sh` instead of PowerShell.
pub fn sh_settings() -> ManagerSettings {
    ManagerSettings {
        script_interpreter: "sh".to_string(),
        script_interpreter_args: Vec::new(),
        bridge_script: BRIDGE_SCRIPT.to_string(),
        fetch_script: FETCH_SCRIPT.to_string(),
        test_connection_script: TEST_SCRIPT.to_string(),
        fetch_timeout_seconds: 5,
        test_connection_timeout_seconds: 5,
        ..Default::default()
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).expect("write test script");
}

pub fn io_entry(camera: &str, enabled: bool) -> CameraEntry {
    CameraEntry {
        camera_id: format!("id-{}", camera),
        camera_name: camera.to_string(),
        event_type_id: "ev-1".into(),
        event_type_name: "Motion".into(),
        io_source_id: "io-1".into(),
        io_source_name: "[input] Door".into(),
        io_type: IoType::Input,
        webhook_url: format!("https://hooks.local/{}", camera),
        alarm_active_event_type_id: None,
        alarm_inactive_event_type_id: None,
        enabled,
    }
}

pub fn user_defined_entry(camera: &str) -> CameraEntry {
    CameraEntry {
        camera_id: format!("id-{}", camera),
        camera_name: camera.to_string(),
        event_type_id: "ev-2".into(),
        event_type_name: "Alarm".into(),
        io_type: IoType::UserDefined,
        webhook_url: format!("https://hooks.local/{}", camera),
        alarm_active_event_type_id: Some("alarm-on".into()),
        alarm_inactive_event_type_id: Some("alarm-off".into()),
        enabled: false,
        ..Default::default()
    }
}
