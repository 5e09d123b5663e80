#![cfg(unix)]

mod common;

use common::{io_entry, sh_settings, write_script, BRIDGE_SCRIPT};
use std::fs;
use std::time::Duration;
use webhook_manager::config_loader::{ConfigStore, WEBHOOK_CONFIG_FILE};
use webhook_manager::core::bridge_log::BridgeLog;
use webhook_manager::core::bridge_supervisor::{
    exit_marker, BridgeEvent, BridgeState, BridgeSupervisor, BridgeTransition, STOPPING_MARKER,
};
use webhook_manager::core::camera_manager::CameraManager;
use webhook_manager::core::script_runner::ScriptRunner;
use webhook_manager::errors::AppError;

fn supervisor_for(dir: &std::path::Path) -> BridgeSupervisor {
    let settings = sh_settings();
    BridgeSupervisor::new(ScriptRunner::new(&settings, dir), &settings.bridge_script, BridgeLog::new())
}

#[tokio::test]
async fn start_without_enabled_cameras_does_not_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("spawned");
    write_script(dir.path(), BRIDGE_SCRIPT, &format!("touch '{}'\n", marker.display()));
    let mut manager = CameraManager::load(ConfigStore::new(dir.path()));
    let mut supervisor = supervisor_for(dir.path());

    let result = supervisor.start(&mut manager);
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(supervisor.state(), BridgeState::Idle);
    assert!(supervisor.log().lines().is_empty());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!marker.exists());
    assert!(!dir.path().join(WEBHOOK_CONFIG_FILE).exists());
}

#[tokio::test]
async fn start_without_script_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::new(dir.path());
    let mut manager = CameraManager::load(store);
    manager.add(io_entry("lobby", true)).unwrap();
    let mut supervisor = supervisor_for(dir.path());
    assert!(matches!(supervisor.start(&mut manager), Err(AppError::NotFound(_))));
    assert_eq!(supervisor.state(), BridgeState::Idle);
}

#[tokio::test]
async fn config_is_persisted_before_the_script_runs() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), BRIDGE_SCRIPT, &format!("cat {}\n", WEBHOOK_CONFIG_FILE));
    let store = ConfigStore::new(dir.path());
    let mut manager = CameraManager::load(store);
    manager.add(io_entry("lobby", true)).unwrap();
    // Drop the file so only the start-time save can bring it back.
    fs::remove_file(dir.path().join(WEBHOOK_CONFIG_FILE)).unwrap();

    let mut supervisor = supervisor_for(dir.path());
    supervisor.start(&mut manager).unwrap();
    assert_eq!(supervisor.state(), BridgeState::Running);
    let transition = tokio::time::timeout(Duration::from_secs(10), supervisor.wait_until_idle())
        .await
        .unwrap();
    assert_eq!(transition, Some(BridgeTransition::Exited { exit_code: Some(0) }));
    assert!(supervisor.log().lines().iter().any(|l| l.contains("\"cameraName\": \"lobby\"")));
}

#[tokio::test]
async fn natural_exit_returns_to_idle_with_tagged_output() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), BRIDGE_SCRIPT, "echo connected\necho 'bad camera' >&2\nexit 3\n");
    let mut manager = CameraManager::load(ConfigStore::new(dir.path()));
    manager.add(io_entry("lobby", true)).unwrap();
    let mut supervisor = supervisor_for(dir.path());

    supervisor.start(&mut manager).unwrap();
    let transition = tokio::time::timeout(Duration::from_secs(10), supervisor.wait_until_idle())
        .await
        .unwrap();
    assert_eq!(transition, Some(BridgeTransition::Exited { exit_code: Some(3) }));
    assert_eq!(supervisor.state(), BridgeState::Idle);

    let log = supervisor.log();
    assert_eq!(log.count_message("connected"), 1);
    assert_eq!(log.count_message("[ERROR] bad camera"), 1);
    let last = log.lines().last().unwrap();
    assert!(last.ends_with(&exit_marker(Some(3))));
}

#[tokio::test]
async fn stop_logs_one_marker_even_when_exit_follows() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), BRIDGE_SCRIPT, "echo up\nsleep 30\n");
    let mut manager = CameraManager::load(ConfigStore::new(dir.path()));
    manager.add(io_entry("lobby", true)).unwrap();
    let mut supervisor = supervisor_for(dir.path());

    supervisor.start(&mut manager).unwrap();
    assert!(supervisor.pid().is_some());
    assert!(supervisor.stop());
    assert_eq!(supervisor.state(), BridgeState::Idle);
    assert!(!supervisor.stop());

    // Drain until the killed run's exit notification has been delivered.
    let drained = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match supervisor.next_event().await {
                Some(event @ BridgeEvent::Exited { .. }) => {
                    assert_eq!(supervisor.handle_event(event), None);
                    break;
                }
                Some(event) => {
                    supervisor.handle_event(event);
                }
                None => break,
            }
        }
    })
    .await;
    assert!(drained.is_ok());

    let log = supervisor.log();
    assert_eq!(log.count_message(STOPPING_MARKER), 1);
    assert_eq!(log.count_message("=== Stopping bridge ==="), 1);
    assert!(!log.lines().iter().any(|l| l.contains("=== Bridge exited")));
    assert_eq!(supervisor.state(), BridgeState::Idle);
}

#[tokio::test]
async fn stale_exit_after_natural_exit_and_stop_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), BRIDGE_SCRIPT, "exit 0\n");
    let mut manager = CameraManager::load(ConfigStore::new(dir.path()));
    manager.add(io_entry("lobby", true)).unwrap();
    let mut supervisor = supervisor_for(dir.path());

    supervisor.start(&mut manager).unwrap();
    // Let the process finish before stop() runs, so both paths race.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(supervisor.stop());
    let event = tokio::time::timeout(Duration::from_secs(10), supervisor.next_event())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(supervisor.handle_event(event), None);
    assert_eq!(supervisor.log().count_message(STOPPING_MARKER), 1);
    assert!(!supervisor.log().lines().iter().any(|l| l.contains("=== Bridge exited")));
}

#[tokio::test]
async fn second_start_while_running_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), BRIDGE_SCRIPT, "sleep 30\n");
    let mut manager = CameraManager::load(ConfigStore::new(dir.path()));
    manager.add(io_entry("lobby", true)).unwrap();
    let mut supervisor = supervisor_for(dir.path());

    supervisor.start(&mut manager).unwrap();
    let pid = supervisor.pid();
    assert!(matches!(supervisor.start(&mut manager), Err(AppError::Bridge(_))));
    assert_eq!(supervisor.pid(), pid);
    supervisor.shutdown();
    assert_eq!(supervisor.state(), BridgeState::Idle);
}
