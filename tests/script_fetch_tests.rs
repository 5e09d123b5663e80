#![cfg(unix)]

mod common;

use common::{sh_settings, write_script, FETCH_SCRIPT, TEST_SCRIPT};
use std::fs;
use std::time::Duration;
use webhook_manager::camera_config::CredentialsFile;
use webhook_manager::config_loader::ConfigStore;
use webhook_manager::core::bridge_supervisor::run_connection_test;
use webhook_manager::core::milestone_fetcher::{discover_with_scripts, DiscoveryOutcome, MilestoneFetcher, DISCOVERY_CANDIDATES};
use webhook_manager::core::script_runner::ScriptRunner;
use webhook_manager::errors::AppError;

const CATALOG_JSON: &str = r#"{"cameras":[{"id":"c1","name":"Cam1"}],"eventTypes":[{"id":"e1","name":"Motion"}],"ioList":[{"id":"i1","name":"Door","type":"input"}]}"#;

fn fetcher_for(dir: &std::path::Path, timeout: Duration) -> MilestoneFetcher {
    let settings = sh_settings();
    let store = ConfigStore::new(dir);
    MilestoneFetcher::new(
        ScriptRunner::new(&settings, dir),
        &settings.fetch_script,
        store.credentials_script_path().to_path_buf(),
        timeout,
    )
}

fn save_credentials(dir: &std::path::Path, url: &str) {
    ConfigStore::new(dir)
        .save_credentials(&CredentialsFile { api_base_url: url.into(), username: "ops".into(), password: None })
        .unwrap();
}

#[tokio::test]
async fn fetch_parses_script_output() {
    let dir = tempfile::tempdir().unwrap();
    save_credentials(dir.path(), "https://vms.local");
    write_script(dir.path(), FETCH_SCRIPT, &format!("echo '{}'\n", CATALOG_JSON));
    let data = fetcher_for(dir.path(), Duration::from_secs(5)).fetch().await.unwrap();
    assert_eq!(data.cameras[0].name, "Cam1");
    assert_eq!(data.event_types.len(), 1);
    assert_eq!(data.io_list[0].kind, "input");
}

#[tokio::test]
async fn fetch_failures_are_uniform() {
    let dir = tempfile::tempdir().unwrap();
    save_credentials(dir.path(), "https://vms.local");
    let fetcher = fetcher_for(dir.path(), Duration::from_secs(5));

    write_script(dir.path(), FETCH_SCRIPT, &format!("echo '{}'\nexit 1\n", CATALOG_JSON));
    assert!(matches!(fetcher.fetch().await, Err(AppError::Fetch(_))));

    write_script(dir.path(), FETCH_SCRIPT, "echo 'not json'\n");
    assert!(matches!(fetcher.fetch().await, Err(AppError::Fetch(_))));
}

#[tokio::test]
async fn fetch_times_out() {
    let dir = tempfile::tempdir().unwrap();
    save_credentials(dir.path(), "https://vms.local");
    write_script(dir.path(), FETCH_SCRIPT, "sleep 10\n");
    let fetcher = fetcher_for(dir.path(), Duration::from_millis(300));
    let started = std::time::Instant::now();
    assert!(matches!(fetcher.fetch().await, Err(AppError::Fetch(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn discovery_rewrites_credentials_until_one_answers() {
    let dir = tempfile::tempdir().unwrap();
    save_credentials(dir.path(), "https://old.local");
    // Succeeds only when the credentials file names http://localhost.
    write_script(
        dir.path(),
        FETCH_SCRIPT,
        &format!("grep -q '\"http://localhost\"' Credentials.ps1 || exit 1\necho '{}'\n", CATALOG_JSON),
    );
    let store = ConfigStore::new(dir.path());
    let fetcher = fetcher_for(dir.path(), Duration::from_secs(5));
    match discover_with_scripts(&store, &fetcher, &DISCOVERY_CANDIDATES).await.unwrap() {
        DiscoveryOutcome::Found { api_base_url, data } => {
            assert_eq!(api_base_url, "http://localhost");
            assert_eq!(data.cameras.len(), 1);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    let saved = store.load_credentials().unwrap();
    assert_eq!(saved.api_base_url, "http://localhost");
    assert_eq!(saved.username, "ops");
}

#[tokio::test]
async fn exhausted_discovery_keeps_saved_credentials() {
    let dir = tempfile::tempdir().unwrap();
    save_credentials(dir.path(), "https://vms.corp:8443");
    let store = ConfigStore::new(dir.path());
    let json_before = fs::read(store.credentials_json_path()).unwrap();
    let script_before = fs::read(store.credentials_script_path()).unwrap();
    write_script(dir.path(), FETCH_SCRIPT, "exit 1\n");
    let fetcher = fetcher_for(dir.path(), Duration::from_secs(5));

    match discover_with_scripts(&store, &fetcher, &DISCOVERY_CANDIDATES).await.unwrap() {
        DiscoveryOutcome::Exhausted { tried } => assert_eq!(tried.len(), 4),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(store.load_credentials().unwrap().api_base_url, "https://vms.corp:8443");
    assert_eq!(fs::read(store.credentials_json_path()).unwrap(), json_before);
    assert_eq!(fs::read(store.credentials_script_path()).unwrap(), script_before);
}

#[tokio::test]
async fn discovery_without_credentials_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("spawned");
    write_script(dir.path(), FETCH_SCRIPT, &format!("touch '{}'\n", marker.display()));
    let store = ConfigStore::new(dir.path());
    let fetcher = fetcher_for(dir.path(), Duration::from_secs(5));

    let result = discover_with_scripts(&store, &fetcher, &DISCOVERY_CANDIDATES).await;
    match result {
        Err(AppError::Fetch(msg)) => assert!(msg.contains("Save credentials first")),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(!marker.exists());
    assert!(!store.credentials_json_path().exists());
    assert!(!store.credentials_script_path().exists());
}

#[tokio::test]
async fn connection_test_reports_script_output_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let settings = sh_settings();
    let runner = ScriptRunner::new(&settings, dir.path());

    write_script(dir.path(), TEST_SCRIPT, "echo 'Connecting'\necho 'HTTP 401' >&2\nexit 2\n");
    match run_connection_test(&runner, TEST_SCRIPT, Duration::from_secs(5)).await {
        Err(AppError::Script(msg)) => {
            assert!(msg.contains("Connecting"));
            assert!(msg.contains("HTTP 401"));
        }
        other => panic!("unexpected result {:?}", other),
    }

    write_script(dir.path(), TEST_SCRIPT, "exit 4\n");
    match run_connection_test(&runner, TEST_SCRIPT, Duration::from_secs(5)).await {
        Err(AppError::Script(msg)) => assert!(msg.contains("Unknown error (exit code: 4)")),
        other => panic!("unexpected result {:?}", other),
    }

    write_script(dir.path(), TEST_SCRIPT, "echo Done\n");
    let output = run_connection_test(&runner, TEST_SCRIPT, Duration::from_secs(5)).await.unwrap();
    assert!(output.stdout.contains("Done"));
}
