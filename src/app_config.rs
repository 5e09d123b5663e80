use serde::Deserialize;

pub const BRIDGE_SCRIPT_NAME: &str = "Start-MilestoneWebhookBridge.ps1";
pub const FETCH_SCRIPT_NAME: &str = "Get-MilestoneConfigData.ps1";
pub const TEST_CONNECTION_SCRIPT_NAME: &str = "Test-MilestoneConnection.ps1";
pub const SETTINGS_FILE_NAME: &str = "webhook-manager.yaml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ManagerSettings {
    pub script_interpreter: String, // e.g., "powershell.exe", "pwsh"
    pub script_interpreter_args: Vec<String>, // placed before the script path
    pub bridge_script: String,
    pub fetch_script: String,
    pub test_connection_script: String,
    pub fetch_timeout_seconds: u64,
    pub test_connection_timeout_seconds: u64,
    pub log_level: Option<String>, // CLI --debug takes precedence
    pub error_log_file: String, // relative to the config directory
    pub bridge_log_file: Option<String>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        let (interpreter, args): (&str, &[&str]) = if cfg!(windows) {
            ("powershell.exe", &["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"])
        } else {
            ("pwsh", &["-NoProfile", "-File"])
        };
        ManagerSettings {
            script_interpreter: interpreter.to_string(),
            script_interpreter_args: args.iter().map(|s| s.to_string()).collect(),
            bridge_script: BRIDGE_SCRIPT_NAME.to_string(),
            fetch_script: FETCH_SCRIPT_NAME.to_string(),
            test_connection_script: TEST_CONNECTION_SCRIPT_NAME.to_string(),
            fetch_timeout_seconds: 15,
            test_connection_timeout_seconds: 30,
            log_level: Some("info".to_string()),
            error_log_file: "error.log".to_string(),
            bridge_log_file: None,
        }
    }
}
