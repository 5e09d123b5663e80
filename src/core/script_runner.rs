use crate::app_config::ManagerSettings;
use crate::errors::AppError;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Captured result of a script that ran to completion.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr (when there is any) on a new line.
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        match (stdout.is_empty(), stderr.is_empty()) {
            (_, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{}\n{}", stdout, stderr),
        }
    }
}

/// Builds `<interpreter> <args…> <script>` invocations rooted in the config
/// directory.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    interpreter: String,
    interpreter_args: Vec<String>,
    working_dir: PathBuf,
}

impl ScriptRunner {
    pub fn new(settings: &ManagerSettings, working_dir: impl Into<PathBuf>) -> Self {
        ScriptRunner {
            interpreter: settings.script_interpreter.clone(),
            interpreter_args: settings.script_interpreter_args.clone(),
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Resolves a script name relative to the working directory.
    pub fn script_path(&self, script_name: &str) -> PathBuf {
        self.working_dir.join(script_name)
    }

    /// Command with stdin closed, stdout/stderr piped and kill-on-drop set.
    pub fn command(&self, script: &Path) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.args(&self.interpreter_args)
            .arg(script)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);
        cmd
    }

    /// Runs a script and waits at most `timeout`. A script still running at
    /// the deadline is killed.
    pub async fn run_to_completion(&self, script: &Path, timeout: Duration) -> Result<ScriptOutput, AppError> {
        let start_time = Instant::now();
        debug!("▶️ Running '{}' (timeout {:?})", script.display(), timeout);
        let child = self.command(script).spawn().map_err(|e| {
            AppError::Script(format!("Could not start '{}': {}", script.display(), e))
        })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                AppError::Script(format!("Failed while waiting for '{}': {}", script.display(), e))
            })?,
            Err(_) => {
                return Err(AppError::Script(format!(
                    "'{}' did not finish within {} seconds",
                    script.display(),
                    timeout.as_secs()
                )))
            }
        };

        let result = ScriptOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            "'{}' finished with exit code {:?} in {:?}",
            script.display(),
            result.exit_code,
            start_time.elapsed()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_output_joins_streams() {
        let out = ScriptOutput { exit_code: Some(1), stdout: "a\n".into(), stderr: "b\n".into() };
        assert_eq!(out.combined(), "a\nb");
        let only_err = ScriptOutput { exit_code: Some(1), stdout: String::new(), stderr: "b".into() };
        assert_eq!(only_err.combined(), "b");
        assert!(!only_err.success());
    }
}
