use crate::core::bridge_log::BridgeLog;
use crate::core::camera_manager::CameraManager;
use crate::core::script_runner::{ScriptOutput, ScriptRunner};
use crate::errors::AppError;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub const STARTING_MARKER: &str = "=== Bridge starting ===";
pub const STOPPING_MARKER: &str = "=== Stopping bridge ===";
pub const ERROR_TAG: &str = "[ERROR]";

// How long the exit watcher waits for the output readers to drain.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Messages from the per-run background tasks. Each carries the id of the
/// run that produced it so stale events can be told apart.
#[derive(Debug)]
pub enum BridgeEvent {
    Line { run_id: u64, stream: OutputStream, line: String },
    Exited { run_id: u64, exit_code: Option<i32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeTransition {
    Exited { exit_code: Option<i32> },
}

struct RunningBridge {
    run_id: u64,
    pid: Option<u32>,
    // Sending, or dropping, this kills the child.
    kill_tx: oneshot::Sender<()>,
}

/// Owns the bridge child process lifecycle: `Idle -> Running -> Idle`.
///
/// All state changes happen on the task that owns the supervisor. Output
/// and exit notifications arrive through `next_event` and are applied with
/// `handle_event`.
pub struct BridgeSupervisor {
    runner: ScriptRunner,
    script_path: PathBuf,
    log: BridgeLog,
    running: Option<RunningBridge>,
    next_run_id: u64,
    events_tx: mpsc::UnboundedSender<BridgeEvent>,
    events_rx: mpsc::UnboundedReceiver<BridgeEvent>,
}

impl BridgeSupervisor {
    pub fn new(runner: ScriptRunner, script_name: &str, log: BridgeLog) -> Self {
        let script_path = runner.script_path(script_name);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        BridgeSupervisor {
            runner,
            script_path,
            log,
            running: None,
            next_run_id: 1,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> BridgeState {
        if self.running.is_some() {
            BridgeState::Running
        } else {
            BridgeState::Idle
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().and_then(|r| r.pid)
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    pub fn log(&self) -> &BridgeLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut BridgeLog {
        &mut self.log
    }

    /// Persists the camera config and launches the bridge script.
    ///
    /// Fails without spawning when already running, when the script is
    /// missing, or when no camera entry is enabled.
    pub fn start(&mut self, manager: &mut CameraManager) -> Result<(), AppError> {
        if self.running.is_some() {
            return Err(AppError::Bridge(
                "The bridge is already running. Stop it before starting it again.".to_string(),
            ));
        }
        if !self.script_path.is_file() {
            return Err(AppError::NotFound(format!(
                "{} was not found.",
                self.script_path.display()
            )));
        }
        if manager.enabled_count() == 0 {
            return Err(AppError::Validation(
                "Enable at least one camera, or add one.".to_string(),
            ));
        }
        manager.save()?;

        self.log.append(STARTING_MARKER);
        self.log.append(&format!("Running script: {}", self.script_path.display()));

        let mut child = match self.runner.command(&self.script_path).spawn() {
            Ok(child) => child,
            Err(e) => {
                self.log.append(&format!("{} Could not start the bridge: {}", ERROR_TAG, e));
                return Err(AppError::Bridge(format!("Could not start the bridge: {}", e)));
            }
        };

        let run_id = self.next_run_id;
        self.next_run_id += 1;
        let pid = child.id();

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(run_id, OutputStream::Stdout, stdout, self.events_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(run_id, OutputStream::Stderr, stderr, self.events_tx.clone()));
        }
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(watch_child(run_id, child, readers, kill_rx, self.events_tx.clone()));

        self.running = Some(RunningBridge { run_id, pid, kill_tx });
        info!("🌉 Bridge started (run #{}, pid {:?}).", run_id, pid);
        Ok(())
    }

    /// Force-kills a running bridge. The run handle is cleared before the
    /// marker is written, so the later exit event for this run is ignored.
    pub fn stop(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            debug!("Stop requested while idle; nothing to do.");
            return false;
        };
        self.log.append(STOPPING_MARKER);
        // The watcher may already be gone if the process just exited.
        let _ = running.kill_tx.send(());
        info!("🛑 Bridge run #{} stopped.", running.run_id);
        true
    }

    /// Kills the bridge if it is still running when the application exits.
    pub fn shutdown(&mut self) {
        if self.stop() {
            info!("Bridge terminated during shutdown.");
        }
    }

    pub async fn next_event(&mut self) -> Option<BridgeEvent> {
        self.events_rx.recv().await
    }

    /// Applies one background event. Returns the transition when the
    /// current run exited on its own.
    pub fn handle_event(&mut self, event: BridgeEvent) -> Option<BridgeTransition> {
        let current = self.running.as_ref().map(|r| r.run_id);
        match event {
            BridgeEvent::Line { run_id, stream, line } => {
                if current != Some(run_id) || line.is_empty() {
                    return None;
                }
                match stream {
                    OutputStream::Stdout => self.log.append(&line),
                    OutputStream::Stderr => self.log.append(&format!("{} {}", ERROR_TAG, line)),
                }
                None
            }
            BridgeEvent::Exited { run_id, exit_code } => {
                if current != Some(run_id) {
                    debug!("Ignoring exit of run #{} (no longer current).", run_id);
                    return None;
                }
                self.running = None;
                self.log.append(&exit_marker(exit_code));
                info!("Bridge run #{} exited with code {:?}.", run_id, exit_code);
                Some(BridgeTransition::Exited { exit_code })
            }
        }
    }

    /// Processes events until the current run has exited.
    pub async fn wait_until_idle(&mut self) -> Option<BridgeTransition> {
        while self.running.is_some() {
            let event = self.next_event().await?;
            if let Some(transition) = self.handle_event(event) {
                return Some(transition);
            }
        }
        None
    }
}

pub fn exit_marker(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("=== Bridge exited (exit code {}) ===", code),
        None => "=== Bridge exited (terminated) ===".to_string(),
    }
}

fn spawn_reader<R>(
    run_id: u64,
    stream: OutputStream,
    pipe: R,
    tx: mpsc::UnboundedSender<BridgeEvent>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end_matches(&['\r', '\n'][..]).to_string();
                    if tx.send(BridgeEvent::Line { run_id, stream, line }).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Reading bridge {:?} failed: {}", stream, e);
                    break;
                }
            }
        }
    })
}

async fn watch_child(
    run_id: u64,
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    kill_rx: oneshot::Receiver<()>,
    tx: mpsc::UnboundedSender<BridgeEvent>,
) {
    let exit_code = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => status.code(),
            Err(e) => {
                warn!("Waiting on bridge run #{} failed: {}", run_id, e);
                None
            }
        },
        _ = kill_rx => {
            if let Err(e) = child.kill().await {
                warn!("Could not kill bridge run #{}: {}", run_id, e);
            }
            for reader in &readers {
                reader.abort();
            }
            None
        }
    };

    for reader in readers {
        let abort = reader.abort_handle();
        match tokio::time::timeout(READER_DRAIN_TIMEOUT, reader).await {
            Ok(Err(e)) if e.is_panic() => error!("Bridge output reader for run #{} panicked: {}", run_id, e),
            Ok(_) => {}
            Err(_) => {
                debug!("Output reader for run #{} still open after exit; detaching.", run_id);
                abort.abort();
            }
        }
    }
    let _ = tx.send(BridgeEvent::Exited { run_id, exit_code });
}

/// Runs the connection-test script and waits for it. On failure the error
/// carries the script's combined output.
pub async fn run_connection_test(
    runner: &ScriptRunner,
    script_name: &str,
    timeout: Duration,
) -> Result<ScriptOutput, AppError> {
    let script = runner.script_path(script_name);
    let output = runner.run_to_completion(&script, timeout).await?;
    if output.success() {
        return Ok(output);
    }
    let mut message = output.combined();
    if message.is_empty() {
        message = match output.exit_code {
            Some(code) => format!("Unknown error (exit code: {})", code),
            None => "Unknown error (terminated by signal)".to_string(),
        };
    }
    Err(AppError::Script(format!("Connection failed: {}", message)))
}
