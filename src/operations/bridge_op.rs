use crate::core::bridge_supervisor::{BridgeState, BridgeSupervisor, BridgeTransition};
use crate::core::camera_manager::CameraManager;
use crate::operations::op_helper::{print_entries, OpContext};
use anyhow::{Context, Result};
use clap::ArgMatches;
use log::{debug, info, warn};
use std::future::Future;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Starts the bridge and streams its log until it exits or Ctrl-C is
/// pressed.
pub async fn handle_run_cli(ctx: &OpContext, _args: &ArgMatches) -> Result<()> {
    let mut manager = ctx.camera_manager();
    let mut supervisor = ctx.bridge_supervisor()?;
    supervisor.start(&mut manager).context("Could not start the bridge")?;
    println!("Bridge running. Press Ctrl-C to stop it.");

    stream_until_exit(&mut supervisor, tokio::signal::ctrl_c()).await;
    supervisor.shutdown();
    Ok(())
}

/// Applies bridge events until the run exits or `interrupt` completes, in
/// which case the bridge is stopped. Returns the natural exit, if any.
pub async fn stream_until_exit<F: Future>(supervisor: &mut BridgeSupervisor, interrupt: F) -> Option<BridgeTransition> {
    let start_time = Instant::now();
    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            event = supervisor.next_event() => {
                let event = event?;
                if let Some(transition @ BridgeTransition::Exited { exit_code }) = supervisor.handle_event(event) {
                    info!("🏁 Bridge finished after {:?} (exit code {:?}).", start_time.elapsed(), exit_code);
                    return Some(transition);
                }
            }
            _ = &mut interrupt => {
                info!("Interrupt received, stopping the bridge.");
                supervisor.stop();
                return None;
            }
        }
    }
}

fn print_console_help() {
    println!("Commands: start, stop, status, list, log, clear, help, quit");
}

fn print_status(supervisor: &BridgeSupervisor, manager: &CameraManager) {
    match supervisor.state() {
        BridgeState::Running => println!("Bridge: running (pid {:?})", supervisor.pid()),
        BridgeState::Idle => println!("Bridge: stopped"),
    }
    println!(
        "Cameras: {} configured, {} enabled",
        manager.entries().len(),
        manager.enabled_count()
    );
}

/// Interactive loop. All bridge state is owned and changed here; output
/// from the running script arrives as events.
pub async fn handle_console_cli(ctx: &OpContext, _args: &ArgMatches) -> Result<()> {
    let mut manager = ctx.camera_manager();
    let mut supervisor = ctx.bridge_supervisor()?;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    print_console_help();

    loop {
        tokio::select! {
            event = supervisor.next_event() => {
                let Some(event) = event else { break };
                if let Some(BridgeTransition::Exited { .. }) = supervisor.handle_event(event) {
                    println!("Bridge finished. Type `start` to run it again.");
                }
            }
            line = stdin.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else { break };
                let command = line.trim().to_lowercase();
                debug!("Console command: '{}'", command);
                match command.as_str() {
                    "" => {}
                    "start" => match supervisor.start(&mut manager) {
                        Ok(()) => println!("Bridge running. See the log for status."),
                        Err(e) => {
                            warn!("Bridge start refused: {}", e);
                            println!("⚠️ {}", e);
                        }
                    },
                    "stop" => {
                        if supervisor.stop() {
                            println!("Bridge stopped.");
                        } else {
                            println!("Bridge is not running.");
                        }
                    }
                    "status" => print_status(&supervisor, &manager),
                    "list" => print_entries(manager.entries()),
                    "log" => {
                        for line in supervisor.log().lines() {
                            println!("{}", line);
                        }
                    }
                    "clear" => supervisor.log_mut().clear(),
                    "quit" | "exit" => break,
                    _ => print_console_help(),
                }
            }
            _ = &mut ctrl_c => {
                println!();
                break;
            }
        }
    }
    supervisor.shutdown();
    Ok(())
}
