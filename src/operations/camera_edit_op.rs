use crate::camera_config::{CameraEntry, IoItem, MilestoneData};
use crate::core::camera_editor::{CameraEditor, EditorMode, EditorOutcome};
use crate::core::camera_manager::{parse_camera_index_arg, CameraManager};
use crate::operations::op_helper::{print_entries, resolve_choice, OpContext};
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use log::{debug, info};
use std::time::Instant;

pub fn handle_list_cli(ctx: &OpContext, _args: &ArgMatches) -> Result<()> {
    let manager = ctx.camera_manager();
    println!("API address: {}", if manager.api_base_url().is_empty() { "(not set)" } else { manager.api_base_url() });
    println!("Require IO active: {}", manager.require_io_active());
    print_entries(manager.entries());
    Ok(())
}

pub async fn handle_add_cli(ctx: &OpContext, args: &ArgMatches) -> Result<()> {
    let start_time = Instant::now();
    let mut manager = ctx.camera_manager();
    let data = fetch_catalog(ctx).await?;
    match run_editor(&data, None, args)? {
        EditorOutcome::Saved(entry) => {
            let idx = manager.add(entry).context("Failed to save the new camera entry")?;
            info!("✅ Camera entry #{} added in {:?}.", idx + 1, start_time.elapsed());
            println!("Added entry #{}.", idx + 1);
        }
        EditorOutcome::Cancelled => println!("Cancelled. Nothing was changed."),
    }
    Ok(())
}

pub async fn handle_edit_cli(ctx: &OpContext, args: &ArgMatches) -> Result<()> {
    let start_time = Instant::now();
    let index = entry_index(args)?;
    let mut manager = ctx.camera_manager();
    let existing = manager.entry(index)?.clone();
    let data = fetch_catalog(ctx).await?;
    match run_editor(&data, Some(&existing), args)? {
        EditorOutcome::Saved(entry) => {
            manager.replace(index, entry).context("Failed to save the camera entry")?;
            info!("✅ Camera entry #{} updated in {:?}.", index + 1, start_time.elapsed());
            println!("Updated entry #{}.", index + 1);
        }
        EditorOutcome::Cancelled => println!("Cancelled. Nothing was changed."),
    }
    Ok(())
}

pub fn handle_remove_cli(ctx: &OpContext, args: &ArgMatches) -> Result<()> {
    let index = entry_index(args)?;
    let mut manager = ctx.camera_manager();
    let removed = manager.remove(index)?;
    println!("Removed entry #{} ({}).", index + 1, removed.camera_name);
    Ok(())
}

pub fn handle_set_enabled_cli(ctx: &OpContext, args: &ArgMatches, enabled: bool) -> Result<()> {
    let index = entry_index(args)?;
    let mut manager = ctx.camera_manager();
    manager.set_enabled(index, enabled)?;
    println!("Entry #{} {}.", index + 1, if enabled { "enabled" } else { "disabled" });
    Ok(())
}

pub fn handle_require_io_active_cli(ctx: &OpContext, args: &ArgMatches) -> Result<()> {
    let value = *args
        .get_one::<bool>("value")
        .context("Missing value for require-io-active")?;
    let mut manager: CameraManager = ctx.camera_manager();
    manager.set_require_io_active(value)?;
    println!("requireIoActive = {}", value);
    Ok(())
}

fn entry_index(args: &ArgMatches) -> Result<usize> {
    let raw = args.get_one::<String>("index").context("Missing entry number")?;
    Ok(parse_camera_index_arg(raw)?)
}

async fn fetch_catalog(ctx: &OpContext) -> Result<MilestoneData> {
    ctx.fetcher()
        .fetch()
        .await
        .context("Could not fetch lists from Milestone. Check the connection and that credentials are saved")
}

fn run_editor(data: &MilestoneData, existing: Option<&CameraEntry>, args: &ArgMatches) -> Result<EditorOutcome> {
    let mut editor = CameraEditor::new(data, existing);
    if args.get_flag("interactive") {
        return edit_interactively(&mut editor, &mut TerminalPrompter::new());
    }
    apply_selection_flags(&mut editor, args)?;
    let entry = editor.submit().map_err(|e| anyhow!("{}", e))?;
    Ok(EditorOutcome::Saved(entry))
}

fn apply_selection_flags(editor: &mut CameraEditor<'_>, args: &ArgMatches) -> Result<()> {
    let data = editor.data();
    if args.get_flag("user-defined") {
        editor.set_mode(EditorMode::UserDefined);
    } else if args.contains_id("io") {
        editor.set_mode(EditorMode::Io);
    }
    if let Some(arg) = args.get_one::<String>("camera") {
        let camera = resolve_choice(&data.cameras, arg, |c| c.id.as_str(), |c| c.name.clone(), "camera")?;
        editor.select_camera(&camera.id);
    }
    if let Some(arg) = args.get_one::<String>("event-type") {
        let event = resolve_choice(&data.event_types, arg, |e| e.id.as_str(), |e| e.name.clone(), "event type")?;
        editor.select_event_type(&event.id);
    }
    if let Some(arg) = args.get_one::<String>("io") {
        let io = resolve_choice(&data.io_list, arg, |io| io.id.as_str(), IoItem::display_name, "IO point")?;
        editor.select_io_point(&io.id);
    }
    if let Some(arg) = args.get_one::<String>("alarm-active") {
        let event = resolve_choice(&data.event_types, arg, |e| e.id.as_str(), |e| e.name.clone(), "event type")?;
        editor.select_alarm_active(&event.id);
    }
    if let Some(arg) = args.get_one::<String>("alarm-inactive") {
        let event = resolve_choice(&data.event_types, arg, |e| e.id.as_str(), |e| e.name.clone(), "event type")?;
        editor.select_alarm_inactive(&event.id);
    }
    if let Some(url) = args.get_one::<String>("webhook-url") {
        editor.set_webhook_url(url);
    }
    Ok(())
}

/// The prompts the interactive editor needs. `None` from `select` means the
/// user pressed Esc.
pub trait Prompter {
    fn input(&mut self, prompt: &str, initial: &str) -> Result<String>;
    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<Option<usize>>;
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        TerminalPrompter { theme: ColorfulTheme::default() }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str, initial: &str) -> Result<String> {
        Ok(Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .with_initial_text(initial.to_string())
            .allow_empty(true)
            .interact_text()?)
    }

    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<Option<usize>> {
        Ok(Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact_opt()?)
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(Confirm::with_theme(&self.theme).with_prompt(prompt).default(true).interact()?)
    }
}

/// Prompts for a filter, then a choice among the matches. `None` means the
/// user pressed Esc, or there is nothing to choose from.
fn pick<P, T, L, F, D>(prompter: &mut P, what: &str, list: L, display: D, current: Option<&str>, id_of: F) -> Result<Option<String>>
where
    P: Prompter + ?Sized,
    L: Fn(&str) -> Vec<T>,
    F: Fn(&T) -> String,
    D: Fn(&T) -> String,
{
    if list("").is_empty() {
        println!("No {} is available from Milestone.", what);
        return Ok(None);
    }
    loop {
        let query = prompter.input(&format!("Search {} (blank for all)", what), "")?;
        let matches = list(&query);
        if matches.is_empty() {
            println!("Nothing matches '{}'.", query);
            continue;
        }
        let labels: Vec<String> = matches.iter().map(&display).collect();
        let default = current
            .and_then(|id| matches.iter().position(|m| id_of(m) == id))
            .unwrap_or(0);
        let choice = prompter.select(&format!("Select {} (Esc to cancel)", what), &labels, default)?;
        return Ok(choice.map(|i| id_of(&matches[i])));
    }
}

fn edit_interactively<P: Prompter + ?Sized>(editor: &mut CameraEditor<'_>, prompter: &mut P) -> Result<EditorOutcome> {
    loop {
        let modes = vec![
            "Input/output point".to_string(),
            "User-defined events (alarm active/inactive)".to_string(),
        ];
        let current_mode = if editor.mode() == EditorMode::UserDefined { 1 } else { 0 };
        let Some(mode) = prompter.select("Trigger source (Esc to cancel)", &modes, current_mode)? else {
            return Ok(EditorOutcome::Cancelled);
        };
        editor.set_mode(if mode == 1 { EditorMode::UserDefined } else { EditorMode::Io });

        let current = editor.camera().map(|c| c.id.clone());
        let Some(id) = pick(prompter, "camera", |q| editor.cameras_matching(q), |c| c.name.clone(), current.as_deref(), |c| c.id.clone())? else {
            return Ok(EditorOutcome::Cancelled);
        };
        editor.select_camera(&id);

        let current = editor.event_type().map(|e| e.id.clone());
        let Some(id) = pick(prompter, "event type", |q| editor.event_types_matching(q), |e| e.name.clone(), current.as_deref(), |e| e.id.clone())? else {
            return Ok(EditorOutcome::Cancelled);
        };
        editor.select_event_type(&id);

        match editor.mode() {
            EditorMode::Io => {
                let current = editor.io_point().map(|io| io.id.clone());
                let Some(id) = pick(prompter, "input/output", |q| editor.io_points_matching(q), |io| io.display_name(), current.as_deref(), |io| io.id.clone())? else {
                    return Ok(EditorOutcome::Cancelled);
                };
                editor.select_io_point(&id);
            }
            EditorMode::UserDefined => {
                let current = editor.alarm_active().map(|e| e.id.clone());
                let Some(active) = pick(prompter, "alarm-active event", |q| editor.event_types_matching(q), |e| e.name.clone(), current.as_deref(), |e| e.id.clone())? else {
                    return Ok(EditorOutcome::Cancelled);
                };
                editor.select_alarm_active(&active);
                let current = editor.alarm_inactive().map(|e| e.id.clone());
                let Some(inactive) = pick(prompter, "alarm-inactive event", |q| editor.event_types_matching(q), |e| e.name.clone(), current.as_deref(), |e| e.id.clone())? else {
                    return Ok(EditorOutcome::Cancelled);
                };
                editor.select_alarm_inactive(&inactive);
            }
        }

        let url = prompter.input("Webhook URL", editor.webhook_url())?;
        editor.set_webhook_url(&url);

        match editor.submit() {
            Ok(entry) => return Ok(EditorOutcome::Saved(entry)),
            Err(e) => {
                debug!("Editor validation failed: {}", e);
                println!("⚠️ {}", e);
                if !prompter.confirm("Correct the entry?")? {
                    return Ok(EditorOutcome::Cancelled);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_config::{IdName, IoType};
    use crate::cli::build_cli;
    use std::collections::VecDeque;

    enum Step {
        Input(&'static str),
        Select(Option<usize>),
        KeepDefault,
        Confirm(bool),
    }

    /// Plays back a fixed sequence of answers and records the preselected
    /// index of every list shown.
    struct ScriptedPrompter {
        steps: VecDeque<Step>,
        defaults: Vec<(String, usize)>,
    }

    impl ScriptedPrompter {
        fn new(steps: Vec<Step>) -> Self {
            ScriptedPrompter { steps: steps.into(), defaults: Vec::new() }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn input(&mut self, prompt: &str, initial: &str) -> Result<String> {
            match self.steps.pop_front() {
                Some(Step::Input(text)) if text == "<keep>" => Ok(initial.to_string()),
                Some(Step::Input(text)) => Ok(text.to_string()),
                _ => panic!("unexpected input prompt '{}'", prompt),
            }
        }

        fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<Option<usize>> {
            assert!(default < items.len());
            self.defaults.push((prompt.to_string(), default));
            match self.steps.pop_front() {
                Some(Step::Select(choice)) => Ok(choice),
                Some(Step::KeepDefault) => Ok(Some(default)),
                _ => panic!("unexpected select prompt '{}'", prompt),
            }
        }

        fn confirm(&mut self, prompt: &str) -> Result<bool> {
            match self.steps.pop_front() {
                Some(Step::Confirm(answer)) => Ok(answer),
                _ => panic!("unexpected confirm prompt '{}'", prompt),
            }
        }
    }

    fn id_name(id: &str, name: &str) -> IdName {
        IdName { id: id.into(), name: name.into() }
    }

    fn catalog() -> MilestoneData {
        MilestoneData {
            cameras: vec![id_name("c1", "Lobby"), id_name("c2", "Yard")],
            event_types: vec![id_name("e1", "Motion"), id_name("e2", "Alarm on"), id_name("e3", "Alarm off")],
            io_list: vec![IoItem { id: "i1".into(), name: "Door".into(), kind: "input".into() }],
        }
    }

    fn user_defined_entry() -> CameraEntry {
        CameraEntry {
            camera_id: "c2".into(),
            camera_name: "Yard".into(),
            event_type_id: "e1".into(),
            event_type_name: "Motion".into(),
            io_type: IoType::UserDefined,
            webhook_url: "https://hooks.local/yard".into(),
            alarm_active_event_type_id: Some("e2".into()),
            alarm_inactive_event_type_id: Some("e3".into()),
            enabled: false,
            ..Default::default()
        }
    }

    fn edit_args(extra: &[&str]) -> ArgMatches {
        let mut argv = vec!["webhook-manager", "edit", "1"];
        argv.extend_from_slice(extra);
        let matches = build_cli().try_get_matches_from(argv).unwrap();
        matches.subcommand_matches("edit").unwrap().clone()
    }

    #[test]
    fn esc_at_any_list_cancels() {
        let data = catalog();
        let mut editor = CameraEditor::new(&data, None);
        let mut prompter = ScriptedPrompter::new(vec![Step::Select(None)]);
        assert_eq!(edit_interactively(&mut editor, &mut prompter).unwrap(), EditorOutcome::Cancelled);

        let mut editor = CameraEditor::new(&data, None);
        let mut prompter = ScriptedPrompter::new(vec![Step::Select(Some(0)), Step::Input(""), Step::Select(None)]);
        assert_eq!(edit_interactively(&mut editor, &mut prompter).unwrap(), EditorOutcome::Cancelled);
        assert!(prompter.steps.is_empty());
    }

    #[test]
    fn empty_io_catalog_cancels_instead_of_prompting_again() {
        let data = MilestoneData { io_list: Vec::new(), ..catalog() };
        let mut editor = CameraEditor::new(&data, None);
        let mut prompter = ScriptedPrompter::new(vec![
            Step::Select(Some(0)),
            Step::Input(""),
            Step::Select(Some(0)),
            Step::Input(""),
            Step::Select(Some(0)),
        ]);
        assert_eq!(edit_interactively(&mut editor, &mut prompter).unwrap(), EditorOutcome::Cancelled);
        assert!(prompter.steps.is_empty());
    }

    #[test]
    fn editing_user_defined_entry_preselects_every_list() {
        let data = catalog();
        let existing = user_defined_entry();
        let mut editor = CameraEditor::new(&data, Some(&existing));
        let mut prompter = ScriptedPrompter::new(vec![
            Step::KeepDefault,
            Step::Input(""),
            Step::KeepDefault,
            Step::Input(""),
            Step::KeepDefault,
            Step::Input(""),
            Step::KeepDefault,
            Step::Input(""),
            Step::KeepDefault,
            Step::Input("<keep>"),
        ]);
        let outcome = edit_interactively(&mut editor, &mut prompter).unwrap();
        assert_eq!(outcome, EditorOutcome::Saved(existing));
        let defaults: Vec<usize> = prompter.defaults.iter().map(|(_, d)| *d).collect();
        // mode, camera, event type, alarm active, alarm inactive
        assert_eq!(defaults, vec![1, 1, 0, 1, 2]);
    }

    #[test]
    fn failed_validation_can_be_abandoned() {
        let data = catalog();
        let mut editor = CameraEditor::new(&data, None);
        let mut prompter = ScriptedPrompter::new(vec![
            Step::Select(Some(0)),
            Step::Input(""),
            Step::Select(Some(0)),
            Step::Input(""),
            Step::Select(Some(0)),
            Step::Input("door"),
            Step::Select(Some(0)),
            Step::Input("   "),
            Step::Confirm(false),
        ]);
        assert_eq!(edit_interactively(&mut editor, &mut prompter).unwrap(), EditorOutcome::Cancelled);
    }

    #[test]
    fn edit_flags_keep_unmentioned_selections() {
        let data = catalog();
        let existing = user_defined_entry();
        let args = edit_args(&["--webhook-url", "https://hooks.local/new"]);
        let mut editor = CameraEditor::new(&data, Some(&existing));
        apply_selection_flags(&mut editor, &args).unwrap();
        let entry = editor.submit().unwrap();
        assert_eq!(entry.webhook_url, "https://hooks.local/new");
        assert_eq!(entry.camera_id, "c2");
        assert_eq!(entry.io_type, IoType::UserDefined);
        assert_eq!(entry.alarm_active_event_type_id.as_deref(), Some("e2"));
        assert!(!entry.enabled);
    }

    #[test]
    fn io_flag_switches_user_defined_entry_to_io() {
        let data = catalog();
        let existing = user_defined_entry();
        let args = edit_args(&["--io", "door"]);
        let mut editor = CameraEditor::new(&data, Some(&existing));
        apply_selection_flags(&mut editor, &args).unwrap();
        let entry = editor.submit().unwrap();
        assert_eq!(entry.io_type, IoType::Input);
        assert_eq!(entry.io_source_id, "i1");
        assert_eq!(entry.io_source_name, "[input] Door");
        assert_eq!(entry.alarm_active_event_type_id, None);
        assert_eq!(entry.alarm_inactive_event_type_id, None);
        assert_eq!(entry.event_type_id, "e1");
        assert!(entry.binding_is_consistent());
    }

    #[test]
    fn unknown_selection_is_an_error() {
        let data = catalog();
        let args = edit_args(&["--camera", "garage"]);
        let mut editor = CameraEditor::new(&data, None);
        assert!(apply_selection_flags(&mut editor, &args).is_err());
    }
}
