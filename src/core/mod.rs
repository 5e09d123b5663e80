pub mod bridge_log;
pub mod bridge_supervisor;
pub mod camera_editor;
pub mod camera_manager;
pub mod milestone_fetcher;
pub mod script_runner;
