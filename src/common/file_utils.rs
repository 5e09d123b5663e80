use crate::app_config::BRIDGE_SCRIPT_NAME;
use crate::errors::AppError;
use log::debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes `contents` to a sibling temp file and renames it over `path`.
pub fn write_file_replacing(path: &Path, contents: &[u8]) -> Result<(), AppError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| AppError::Io(format!("'{}' has no file name", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = fs::File::create(&tmp_path).map_err(|e| {
        AppError::Io(format!("Failed to create '{}': {}", tmp_path.display(), e))
    })?;
    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(|e| AppError::Io(format!("Failed to write '{}': {}", tmp_path.display(), e)))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        AppError::Io(format!("Failed to replace '{}': {}", path.display(), e))
    })?;
    debug!("Wrote {} bytes to '{}'", contents.len(), path.display());
    Ok(())
}

/// Picks the directory holding the config files and scripts.
///
/// An explicit directory wins. Otherwise the executable's directory is used
/// when it contains the bridge script, then the current directory when it
/// does, and finally the executable's directory regardless.
pub fn resolve_config_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit {
        return PathBuf::from(dir);
    }
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    pick_config_dir(&exe_dir, &cwd)
}

fn pick_config_dir(exe_dir: &Path, cwd: &Path) -> PathBuf {
    if exe_dir.join(BRIDGE_SCRIPT_NAME).is_file() {
        debug!("Bridge script found next to the executable in '{}'", exe_dir.display());
        return exe_dir.to_path_buf();
    }
    if cwd.join(BRIDGE_SCRIPT_NAME).is_file() {
        debug!("Bridge script found in current directory '{}'", cwd.display());
        return cwd.to_path_buf();
    }
    exe_dir.to_path_buf()
}
