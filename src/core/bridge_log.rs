use crate::common::timestamp_utils;
use log::warn;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Timestamped log of bridge activity, optionally mirrored to stdout and a
/// file.
#[derive(Debug, Default)]
pub struct BridgeLog {
    lines: Vec<String>,
    echo: bool,
    file: Option<File>,
}

impl BridgeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_file(mut self, path: &Path) -> std::io::Result<Self> {
        self.file = Some(OpenOptions::new().create(true).append(true).open(path)?);
        Ok(self)
    }

    /// Appends `[HH:MM:SS] message`. Empty messages are dropped.
    pub fn append(&mut self, message: &str) {
        if message.is_empty() {
            return;
        }
        let line = format!("[{}] {}", timestamp_utils::log_line_stamp(), message);
        if self.echo {
            println!("{}", line);
        }
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", line) {
                warn!("Could not write bridge log file: {}", e);
                self.file = None;
            }
        }
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines whose message (after the stamp) equals `message`.
    pub fn count_message(&self, message: &str) -> usize {
        self.lines
            .iter()
            .filter(|l| l.split_once("] ").map(|(_, m)| m) == Some(message))
            .count()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_stamped_and_empty_ones_skipped() {
        let mut log = BridgeLog::new();
        log.append("hello");
        log.append("");
        assert_eq!(log.lines().len(), 1);
        let line = &log.lines()[0];
        // "[HH:MM:SS] hello"
        assert_eq!(line.len(), "[00:00:00] hello".len());
        assert!(line.starts_with('[') && line.ends_with("] hello"));
        assert_eq!(&line[3..4], ":");
        assert_eq!(log.count_message("hello"), 1);
        log.clear();
        assert!(log.lines().is_empty());
    }

    #[test]
    fn mirrors_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.log");
        let mut log = BridgeLog::new().with_file(&path).unwrap();
        log.append("one");
        log.append("two");
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("] two"));
    }
}
