use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- Requests ---
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub cwd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envs: Option<HashMap<String, String>>,
}

impl SpawnRequest {
    pub fn new(command: impl Into<String>, cwd: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cwd: cwd.into(),
            ..Default::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

// --- Responses ---
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnResult {
    pub output: String,
    pub success: bool,
    pub code: Option<i32>,
}

/// Result of probing one filename inside a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    Missing,
    Directory,
    File,
}

impl FileStatus {
    pub fn exists(self) -> bool {
        !matches!(self, FileStatus::Missing)
    }

    pub fn is_file(self) -> bool {
        matches!(self, FileStatus::File)
    }
}

// Wire encoding used by the host bridge: 0 missing, 1 directory, 2 file.
impl From<u8> for FileStatus {
    fn from(code: u8) -> Self {
        match code {
            1 => FileStatus::Directory,
            2 => FileStatus::File,
            _ => FileStatus::Missing,
        }
    }
}

impl From<FileStatus> for u8 {
    fn from(status: FileStatus) -> Self {
        match status {
            FileStatus::Missing => 0,
            FileStatus::Directory => 1,
            FileStatus::File => 2,
        }
    }
}

/// One resource-usage sample of the process running inside a terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalStatistic {
    pub cpu_usage: f64,
    pub mem_usage: f64,
    pub sampled_at: DateTime<Utc>,
}

impl TerminalStatistic {
    pub fn new(cpu_usage: f64, mem_usage: f64) -> Self {
        Self {
            cpu_usage,
            mem_usage,
            sampled_at: Utc::now(),
        }
    }

    pub fn idle() -> Self {
        Self::new(0.0, 0.0)
    }
}

// --- Push events ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PlatformEvent {
    PtyOutput { id: String, data: Vec<u8> },
    PtyExit { id: String },
    FsChanged { id: String, paths: Vec<String> },
}

impl PlatformEvent {
    pub fn session_id(&self) -> &str {
        match self {
            PlatformEvent::PtyOutput { id, .. }
            | PlatformEvent::PtyExit { id }
            | PlatformEvent::FsChanged { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_status_wire_codes() {
        assert_eq!(FileStatus::from(0u8), FileStatus::Missing);
        assert_eq!(FileStatus::from(1u8), FileStatus::Directory);
        assert_eq!(FileStatus::from(2u8), FileStatus::File);
        assert_eq!(u8::from(FileStatus::File), 2);
        assert!(FileStatus::Directory.exists());
        assert!(!FileStatus::Directory.is_file());
        assert!(!FileStatus::Missing.exists());
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = PlatformEvent::FsChanged {
            id: "Tab-1".to_string(),
            paths: vec!["/a/b".to_string()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "fs-changed");
        assert_eq!(event.session_id(), "Tab-1");
    }
}
