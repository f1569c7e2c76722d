use crate::config::Config;
use crate::error::AppError;
use crate::platform::messages::{FileStatus, PlatformEvent, SpawnRequest, SpawnResult, TerminalStatistic};
use crate::platform::Platform;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio as StdProcessStdio;
use std::sync::Arc;
use sysinfo::{Pid, System};
use tokio::fs;
use tokio::process::Command as TokioCommand;
use tokio::sync::{broadcast, Mutex as TokioMutex};
use tracing::{debug, error, instrument, warn};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Default, Serialize, Deserialize)]
struct UiStoreFile {
    #[serde(default)]
    ui_stores: Map<String, Value>,
    #[serde(default)]
    favorite_folders: Vec<String>,
}

/// Headless platform backed by tokio processes and the local filesystem.
///
/// A host embedding the core pushes terminal events through [`NativePlatform::emit`]
/// and tells the platform which shell pid belongs to which session so that
/// statistics can be sampled.
#[derive(Debug)]
pub struct NativePlatform {
    ui_store_file: PathBuf,
    store_lock: TokioMutex<()>, // serializes read-modify-write of the store file
    events: broadcast::Sender<PlatformEvent>,
    shell_pids: Mutex<HashMap<String, u32>>,
    system: Arc<Mutex<System>>,
}

impl NativePlatform {
    pub fn new(config: &Config) -> Self {
        Self::with_store_file(config.ui_store_file.clone())
    }

    pub fn with_store_file(ui_store_file: PathBuf) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ui_store_file,
            store_lock: TokioMutex::new(()),
            events,
            shell_pids: Mutex::new(HashMap::new()),
            system: Arc::new(Mutex::new(System::new())),
        }
    }

    /// Pushes an event to every subscriber. Returns how many received it.
    pub fn emit(&self, event: PlatformEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    pub fn register_shell_pid(&self, session_id: &str, pid: u32) {
        self.shell_pids.lock().insert(session_id.to_string(), pid);
    }

    pub fn unregister_shell(&self, session_id: &str) {
        self.shell_pids.lock().remove(session_id);
    }

    async fn load_store(&self) -> Result<UiStoreFile, AppError> {
        match fs::read_to_string(&self.ui_store_file).await {
            Ok(content) if content.trim().is_empty() => Ok(UiStoreFile::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(UiStoreFile::default()),
            Err(e) => Err(AppError::PersistenceError(format!(
                "Failed to read ui store {}: {}",
                self.ui_store_file.display(),
                e
            ))),
        }
    }

    async fn save_store(&self, store: &UiStoreFile) -> Result<(), AppError> {
        if let Some(parent_dir) = self.ui_store_file.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                fs::create_dir_all(parent_dir).await.map_err(|e| {
                    error!(path = %parent_dir.display(), error = %e, "Failed to create ui store directory");
                    AppError::PersistenceError(format!("Failed to create {}: {}", parent_dir.display(), e))
                })?;
            }
        }
        let content = serde_json::to_string_pretty(store)?;
        let tmp_path = self.ui_store_file.with_extension("json.tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.ui_store_file).await.map_err(|e| {
            AppError::PersistenceError(format!("Failed to replace {}: {}", self.ui_store_file.display(), e))
        })
    }

    async fn update_store<F>(&self, update: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut UiStoreFile) + Send,
    {
        let _guard = self.store_lock.lock().await;
        let mut store = self.load_store().await?;
        update(&mut store);
        self.save_store(&store).await
    }
}

fn sample_child_of(system: &mut System, shell_pid: u32) -> Option<TerminalStatistic> {
    system.refresh_memory();
    system.refresh_processes();
    let parent = Pid::from_u32(shell_pid);
    let total_memory = system.total_memory();

    // The shell itself is idle; what matters is the first thing it runs.
    let child = system
        .processes()
        .values()
        .filter(|process| process.parent() == Some(parent))
        .min_by_key(|process| process.pid())?;

    let mem_usage = if total_memory == 0 {
        0.0
    } else {
        child.memory() as f64 / total_memory as f64 * 100.0
    };
    Some(TerminalStatistic::new(child.cpu_usage() as f64, mem_usage))
}

#[async_trait]
impl Platform for NativePlatform {
    #[instrument(skip(self, request), fields(command = %request.command, cwd = %request.cwd))]
    async fn spawn_command(&self, request: SpawnRequest) -> Result<SpawnResult, AppError> {
        if request.command.trim().is_empty() {
            return Err(AppError::InvalidInputArgument("Empty command".to_string()));
        }
        let mut command = TokioCommand::new(&request.command);
        command.args(&request.args);
        if let Some(envs) = &request.envs {
            command.envs(envs);
        }
        command.current_dir(&request.cwd);
        command.stdin(StdProcessStdio::null());

        debug!(args = ?request.args, "Spawning command");
        let output = command.output().await.map_err(|e| {
            warn!(error = %e, command = %request.command, "Failed to spawn command");
            AppError::CommandExecutionError(format!("Failed to spawn command '{}': {}", request.command, e))
        })?;

        Ok(SpawnResult {
            output: String::from_utf8_lossy(&output.stdout).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }

    async fn read_all(&self, path: &str) -> Result<String, AppError> {
        Ok(fs::read_to_string(path).await?)
    }

    #[instrument(skip(self, files), fields(count = files.len()))]
    async fn batch_test_files(&self, current_dir: &str, files: &[String]) -> Result<Vec<FileStatus>, AppError> {
        let base = Path::new(current_dir);
        let mut statuses = Vec::with_capacity(files.len());
        for file in files {
            let status = match fs::metadata(base.join(file)).await {
                Ok(meta) if meta.is_dir() => FileStatus::Directory,
                Ok(_) => FileStatus::File,
                Err(_) => FileStatus::Missing,
            };
            statuses.push(status);
        }
        Ok(statuses)
    }

    #[instrument(skip(self, value))]
    async fn ui_store(&self, key: &str, value: Value) -> Result<(), AppError> {
        if key.is_empty() {
            return Err(AppError::InvalidInputArgument("ui store key must not be empty".to_string()));
        }
        let key = key.to_string();
        self.update_store(move |store| {
            store.ui_stores.insert(key, value);
        })
        .await
    }

    async fn fetch_ui_stores(&self) -> Result<Map<String, Value>, AppError> {
        let _guard = self.store_lock.lock().await;
        Ok(self.load_store().await?.ui_stores)
    }

    #[instrument(skip(self))]
    async fn add_favorite_folder(&self, path: &str) -> Result<(), AppError> {
        let path = path.to_string();
        self.update_store(move |store| {
            if !store.favorite_folders.contains(&path) {
                store.favorite_folders.push(path);
            }
        })
        .await
    }

    #[instrument(skip(self))]
    async fn remove_favorite_folder(&self, path: &str) -> Result<(), AppError> {
        let path = path.to_string();
        self.update_store(move |store| {
            store.favorite_folders.retain(|existing| existing != &path);
        })
        .await
    }

    async fn get_all_favorite_folders(&self) -> Result<Vec<String>, AppError> {
        let _guard = self.store_lock.lock().await;
        Ok(self.load_store().await?.favorite_folders)
    }

    async fn terminal_statistics(&self, session_id: &str) -> Result<Option<TerminalStatistic>, AppError> {
        let shell_pid = match self.shell_pids.lock().get(session_id).copied() {
            Some(pid) => pid,
            None => return Ok(None),
        };
        let system = self.system.clone();
        tokio::task::spawn_blocking(move || sample_child_of(&mut system.lock(), shell_pid))
            .await
            .map_err(|e| AppError::PlatformError(format!("Statistics sampler panicked: {}", e)))
    }

    fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn batch_test_files_reports_per_file_status() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();

        let platform = NativePlatform::with_store_file(dir.path().join("store.json"));
        let files = vec!["Cargo.toml".to_string(), ".git".to_string(), "package.json".to_string()];
        let statuses = platform
            .batch_test_files(dir.path().to_str().unwrap(), &files)
            .await
            .unwrap();
        assert_eq!(statuses, vec![FileStatus::File, FileStatus::Directory, FileStatus::Missing]);
    }

    #[tokio::test]
    async fn favorites_and_ui_store_persist_across_instances() {
        let dir = tempdir().unwrap();
        let store_file = dir.path().join("nested").join("ui_store.json");

        let platform = NativePlatform::with_store_file(store_file.clone());
        platform.add_favorite_folder("/work/a").await.unwrap();
        platform.add_favorite_folder("/work/b").await.unwrap();
        platform.add_favorite_folder("/work/a").await.unwrap();
        platform.remove_favorite_folder("/work/b").await.unwrap();
        platform.ui_store("showFileExplorer", Value::Bool(true)).await.unwrap();

        let reopened = NativePlatform::with_store_file(store_file);
        assert_eq!(reopened.get_all_favorite_folders().await.unwrap(), vec!["/work/a".to_string()]);
        let stores = reopened.fetch_ui_stores().await.unwrap();
        assert_eq!(stores.get("showFileExplorer"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn corrupt_store_is_reported() {
        let dir = tempdir().unwrap();
        let store_file = dir.path().join("ui_store.json");
        std::fs::write(&store_file, "{ not json").unwrap();
        let platform = NativePlatform::with_store_file(store_file);
        assert!(matches!(
            platform.get_all_favorite_folders().await,
            Err(AppError::SerdeJsonError(_))
        ));
    }

    #[tokio::test]
    async fn empty_command_and_key_are_rejected() {
        let dir = tempdir().unwrap();
        let platform = NativePlatform::with_store_file(dir.path().join("store.json"));
        let spawned = platform.spawn_command(SpawnRequest::new("  ", "/")).await;
        assert!(matches!(spawned, Err(AppError::InvalidInputArgument(_))));
        let stored = platform.ui_store("", Value::Null).await;
        assert!(matches!(stored, Err(AppError::InvalidInputArgument(_))));
    }

    #[tokio::test]
    async fn statistics_without_registered_shell_are_none() {
        let dir = tempdir().unwrap();
        let platform = NativePlatform::with_store_file(dir.path().join("store.json"));
        assert_eq!(platform.terminal_statistics("Tab-unknown").await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_command_captures_stdout_and_status() {
        let dir = tempdir().unwrap();
        let platform = NativePlatform::with_store_file(dir.path().join("store.json"));
        let ok = platform
            .spawn_command(SpawnRequest::new("sh", dir.path().to_str().unwrap()).args(["-c", "echo hi"]))
            .await
            .unwrap();
        assert!(ok.success);
        assert_eq!(ok.output.trim(), "hi");

        let failed = platform
            .spawn_command(SpawnRequest::new("sh", dir.path().to_str().unwrap()).args(["-c", "exit 3"]))
            .await
            .unwrap();
        assert!(!failed.success);
        assert_eq!(failed.code, Some(3));

        let missing = platform
            .spawn_command(SpawnRequest::new("definitely-not-a-real-binary-t1", "/"))
            .await;
        assert!(matches!(missing, Err(AppError::CommandExecutionError(_))));
    }

    #[test]
    fn emit_without_subscribers_is_harmless() {
        let platform = NativePlatform::with_store_file(PathBuf::from("unused.json"));
        assert_eq!(platform.emit(PlatformEvent::PtyExit { id: "x".into() }), 0);
        let mut rx = platform.subscribe();
        assert_eq!(platform.emit(PlatformEvent::PtyExit { id: "x".into() }), 1);
        assert_eq!(rx.try_recv().unwrap(), PlatformEvent::PtyExit { id: "x".into() });
    }
}
