//! Shared test utilities for integration tests.
//!
//! `MockPlatform` stands in for the host: file probes answer from an
//! in-memory set, favorites live in memory, and events are pushed by hand.
//! `ScriptedExtension` is an extension whose behaviour is configured per test.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use t1_session_core::config::Config;
use t1_session_core::error::AppError;
use t1_session_core::extensions::{ActionData, Extension, MenuItem, ResolveParams, TriggerParams};
use t1_session_core::models::{ExtensionManager, SessionManager};
use t1_session_core::platform::messages::{FileStatus, PlatformEvent, SpawnRequest, SpawnResult, TerminalStatistic};
use t1_session_core::platform::Platform;
use tokio::sync::broadcast;

pub const HOME: &str = "/home/tester";

/// Default timeout for async test operations
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_config() -> Arc<Config> {
    Arc::new(Config {
        home_dir: Some(HOME.to_string()),
        ..Config::default()
    })
}

// ============================================================================
// Mock Platform
// ============================================================================

#[derive(Debug)]
pub struct MockPlatform {
    files: Mutex<HashSet<String>>,
    directories: Mutex<HashSet<String>>,
    pub batch_calls: AtomicUsize,
    pub fail_batch: AtomicBool,
    pub fail_store: AtomicBool,
    favorites: Mutex<Vec<String>>,
    ui_stores: Mutex<Map<String, Value>>,
    statistics: Mutex<Option<TerminalStatistic>>,
    pub spawned: Mutex<Vec<SpawnRequest>>,
    events: broadcast::Sender<PlatformEvent>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            files: Mutex::new(HashSet::new()),
            directories: Mutex::new(HashSet::new()),
            batch_calls: AtomicUsize::new(0),
            fail_batch: AtomicBool::new(false),
            fail_store: AtomicBool::new(false),
            favorites: Mutex::new(Vec::new()),
            ui_stores: Mutex::new(Map::new()),
            statistics: Mutex::new(None),
            spawned: Mutex::new(Vec::new()),
            events: broadcast::channel(64).0,
        })
    }

    /// Marks `dir/name` as an existing regular file.
    pub fn add_file(&self, dir: &str, name: &str) {
        self.files.lock().insert(format!("{}/{}", dir, name));
    }

    pub fn add_directory(&self, dir: &str, name: &str) {
        self.directories.lock().insert(format!("{}/{}", dir, name));
    }

    pub fn set_favorites(&self, favorites: &[&str]) {
        *self.favorites.lock() = favorites.iter().map(|s| s.to_string()).collect();
    }

    pub fn stored_favorites(&self) -> Vec<String> {
        self.favorites.lock().clone()
    }

    pub fn set_statistics(&self, sample: Option<TerminalStatistic>) {
        *self.statistics.lock() = sample;
    }

    pub fn emit(&self, event: PlatformEvent) {
        let _ = self.events.send(event);
    }

    fn check_store(&self) -> Result<(), AppError> {
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(AppError::PersistenceError("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn spawn_command(&self, request: SpawnRequest) -> Result<SpawnResult, AppError> {
        self.spawned.lock().push(request);
        Ok(SpawnResult {
            output: String::new(),
            success: false,
            code: Some(1),
        })
    }

    async fn read_all(&self, path: &str) -> Result<String, AppError> {
        Err(AppError::StdIoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            path.to_string(),
        )))
    }

    async fn batch_test_files(&self, current_dir: &str, files: &[String]) -> Result<Vec<FileStatus>, AppError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_batch.load(Ordering::SeqCst) {
            return Err(AppError::PlatformError("probe failed".to_string()));
        }
        let known_files = self.files.lock();
        let known_dirs = self.directories.lock();
        Ok(files
            .iter()
            .map(|name| {
                let path = format!("{}/{}", current_dir, name);
                if known_files.contains(&path) {
                    FileStatus::File
                } else if known_dirs.contains(&path) {
                    FileStatus::Directory
                } else {
                    FileStatus::Missing
                }
            })
            .collect())
    }

    async fn ui_store(&self, key: &str, value: Value) -> Result<(), AppError> {
        self.check_store()?;
        self.ui_stores.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn fetch_ui_stores(&self) -> Result<Map<String, Value>, AppError> {
        self.check_store()?;
        Ok(self.ui_stores.lock().clone())
    }

    async fn add_favorite_folder(&self, path: &str) -> Result<(), AppError> {
        self.check_store()?;
        let mut favorites = self.favorites.lock();
        if !favorites.iter().any(|f| f == path) {
            favorites.push(path.to_string());
        }
        Ok(())
    }

    async fn remove_favorite_folder(&self, path: &str) -> Result<(), AppError> {
        self.check_store()?;
        self.favorites.lock().retain(|f| f != path);
        Ok(())
    }

    async fn get_all_favorite_folders(&self) -> Result<Vec<String>, AppError> {
        self.check_store()?;
        Ok(self.favorites.lock().clone())
    }

    async fn terminal_statistics(&self, _session_id: &str) -> Result<Option<TerminalStatistic>, AppError> {
        Ok(self.statistics.lock().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// Scripted Extension
// ============================================================================

/// Resolves to `"<name>:<dir>"` unless told otherwise.
#[derive(Debug, Default)]
pub struct ScriptedExtension {
    pub name: String,
    pub match_file: Option<String>,
    pub watch_directory: bool,
    pub fail: AtomicBool,
    pub hidden: AtomicBool,
    /// Title suffix, bumped by tests to simulate a changing directory.
    pub revision: AtomicUsize,
    pub delays: Mutex<HashMap<String, Duration>>,
    pub menu: Vec<MenuItem>,
    pub resolve_count: AtomicUsize,
    /// Directories passed to `resolve`, in call order.
    pub resolved_dirs: Mutex<Vec<String>>,
    pub last_trigger: Mutex<Option<TriggerParams>>,
}

impl ScriptedExtension {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn matching(mut self, file: &str) -> Self {
        self.match_file = Some(file.to_string());
        self
    }

    pub fn watching(mut self) -> Self {
        self.watch_directory = true;
        self
    }

    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_menu(mut self, menu: Vec<MenuItem>) -> Self {
        self.menu = menu;
        self
    }

    pub fn with_delay(self, dir: &str, delay: Duration) -> Self {
        self.delays.lock().insert(dir.to_string(), delay);
        self
    }

    pub fn resolves(&self) -> usize {
        self.resolve_count.load(Ordering::SeqCst)
    }

    pub fn resolved_dirs(&self) -> Vec<String> {
        self.resolved_dirs.lock().clone()
    }

    pub fn title_for(&self, dir: &str) -> String {
        match self.revision.load(Ordering::SeqCst) {
            0 => format!("{}:{}", self.name, dir),
            rev => format!("{}:{}#{}", self.name, dir, rev),
        }
    }
}

#[async_trait]
impl Extension for ScriptedExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn match_file(&self) -> Option<&str> {
        self.match_file.as_deref()
    }

    async fn resolve(&self, _platform: &dyn Platform, params: &ResolveParams) -> Result<Option<ActionData>, AppError> {
        self.resolve_count.fetch_add(1, Ordering::SeqCst);
        self.resolved_dirs.lock().push(params.current_dir.clone());
        let delay = self.delays.lock().get(&params.current_dir).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::extension(&self.name, "scripted failure"));
        }
        if self.hidden.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(
            ActionData::new(self.title_for(&params.current_dir)).watch_directory(self.watch_directory),
        ))
    }

    fn has_trigger(&self) -> bool {
        !self.menu.is_empty()
    }

    async fn trigger(&self, _platform: &dyn Platform, params: &TriggerParams) -> Result<Vec<MenuItem>, AppError> {
        *self.last_trigger.lock() = Some(params.clone());
        Ok(self.menu.clone())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn extension_manager(platform: &Arc<MockPlatform>, extensions: Vec<Arc<ScriptedExtension>>) -> Arc<ExtensionManager> {
    let extensions = extensions
        .into_iter()
        .map(|ext| ext as Arc<dyn Extension>)
        .collect();
    let manager = ExtensionManager::new(platform.clone(), extensions);
    manager.set_home_dir(Some(HOME.to_string()));
    Arc::new(manager)
}

pub fn session_manager(platform: &Arc<MockPlatform>, extensions: Vec<Arc<ScriptedExtension>>) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(extension_manager(platform, extensions), test_config()))
}

pub fn titles(actions: &[t1_session_core::extensions::ToolbarAction]) -> Vec<String> {
    actions.iter().map(|a| a.title.clone()).collect()
}
