pub mod messages;
pub mod native;

use crate::error::AppError;
use async_trait::async_trait;
use messages::{FileStatus, PlatformEvent, SpawnRequest, SpawnResult, TerminalStatistic};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

pub use native::NativePlatform;

/// Everything the core needs from the host: process spawning, file access,
/// the persisted ui store, and the push channel for terminal/filesystem events.
///
/// Every method is an await point; implementations must never block the
/// calling task on slow I/O.
#[async_trait]
pub trait Platform: Send + Sync + std::fmt::Debug {
    async fn spawn_command(&self, request: SpawnRequest) -> Result<SpawnResult, AppError>;

    async fn read_all(&self, path: &str) -> Result<String, AppError>;

    /// Probes `files` inside `current_dir` in a single round-trip. The result
    /// has one status per requested filename, in request order.
    async fn batch_test_files(&self, current_dir: &str, files: &[String]) -> Result<Vec<FileStatus>, AppError>;

    async fn ui_store(&self, key: &str, value: Value) -> Result<(), AppError>;

    async fn fetch_ui_stores(&self) -> Result<Map<String, Value>, AppError>;

    async fn add_favorite_folder(&self, path: &str) -> Result<(), AppError>;

    async fn remove_favorite_folder(&self, path: &str) -> Result<(), AppError>;

    async fn get_all_favorite_folders(&self) -> Result<Vec<String>, AppError>;

    /// Latest sample for the process running inside the session's terminal,
    /// `None` when nothing is running there.
    async fn terminal_statistics(&self, session_id: &str) -> Result<Option<TerminalStatistic>, AppError>;

    fn subscribe(&self) -> broadcast::Receiver<PlatformEvent>;
}
