use crate::config::Config;
use crate::extensions::{builtin_extensions, Extension, MenuAction, MenuItem, ToolbarAction};
use crate::models::extension_manager::ExtensionManager;
use crate::models::session::Session;
use crate::models::session_manager::SessionManager;
use crate::platform::Platform;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Top-level wiring: owns the managers, follows the active tab's directory,
/// keeps the favorites list, and turns menu clicks into terminal input.
#[derive(Debug)]
pub struct AppState {
    config: Arc<Config>,
    platform: Arc<dyn Platform>,
    extension_manager: Arc<ExtensionManager>,
    session_manager: Arc<SessionManager>,
    home_dir: watch::Sender<Option<String>>,
    favorite_dirs: watch::Sender<Arc<Vec<String>>>,
    current_dir: watch::Sender<Option<String>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, platform: Arc<dyn Platform>) -> Arc<Self> {
        Self::with_extensions(config, platform, builtin_extensions())
    }

    pub fn with_extensions(
        config: Arc<Config>,
        platform: Arc<dyn Platform>,
        extensions: Vec<Arc<dyn Extension>>,
    ) -> Arc<Self> {
        let extension_manager = Arc::new(ExtensionManager::new(platform.clone(), extensions));
        extension_manager.set_home_dir(config.home_dir.clone());
        let session_manager = Arc::new(SessionManager::new(extension_manager.clone(), config.clone()));

        Arc::new(Self {
            home_dir: watch::Sender::new(config.home_dir.clone()),
            config,
            platform,
            extension_manager,
            session_manager,
            favorite_dirs: watch::Sender::new(Arc::new(Vec::new())),
            current_dir: watch::Sender::new(None),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Starts event routing and cwd tracking, then loads persisted state.
    /// Persistence failures are logged; the app starts with empty favorites.
    #[instrument(skip(self))]
    pub async fn init(self: &Arc<Self>) {
        let router = self.session_manager.spawn_event_router(self.platform.subscribe());
        let follower = tokio::spawn(follow_current_dir(
            Arc::downgrade(self),
            self.session_manager.subscribe_active_session(),
        ));
        self.tasks.lock().extend([router, follower]);

        self.fetch_favorite_dirs().await;
        info!(home_dir = ?self.home_dir(), favorites = self.favorite_dirs().len(), "App state initialized");
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn extension_manager(&self) -> &Arc<ExtensionManager> {
        &self.extension_manager
    }

    pub fn session_manager(&self) -> &Arc<SessionManager> {
        &self.session_manager
    }

    pub fn home_dir(&self) -> Option<String> {
        self.home_dir.borrow().clone()
    }

    pub fn set_home_dir(&self, home_dir: Option<String>) {
        self.extension_manager.set_home_dir(home_dir.clone());
        self.home_dir.send_replace(home_dir);
    }

    /// Directory of the active tab, `None` without one.
    pub fn current_dir(&self) -> Option<String> {
        self.current_dir.borrow().clone()
    }

    pub fn subscribe_current_dir(&self) -> watch::Receiver<Option<String>> {
        self.current_dir.subscribe()
    }

    /// Opens a tab and starts sampling its usage statistics.
    pub fn open_tab(&self, initial_path: Option<String>) -> Arc<Session> {
        let session = self.session_manager.new_tab(initial_path);
        session.start_statistics_monitor();
        session
    }

    // --- Favorites ---

    pub fn favorite_dirs(&self) -> Arc<Vec<String>> {
        self.favorite_dirs.borrow().clone()
    }

    pub fn subscribe_favorite_dirs(&self) -> watch::Receiver<Arc<Vec<String>>> {
        self.favorite_dirs.subscribe()
    }

    pub async fn fetch_favorite_dirs(&self) {
        match self.platform.get_all_favorite_folders().await {
            Ok(dirs) => {
                self.favorite_dirs.send_replace(Arc::new(dirs));
            }
            Err(e) => error!(error = %e, "Failed to load favorite folders"),
        }
    }

    /// Adds or removes `path`. The in-memory list changes immediately; the
    /// store write is best-effort.
    #[instrument(skip(self))]
    pub async fn toggle_favorite_dir(&self, path: &str) {
        let mut added = false;
        self.favorite_dirs.send_modify(|dirs| {
            let mut next = dirs.as_ref().clone();
            match next.iter().position(|dir| dir == path) {
                Some(index) => {
                    next.remove(index);
                }
                None => {
                    next.push(path.to_string());
                    added = true;
                }
            }
            *dirs = Arc::new(next);
        });

        let result = if added {
            self.platform.add_favorite_folder(path).await
        } else {
            self.platform.remove_favorite_folder(path).await
        };
        if let Err(e) = result {
            warn!(path = %path, added, error = %e, "Failed to persist favorite folder change");
        }
    }

    pub async fn store_ui_value(&self, key: &str, value: Value) {
        if let Err(e) = self.platform.ui_store(key, value).await {
            warn!(key = %key, error = %e, "Failed to persist ui store value");
        }
    }

    // --- Toolbar ---

    /// Menu for one toolbar entry.
    pub async fn trigger_action(&self, action: &ToolbarAction) -> Vec<MenuItem> {
        let favorites = self.favorite_dirs().as_ref().clone();
        self.extension_manager
            .trigger(&action.extension_name, action.data(), favorites)
            .await
    }

    /// Menu for the entry selected with the keyboard, if any.
    pub async fn trigger_selected_action(&self, session: &Session) -> Option<Vec<MenuItem>> {
        let index = usize::try_from(session.active_toolbar_index()).ok()?;
        let action = session.toolbar_actions().get(index).cloned()?;
        Some(self.trigger_action(&action).await)
    }

    pub async fn activate_menu_item(&self, item: &MenuItem) {
        match item {
            MenuItem::Command { command, .. } => {
                self.session_manager.execute_command(&format!("{}\r", command));
            }
            MenuItem::Action { action, .. } => match action {
                MenuAction::ToggleFavorite(path) => self.toggle_favorite_dir(path).await,
            },
            MenuItem::Divider => {}
        }
    }

    pub fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn follow_current_dir(weak: Weak<AppState>, mut active_rx: watch::Receiver<Option<Arc<Session>>>) {
    loop {
        let session = active_rx.borrow_and_update().clone();
        let mut cwd_rx = session.as_ref().map(|s| s.subscribe_cwd());
        drop(session);

        let cwd = cwd_rx.as_mut().and_then(|rx| rx.borrow_and_update().clone());
        match weak.upgrade() {
            Some(state) => {
                state.current_dir.send_replace(cwd);
            }
            None => return,
        }

        loop {
            tokio::select! {
                changed = active_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
                changed = async {
                    match cwd_rx.as_mut() {
                        Some(rx) => rx.changed().await,
                        None => std::future::pending().await,
                    }
                } => {
                    if changed.is_err() {
                        // The session is gone; wait for the next active tab.
                        cwd_rx = None;
                        continue;
                    }
                    let cwd = cwd_rx.as_mut().and_then(|rx| rx.borrow_and_update().clone());
                    debug!(cwd = ?cwd, "Active tab changed directory");
                    match weak.upgrade() {
                        Some(state) => {
                            state.current_dir.send_replace(cwd);
                        }
                        None => return,
                    }
                }
            }
        }
    }
}
