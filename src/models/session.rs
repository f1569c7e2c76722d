use crate::config::Config;
use crate::extensions::ToolbarAction;
use crate::models::extension_manager::ExtensionManager;
use crate::platform::messages::TerminalStatistic;
use crate::utils::cwd_signal::parse_cwd_signal;
use crate::utils::dynamic_debounce::DynamicDebounce;
use crate::utils::id_helper::mk_tab_id;
use crate::utils::ring_buffer::RingBuffer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

const SHELL_INPUT_CAPACITY: usize = 64;
const PTY_OUTPUT_CAPACITY: usize = 1024;
const SIGNAL_CAPACITY: usize = 16;

/// State of one terminal tab.
///
/// Observable fields live in `watch` channels, so a new subscriber sees the
/// current value immediately. One-shot signals (input, output, focus) are
/// `broadcast` channels.
#[derive(Debug)]
pub struct Session {
    id: String,
    initial_path: Option<String>,
    config: Arc<Config>,
    extension_manager: Arc<ExtensionManager>,

    title: watch::Sender<Option<String>>,
    cwd: watch::Sender<Option<String>>,
    toolbar_actions: watch::Sender<Arc<Vec<ToolbarAction>>>,
    active_toolbar_index: watch::Sender<i32>,
    search_box_visible: watch::Sender<bool>,
    exited: watch::Sender<bool>,

    statistics: Mutex<RingBuffer<TerminalStatistic>>,
    statistics_updated: watch::Sender<u64>,

    shell_input: broadcast::Sender<String>,
    pty_output: broadcast::Sender<Vec<u8>>,
    search_box_focus: broadcast::Sender<()>,
    search_next: broadcast::Sender<String>,
    term_focus: broadcast::Sender<()>,

    // Bumped by every full resolution; only the newest one may publish.
    resolve_generation: AtomicU64,
    resolved_dir: Mutex<Option<String>>,
    last_resolution_cost: Mutex<Duration>,
    fs_debounce: DynamicDebounce,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(
        extension_manager: Arc<ExtensionManager>,
        config: Arc<Config>,
        initial_path: Option<String>,
    ) -> Arc<Self> {
        let statistics = RingBuffer::new(config.statistics_capacity);
        Arc::new(Self {
            id: mk_tab_id(),
            initial_path,
            config,
            extension_manager,
            title: watch::Sender::new(None),
            cwd: watch::Sender::new(None),
            toolbar_actions: watch::Sender::new(Arc::new(Vec::new())),
            active_toolbar_index: watch::Sender::new(-1),
            search_box_visible: watch::Sender::new(false),
            exited: watch::Sender::new(false),
            statistics: Mutex::new(statistics),
            statistics_updated: watch::Sender::new(0),
            shell_input: broadcast::channel(SHELL_INPUT_CAPACITY).0,
            pty_output: broadcast::channel(PTY_OUTPUT_CAPACITY).0,
            search_box_focus: broadcast::channel(SIGNAL_CAPACITY).0,
            search_next: broadcast::channel(SIGNAL_CAPACITY).0,
            term_focus: broadcast::channel(SIGNAL_CAPACITY).0,
            resolve_generation: AtomicU64::new(0),
            resolved_dir: Mutex::new(None),
            last_resolution_cost: Mutex::new(Duration::ZERO),
            fs_debounce: DynamicDebounce::new(),
            monitor: Mutex::new(None),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory the terminal should be started in, if the tab was opened
    /// for a specific path.
    pub fn initial_path(&self) -> Option<&str> {
        self.initial_path.as_deref()
    }

    // --- Title ---

    pub fn title(&self) -> Option<String> {
        self.title.borrow().clone()
    }

    pub fn subscribe_title(&self) -> watch::Receiver<Option<String>> {
        self.title.subscribe()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.title.send_replace(Some(title.into()));
    }

    // --- Working directory & toolbar ---

    pub fn cwd(&self) -> Option<String> {
        self.cwd.borrow().clone()
    }

    pub fn subscribe_cwd(&self) -> watch::Receiver<Option<String>> {
        self.cwd.subscribe()
    }

    /// Handles a `scheme://host/path` directory report from the terminal.
    /// Malformed signals are ignored. Returns whether the cwd changed.
    pub fn set_cwd_from_raw_signal(self: &Arc<Self>, raw: &str) -> bool {
        match parse_cwd_signal(raw) {
            Some(path) => self.set_cwd(path),
            None => {
                debug!(session_id = %self.id, raw = %raw, "Ignoring malformed cwd signal");
                false
            }
        }
    }

    /// Updates the cwd and starts a resolution for it, unless it is the
    /// directory we already have.
    pub fn set_cwd(self: &Arc<Self>, path: impl Into<String>) -> bool {
        let path = path.into();
        let mut generation = 0;
        // The generation is taken under the cwd lock so it orders the same
        // way the directory changes do.
        let changed = self.cwd.send_if_modified(|current| {
            if current.as_deref() == Some(path.as_str()) {
                return false;
            }
            *current = Some(path.clone());
            generation = self.resolve_generation.fetch_add(1, Ordering::SeqCst) + 1;
            true
        });

        if changed {
            debug!(session_id = %self.id, cwd = %path, generation, "cwd changed");
            let session = self.clone();
            tokio::spawn(async move { session.resolve_for(path, generation).await });
        }
        changed
    }

    pub fn toolbar_actions(&self) -> Arc<Vec<ToolbarAction>> {
        self.toolbar_actions.borrow().clone()
    }

    pub fn subscribe_toolbar_actions(&self) -> watch::Receiver<Arc<Vec<ToolbarAction>>> {
        self.toolbar_actions.subscribe()
    }

    /// Number of full resolutions started so far.
    pub fn resolution_generation(&self) -> u64 {
        self.resolve_generation.load(Ordering::SeqCst)
    }

    pub fn last_resolution_cost(&self) -> Duration {
        *self.last_resolution_cost.lock()
    }

    /// Resolves the toolbar for the current cwd. No-op until a cwd is known.
    pub async fn generate_actions(&self) {
        let (dir, generation) = {
            let cwd = self.cwd.borrow();
            let Some(dir) = cwd.clone() else {
                return;
            };
            (dir, self.resolve_generation.fetch_add(1, Ordering::SeqCst) + 1)
        };
        self.resolve_for(dir, generation).await;
    }

    /// A resolution that finishes after a newer one has started, or after
    /// the cwd moved elsewhere, is discarded, so a slow resolver for an old
    /// directory never overwrites the toolbar of the current one.
    #[instrument(skip(self), fields(session_id = %self.id))]
    async fn resolve_for(&self, dir: String, generation: u64) {
        let started = Instant::now();
        let actions = self.extension_manager.generate_actions(&dir).await;
        let cost = started.elapsed();
        *self.last_resolution_cost.lock() = cost;

        if self.resolution_generation() != generation || self.cwd().as_deref() != Some(dir.as_str()) {
            debug!(dir = %dir, generation, "Dropping stale resolution");
            return;
        }
        debug!(dir = %dir, count = actions.len(), cost_ms = cost.as_millis() as u64, "Publishing toolbar actions");
        self.publish_actions(dir, actions);
    }

    fn publish_actions(&self, dir: String, actions: Vec<ToolbarAction>) {
        let len = actions.len() as i32;
        *self.resolved_dir.lock() = Some(dir);
        self.toolbar_actions.send_replace(Arc::new(actions));
        self.active_toolbar_index.send_if_modified(|index| {
            if *index >= len {
                *index = -1;
                return true;
            }
            false
        });
    }

    /// Schedules a watcher-only re-resolution. The wait scales with what the
    /// last full resolution cost, so expensive resolvers back off harder.
    pub fn on_filesystem_changed(self: &Arc<Self>, paths: Vec<String>) {
        let delay = self.config.watch_debounce_for(self.last_resolution_cost());
        debug!(session_id = %self.id, changed = paths.len(), delay_ms = delay.as_millis() as u64, "Filesystem changed");

        let weak: Weak<Session> = Arc::downgrade(self);
        self.fs_debounce.call(delay, async move {
            if let Some(session) = weak.upgrade() {
                session.regenerate_for_watchers().await;
            }
        });
    }

    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn regenerate_for_watchers(&self) {
        let Some(dir) = self.cwd() else {
            return;
        };
        // The toolbar being refreshed must belong to the directory we are in.
        if self.resolved_dir.lock().as_deref() != Some(dir.as_str()) {
            return;
        }
        let current = self.toolbar_actions();
        if !current.iter().any(|action| action.watch_directory) {
            return;
        }

        let generation = self.resolution_generation();
        let actions = self.extension_manager.regenerate_for_watchers(&dir, &current).await;

        if self.resolution_generation() != generation || self.cwd().as_deref() != Some(dir.as_str()) {
            debug!(dir = %dir, "Dropping watcher refresh superseded by a full resolution");
            return;
        }
        self.publish_actions(dir, actions);
    }

    pub fn active_toolbar_index(&self) -> i32 {
        *self.active_toolbar_index.borrow()
    }

    pub fn subscribe_active_toolbar_index(&self) -> watch::Receiver<i32> {
        self.active_toolbar_index.subscribe()
    }

    /// Selects a toolbar entry for keyboard activation; out-of-range values
    /// mean "none selected" (-1).
    pub fn set_active_toolbar_index(&self, index: i32) {
        let len = self.toolbar_actions.borrow().len() as i32;
        let index = if (0..len).contains(&index) { index } else { -1 };
        self.active_toolbar_index.send_if_modified(|current| {
            if *current == index {
                return false;
            }
            *current = index;
            true
        });
    }

    // --- Statistics ---

    /// Records a usage sample. `None` means nothing is running in the
    /// terminal; it is stored as an idle sample unless history is empty.
    pub fn push_statistic(&self, sample: Option<TerminalStatistic>) {
        {
            let mut statistics = self.statistics.lock();
            let sample = match sample {
                Some(sample) => sample,
                None if statistics.is_empty() => return,
                None => TerminalStatistic::idle(),
            };
            statistics.push(sample);
        }
        self.statistics_updated.send_modify(|count| *count += 1);
    }

    /// Oldest first.
    pub fn statistics(&self) -> Vec<TerminalStatistic> {
        self.statistics.lock().to_vec()
    }

    pub fn last_statistic(&self) -> Option<TerminalStatistic> {
        self.statistics.lock().last().cloned()
    }

    pub fn subscribe_statistics_updated(&self) -> watch::Receiver<u64> {
        self.statistics_updated.subscribe()
    }

    /// Polls the platform for usage samples until the session is disposed.
    pub fn start_statistics_monitor(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let platform = self.extension_manager.platform().clone();
        let period = self.config.statistics_interval;
        let session_id = self.id.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let sample = match platform.terminal_statistics(&session_id).await {
                    Ok(sample) => sample,
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Failed to fetch terminal statistics");
                        continue;
                    }
                };
                match weak.upgrade() {
                    Some(session) => session.push_statistic(sample),
                    None => break,
                }
            }
        });

        if let Some(previous) = self.monitor.lock().replace(handle) {
            previous.abort();
        }
    }

    // --- Search box ---

    pub fn search_box_visible(&self) -> bool {
        *self.search_box_visible.borrow()
    }

    pub fn subscribe_search_box_visible(&self) -> watch::Receiver<bool> {
        self.search_box_visible.subscribe()
    }

    pub fn subscribe_search_box_focus(&self) -> broadcast::Receiver<()> {
        self.search_box_focus.subscribe()
    }

    /// Opens the search box, or asks it to take focus again if it is open.
    pub fn show_search_box(&self) {
        if self.search_box_visible() {
            let _ = self.search_box_focus.send(());
            return;
        }
        self.search_box_visible.send_replace(true);
    }

    pub fn close_search_box(&self) {
        self.search_box_visible.send_if_modified(|visible| std::mem::replace(visible, false));
    }

    pub fn search_next(&self, text: impl Into<String>) {
        let _ = self.search_next.send(text.into());
    }

    pub fn subscribe_search_next(&self) -> broadcast::Receiver<String> {
        self.search_next.subscribe()
    }

    // --- Terminal I/O ---

    /// Sends text to the terminal surface as if typed.
    pub fn send_input(&self, content: impl Into<String>) {
        if self.shell_input.send(content.into()).is_err() {
            debug!(session_id = %self.id, "No terminal attached to receive input");
        }
        self.focus_terminal();
    }

    pub fn subscribe_shell_input(&self) -> broadcast::Receiver<String> {
        self.shell_input.subscribe()
    }

    pub fn push_pty_output(&self, data: Vec<u8>) {
        let _ = self.pty_output.send(data);
    }

    pub fn subscribe_pty_output(&self) -> broadcast::Receiver<Vec<u8>> {
        self.pty_output.subscribe()
    }

    pub fn focus_terminal(&self) {
        let _ = self.term_focus.send(());
    }

    pub fn subscribe_term_focus(&self) -> broadcast::Receiver<()> {
        self.term_focus.subscribe()
    }

    pub fn mark_exited(&self) {
        if !self.exited.send_replace(true) {
            info!(session_id = %self.id, "Terminal process exited");
        }
    }

    pub fn has_exited(&self) -> bool {
        *self.exited.borrow()
    }

    pub fn subscribe_exit(&self) -> watch::Receiver<bool> {
        self.exited.subscribe()
    }

    /// Stops background work owned by this session and tells exit
    /// subscribers the tab is gone.
    pub fn dispose(&self) {
        self.fs_debounce.cancel();
        if let Some(monitor) = self.monitor.lock().take() {
            monitor.abort();
        }
        self.exited.send_replace(true);
        debug!(session_id = %self.id, "Session disposed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.get_mut().take() {
            monitor.abort();
        }
    }
}
