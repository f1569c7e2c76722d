use crate::config::Config;
use crate::models::extension_manager::ExtensionManager;
use crate::models::session::Session;
use crate::platform::messages::PlatformEvent;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

#[derive(Debug)]
struct TabState {
    sessions: Vec<Arc<Session>>,
    id_index: HashMap<String, Arc<Session>>,
    active_index: i32,
}

impl TabState {
    fn active_session(&self) -> Option<Arc<Session>> {
        usize::try_from(self.active_index)
            .ok()
            .and_then(|index| self.sessions.get(index))
            .cloned()
    }
}

/// Ordered tab collection with the active selection, plus routing of
/// platform events to the session they belong to.
///
/// `sessions`, `id_index` and `active_index` change together under one lock,
/// and the published views are refreshed before the lock is released, so a
/// reader never sees one updated without the others.
#[derive(Debug)]
pub struct SessionManager {
    extension_manager: Arc<ExtensionManager>,
    config: Arc<Config>,
    state: RwLock<TabState>,
    sessions_tx: watch::Sender<Arc<Vec<Arc<Session>>>>,
    active_index_tx: watch::Sender<i32>,
    active_session_tx: watch::Sender<Option<Arc<Session>>>,
}

impl SessionManager {
    pub fn new(extension_manager: Arc<ExtensionManager>, config: Arc<Config>) -> Self {
        Self {
            extension_manager,
            config,
            state: RwLock::new(TabState {
                sessions: Vec::new(),
                id_index: HashMap::new(),
                active_index: -1,
            }),
            sessions_tx: watch::Sender::new(Arc::new(Vec::new())),
            active_index_tx: watch::Sender::new(-1),
            active_session_tx: watch::Sender::new(None),
        }
    }

    fn publish(&self, state: &TabState) {
        self.sessions_tx.send_replace(Arc::new(state.sessions.clone()));
        self.active_index_tx.send_if_modified(|index| {
            let changed = *index != state.active_index;
            *index = state.active_index;
            changed
        });
        let active = state.active_session();
        self.active_session_tx.send_if_modified(|current| {
            let changed = match (current.as_ref(), active.as_ref()) {
                (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
                (None, None) => false,
                _ => true,
            };
            *current = active;
            changed
        });
    }

    // --- Views ---

    pub fn sessions(&self) -> Arc<Vec<Arc<Session>>> {
        self.sessions_tx.borrow().clone()
    }

    pub fn subscribe_sessions(&self) -> watch::Receiver<Arc<Vec<Arc<Session>>>> {
        self.sessions_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.state.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_index(&self) -> i32 {
        self.state.read().active_index
    }

    pub fn subscribe_active_index(&self) -> watch::Receiver<i32> {
        self.active_index_tx.subscribe()
    }

    pub fn active_session(&self) -> Option<Arc<Session>> {
        self.state.read().active_session()
    }

    pub fn subscribe_active_session(&self) -> watch::Receiver<Option<Arc<Session>>> {
        self.active_session_tx.subscribe()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.state.read().id_index.get(id).cloned()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.state.read().sessions.iter().position(|s| s.id() == id)
    }

    // --- Tab lifecycle ---

    /// Opens a tab and makes it active.
    #[instrument(skip(self))]
    pub fn new_tab(&self, initial_path: Option<String>) -> Arc<Session> {
        let session = Session::new(self.extension_manager.clone(), self.config.clone(), initial_path);

        let mut state = self.state.write();
        state.id_index.insert(session.id().to_string(), session.clone());
        state.sessions.push(session.clone());
        state.active_index = state.sessions.len() as i32 - 1;
        self.publish(&state);
        drop(state);

        info!(session_id = %session.id(), "Tab opened");
        session
    }

    /// Makes the tab at `index` active. Out-of-range indexes are ignored.
    pub fn set_active_index(&self, index: usize) -> bool {
        let mut state = self.state.write();
        if index >= state.sessions.len() {
            warn!(index, len = state.sessions.len(), "Ignoring out-of-range tab selection");
            return false;
        }
        state.active_index = index as i32;
        self.publish(&state);
        true
    }

    pub fn close_active_tab(&self) -> Option<Arc<Session>> {
        let mut state = self.state.write();
        let index = usize::try_from(state.active_index).ok()?;
        let removed = self.remove_locked(&mut state, index);
        drop(state);
        Some(Self::finish_removal(removed))
    }

    /// Removes the tab at `index` from both the ordered list and the id index.
    ///
    /// The active tab stays selected when another tab is removed; when the
    /// active tab itself goes, its neighbour at the same position (or the new
    /// last tab) becomes active.
    #[instrument(skip(self))]
    pub fn remove_tab(&self, index: usize) -> Option<Arc<Session>> {
        let mut state = self.state.write();
        if index >= state.sessions.len() {
            debug!(index, "remove_tab out of range");
            return None;
        }
        let removed = self.remove_locked(&mut state, index);
        drop(state);
        Some(Self::finish_removal(removed))
    }

    /// Unknown ids leave everything untouched.
    pub fn remove_tab_by_id(&self, id: &str) -> Option<Arc<Session>> {
        let mut state = self.state.write();
        let index = state.sessions.iter().position(|s| s.id() == id)?;
        let removed = self.remove_locked(&mut state, index);
        drop(state);
        Some(Self::finish_removal(removed))
    }

    fn remove_locked(&self, state: &mut TabState, index: usize) -> Arc<Session> {
        let removed = state.sessions.remove(index);
        state.id_index.remove(removed.id());

        let len = state.sessions.len() as i32;
        if len == 0 {
            state.active_index = -1;
        } else if (index as i32) < state.active_index {
            state.active_index -= 1;
        } else if state.active_index >= len {
            state.active_index = len - 1;
        }
        self.publish(state);
        removed
    }

    fn finish_removal(removed: Arc<Session>) -> Arc<Session> {
        removed.dispose();
        info!(session_id = %removed.id(), "Tab closed");
        removed
    }

    /// Swaps the tabs at `from` and `to`. The active selection follows the
    /// tab it was on.
    pub fn move_tab(&self, from: usize, to: usize) -> bool {
        let mut state = self.state.write();
        let len = state.sessions.len();
        if from >= len || to >= len {
            warn!(from, to, len, "Ignoring out-of-range tab move");
            return false;
        }
        if from == to {
            return true;
        }
        state.sessions.swap(from, to);
        if state.active_index == from as i32 {
            state.active_index = to as i32;
        } else if state.active_index == to as i32 {
            state.active_index = from as i32;
        }
        self.publish(&state);
        true
    }

    /// Types `text` into the active tab. Silently does nothing without one.
    pub fn execute_command(&self, text: &str) {
        match self.active_session() {
            Some(session) => session.send_input(text),
            None => debug!("execute_command without an active session"),
        }
    }

    // --- Platform event routing ---

    pub fn handle_event(&self, event: PlatformEvent) {
        let Some(session) = self.get(event.session_id()) else {
            // Expected while a closed tab's process is still shutting down.
            debug!(session_id = %event.session_id(), "Dropping event for unknown session");
            return;
        };

        match event {
            PlatformEvent::PtyOutput { data, .. } => session.push_pty_output(data),
            PlatformEvent::PtyExit { id } => {
                session.mark_exited();
                self.remove_tab_by_id(&id);
            }
            PlatformEvent::FsChanged { paths, .. } => session.on_filesystem_changed(paths),
        }
    }

    /// Routes events from `events` until the channel closes or the manager
    /// is dropped. Events for one session keep their arrival order.
    pub fn spawn_event_router(self: &Arc<Self>, mut events: broadcast::Receiver<PlatformEvent>) -> JoinHandle<()> {
        let weak: Weak<SessionManager> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Platform event router lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                match weak.upgrade() {
                    Some(manager) => manager.handle_event(event),
                    None => break,
                }
            }
            debug!("Platform event router stopped");
        })
    }
}
