use crate::extensions::{ActionData, Extension, ExtensionContext, MenuItem, ResolveParams, ToolbarAction};
use crate::platform::Platform;
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Runs every registered extension against a directory and turns the results
/// into toolbar actions, always in registration order.
#[derive(Debug)]
pub struct ExtensionManager {
    platform: Arc<dyn Platform>,
    extensions: Vec<Arc<ExtensionContext>>,
    extension_map: HashMap<String, Arc<ExtensionContext>>,
    home_dir: RwLock<Option<String>>,
}

impl ExtensionManager {
    pub fn new(platform: Arc<dyn Platform>, extensions: Vec<Arc<dyn Extension>>) -> Self {
        let mut ordered = Vec::with_capacity(extensions.len());
        let mut extension_map = HashMap::with_capacity(extensions.len());

        for extension in extensions {
            let name = extension.name().to_string();
            if extension_map.contains_key(&name) {
                error!(extension = %name, "Extension name duplicated, ignoring later registration");
                continue;
            }
            let ctx = Arc::new(ExtensionContext::new(extension));
            extension_map.insert(name, ctx.clone());
            ordered.push(ctx);
        }

        Self {
            platform,
            extensions: ordered,
            extension_map,
            home_dir: RwLock::new(None),
        }
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|ctx| ctx.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ExtensionContext>> {
        self.extension_map.get(name)
    }

    pub fn set_home_dir(&self, home_dir: Option<String>) {
        *self.home_dir.write() = home_dir;
    }

    pub fn home_dir(&self) -> Option<String> {
        self.home_dir.read().clone()
    }

    fn resolve_params(&self, current_dir: &str) -> ResolveParams {
        ResolveParams::new(current_dir, self.home_dir())
    }

    async fn resolve_one(&self, ctx: &ExtensionContext, params: &ResolveParams) -> Option<ToolbarAction> {
        match ctx.resolve(self.platform.as_ref(), params).await {
            Ok(Some(data)) => Some(ToolbarAction::new(ctx.name(), data)),
            Ok(None) => None,
            Err(e) => {
                error!(extension = %ctx.name(), dir = %params.current_dir, error = %e, "Generate action failed");
                None
            }
        }
    }

    /// Full resolution for `current_dir`. Extension failures only drop that
    /// extension's entry.
    #[instrument(skip(self))]
    pub async fn generate_actions(&self, current_dir: &str) -> Vec<ToolbarAction> {
        let params = self.resolve_params(current_dir);

        let (file_matched, match_all): (Vec<_>, Vec<_>) =
            self.extensions.iter().partition(|ctx| ctx.match_file().is_some());

        let test_files: Vec<String> = file_matched
            .iter()
            .filter_map(|ctx| ctx.match_file().map(str::to_string))
            .collect();

        let mut candidates: Vec<&Arc<ExtensionContext>> = Vec::with_capacity(self.extensions.len());
        if !test_files.is_empty() {
            match self.platform.batch_test_files(current_dir, &test_files).await {
                Ok(statuses) => {
                    if statuses.len() != file_matched.len() {
                        warn!(expected = file_matched.len(), got = statuses.len(), "Batch file probe returned a mismatched report");
                    }
                    candidates.extend(
                        file_matched
                            .iter()
                            .zip(statuses)
                            .filter(|(_, status)| status.exists())
                            .map(|(ctx, _)| *ctx),
                    );
                }
                Err(e) => {
                    error!(dir = %current_dir, error = %e, "Batch file probe failed, skipping file-matched extensions");
                }
            }
        }
        candidates.extend(match_all);

        let resolved = join_all(candidates.iter().map(|ctx| self.resolve_one(ctx, &params))).await;
        let mut result_map: HashMap<String, ToolbarAction> = resolved
            .into_iter()
            .flatten()
            .map(|action| (action.extension_name.clone(), action))
            .collect();

        let actions: Vec<ToolbarAction> = self
            .extensions
            .iter()
            .filter_map(|ctx| result_map.remove(ctx.name()))
            .collect();
        debug!(count = actions.len(), "Actions generated");
        actions
    }

    /// Re-runs only the entries whose last resolution asked to watch the
    /// directory. Other entries pass through untouched.
    #[instrument(skip(self, current))]
    pub async fn regenerate_for_watchers(&self, current_dir: &str, current: &[ToolbarAction]) -> Vec<ToolbarAction> {
        let params = self.resolve_params(current_dir);

        let refreshed = join_all(current.iter().map(|action| async {
            if !action.watch_directory {
                return Some(action.clone());
            }
            match self.get(&action.extension_name) {
                Some(ctx) => self.resolve_one(ctx, &params).await,
                None => Some(action.clone()),
            }
        }))
        .await;

        refreshed.into_iter().flatten().collect()
    }

    /// Menu for a toolbar action, scoped to the directory its extension last
    /// resolved. Failures yield an empty menu.
    #[instrument(skip(self, data, favorite_dirs))]
    pub async fn trigger(&self, extension_name: &str, data: ActionData, favorite_dirs: Vec<String>) -> Vec<MenuItem> {
        let Some(ctx) = self.get(extension_name) else {
            warn!(extension = %extension_name, "Trigger for unknown extension");
            return Vec::new();
        };
        match ctx.trigger(self.platform.as_ref(), data, favorite_dirs).await {
            Ok(items) => items,
            Err(e) => {
                error!(extension = %extension_name, error = %e, "Action trigger failed");
                Vec::new()
            }
        }
    }

    pub fn is_triggerable(&self, extension_name: &str) -> bool {
        self.get(extension_name).map(|ctx| ctx.has_trigger()).unwrap_or(false)
    }
}
