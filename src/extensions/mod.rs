pub mod cargo_ext;
pub mod explorer_ext;
pub mod flutter_ext;
pub mod git_ext;
pub mod npm_ext;

use crate::error::AppError;
use crate::platform::Platform;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What an extension contributes to the toolbar for one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionData {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Re-resolve this action when the directory contents change.
    #[serde(default)]
    pub watch_directory: bool,
}

impl ActionData {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: None,
            watch_directory: false,
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn watch_directory(mut self, watch: bool) -> Self {
        self.watch_directory = watch;
        self
    }
}

/// One resolved entry of a session's toolbar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarAction {
    pub extension_name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub watch_directory: bool,
}

impl ToolbarAction {
    pub fn new(extension_name: impl Into<String>, data: ActionData) -> Self {
        Self {
            extension_name: extension_name.into(),
            title: data.title,
            color: data.color,
            watch_directory: data.watch_directory,
        }
    }

    pub fn data(&self) -> ActionData {
        ActionData {
            title: self.title.clone(),
            color: self.color.clone(),
            watch_directory: self.watch_directory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveParams {
    pub current_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_dir: Option<String>,
}

impl ResolveParams {
    pub fn new(current_dir: impl Into<String>, home_dir: Option<String>) -> Self {
        Self {
            current_dir: current_dir.into(),
            home_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerParams {
    pub current_dir: String,
    pub home_dir: Option<String>,
    /// The action the menu was opened from.
    pub data: ActionData,
    pub favorite_dirs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuAction {
    ToggleFavorite(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MenuItem {
    Command {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        command: String,
    },
    Action {
        key: String,
        title: String,
        action: MenuAction,
    },
    Divider,
}

impl MenuItem {
    pub fn command(key: impl Into<String>, command: impl Into<String>) -> Self {
        MenuItem::Command {
            key: key.into(),
            title: None,
            command: command.into(),
        }
    }

    pub fn titled_command(key: impl Into<String>, title: impl Into<String>, command: impl Into<String>) -> Self {
        MenuItem::Command {
            key: key.into(),
            title: Some(title.into()),
            command: command.into(),
        }
    }

    pub fn action(key: impl Into<String>, title: impl Into<String>, action: MenuAction) -> Self {
        MenuItem::Action {
            key: key.into(),
            title: title.into(),
            action,
        }
    }

    /// Text shown in the menu; a command without a title shows the command.
    pub fn display_title(&self) -> Option<&str> {
        match self {
            MenuItem::Command { title, command, .. } => Some(title.as_deref().unwrap_or(command)),
            MenuItem::Action { title, .. } => Some(title),
            MenuItem::Divider => None,
        }
    }
}

/// A pluggable toolbar contributor.
///
/// `resolve` decides whether the extension shows up for a directory; `trigger`
/// is only called once the user opens the action's menu.
#[async_trait]
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    /// File that must exist in the directory for this extension to be
    /// considered. `None` means the extension is always considered.
    fn match_file(&self) -> Option<&str> {
        None
    }

    async fn resolve(&self, platform: &dyn Platform, params: &ResolveParams) -> Result<Option<ActionData>, AppError>;

    fn has_trigger(&self) -> bool {
        false
    }

    async fn trigger(&self, _platform: &dyn Platform, _params: &TriggerParams) -> Result<Vec<MenuItem>, AppError> {
        Ok(Vec::new())
    }
}

/// Registered extension plus the input of its most recent resolution, which
/// scopes a later trigger to the same directory.
pub struct ExtensionContext {
    extension: Arc<dyn Extension>,
    last_resolved_params: Mutex<Option<ResolveParams>>,
}

impl std::fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("name", &self.name())
            .field("match_file", &self.match_file())
            .field("last_resolved_params", &*self.last_resolved_params.lock())
            .finish()
    }
}

impl ExtensionContext {
    pub fn new(extension: Arc<dyn Extension>) -> Self {
        Self {
            extension,
            last_resolved_params: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        self.extension.name()
    }

    pub fn match_file(&self) -> Option<&str> {
        self.extension.match_file()
    }

    pub fn has_trigger(&self) -> bool {
        self.extension.has_trigger()
    }

    pub fn last_resolved_params(&self) -> Option<ResolveParams> {
        self.last_resolved_params.lock().clone()
    }

    pub async fn resolve(&self, platform: &dyn Platform, params: &ResolveParams) -> Result<Option<ActionData>, AppError> {
        *self.last_resolved_params.lock() = Some(params.clone());
        self.extension.resolve(platform, params).await
    }

    /// Builds the menu for `data` in the directory this extension last
    /// resolved. Nothing to show if it never resolved.
    pub async fn trigger(
        &self,
        platform: &dyn Platform,
        data: ActionData,
        favorite_dirs: Vec<String>,
    ) -> Result<Vec<MenuItem>, AppError> {
        let Some(resolved) = self.last_resolved_params() else {
            return Ok(Vec::new());
        };
        let params = TriggerParams {
            current_dir: resolved.current_dir,
            home_dir: resolved.home_dir,
            data,
            favorite_dirs,
        };
        self.extension.trigger(platform, &params).await
    }
}

/// Built-in extensions in toolbar order.
pub fn builtin_extensions() -> Vec<Arc<dyn Extension>> {
    vec![
        Arc::new(explorer_ext::ExplorerExtension),
        Arc::new(git_ext::GitExtension),
        Arc::new(npm_ext::NpmExtension),
        Arc::new(cargo_ext::CargoExtension),
        Arc::new(flutter_ext::FlutterExtension),
    ]
}

/// Shows `path` relative to `home_dir` as `~/...`.
pub fn pretty_path(home_dir: Option<&str>, path: &str) -> String {
    let home = match home_dir {
        Some(home) if !home.trim_end_matches('/').is_empty() => home.trim_end_matches('/'),
        _ => return path.to_string(),
    };
    match path.strip_prefix(home) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("~{}", rest),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_path_shortens_home_prefix() {
        assert_eq!(pretty_path(Some("/Users/me"), "/Users/me/code"), "~/code");
        assert_eq!(pretty_path(Some("/Users/me"), "/Users/me"), "~");
        assert_eq!(pretty_path(Some("/Users/me"), "/tmp"), "/tmp");
        assert_eq!(pretty_path(Some("/Users/me"), "/Users/meow"), "/Users/meow");
        assert_eq!(pretty_path(None, "/Users/me/code"), "/Users/me/code");
    }

    #[test]
    fn menu_item_display_title_falls_back_to_command() {
        assert_eq!(MenuItem::command("k", "git push").display_title(), Some("git push"));
        assert_eq!(MenuItem::titled_command("k", "Up", "cd ..").display_title(), Some("Up"));
        assert_eq!(MenuItem::Divider.display_title(), None);
    }

    #[test]
    fn builtin_order_is_stable() {
        let names: Vec<String> = builtin_extensions().iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["explorer", "git", "npm", "cargo", "flutter"]);
    }
}
