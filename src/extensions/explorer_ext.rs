use crate::error::AppError;
use crate::extensions::{pretty_path, ActionData, Extension, MenuAction, MenuItem, ResolveParams, TriggerParams};
use crate::platform::Platform;
use async_trait::async_trait;
use std::path::Path;

pub const NAME: &str = "explorer";

/// Always present: shows the current directory and a favorites menu.
#[derive(Debug, Default)]
pub struct ExplorerExtension;

#[async_trait]
impl Extension for ExplorerExtension {
    fn name(&self) -> &str {
        NAME
    }

    async fn resolve(&self, _platform: &dyn Platform, params: &ResolveParams) -> Result<Option<ActionData>, AppError> {
        let title = pretty_path(params.home_dir.as_deref(), &params.current_dir);
        Ok(Some(ActionData::new(title).color("rgb(138, 206, 247)")))
    }

    fn has_trigger(&self) -> bool {
        true
    }

    async fn trigger(&self, _platform: &dyn Platform, params: &TriggerParams) -> Result<Vec<MenuItem>, AppError> {
        let current_dir = &params.current_dir;
        let mut items = Vec::new();

        if params.favorite_dirs.contains(current_dir) {
            items.push(MenuItem::action(
                "remove-from-favorite",
                "Remove from Favorites",
                MenuAction::ToggleFavorite(current_dir.clone()),
            ));
        } else {
            items.push(MenuItem::action(
                "add-to-favorite",
                "Add to Favorites",
                MenuAction::ToggleFavorite(current_dir.clone()),
            ));
        }

        if !params.favorite_dirs.is_empty() {
            items.push(MenuItem::Divider);
            for dir in &params.favorite_dirs {
                let basename = Path::new(dir)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| dir.clone());
                items.push(MenuItem::titled_command(format!("goto:{}", dir), basename, format!("cd {}", dir)));
            }
        }

        items.push(MenuItem::Divider);
        items.push(MenuItem::titled_command("go-up", "Go to parent directory", "cd .."));
        Ok(items)
    }
}
