use crate::error::AppError;
use crate::extensions::{ActionData, Extension, MenuItem, ResolveParams, TriggerParams};
use crate::platform::messages::SpawnRequest;
use crate::platform::Platform;
use async_trait::async_trait;
use tracing::debug;

pub const NAME: &str = "git";

/// Current branch, refreshed whenever the working tree changes.
#[derive(Debug, Default)]
pub struct GitExtension;

#[async_trait]
impl Extension for GitExtension {
    fn name(&self) -> &str {
        NAME
    }

    async fn resolve(&self, platform: &dyn Platform, params: &ResolveParams) -> Result<Option<ActionData>, AppError> {
        let result = platform
            .spawn_command(SpawnRequest::new("git", &params.current_dir).args(["branch", "--show-current"]))
            .await?;

        if !result.success {
            debug!(dir = %params.current_dir, code = ?result.code, "Not a git work tree");
            return Ok(None);
        }

        let branch = result.output.trim();
        Ok(Some(
            ActionData::new(format!("git:{}", branch))
                .color("rgb(215, 90, 62)")
                .watch_directory(true),
        ))
    }

    fn has_trigger(&self) -> bool {
        true
    }

    async fn trigger(&self, _platform: &dyn Platform, _params: &TriggerParams) -> Result<Vec<MenuItem>, AppError> {
        Ok(vec![
            MenuItem::command("git-commit", "git commit"),
            MenuItem::command("git-commit-a", "git commit -a"),
            MenuItem::Divider,
            MenuItem::command("git-pull", "git pull"),
            MenuItem::command("git-push", "git push"),
        ])
    }
}
