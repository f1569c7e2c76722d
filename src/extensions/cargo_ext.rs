use crate::error::AppError;
use crate::extensions::{ActionData, Extension, MenuItem, ResolveParams, TriggerParams};
use crate::platform::Platform;
use async_trait::async_trait;

pub const NAME: &str = "cargo";

#[derive(Debug, Default)]
pub struct CargoExtension;

#[async_trait]
impl Extension for CargoExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn match_file(&self) -> Option<&str> {
        Some("Cargo.toml")
    }

    async fn resolve(&self, _platform: &dyn Platform, _params: &ResolveParams) -> Result<Option<ActionData>, AppError> {
        Ok(Some(ActionData::new("cargo").color("rgb(221, 85, 39)")))
    }

    fn has_trigger(&self) -> bool {
        true
    }

    async fn trigger(&self, _platform: &dyn Platform, _params: &TriggerParams) -> Result<Vec<MenuItem>, AppError> {
        Ok(vec![
            MenuItem::command("cargo-run", "cargo run"),
            MenuItem::command("cargo-build", "cargo build"),
            MenuItem::command("cargo-build-release", "cargo build --release"),
            MenuItem::command("cargo-test", "cargo test"),
            MenuItem::command("cargo-bench", "cargo bench"),
            MenuItem::command("cargo-doc", "cargo doc"),
            MenuItem::command("cargo-publish", "cargo publish"),
        ])
    }
}
