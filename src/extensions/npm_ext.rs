use crate::error::AppError;
use crate::extensions::{ActionData, Extension, MenuItem, ResolveParams, TriggerParams};
use crate::platform::Platform;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

pub const NAME: &str = "npm";

const LOCK_FILES: [(&str, &str, &str); 2] = [
    ("yarn.lock", "yarn", "rgb(74, 140, 183)"),
    ("pnpm-lock.yaml", "pnpm", "rgb(231, 169, 59)"),
];

/// Detects the package manager from lock files and offers the package.json scripts.
#[derive(Debug, Default)]
pub struct NpmExtension;

#[async_trait]
impl Extension for NpmExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn match_file(&self) -> Option<&str> {
        Some("package.json")
    }

    async fn resolve(&self, platform: &dyn Platform, params: &ResolveParams) -> Result<Option<ActionData>, AppError> {
        let lock_files: Vec<String> = LOCK_FILES.iter().map(|(file, _, _)| file.to_string()).collect();
        let statuses = platform.batch_test_files(&params.current_dir, &lock_files).await?;

        for ((_, manager, color), status) in LOCK_FILES.iter().zip(statuses) {
            if status.is_file() {
                return Ok(Some(ActionData::new(*manager).color(*color)));
            }
        }
        Ok(Some(ActionData::new("npm").color("rgb(181, 66, 60)")))
    }

    fn has_trigger(&self) -> bool {
        true
    }

    async fn trigger(&self, platform: &dyn Platform, params: &TriggerParams) -> Result<Vec<MenuItem>, AppError> {
        let manager = match params.data.title.as_str() {
            "yarn" => "yarn",
            "pnpm" => "pnpm",
            _ => "npm",
        };

        let manifest_path = Path::new(&params.current_dir).join("package.json");
        let content = platform.read_all(&manifest_path.to_string_lossy()).await?;
        let manifest: Value = serde_json::from_str(&content)
            .map_err(|e| AppError::extension(NAME, format!("Invalid {}: {}", manifest_path.display(), e)))?;

        Ok(package_menu(manager, &manifest))
    }
}

fn package_menu(manager: &str, manifest: &Value) -> Vec<MenuItem> {
    let mut items = vec![MenuItem::command("install", format!("{} install", manager))];

    let scripts = manifest.get("scripts").and_then(Value::as_object);
    if let Some(scripts) = scripts.filter(|scripts| !scripts.is_empty()) {
        items.push(MenuItem::Divider);
        for script in scripts.keys() {
            items.push(MenuItem::command(script.clone(), format!("{} run {}", manager, script)));
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scripts_keep_manifest_order() {
        let manifest = json!({ "scripts": { "start": "vite", "build": "vite build", "a-lint": "eslint" } });
        let items = package_menu("pnpm", &manifest);
        let titles: Vec<&str> = items.iter().filter_map(MenuItem::display_title).collect();
        assert_eq!(
            titles,
            vec!["pnpm install", "pnpm run start", "pnpm run build", "pnpm run a-lint"]
        );
        assert_eq!(items[1], MenuItem::Divider);
    }

    #[test]
    fn no_scripts_means_install_only() {
        let items = package_menu("npm", &json!({ "name": "x" }));
        assert_eq!(items, vec![MenuItem::command("install", "npm install")]);
    }
}
