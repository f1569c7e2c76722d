use crate::error::AppError;
use crate::extensions::{ActionData, Extension, MenuItem, ResolveParams, TriggerParams};
use crate::platform::Platform;
use async_trait::async_trait;

pub const NAME: &str = "flutter";

#[derive(Debug, Default)]
pub struct FlutterExtension;

#[async_trait]
impl Extension for FlutterExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn match_file(&self) -> Option<&str> {
        Some("pubspec.yaml")
    }

    async fn resolve(&self, _platform: &dyn Platform, _params: &ResolveParams) -> Result<Option<ActionData>, AppError> {
        Ok(Some(ActionData::new("flutter").color("rgb(117, 191, 235)")))
    }

    fn has_trigger(&self) -> bool {
        true
    }

    async fn trigger(&self, _platform: &dyn Platform, _params: &TriggerParams) -> Result<Vec<MenuItem>, AppError> {
        Ok(vec![
            MenuItem::command("flutter-run", "flutter run"),
            MenuItem::command("flutter-test", "flutter test"),
            MenuItem::command("flutter-pub-get", "flutter pub get"),
            MenuItem::command("flutter-build", "flutter build"),
        ])
    }
}
