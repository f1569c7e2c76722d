pub mod app_state;
pub mod extension_manager;
pub mod session;
pub mod session_manager;

pub use app_state::AppState;
pub use extension_manager::ExtensionManager;
pub use session::Session;
pub use session_manager::SessionManager;
