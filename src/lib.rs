//! Session/tab orchestration and contextual toolbar actions for the T1
//! terminal.
//!
//! [`models::SessionManager`] owns the open tabs and routes platform events to
//! them; each [`models::Session`] re-resolves its toolbar through the
//! [`models::ExtensionManager`] whenever its working directory changes.

pub mod config;
pub mod error;
pub mod extensions;
pub mod models;
pub mod platform;
pub mod utils;

pub use config::Config;
pub use error::AppError;
