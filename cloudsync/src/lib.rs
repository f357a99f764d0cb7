//! cloudsync library
//!
//! Change detection and ordered deployment for cloud object projects.

pub mod api;
pub mod config;
pub mod context;
pub mod diff;
pub mod events;
pub mod executor;
pub mod fetch;
pub mod fs;
pub mod gate;
pub mod project;
pub mod report;
pub mod schema;
pub mod session;
pub mod shutdown;
pub mod snapshot;
pub mod sync;
pub mod utils;
pub mod ws;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::SyncError;
pub use utils::Result;
