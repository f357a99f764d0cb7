//! Utility modules for cloudsync.

pub mod errors;
pub mod logger;

pub use errors::{SyncError, Result};
