//! Local file system access: project tree walking and bundle archiving.

pub mod bundle;
pub mod walker;
