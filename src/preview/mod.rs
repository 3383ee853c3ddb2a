/// Live preview pipeline
///
/// This module owns the downscaled preview base (base.rs) and the debounced,
/// single-flight preview scheduler (scheduler.rs) that keeps the UI
/// responsive while external renders run.

use std::path::PathBuf;

pub mod base;
pub mod scheduler;

pub use base::generate_preview_base;
pub use scheduler::{PreviewScheduler, SchedulerEvent, SchedulerHandle};

/// Get the cache directory for preview and apply artifacts
pub fn default_cache_dir() -> PathBuf {
    let mut path = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .expect("Could not determine cache directory");

    path.push("aether");
    path.push("filters");

    path
}
