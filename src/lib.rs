//! Aether filter engine
//!
//! The filter-mapping and live-preview core of the Aether wallpaper studio.
//! Translates normalized filter parameters into external render commands and
//! fast preview filter expressions, and schedules debounced, single-flight
//! preview renders against a downscaled working copy of the source image.
//! The GUI shell drives this crate through [`SchedulerHandle`] and consumes
//! [`SchedulerEvent`]s; nothing here depends on any UI toolkit.

pub mod error;
pub mod filters;
pub mod preview;
pub mod render;

pub use error::EngineError;
pub use filters::{build_command, build_preview_filter, FilterSet};
pub use preview::{PreviewScheduler, SchedulerEvent, SchedulerHandle};
pub use render::RenderEngine;
