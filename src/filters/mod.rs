/// Filter parameter model and mapping
///
/// This module owns the FilterSet parameter struct and the two translations
/// out of it: the ordered external render command (command.rs) and the fast
/// CSS-style preview expression (css.rs).

pub mod command;
pub mod css;
pub mod params;

pub use command::build_command;
pub use css::build_preview_filter;
pub use params::FilterSet;

/// Native hue of the external tool's sepia transform, in degrees.
/// The tone wash rotates from this point to reach the requested hue.
pub const SEPIA_HUE_DEG: f32 = 38.0;
