/// Filter parameters for one editing session
///
/// This struct stores every adjustment the wallpaper editor exposes.
/// It is serialized to JSON (camelCase, matching the app's saved presets)
/// and reset to defaults whenever a new source image loads.

use serde::{Deserialize, Serialize};

/// The complete named set of filter values driving one render.
///
/// Every field has a fixed valid range enforced by the UI sliders. The
/// engine treats out-of-range values as a caller precondition violation and
/// does not re-validate them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSet {
    // ========== Linear adjustments ==========

    /// Blur radius in preview units (0.0 to 5.0), 0.0 = sharp
    pub blur: f32,

    /// Brightness percentage (50.0 to 150.0), 100.0 = unchanged
    pub brightness: f32,

    /// Contrast percentage (50.0 to 150.0), 100.0 = unchanged
    pub contrast: f32,

    /// Saturation percentage (0.0 to 150.0), 100.0 = unchanged
    pub saturation: f32,

    /// Hue rotation in degrees (0.0 to 360.0), 0.0 = unchanged
    pub hue_rotate: f32,

    /// Exposure adjustment (-100.0 to +100.0), 0.0 = unchanged
    /// Applied as a multiplicative brightness scale of 1 + exposure/100
    pub exposure: f32,

    /// Sharpen strength (0.0 to 100.0), 0.0 = off
    pub sharpen: f32,

    /// Film grain strength (0.0 to 10.0), 0.0 = off
    pub grain: f32,

    /// Shadow lift/crush (-100.0 to +100.0), 0.0 = unchanged
    pub shadows: f32,

    /// Highlight recovery/blowout (-100.0 to +100.0), 0.0 = unchanged
    /// Positive values compress the white point (recover), negative expand it
    pub highlights: f32,

    /// Vignette strength (0.0 to 100.0), 0.0 = off
    pub vignette: f32,

    /// Sepia strength (0.0 to 100.0), 0.0 = off
    pub sepia: f32,

    /// Invert strength (0.0 to 100.0), 0.0 = off
    /// Continuous in the live preview; the final render applies a full
    /// negate once the slider crosses 50
    pub invert: f32,

    /// Tint strength (0.0 to 100.0), 0.0 = off
    pub tint: f32,

    /// Oil-paint artistic filter strength (0.0 to 10.0), 0.0 = off
    pub oil_paint: f32,

    // ========== Tone wash ==========

    /// Tone hue in degrees (0.0 to 360.0), unset = no tone wash
    pub tone: Option<f32>,

    /// Tone strength (0.0 to 100.0), 0.0 = off
    pub tone_amount: f32,

    /// Tone swatch saturation (0.0 to 100.0), UI-side only
    pub tone_saturation: f32,

    /// Tone swatch lightness (0.0 to 100.0), UI-side only
    pub tone_lightness: f32,

    // ========== Tint color ==========

    /// Hex RGB color used by the tint step
    pub tint_color: String,
}

impl Default for FilterSet {
    /// Create default filter values (no adjustments)
    fn default() -> Self {
        Self {
            blur: 0.0,
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            hue_rotate: 0.0,
            exposure: 0.0,
            sharpen: 0.0,
            grain: 0.0,
            shadows: 0.0,
            highlights: 0.0,
            vignette: 0.0,
            sepia: 0.0,
            invert: 0.0,
            tint: 0.0,
            oil_paint: 0.0,
            tone: None,
            tone_amount: 0.0,
            tone_saturation: 100.0,
            tone_lightness: 50.0,
            tint_color: "#3b82f6".to_string(),
        }
    }
}

impl FilterSet {
    /// Create new default filter values
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert to JSON string for preset storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string (from a saved preset)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check whether any filter with a visual effect is away from its default.
    ///
    /// The tone group counts as active only when a tone hue is set AND the
    /// amount is above zero; a tint color choice with tint at 0 is inert.
    /// Used to short-circuit render work when nothing changed.
    pub fn has_active_filters(&self) -> bool {
        self.blur > 0.0
            || self.brightness != 100.0
            || self.contrast != 100.0
            || self.saturation != 100.0
            || self.hue_rotate.rem_euclid(360.0) != 0.0
            || self.exposure != 0.0
            || self.sharpen > 0.0
            || self.grain > 0.0
            || self.shadows != 0.0
            || self.highlights != 0.0
            || self.vignette > 0.0
            || self.sepia > 0.0
            || self.invert > 0.0
            || self.tint > 0.0
            || self.oil_paint > 0.0
            || (self.tone.is_some() && self.tone_amount > 0.0)
    }

    /// Reset all adjustments to default (no edits)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
