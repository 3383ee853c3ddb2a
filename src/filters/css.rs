/// FilterSet to fast-preview filter expression translation
///
/// Produces a CSS-style filter-function chain the UI layer can hand to its
/// compositor for instant feedback while the external render runs. Visually
/// close to the rendered output but not pixel-identical; the tone wash in
/// particular is approximated as sepia + hue-rotate + saturate.

use super::params::FilterSet;
use super::SEPIA_HUE_DEG;

/// Build the preview filter expression for the given filters.
///
/// Returns the literal `"none"` when no filter is active, so the result can
/// be assigned to a filter property unconditionally.
pub fn build_preview_filter(filters: &FilterSet) -> String {
    let mut parts = Vec::new();

    if filters.blur > 0.0 {
        parts.push(format!("blur({}px)", filters.blur));
    }

    // UI brightness and exposure both land in a single brightness function:
    // the slider percentage scaled by the exposure factor.
    let brightness = filters.brightness / 100.0 * (1.0 + filters.exposure / 100.0);
    if brightness != 1.0 {
        parts.push(format!("brightness({})", brightness));
    }

    if filters.contrast != 100.0 {
        parts.push(format!("contrast({})", filters.contrast / 100.0));
    }

    if filters.saturation != 100.0 {
        parts.push(format!("saturate({})", filters.saturation / 100.0));
    }

    let hue = filters.hue_rotate.rem_euclid(360.0);
    if hue != 0.0 {
        parts.push(format!("hue-rotate({}deg)", hue));
    }

    if filters.sepia > 0.0 {
        parts.push(format!("sepia({})", filters.sepia / 100.0));
    }

    // Continuous here, unlike the render path's binary negate.
    if filters.invert > 0.0 {
        parts.push(format!("invert({})", filters.invert / 100.0));
    }

    // Tone approximation: sepia base, rotate from the sepia hue to the
    // requested one, then the same saturation boost the render applies.
    if let Some(tone) = filters.tone {
        if filters.tone_amount > 0.0 {
            parts.push(format!("sepia({})", filters.tone_amount / 100.0));
            parts.push(format!("hue-rotate({}deg)", tone - SEPIA_HUE_DEG));
            parts.push(format!(
                "saturate({})",
                (100.0 + filters.tone_amount / 2.0) / 100.0
            ));
        }
    }

    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(" ")
    }
}
