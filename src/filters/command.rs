/// FilterSet to external render command translation
///
/// Builds the ordered ImageMagick argument list for one render. The pipeline
/// order is load-bearing: each step operates on the cumulative output of the
/// previous one, so skip logic must never reorder steps. A filter at its
/// neutral value contributes no arguments, keeping the command minimal when
/// few filters are active.

use std::path::Path;

use super::params::FilterSet;
use super::SEPIA_HUE_DEG;

/// Output extensions encoded lossily; these get the high quality setting.
const LOSSY_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "webp"];

/// Build the argument list for the external render executable.
///
/// The list starts with the input path and ends with the output path; the
/// executable name itself is the render engine's concern. Deterministic:
/// identical inputs produce byte-identical argument lists.
///
/// Out-of-range filter values are a caller precondition violation; the
/// mapper emits whatever the arithmetic produces and never fails.
pub fn build_command(input: &Path, output: &Path, filters: &FilterSet) -> Vec<String> {
    let mut args = vec![input.to_string_lossy().to_string()];

    // 1. Blur. Radius scaled 5x from UI units to match the visual weight
    //    of the preview's blur.
    if filters.blur > 0.0 {
        args.push("-blur".to_string());
        args.push(format!("0x{}", filters.blur * 5.0));
    }

    // 2. Exposure as a multiplicative brightness scale.
    if filters.exposure != 0.0 {
        let factor = 1.0 + filters.exposure / 100.0;
        args.push("-evaluate".to_string());
        args.push("multiply".to_string());
        args.push(format!("{}", factor));
    }

    // 3. Combined brightness/saturation/hue in a single modulate pass.
    //    Hue is normalized to [0, 360) first so a full rotation collapses to
    //    the neutral point, then remapped to the tool's 0-200 modulation
    //    domain around 100.
    let hue = filters.hue_rotate.rem_euclid(360.0);
    if filters.brightness != 100.0 || filters.saturation != 100.0 || hue != 0.0 {
        let hue_arg = 100.0 + (hue / 360.0) * 200.0;
        args.push("-modulate".to_string());
        args.push(format!(
            "{},{},{}",
            filters.brightness, filters.saturation, hue_arg
        ));
    }

    // 4. Sigmoidal contrast. Direction branches on the sign of the delta,
    //    magnitude scales 3..10 with the delta.
    if filters.contrast != 100.0 {
        let delta = filters.contrast / 100.0 - 1.0;
        let amount = 3.0 + delta.abs() * 7.0;
        let flag = if delta > 0.0 {
            "-sigmoidal-contrast"
        } else {
            "+sigmoidal-contrast"
        };
        args.push(flag.to_string());
        args.push(format!("{}x50%", amount));
    }

    // 5. Sepia. Boosted 1.5x over the raw slider to visually match the
    //    preview's sepia filter, clamped to full strength.
    if filters.sepia > 0.0 {
        let amount = (filters.sepia / 100.0 * 1.5).min(1.0);
        args.push("-sepia-tone".to_string());
        args.push(format!("{}%", amount * 100.0));
    }

    // 6. Invert. Binary in the render path: applied once the slider crosses
    //    the halfway point (the preview keeps it continuous).
    if filters.invert >= 50.0 {
        args.push("-negate".to_string());
    }

    // 7. Oil-paint artistic filter, slider 0-10 mapped to radius 0-5.
    if filters.oil_paint > 0.0 {
        args.push("-paint".to_string());
        args.push(format!("{}", filters.oil_paint / 2.0));
    }

    // 8. Color tone wash: sepia base (partial blend below full strength),
    //    hue rotation from the sepia point to the requested hue, then a
    //    saturation boost proportional to the amount.
    if let Some(tone) = filters.tone {
        if filters.tone_amount > 0.0 {
            if filters.tone_amount < 100.0 {
                args.push("(".to_string());
                args.push("+clone".to_string());
                args.push("-sepia-tone".to_string());
                args.push("100%".to_string());
                args.push(")".to_string());
                args.push("-define".to_string());
                args.push(format!("compose:args={}", filters.tone_amount));
                args.push("-compose".to_string());
                args.push("blend".to_string());
                args.push("-composite".to_string());
            } else {
                args.push("-sepia-tone".to_string());
                args.push("100%".to_string());
            }

            let matrix = hue_rotation_matrix(tone - SEPIA_HUE_DEG);
            args.push("-color-matrix".to_string());
            args.push(format_matrix(&matrix));

            args.push("-modulate".to_string());
            args.push(format!("100,{},100", 100.0 + filters.tone_amount / 2.0));
        }
    }

    // 9. Sharpen, slider 0-100 mapped to sigma 0-5.
    if filters.sharpen > 0.0 {
        args.push("-sharpen".to_string());
        args.push(format!("0x{}", filters.sharpen / 100.0 * 5.0));
    }

    // 10. Grain: a desaturated Gaussian-noise layer blended at fixed 20%
    //     opacity, noise intensity scaling with the slider.
    if filters.grain > 0.0 {
        args.push("(".to_string());
        args.push("+clone".to_string());
        args.push("-attenuate".to_string());
        args.push(format!("{}", filters.grain * 0.3));
        args.push("+noise".to_string());
        args.push("Gaussian".to_string());
        args.push("-colorspace".to_string());
        args.push("Gray".to_string());
        args.push(")".to_string());
        args.push("-define".to_string());
        args.push("compose:args=20".to_string());
        args.push("-compose".to_string());
        args.push("blend".to_string());
        args.push("-composite".to_string());
    }

    // 11. Shadows as a brightness-contrast adjustment at half strength.
    if filters.shadows != 0.0 {
        args.push("-brightness-contrast".to_string());
        args.push(format!("{}x0", filters.shadows / 2.0));
    }

    // 12. Highlights as a white-point adjustment: positive values compress
    //     the white point (recover), negative values expand it (blow out).
    if filters.highlights != 0.0 {
        args.push("-level".to_string());
        args.push(format!("0%,{}%", 100.0 - filters.highlights / 2.0));
    }

    // 13. Vignette: radial white-to-black falloff multiplied into the image.
    //     The clone-sized fx gradient keeps the command independent of the
    //     input dimensions.
    if filters.vignette > 0.0 {
        let exponent = 1.0 - filters.vignette / 100.0 * 0.7;
        args.push("(".to_string());
        args.push("+clone".to_string());
        args.push("-fx".to_string());
        args.push(format!(
            "pow(max(0,1-1.4142*hypot(i/w-0.5,j/h-0.5)),{})",
            exponent
        ));
        args.push(")".to_string());
        args.push("-compose".to_string());
        args.push("multiply".to_string());
        args.push("-composite".to_string());
    }

    // 14. Flat colorize tint.
    if filters.tint > 0.0 {
        args.push("-fill".to_string());
        args.push(filters.tint_color.clone());
        args.push("-colorize".to_string());
        args.push(format!("{}%", filters.tint));
    }

    // 15. Output compression: metadata stripped, quality by output format.
    args.push("-strip".to_string());
    args.push("-quality".to_string());
    args.push(output_quality(output).to_string());

    args.push(output.to_string_lossy().to_string());
    args
}

/// Quality setting for the output path: 95 for lossy formats, 75 otherwise.
fn output_quality(output: &Path) -> u32 {
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if LOSSY_EXTENSIONS.contains(&ext.as_str()) {
        95
    } else {
        75
    }
}

/// 3x3 hue-rotation color matrix for the given angle in degrees.
///
/// Standard luminance-preserving hue rotation (the same matrix the SVG
/// feColorMatrix hueRotate primitive uses), returned flat row-major.
fn hue_rotation_matrix(degrees: f32) -> [f32; 9] {
    let rad = degrees.to_radians();
    let c = rad.cos();
    let s = rad.sin();
    [
        0.213 + c * 0.787 - s * 0.213,
        0.715 - c * 0.715 - s * 0.715,
        0.072 - c * 0.072 + s * 0.928,
        0.213 - c * 0.213 + s * 0.143,
        0.715 + c * 0.285 + s * 0.140,
        0.072 - c * 0.072 - s * 0.283,
        0.213 - c * 0.213 - s * 0.787,
        0.715 - c * 0.715 + s * 0.715,
        0.072 + c * 0.928 + s * 0.072,
    ]
}

/// Format a flat row-major 3x3 matrix as a single tool argument.
fn format_matrix(matrix: &[f32; 9]) -> String {
    matrix
        .iter()
        .map(|v| format!("{:.4}", v))
        .collect::<Vec<_>>()
        .join(" ")
}
