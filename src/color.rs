use std::collections::BTreeMap;

use eframe::egui::Color32;
use epidash::data::aggregate::PyramidSide;
use palette::{Hsl, IntoColor, Srgb};

/// Bar colour for male counts.
pub const MALE: Color32 = Color32::from_rgb(0x83, 0xc9, 0xff);
/// Bar colour for female counts.
pub const FEMALE: Color32 = Color32::from_rgb(0x00, 0x68, 0xc9);
/// Bar colour for rankings.
pub const BAR: Color32 = Color32::from_rgb(0x1f, 0x77, 0xb4);
/// Regions with no visits.
pub const EMPTY_REGION: Color32 = Color32::from_gray(215);

fn hsl_to_color32(hsl: Hsl) -> Color32 {
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            hsl_to_color32(Hsl::new(hue, 0.75, 0.55))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sequential scale for the choropleth
// ---------------------------------------------------------------------------

/// Yellow-to-red colour for `count` relative to `max`, 70% opaque.
pub fn heat_color(count: usize, max: usize) -> Color32 {
    if count == 0 || max == 0 {
        return EMPTY_REGION;
    }
    let t = (count as f32 / max as f32).clamp(0.0, 1.0);
    let base = hsl_to_color32(Hsl::new(55.0 * (1.0 - t), 0.9, 0.85 - 0.45 * t));
    Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), 180)
}

// ---------------------------------------------------------------------------
// Color mapping: category label → Color32
// ---------------------------------------------------------------------------

/// Maps category labels (sex values) to colours. Male and female labels get
/// the pyramid colours, anything else a palette colour.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let labels: Vec<&str> = labels.into_iter().collect();
        let palette = generate_palette(labels.len());
        let mapping = labels
            .iter()
            .zip(palette)
            .map(|(&label, fallback)| {
                let color = match PyramidSide::classify(label) {
                    PyramidSide::Male => MALE,
                    PyramidSide::Female => FEMALE,
                    PyramidSide::Other => fallback,
                };
                (label.to_string(), color)
            })
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sexes_use_pyramid_colours() {
        let map = ColorMap::new(["FEMININO", "MASCULINO", "IGNORADO"]);
        assert_eq!(map.color_for("MASCULINO"), MALE);
        assert_eq!(map.color_for("FEMININO"), FEMALE);
        assert_ne!(map.color_for("IGNORADO"), Color32::GRAY);
        assert_eq!(map.color_for("unknown"), Color32::GRAY);
    }

    #[test]
    fn empty_regions_are_grey() {
        assert_eq!(heat_color(0, 10), EMPTY_REGION);
        assert_ne!(heat_color(10, 10), heat_color(1, 10));
    }
}
