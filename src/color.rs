use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Named categorical palettes
// ---------------------------------------------------------------------------

/// Categorical palette a chart colours its series with. Each family spaces
/// hues evenly but starts at its own hue with its own saturation/lightness,
/// so neighbouring reports stay visually distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Palette {
    #[default]
    Set1,
    Set2,
    Paired,
    Deep,
    Bright,
}

impl Palette {
    fn params(self) -> (f32, f32, f32) {
        // (start hue, saturation, lightness)
        match self {
            Palette::Set1 => (0.0, 0.75, 0.50),
            Palette::Set2 => (160.0, 0.45, 0.62),
            Palette::Paired => (200.0, 0.60, 0.45),
            Palette::Deep => (220.0, 0.50, 0.40),
            Palette::Bright => (30.0, 0.95, 0.55),
        }
    }

    /// `n` visually distinct RGB colours.
    pub fn colors(self, n: usize) -> Vec<[u8; 3]> {
        generate_palette(n, self.params())
    }

    /// Colour of series `idx` out of `n`.
    pub fn color(self, idx: usize, n: usize) -> [u8; 3] {
        self.colors(n.max(1))
            .get(idx)
            .copied()
            .unwrap_or([128, 128, 128])
    }
}

/// Generates `n` colours using evenly spaced hues.
fn generate_palette(n: usize, (start, saturation, lightness): (f32, f32, f32)) -> Vec<[u8; 3]> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (start + (i as f32 / n as f32) * 360.0) % 360.0;
            let hsl = Hsl::new(hue, saturation, lightness);
            let rgb: Srgb = hsl.into_color();
            [
                (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
                (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
                (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
            ]
        })
        .collect()
}
