//! RGB triples, hex conversion, and piecewise-linear color ramps.

/// Linear RGB color with channels in [0, 1].
pub type Rgb = [f32; 3];

/// Neutral gray used for residues without data and out-of-domain values.
pub const DEFAULT_GRAY: u32 = 0x77_77_77;

/// Convert a packed `0xRRGGBB` color to an [`Rgb`] triple.
#[must_use]
pub fn rgb_from_u32(hex: u32) -> Rgb {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// Format an [`Rgb`] triple as `#rrggbb`.
#[must_use]
pub fn rgb_to_hex(rgb: Rgb) -> String {
    let [r, g, b] = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Parse `#rrggbb`, `rrggbb`, `#rgb` or `0xrrggbb`.
#[must_use]
pub fn parse_hex(text: &str) -> Option<Rgb> {
    let digits = text
        .trim()
        .trim_start_matches('#')
        .trim_start_matches("0x");
    let packed = match digits.len() {
        6 => u32::from_str_radix(digits, 16).ok()?,
        3 => {
            let short = u32::from_str_radix(digits, 16).ok()?;
            let (r, g, b) = ((short >> 8) & 0xf, (short >> 4) & 0xf, short & 0xf);
            ((r * 0x11) << 16) | ((g * 0x11) << 8) | (b * 0x11)
        }
        _ => return None,
    };
    Some(rgb_from_u32(packed))
}

/// A color ramp defined by N evenly-spaced color stops.
/// `t = 0` maps to the first stop, `t = 1` to the last.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    stops: Vec<Rgb>,
}

impl ColorRamp {
    /// Build a ramp from packed `0xRRGGBB` stops. Fewer than two stops are
    /// padded by repeating the only color (or black when empty).
    #[must_use]
    pub fn from_hex(stops: &[u32]) -> Self {
        let mut stops: Vec<Rgb> = stops.iter().map(|&h| rgb_from_u32(h)).collect();
        while stops.len() < 2 {
            stops.push(stops.last().copied().unwrap_or([0.0; 3]));
        }
        Self { stops }
    }

    /// Interpolate the ramp at position `t`, clamped to [0, 1].
    #[must_use]
    pub fn sample(&self, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let n = self.stops.len() - 1;
        let scaled = t * n as f32;
        let idx = (scaled as usize).min(n - 1);
        let frac = scaled - idx as f32;

        let a = &self.stops[idx];
        let b = &self.stops[idx + 1];
        [
            a[0] + (b[0] - a[0]) * frac,
            a[1] + (b[1] - a[1]) * frac,
            a[2] + (b[2] - a[2]) * frac,
        ]
    }

    /// The same ramp traversed end to start.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut stops = self.stops.clone();
        stops.reverse();
        Self { stops }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        assert_eq!(rgb_to_hex(rgb_from_u32(0x44_01_54)), "#440154");
        assert_eq!(rgb_to_hex(rgb_from_u32(DEFAULT_GRAY)), "#777777");
    }

    #[test]
    fn parses_hex_forms() {
        assert_eq!(parse_hex("#777777"), Some(rgb_from_u32(0x77_77_77)));
        assert_eq!(parse_hex("0xff0000"), Some([1.0, 0.0, 0.0]));
        assert_eq!(parse_hex("#fff"), Some([1.0, 1.0, 1.0]));
        assert_eq!(parse_hex("grey"), None);
    }

    #[test]
    fn ramp_endpoints_and_midpoint() {
        let ramp = ColorRamp::from_hex(&[0x00_00_00, 0xff_ff_ff]);
        assert_eq!(ramp.sample(0.0), [0.0, 0.0, 0.0]);
        assert_eq!(ramp.sample(1.0), [1.0, 1.0, 1.0]);
        assert!((ramp.sample(0.5)[0] - 0.5).abs() < 1e-6);
        assert_eq!(ramp.sample(-3.0), ramp.sample(0.0));
        assert_eq!(ramp.reversed().sample(0.0), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn single_stop_ramp_is_flat() {
        let ramp = ColorRamp::from_hex(&[0xff_00_00]);
        assert_eq!(ramp.sample(0.3), [1.0, 0.0, 0.0]);
    }
}
