//! Perceptual colormaps.
//!
//! Each colormap is a table of evenly spaced sRGB control points,
//! interpolated linearly. [`Colormap::color_at`] is the only place a
//! normalized value becomes a color: pixel evaluation and legend sampling
//! both go through it.

use overlay_common::Color;
use serde::Serialize;

use crate::error::ColormapError;

/// Name of the colormap used when none is configured.
pub const DEFAULT_COLORMAP: &str = "viridis";

/// A named, stateless mapping from `t` in `[0, 1]` to a color.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Colormap {
    name: &'static str,
    #[serde(skip)]
    stops: &'static [[u8; 3]],
}

impl Colormap {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of control points in the table.
    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Color for a normalized value.
    ///
    /// Callers normalize (and clamp) before calling; values outside
    /// `[0, 1]` take the nearest end color and NaN takes the `t = 0` color.
    pub fn color_at(&self, t: f64) -> Color {
        let last = self.stops.len() - 1;
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * last as f64;
        let i = (pos.floor() as usize).min(last.saturating_sub(1));
        let frac = pos - i as f64;

        let a = self.stops[i];
        let b = self.stops[(i + 1).min(last)];
        let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;

        Color::rgb(lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2]))
    }

    /// `n` evenly spaced colors from `t = 0` to `t = 1` inclusive.
    ///
    /// `n` below 2 is raised to 2 so both ends are always present.
    pub fn sample(&self, n: usize) -> Vec<Color> {
        let n = n.max(2);
        (0..n)
            .map(|i| self.color_at(i as f64 / (n - 1) as f64))
            .collect()
    }
}

const VIRIDIS: &[[u8; 3]] = &[
    [0x44, 0x01, 0x54],
    [0x48, 0x24, 0x75],
    [0x41, 0x44, 0x87],
    [0x35, 0x5f, 0x8d],
    [0x2a, 0x78, 0x8e],
    [0x21, 0x91, 0x8c],
    [0x22, 0xa8, 0x84],
    [0x44, 0xbf, 0x70],
    [0x7a, 0xd1, 0x51],
    [0xbd, 0xdf, 0x26],
    [0xfd, 0xe7, 0x25],
];

const MAGMA: &[[u8; 3]] = &[
    [0x00, 0x00, 0x04],
    [0x14, 0x0e, 0x36],
    [0x3b, 0x0f, 0x70],
    [0x64, 0x1a, 0x80],
    [0x8c, 0x29, 0x81],
    [0xb7, 0x37, 0x79],
    [0xde, 0x49, 0x68],
    [0xf7, 0x70, 0x5c],
    [0xfe, 0x9f, 0x6d],
    [0xfe, 0xcf, 0x92],
    [0xfc, 0xfd, 0xbf],
];

const INFERNO: &[[u8; 3]] = &[
    [0x00, 0x00, 0x04],
    [0x16, 0x0b, 0x39],
    [0x42, 0x0a, 0x68],
    [0x6a, 0x17, 0x6e],
    [0x93, 0x26, 0x67],
    [0xbc, 0x37, 0x54],
    [0xdd, 0x51, 0x3a],
    [0xf3, 0x78, 0x19],
    [0xfc, 0xa5, 0x0a],
    [0xf6, 0xd7, 0x46],
    [0xfc, 0xff, 0xa4],
];

const PLASMA: &[[u8; 3]] = &[
    [0x0d, 0x08, 0x87],
    [0x41, 0x04, 0x9d],
    [0x6a, 0x00, 0xa8],
    [0x8f, 0x0d, 0xa4],
    [0xb1, 0x2a, 0x90],
    [0xcc, 0x47, 0x78],
    [0xe1, 0x64, 0x62],
    [0xf2, 0x84, 0x4b],
    [0xfc, 0xa6, 0x36],
    [0xfc, 0xce, 0x25],
    [0xf0, 0xf9, 0x21],
];

const CIVIDIS: &[[u8; 3]] = &[
    [0x00, 0x22, 0x4e],
    [0x12, 0x35, 0x70],
    [0x3b, 0x49, 0x6c],
    [0x57, 0x5d, 0x6d],
    [0x70, 0x71, 0x73],
    [0x8a, 0x87, 0x79],
    [0xa6, 0x9d, 0x75],
    [0xc4, 0xb5, 0x6c],
    [0xe4, 0xcf, 0x5b],
    [0xff, 0xea, 0x46],
];

const TURBO: &[[u8; 3]] = &[
    [0x30, 0x12, 0x3b],
    [0x41, 0x45, 0xab],
    [0x46, 0x75, 0xed],
    [0x39, 0xa2, 0xfc],
    [0x1b, 0xcf, 0xd4],
    [0x24, 0xec, 0xa6],
    [0x61, 0xfc, 0x6c],
    [0xa4, 0xfc, 0x3b],
    [0xd1, 0xe8, 0x34],
    [0xf3, 0xc6, 0x3a],
    [0xfe, 0x9b, 0x2d],
    [0xf3, 0x63, 0x15],
    [0xd9, 0x38, 0x06],
    [0xb1, 0x19, 0x01],
    [0x7a, 0x04, 0x03],
];

const GREYS: &[[u8; 3]] = &[[0xff, 0xff, 0xff], [0x00, 0x00, 0x00]];

static REGISTRY: [Colormap; 7] = [
    Colormap {
        name: "viridis",
        stops: VIRIDIS,
    },
    Colormap {
        name: "magma",
        stops: MAGMA,
    },
    Colormap {
        name: "inferno",
        stops: INFERNO,
    },
    Colormap {
        name: "plasma",
        stops: PLASMA,
    },
    Colormap {
        name: "cividis",
        stops: CIVIDIS,
    },
    Colormap {
        name: "turbo",
        stops: TURBO,
    },
    Colormap {
        name: "greys",
        stops: GREYS,
    },
];

/// Look up a colormap by name (case-insensitive).
pub fn colormap(name: &str) -> Result<&'static Colormap, ColormapError> {
    let wanted = name.trim();
    REGISTRY
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| ColormapError::Unknown {
            name: name.to_string(),
            available: available().join(", "),
        })
}

/// Names of all registered colormaps.
pub fn available() -> Vec<&'static str> {
    REGISTRY.iter().map(|c| c.name).collect()
}

/// Color for `t` under the named colormap.
pub fn color_at(name: &str, t: f64) -> Result<Color, ColormapError> {
    Ok(colormap(name)?.color_at(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_match_table() {
        let viridis = colormap("viridis").unwrap();
        assert_eq!(viridis.color_at(0.0), Color::rgb(0x44, 0x01, 0x54));
        assert_eq!(viridis.color_at(1.0), Color::rgb(0xfd, 0xe7, 0x25));
    }

    #[test]
    fn test_interpolates_between_stops() {
        let greys = colormap("greys").unwrap();
        assert_eq!(greys.color_at(0.5), Color::rgb(128, 128, 128));
        assert_eq!(greys.color_at(0.25), Color::rgb(191, 191, 191));
    }

    #[test]
    fn test_control_points_are_exact() {
        let viridis = colormap("viridis").unwrap();
        assert_eq!(viridis.color_at(0.5), Color::rgb(0x21, 0x91, 0x8c));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        assert_eq!(colormap("Magma").unwrap().name(), "magma");
        assert_eq!(colormap(" TURBO ").unwrap().name(), "turbo");
    }

    #[test]
    fn test_unknown_colormap() {
        let err = colormap("jet").unwrap_err();
        let ColormapError::Unknown { name, available } = err;
        assert_eq!(name, "jet");
        assert!(available.contains("viridis"));
    }

    #[test]
    fn test_sample_covers_both_ends() {
        let magma = colormap("magma").unwrap();
        let stops = magma.sample(40);
        assert_eq!(stops.len(), 40);
        assert_eq!(stops[0], magma.color_at(0.0));
        assert_eq!(stops[39], magma.color_at(1.0));
        assert_eq!(magma.sample(1).len(), 2);
    }

    #[test]
    fn test_out_of_domain_takes_end_colors() {
        let plasma = colormap("plasma").unwrap();
        assert_eq!(plasma.color_at(-0.5), plasma.color_at(0.0));
        assert_eq!(plasma.color_at(7.0), plasma.color_at(1.0));
        assert_eq!(plasma.color_at(f64::NAN), plasma.color_at(0.0));
    }

    #[test]
    fn test_registry_tables_are_usable() {
        for name in available() {
            let map = colormap(name).unwrap();
            assert!(map.stop_count() >= 2, "{} needs two stops", name);
            assert_eq!(map.color_at(0.0).a, 255);
        }
    }
}
