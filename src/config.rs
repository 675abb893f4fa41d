use crate::animation::AnimationTimings;
use crate::land::LandSampling;
use crate::marker::MarkerTimings;
use crate::route::RouteConfig;
use std::path::PathBuf;

/// RGB triple
pub type Rgb = (u8, u8, u8);

/// Colors used by the terminal globe
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub background: Rgb,
    pub globe: Rgb,
    pub land: Rgb,
    pub line: Rgb,
    pub origin_dot: Rgb,
    pub destination_dot: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: (0x0b, 0x14, 0x18),
            globe: (0x1c, 0x31, 0x3a),
            land: (0x9a, 0xae, 0xb6),
            line: (0x80, 0x80, 0x80),
            origin_dot: (0xff, 0xff, 0xff),
            destination_dot: (0xd3, 0xd3, 0xd3),
        }
    }
}

/// Camera behaviour
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewConfig {
    pub auto_rotate: bool,
    /// Radians per second of automatic yaw at speed 1.0
    pub rotate_speed: f64,
    /// Initial tilt, radians
    pub tilt: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            auto_rotate: true,
            rotate_speed: 1.0,
            tilt: 0.35,
        }
    }
}

/// Everything the globe command needs, after CLI and settings are merged
#[derive(Clone, Debug)]
pub struct GlobeConfig {
    pub time_step: f32,
    pub seed: Option<u64>,
    pub map: Option<PathBuf>,
    pub routes: Vec<RouteConfig>,
    pub timings: AnimationTimings,
    pub marker_timings: MarkerTimings,
    pub marker_size: f64,
    pub land: LandSampling,
    pub palette: Palette,
    pub view: ViewConfig,
}

/// Parse `#rrggbb` (the leading `#` is optional)
pub fn parse_hex_color(s: &str) -> Option<Rgb> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Linear blend from `bg` toward `fg` by `t` (0..=1)
pub fn blend(bg: Rgb, fg: Rgb, t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    (mix(bg.0, fg.0), mix(bg.1, fg.1), mix(bg.2, fg.2))
}
