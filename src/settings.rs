use crate::animation::AnimationTimings;
use crate::config::{parse_hex_color, Palette, ViewConfig};
use crate::error::{GlobeError, Result};
use crate::land::LandSampling;
use crate::marker::MarkerTimings;
use crate::route::RouteConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Accepted `[marker] size` values
pub const MARKER_SIZE_RANGE: (f64, f64) = (0.0, 8.0);

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub animation: AnimationSettings,
    #[serde(default)]
    pub marker: MarkerSettings,
    #[serde(default)]
    pub land: LandSettings,
    #[serde(default)]
    pub colors: ColorSettings,
    #[serde(default)]
    pub view: ViewSettings,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnimationSettings {
    pub draw_ms: Option<u64>,
    pub pause_ms: Option<u64>,
    pub fade_ms: Option<u64>,
    pub segment_gap_ms: Option<u64>,
    pub max_start_delay_ms: Option<u64>,
    pub cycle_gap_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkerSettings {
    pub fade_ms: Option<u64>,
    pub pulse_amplitude: Option<f64>,
    pub pulse_rate: Option<f64>,
    pub size: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LandSettings {
    pub map: Option<PathBuf>,   // Equirectangular RGBA world map
    pub rows: Option<u32>,
    pub density: Option<f64>,
    pub threshold: Option<u8>,
    pub channel: Option<usize>,
    pub altitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ColorSettings {
    pub background: Option<String>,
    pub globe: Option<String>,
    pub land: Option<String>,
    pub line: Option<String>,
    pub origin_dot: Option<String>,
    pub destination_dot: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewSettings {
    pub auto_rotate: Option<bool>,
    pub rotate_speed: Option<f64>,
    pub tilt: Option<f64>,      // Degrees
}

#[derive(Deserialize)]
struct RouteFile {
    #[serde(default)]
    routes: Vec<RouteConfig>,
}

impl Settings {
    /// Load the user's settings file; a missing or broken file yields defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
                Self::default()
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read settings");
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("globetrail")
            .join("config.toml")
    }

    /// Where the world map is looked for when none is configured
    pub fn default_map_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("globetrail")
            .join("map.png")
    }

    pub fn timings(&self) -> AnimationTimings {
        let d = AnimationTimings::default();
        let a = &self.animation;
        let ms = |v: Option<u64>, default: Duration| v.map(Duration::from_millis).unwrap_or(default);
        AnimationTimings {
            draw: ms(a.draw_ms, d.draw),
            pause: ms(a.pause_ms, d.pause),
            fade: ms(a.fade_ms, d.fade),
            segment_gap: ms(a.segment_gap_ms, d.segment_gap),
            max_start_delay: ms(a.max_start_delay_ms, d.max_start_delay),
            cycle_gap: ms(a.cycle_gap_ms, d.cycle_gap),
        }
    }

    pub fn marker_timings(&self) -> MarkerTimings {
        let d = MarkerTimings::default();
        MarkerTimings {
            fade: self.marker.fade_ms.map(Duration::from_millis).unwrap_or(d.fade),
            pulse_amplitude: self.marker.pulse_amplitude.unwrap_or(d.pulse_amplitude),
            pulse_rate: self.marker.pulse_rate.unwrap_or(d.pulse_rate),
        }
    }

    /// Marker size multiplier, kept within `MARKER_SIZE_RANGE`
    pub fn marker_size(&self) -> f64 {
        let (lo, hi) = MARKER_SIZE_RANGE;
        match self.marker.size {
            Some(size) if size.is_finite() => size.clamp(lo, hi),
            _ => 1.0,
        }
    }

    pub fn land_sampling(&self) -> LandSampling {
        let d = LandSampling::default();
        let l = &self.land;
        LandSampling {
            rows: l.rows.unwrap_or(d.rows),
            density: l.density.unwrap_or(d.density),
            threshold: l.threshold.unwrap_or(d.threshold),
            channel: l.channel.unwrap_or(d.channel).min(3),
            altitude: l.altitude.unwrap_or(d.altitude),
            ..d
        }
    }

    pub fn palette(&self) -> Palette {
        let d = Palette::default();
        let c = &self.colors;
        let pick = |v: &Option<String>, default| {
            v.as_deref().and_then(parse_hex_color).unwrap_or(default)
        };
        Palette {
            background: pick(&c.background, d.background),
            globe: pick(&c.globe, d.globe),
            land: pick(&c.land, d.land),
            line: pick(&c.line, d.line),
            origin_dot: pick(&c.origin_dot, d.origin_dot),
            destination_dot: pick(&c.destination_dot, d.destination_dot),
        }
    }

    pub fn view(&self) -> ViewConfig {
        let d = ViewConfig::default();
        ViewConfig {
            auto_rotate: self.view.auto_rotate.unwrap_or(d.auto_rotate),
            rotate_speed: self.view.rotate_speed.unwrap_or(d.rotate_speed),
            tilt: self.view.tilt.map(f64::to_radians).unwrap_or(d.tilt),
        }
    }
}

/// Read route records from a `.json` array or a TOML file with `[[routes]]`
pub fn load_route_file(path: &Path) -> Result<Vec<RouteConfig>> {
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        let file: RouteFile = toml::from_str(&content).map_err(GlobeError::RouteFileToml)?;
        Ok(file.routes)
    }
}
