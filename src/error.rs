use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by route assembly and resource loading.
#[derive(Debug, Error)]
pub enum GlobeError {
    #[error("route `{name}` has {waypoints} waypoint(s); at least 2 are required")]
    MalformedRoute { name: String, waypoints: usize },

    #[error("route `{name}` must give either a start/end pair or a stops list, not both")]
    AmbiguousRoute { name: String },

    #[error("route name `{name}` is used more than once")]
    DuplicateRoute { name: String },

    #[error("failed to load map raster {path}: {source}")]
    RasterLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("failed to parse route file: {0}")]
    RouteFile(#[from] serde_json::Error),

    #[error("failed to parse route file: {0}")]
    RouteFileToml(#[source] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GlobeError>;
