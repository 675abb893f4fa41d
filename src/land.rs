//! Landmass point cloud sampled from an equirectangular map raster

use crate::error::{GlobeError, Result};
use crate::geo::{self, CartesianPoint, GeoPoint, Raster, LAND_CHANNEL, LAND_THRESHOLD, RADIUS};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use tracing::{debug, info, warn};

/// Sampling parameters for the land grid.
///
/// The defaults are tuned for the bundled world map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandSampling {
    /// Number of latitude steps between the poles (rows + 1 parallels are sampled)
    pub rows: u32,
    /// Longitude samples on the equator; scaled by cos(lat) elsewhere
    pub density: f64,
    pub threshold: u8,
    pub channel: usize,
    pub radius: f64,
    /// Lift above the sphere, as a fraction of the radius
    pub altitude: f64,
}

impl Default for LandSampling {
    fn default() -> Self {
        Self {
            rows: 180,
            density: 25.0 * PI * 2.0 * 2.0,
            threshold: LAND_THRESHOLD,
            channel: LAND_CHANNEL,
            radius: RADIUS,
            altitude: 0.005,
        }
    }
}

impl LandSampling {
    /// Every (lat, lng) cell visited by the generator, pole to pole
    pub fn cells(&self) -> impl Iterator<Item = GeoPoint> + '_ {
        let rows = self.rows.max(1);
        (0..=rows).flat_map(move |i| {
            let lat = -90.0 + 180.0 * i as f64 / rows as f64;
            let count = (lat.abs().to_radians().cos() * self.density).max(0.0);
            (0u32..)
                .take_while(move |&r| (r as f64) < count)
                .map(move |r| GeoPoint::new(lat, 360.0 * r as f64 / count - 180.0))
        })
    }
}

/// Static set of land points; immutable once generated
#[derive(Debug, Clone, Default)]
pub struct LandPointCloud {
    points: Vec<CartesianPoint>,
}

impl LandPointCloud {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[CartesianPoint] {
        &self.points
    }

    /// Flat xyz triples, the layout point primitives expect
    pub fn to_flat(&self) -> Vec<f32> {
        self.points
            .iter()
            .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32])
            .collect()
    }
}

/// Sample the raster and project every land cell onto the sphere
pub fn generate_land_points(raster: &Raster, sampling: &LandSampling) -> LandPointCloud {
    let points: Vec<CartesianPoint> = sampling
        .cells()
        .filter(|cell| geo::is_land_with(cell.lng, cell.lat, raster, sampling.threshold, sampling.channel))
        .map(|cell| geo::project(cell.lat, cell.lng, sampling.radius, sampling.altitude))
        .collect();

    info!(
        points = points.len(),
        width = raster.width(),
        height = raster.height(),
        "generated land point cloud"
    );
    LandPointCloud { points }
}

/// Decode an image file into an RGBA raster
pub fn load_raster(path: &Path) -> Result<Raster> {
    let img = image::open(path).map_err(|source| GlobeError::RasterLoad {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Raster::from(img.to_rgba8()))
}

/// Load and sample in one step. A failed load yields an empty cloud.
pub fn load_land(path: &Path, sampling: &LandSampling) -> LandPointCloud {
    match load_raster(path) {
        Ok(raster) => generate_land_points(&raster, sampling),
        Err(e) => {
            warn!(error = %e, "map raster unavailable, landmass left empty");
            LandPointCloud::empty()
        }
    }
}

/// One-shot background load of the land cloud.
///
/// The result is delivered at most once through [`LandLoader::poll`].
/// Dropping the loader before it finishes discards the result.
pub struct LandLoader {
    rx: Option<Receiver<LandPointCloud>>,
}

impl LandLoader {
    pub fn spawn(path: PathBuf, sampling: LandSampling) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let cloud = load_land(&path, &sampling);
            if tx.send(cloud).is_err() {
                debug!("land loader dropped before completion");
            }
        });
        Self { rx: Some(rx) }
    }

    /// A loader that already holds its result
    pub fn ready(cloud: LandPointCloud) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(cloud);
        Self { rx: Some(rx) }
    }

    /// Non-blocking check for the finished cloud
    pub fn poll(&mut self) -> Option<LandPointCloud> {
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(cloud) => {
                self.rx = None;
                Some(cloud)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.rx = None;
                None
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.rx.is_some()
    }
}
