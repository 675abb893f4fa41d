//! Sphere projection and raster land lookup
//!
//! The globe uses a stylized spherical mapping rather than a geodetic one:
//! latitude 90 sits on +Y, longitude 0 on +Z and longitude 90 on +X.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Base sphere radius in scene units
pub const RADIUS: f64 = 80.0;

/// Pixel channel value above which a raster sample counts as land
pub const LAND_THRESHOLD: u8 = 90;

/// Byte offset of the sampled channel within a 4-byte RGBA pixel
pub const LAND_CHANNEL: usize = 3;

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Point in scene space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CartesianPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianPoint {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance_to(&self, other: &CartesianPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn scale(&self, s: f64) -> CartesianPoint {
        CartesianPoint::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn add(&self, other: &CartesianPoint) -> CartesianPoint {
        CartesianPoint::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    /// Rotate about the Y axis (yaw) then the X axis (tilt)
    pub fn rotate(&self, yaw: f64, tilt: f64) -> CartesianPoint {
        let (sin_y, cos_y) = yaw.sin_cos();
        let x = self.x * cos_y + self.z * sin_y;
        let z = -self.x * sin_y + self.z * cos_y;

        let (sin_t, cos_t) = tilt.sin_cos();
        let y = self.y * cos_t - z * sin_t;
        let z2 = self.y * sin_t + z * cos_t;
        CartesianPoint::new(x, y, z2)
    }
}

/// Map a geographic coordinate onto a sphere of `radius`, lifted by
/// `relative_altitude` (a fraction of the radius).
///
/// Inputs are not normalized; any real latitude/longitude yields a finite point.
pub fn project(lat: f64, lng: f64, radius: f64, relative_altitude: f64) -> CartesianPoint {
    let phi = (90.0 - lat) * DEG_TO_RAD;
    let theta = (90.0 - lng) * DEG_TO_RAD;
    let r = radius * (1.0 + relative_altitude);

    CartesianPoint {
        x: r * phi.sin() * theta.cos(),
        y: r * phi.cos(),
        z: r * phi.sin() * theta.sin(),
    }
}

/// Project a [`GeoPoint`] at zero altitude
pub fn project_point(point: GeoPoint, radius: f64) -> CartesianPoint {
    project(point.lat, point.lng, radius, 0.0)
}

#[inline]
fn haversin(x: f64) -> f64 {
    let s = (x / 2.0).sin();
    s * s
}

/// Great-circle interpolator between two geographic points.
///
/// Interpolation happens on the unit sphere and the result is returned as
/// latitude/longitude, so callers can re-project at any radius.
#[derive(Debug, Clone, Copy)]
pub struct GreatCircle {
    start: GeoPoint,
    k0: (f64, f64, f64),
    k1: (f64, f64, f64),
    distance: f64,
    sin_distance: f64,
}

impl GreatCircle {
    pub fn new(from: GeoPoint, to: GeoPoint) -> Self {
        let (x0, y0) = (from.lng * DEG_TO_RAD, from.lat * DEG_TO_RAD);
        let (x1, y1) = (to.lng * DEG_TO_RAD, to.lat * DEG_TO_RAD);
        let (cy0, sy0) = (y0.cos(), y0.sin());
        let (cy1, sy1) = (y1.cos(), y1.sin());

        let distance = 2.0 * (haversin(y1 - y0) + cy0 * cy1 * haversin(x1 - x0)).sqrt().asin();

        Self {
            start: from,
            k0: (cy0 * x0.cos(), cy0 * x0.sin(), sy0),
            k1: (cy1 * x1.cos(), cy1 * x1.sin(), sy1),
            distance,
            sin_distance: distance.sin(),
        }
    }

    /// Point at parameter `t` (0 = start, 1 = end)
    pub fn at(&self, t: f64) -> GeoPoint {
        if self.distance == 0.0 {
            return self.start;
        }

        let t = t * self.distance;
        let b = t.sin() / self.sin_distance;
        let a = (self.distance - t).sin() / self.sin_distance;
        let x = a * self.k0.0 + b * self.k1.0;
        let y = a * self.k0.1 + b * self.k1.1;
        let z = a * self.k0.2 + b * self.k1.2;

        GeoPoint {
            lat: z.atan2((x * x + y * y).sqrt()) * RAD_TO_DEG,
            lng: y.atan2(x) * RAD_TO_DEG,
        }
    }
}

/// Interpolate along the great circle from `from` to `to` at parameter `t`
pub fn geo_interpolate(from: GeoPoint, to: GeoPoint, t: f64) -> GeoPoint {
    GreatCircle::new(from, to).at(t)
}

/// Decoded RGBA raster, row-major with 4 bytes per pixel
#[derive(Debug, Clone)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Raster {
    /// Wrap raw RGBA bytes; returns `None` if the buffer does not match the dimensions
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel coordinate of a geographic position, or `None` outside the raster.
    ///
    /// Longitude -180..180 maps onto columns left to right and latitude
    /// 90..-90 onto rows top to bottom. Rounding up onto the antimeridian
    /// wraps to column 0.
    pub fn pixel_for(&self, lng: f64, lat: f64) -> Option<(usize, usize)> {
        let w = self.width as f64;
        let h = self.height as f64;
        let mut col = (((lng + 180.0) / 360.0) * w + 0.5).trunc();
        let row = h - (((lat + 90.0) / 180.0) * h - 0.5).trunc() - 1.0;
        if col == w && lng <= 180.0 {
            col = 0.0;
        }

        if !(col >= 0.0 && col < w && row >= 0.0 && row < h) {
            return None;
        }
        Some((col as usize, row as usize))
    }

    /// Raw byte of `channel` (0..4) at a pixel
    pub fn sample(&self, col: usize, row: usize, channel: usize) -> Option<u8> {
        if col >= self.width as usize || row >= self.height as usize || channel >= 4 {
            return None;
        }
        let idx = 4 * (self.width as usize * row + col) + channel;
        self.data.get(idx).copied()
    }
}

impl From<RgbaImage> for Raster {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

/// True when the raster marks (lng, lat) as land with the default threshold
pub fn is_land_at(lng: f64, lat: f64, raster: &Raster) -> bool {
    is_land_with(lng, lat, raster, LAND_THRESHOLD, LAND_CHANNEL)
}

/// Land test with explicit threshold and channel; positions outside the raster are sea
pub fn is_land_with(lng: f64, lat: f64, raster: &Raster, threshold: u8, channel: usize) -> bool {
    raster
        .pixel_for(lng, lat)
        .and_then(|(col, row)| raster.sample(col, row, channel))
        .is_some_and(|v| v > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const EPS: f64 = 1e-9;

    fn close(a: CartesianPoint, b: CartesianPoint) -> bool {
        a.distance_to(&b) < 1e-6
    }

    #[test]
    fn projection_stays_on_sphere() {
        for lat in (-90..=90).step_by(15) {
            for lng in (-180..=180).step_by(20) {
                let p = project(lat as f64, lng as f64, RADIUS, 0.0);
                assert!((p.length() - RADIUS).abs() < 1e-9, "lat={lat} lng={lng}");
            }
        }
    }

    #[test]
    fn north_pole_ignores_longitude() {
        let pole = project(90.0, 0.0, RADIUS, 0.0);
        for lng in [-180.0, -97.5, 0.0, 33.3, 180.0] {
            assert!(close(project(90.0, lng, RADIUS, 0.0), pole));
        }
        assert!((pole.y - RADIUS).abs() < EPS);
    }

    #[test]
    fn axis_orientation() {
        assert!(close(project(0.0, 0.0, RADIUS, 0.0), CartesianPoint::new(0.0, 0.0, RADIUS)));
        assert!(close(project(0.0, 90.0, RADIUS, 0.0), CartesianPoint::new(RADIUS, 0.0, 0.0)));
    }

    #[test]
    fn altitude_scales_radius() {
        let p = project(12.0, 34.0, RADIUS, 0.005);
        assert!((p.length() - RADIUS * 1.005).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_input_is_finite() {
        let p = project(135.0, 400.0, RADIUS, 0.0);
        assert!(p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
    }

    #[test]
    fn great_circle_endpoints_and_midpoint() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 90.0);
        let start = geo_interpolate(a, b, 0.0);
        let end = geo_interpolate(a, b, 1.0);
        let mid = geo_interpolate(a, b, 0.5);
        assert!(start.lat.abs() < EPS && start.lng.abs() < EPS);
        assert!(end.lat.abs() < EPS && (end.lng - 90.0).abs() < 1e-9);
        assert!(mid.lat.abs() < EPS && (mid.lng - 45.0).abs() < 1e-9);
    }

    #[test]
    fn great_circle_bends_toward_pole() {
        // Same-latitude arcs in the northern hemisphere pass north of the parallel
        let gc = GreatCircle::new(GeoPoint::new(45.0, -60.0), GeoPoint::new(45.0, 60.0));
        assert!(gc.at(0.5).lat > 45.0);
    }

    #[test]
    fn great_circle_coincident_points() {
        let p = GeoPoint::new(10.0, 20.0);
        assert_eq!(geo_interpolate(p, p, 0.7), p);
    }

    #[test]
    fn raster_lookup_and_bounds() {
        let mut img = RgbaImage::from_pixel(360, 180, Rgba([0, 0, 0, 0]));
        // Top-left corner pixel is land
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        let raster = Raster::from(img);

        assert_eq!(raster.pixel_for(-180.0, 90.0), Some((0, 0)));
        assert!(is_land_at(-180.0, 90.0, &raster));
        assert!(!is_land_at(0.0, 0.0, &raster));
        assert_eq!(raster.pixel_for(250.0, 0.0), None);
        assert_eq!(raster.pixel_for(179.9, 0.0).map(|(c, _)| c), Some(0));
        assert!(!is_land_at(250.0, 0.0, &raster));
        assert!(!is_land_at(0.0, -120.0, &raster));
    }

    #[test]
    fn threshold_is_exclusive() {
        let at = Raster::from(RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, LAND_THRESHOLD])));
        let above = Raster::from(RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, LAND_THRESHOLD + 1])));
        assert!(!is_land_at(0.0, 0.0, &at));
        assert!(is_land_at(0.0, 0.0, &above));
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(Raster::from_raw(2, 2, vec![0; 16]).is_some());
        assert!(Raster::from_raw(2, 2, vec![0; 15]).is_none());
    }
}
