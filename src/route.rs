//! Travel routes and their Bézier arc geometry

use crate::error::{GlobeError, Result};
use crate::geo::{self, CartesianPoint, GeoPoint, GreatCircle, RADIUS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Great-circle parameters of the two inner control points
const CONTROL_T: (f64, f64) = (0.3, 0.7);

/// Arc bulge as a fraction of the chord between endpoints
const ARC_HEIGHT_FACTOR: f64 = 0.4;

/// Route record as it appears in settings and route files.
///
/// Exactly one of `start`/`end` or `stops` must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stops: Option<Vec<GeoPoint>>,
}

impl RouteConfig {
    pub fn pair(name: &str, start: GeoPoint, end: GeoPoint) -> Self {
        Self {
            name: name.to_string(),
            start: Some(start),
            end: Some(end),
            stops: None,
        }
    }

    pub fn stops(name: &str, stops: Vec<GeoPoint>) -> Self {
        Self {
            name: name.to_string(),
            start: None,
            end: None,
            stops: Some(stops),
        }
    }
}

/// A geographic point with its position in the route
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub index: usize,
    pub point: GeoPoint,
}

/// Validated route with at least two waypoints
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    name: String,
    waypoints: Vec<Waypoint>,
}

impl Route {
    pub fn new(name: impl Into<String>, points: Vec<GeoPoint>) -> Result<Self> {
        let name = name.into();
        if points.len() < 2 {
            return Err(GlobeError::MalformedRoute {
                name,
                waypoints: points.len(),
            });
        }

        let waypoints = points
            .into_iter()
            .enumerate()
            .map(|(index, point)| Waypoint { index, point })
            .collect();
        Ok(Self { name, waypoints })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn segment_count(&self) -> usize {
        self.waypoints.len() - 1
    }
}

impl TryFrom<&RouteConfig> for Route {
    type Error = GlobeError;

    fn try_from(config: &RouteConfig) -> Result<Self> {
        let ambiguous = || GlobeError::AmbiguousRoute {
            name: config.name.clone(),
        };

        match (&config.start, &config.end, &config.stops) {
            (None, None, Some(stops)) => Route::new(config.name.clone(), stops.clone()),
            (Some(start), Some(end), None) => Route::new(config.name.clone(), vec![*start, *end]),
            (None, None, None) => Route::new(config.name.clone(), Vec::new()),
            (Some(_), None, None) | (None, Some(_), None) => Err(GlobeError::MalformedRoute {
                name: config.name.clone(),
                waypoints: 1,
            }),
            _ => Err(ambiguous()),
        }
    }
}

/// Build every route, rejecting malformed records and repeated names
pub fn routes_from_configs(configs: &[RouteConfig]) -> Result<Vec<Route>> {
    let mut seen = HashSet::new();
    configs
        .iter()
        .map(|config| {
            if !seen.insert(config.name.as_str()) {
                return Err(GlobeError::DuplicateRoute {
                    name: config.name.clone(),
                });
            }
            Route::try_from(config)
        })
        .collect()
}

/// Cubic Bézier curve in scene space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: CartesianPoint,
    pub p1: CartesianPoint,
    pub p2: CartesianPoint,
    pub p3: CartesianPoint,
}

impl CubicBezier {
    pub fn point_at(&self, t: f64) -> CartesianPoint {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let (b0, b1, b2, b3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
        self.p0
            .scale(b0)
            .add(&self.p1.scale(b1))
            .add(&self.p2.scale(b2))
            .add(&self.p3.scale(b3))
    }

    /// `steps + 1` evenly spaced points from start up to `fraction` of the curve
    pub fn sample(&self, steps: usize, fraction: f64) -> Vec<CartesianPoint> {
        let fraction = fraction.clamp(0.0, 1.0);
        let steps = steps.max(1);
        (0..=steps)
            .map(|i| self.point_at(fraction * i as f64 / steps as f64))
            .collect()
    }
}

/// Curve between waypoint `from` and waypoint `from + 1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub from: Waypoint,
    pub to: Waypoint,
    pub curve: CubicBezier,
}

/// Arc from `start` to `end` bulging in proportion to their separation
pub fn arc_between(start: GeoPoint, end: GeoPoint) -> CubicBezier {
    let p0 = geo::project_point(start, RADIUS);
    let p3 = geo::project_point(end, RADIUS);

    let gc = GreatCircle::new(start, end);
    let c1 = gc.at(CONTROL_T.0);
    let c2 = gc.at(CONTROL_T.1);

    let arc_radius = p0.distance_to(&p3) * ARC_HEIGHT_FACTOR + RADIUS;
    CubicBezier {
        p0,
        p1: geo::project_point(c1, arc_radius),
        p2: geo::project_point(c2, arc_radius),
        p3,
    }
}

/// One segment per consecutive waypoint pair, in route order
pub fn build_segments(route: &Route) -> Vec<Segment> {
    route
        .waypoints()
        .windows(2)
        .enumerate()
        .map(|(index, pair)| Segment {
            index,
            from: pair[0],
            to: pair[1],
            curve: arc_between(pair[0].point, pair[1].point),
        })
        .collect()
}

/// The built-in travel list: one origin, seven destinations
pub fn default_routes() -> Vec<RouteConfig> {
    let origin = GeoPoint::new(57.70887, 11.97456);
    vec![
        RouteConfig::pair("Brazil", origin, GeoPoint::new(-10.0, -55.0)),
        RouteConfig::pair("Egypt", origin, GeoPoint::new(27.0, 30.0)),
        RouteConfig::pair("Johannesburg, South Africa", origin, GeoPoint::new(-26.195246, 28.034088)),
        RouteConfig::pair("New York", origin, GeoPoint::new(40.71427, -74.00597)),
        RouteConfig::pair("Sydney", origin, GeoPoint::new(-33.771, 150.906296)),
        RouteConfig::pair("Sarajevo", origin, GeoPoint::new(43.85643, 18.413029)),
        RouteConfig::pair("Moscow", origin, GeoPoint::new(55.751244, 37.618423)),
    ]
}
