//! Route controllers and the per-frame snapshot handed to the renderer

use crate::animation::{AnimationState, AnimationTimings, DelaySource, Phase};
use crate::error::Result;
use crate::land::{LandLoader, LandPointCloud};
use crate::marker::{MarkerController, MarkerTimings};
use crate::route::{self, build_segments, Route, RouteConfig, Segment};
use std::time::Duration;
use tracing::{debug, info};

/// Render outputs of one route for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub phase: Phase,
    /// Visible fraction of each segment's curve
    pub segment_progress: Vec<f64>,
    /// Opacity of each waypoint marker
    pub marker_visibility: Vec<f64>,
    /// Scale multiplier of each waypoint marker
    pub marker_scale: Vec<f64>,
    /// Opacity shared by the route's curves
    pub opacity: f64,
}

/// Drives one route: geometry, animation state and its markers
pub struct RouteController {
    route: Route,
    segments: Vec<Segment>,
    state: AnimationState,
    markers: Vec<MarkerController>,
}

impl RouteController {
    pub fn new(
        route: Route,
        now: Duration,
        timings: &AnimationTimings,
        delay: &mut impl DelaySource,
    ) -> Self {
        let segments = build_segments(&route);
        let state = AnimationState::new(segments.len(), now, timings, delay);
        let markers = vec![MarkerController::new(); route.waypoints().len()];
        debug!(route = route.name(), segments = segments.len(), "route mounted");
        Self {
            route,
            segments,
            state,
            markers,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    /// Swap in a new route. Geometry and animation restart only when the
    /// waypoints differ.
    pub fn set_route(
        &mut self,
        route: Route,
        now: Duration,
        timings: &AnimationTimings,
        delay: &mut impl DelaySource,
    ) {
        if route.waypoints() == self.route.waypoints() {
            self.route = route;
            return;
        }
        *self = Self::new(route, now, timings, delay);
    }

    /// Advance one frame and report what to draw
    pub fn tick(
        &mut self,
        now: Duration,
        timings: &AnimationTimings,
        marker_timings: &MarkerTimings,
        delay: &mut impl DelaySource,
    ) -> FrameSnapshot {
        self.state.step(now, timings, delay);

        let (marker_visibility, marker_scale) = self
            .markers
            .iter_mut()
            .zip(&self.state.dot_visibility)
            .map(|(m, &signal)| {
                let out = m.update(signal, self.state.opacity, now, marker_timings);
                (out.opacity, out.scale)
            })
            .unzip();

        FrameSnapshot {
            phase: self.state.phase,
            segment_progress: self.state.segment_progress(),
            marker_visibility,
            marker_scale,
            opacity: self.state.opacity,
        }
    }
}

/// Every animated route plus the landmass
pub struct Scene {
    controllers: Vec<RouteController>,
    land: LandPointCloud,
    loader: Option<LandLoader>,
    timings: AnimationTimings,
    marker_timings: MarkerTimings,
    delay: Box<dyn DelaySource>,
}

impl Scene {
    pub fn new(
        routes: Vec<Route>,
        timings: AnimationTimings,
        marker_timings: MarkerTimings,
        mut delay: Box<dyn DelaySource>,
        now: Duration,
    ) -> Self {
        let controllers = routes
            .into_iter()
            .map(|r| RouteController::new(r, now, &timings, &mut delay))
            .collect::<Vec<_>>();
        info!(routes = controllers.len(), "scene assembled");
        Self {
            controllers,
            land: LandPointCloud::empty(),
            loader: None,
            timings,
            marker_timings,
            delay,
        }
    }

    /// Validate route records and build the scene; malformed routes are rejected
    pub fn from_configs(
        configs: &[RouteConfig],
        timings: AnimationTimings,
        marker_timings: MarkerTimings,
        delay: Box<dyn DelaySource>,
        now: Duration,
    ) -> Result<Self> {
        let routes = route::routes_from_configs(configs)?;
        Ok(Self::new(routes, timings, marker_timings, delay, now))
    }

    /// Land cloud arrives from `loader` on a later tick
    pub fn attach_land_loader(&mut self, loader: LandLoader) {
        self.loader = Some(loader);
    }

    pub fn land(&self) -> &LandPointCloud {
        &self.land
    }

    pub fn controllers(&self) -> &[RouteController] {
        &self.controllers
    }

    /// Replace a route by name, or add it if the name is new
    pub fn upsert_route(&mut self, route: Route, now: Duration) {
        let timings = self.timings;
        match self.controllers.iter_mut().find(|c| c.route().name() == route.name()) {
            Some(c) => c.set_route(route, now, &timings, &mut self.delay),
            None => self
                .controllers
                .push(RouteController::new(route, now, &timings, &mut self.delay)),
        }
    }

    /// Advance every route; snapshots come back in route order
    pub fn tick(&mut self, now: Duration) -> Vec<FrameSnapshot> {
        if let Some(loader) = self.loader.as_mut() {
            if let Some(cloud) = loader.poll() {
                self.land = cloud;
            }
            if !loader.is_pending() {
                self.loader = None;
            }
        }

        let timings = self.timings;
        let marker_timings = self.marker_timings;
        self.controllers
            .iter_mut()
            .map(|c| c.tick(now, &timings, &marker_timings, &mut self.delay))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::FixedDelay;
    use crate::geo::GeoPoint;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn three_stop_route() -> Route {
        Route::new(
            "tour",
            vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(20.0, 40.0), GeoPoint::new(-10.0, 80.0)],
        )
        .unwrap()
    }

    #[test]
    fn snapshot_shapes_match_route() {
        let timings = AnimationTimings::default();
        let mut delay = FixedDelay(Duration::ZERO);
        let mut c = RouteController::new(three_stop_route(), ms(0), &timings, &mut delay);
        let snap = c.tick(ms(16), &timings, &MarkerTimings::default(), &mut delay);
        assert_eq!(snap.segment_progress.len(), 2);
        assert_eq!(snap.marker_visibility.len(), 3);
        assert_eq!(snap.marker_scale.len(), 3);
    }

    #[test]
    fn same_waypoints_keep_state() {
        let timings = AnimationTimings::default();
        let mut delay = FixedDelay(Duration::ZERO);
        let mut c = RouteController::new(three_stop_route(), ms(0), &timings, &mut delay);
        c.tick(ms(1000), &timings, &MarkerTimings::default(), &mut delay);
        c.tick(ms(2000), &timings, &MarkerTimings::default(), &mut delay);
        assert_eq!(c.state().phase, Phase::Drawing);

        c.set_route(three_stop_route(), ms(2000), &timings, &mut delay);
        assert_eq!(c.state().phase, Phase::Drawing);

        let moved = Route::new("tour", vec![GeoPoint::new(5.0, 5.0), GeoPoint::new(6.0, 6.0)]).unwrap();
        c.set_route(moved, ms(2000), &timings, &mut delay);
        assert_eq!(c.state().phase, Phase::Waiting);
        assert_eq!(c.segments().len(), 1);
    }

    #[test]
    fn scene_rejects_malformed_routes() {
        let configs = vec![RouteConfig::stops("bad", vec![GeoPoint::new(0.0, 0.0)])];
        let scene = Scene::from_configs(
            &configs,
            AnimationTimings::default(),
            MarkerTimings::default(),
            Box::new(FixedDelay::default()),
            ms(0),
        );
        assert!(scene.is_err());
    }

    #[test]
    fn scene_picks_up_land_once_loaded() {
        let mut scene = Scene::from_configs(
            &route::default_routes(),
            AnimationTimings::default(),
            MarkerTimings::default(),
            Box::new(FixedDelay::default()),
            ms(0),
        )
        .unwrap();
        scene.attach_land_loader(LandLoader::ready(LandPointCloud::empty()));
        let snaps = scene.tick(ms(16));
        assert_eq!(snaps.len(), 7);
        assert!(scene.land().is_empty());
    }

    #[test]
    fn upsert_adds_new_names() {
        let mut scene = Scene::new(
            vec![three_stop_route()],
            AnimationTimings::default(),
            MarkerTimings::default(),
            Box::new(FixedDelay::default()),
            ms(0),
        );
        let extra = Route::new("extra", vec![GeoPoint::new(1.0, 1.0), GeoPoint::new(2.0, 2.0)]).unwrap();
        scene.upsert_route(extra, ms(10));
        scene.upsert_route(three_stop_route(), ms(10));
        assert_eq!(scene.controllers().len(), 2);
    }
}
