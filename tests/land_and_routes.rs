//! Land sampling against in-memory rasters and route file parsing

use globetrail::geo::{self, Raster, RADIUS};
use globetrail::land::{generate_land_points, LandSampling};
use globetrail::route::routes_from_configs;
use globetrail::settings::load_route_file;
use globetrail::GlobeError;
use image::{Rgba, RgbaImage};
use std::fs;
use std::path::PathBuf;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("globetrail-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn half_land_raster_keeps_one_hemisphere() {
    // Western half land, eastern half sea
    let mut img = RgbaImage::from_pixel(720, 360, Rgba([0, 0, 0, 0]));
    for y in 0..360 {
        for x in 0..360 {
            img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }
    let raster = Raster::from(img);
    let sampling = LandSampling { rows: 36, ..LandSampling::default() };
    let cloud = generate_land_points(&raster, &sampling);

    assert!(!cloud.is_empty());
    assert!(cloud.len() < sampling.cells().count());
    for p in cloud.points() {
        assert!((p.length() - RADIUS * (1.0 + sampling.altitude)).abs() < 1e-9);
    }

    // Within half a pixel of +180 the column wraps to 0, which is land here
    let wrap_edge = 180.0 - 180.0 / 720.0;
    let wrapped: Vec<_> = sampling.cells().filter(|c| c.lng >= wrap_edge).collect();
    assert!(!wrapped.is_empty());
    for c in &wrapped {
        assert_eq!(raster.pixel_for(c.lng, c.lat).map(|(col, _)| col), Some(0));
        assert!(geo::is_land_at(c.lng, c.lat, &raster));
    }

    // Everything else on the land side is western: negative x
    let eastern_land = sampling
        .cells()
        .filter(|c| c.lng > 0.0 && c.lng < wrap_edge)
        .filter(|c| geo::is_land_at(c.lng, c.lat, &raster))
        .count();
    assert_eq!(eastern_land, 0);
    let positive_x = cloud.points().iter().filter(|p| p.x > 1e-9).count();
    assert_eq!(positive_x, wrapped.len());
}

#[test]
fn land_threshold_is_configurable() {
    let raster = Raster::from(RgbaImage::from_pixel(360, 180, Rgba([0, 0, 0, 100])));
    let default = generate_land_points(&raster, &LandSampling { rows: 10, ..LandSampling::default() });
    let strict = generate_land_points(
        &raster,
        &LandSampling { rows: 10, threshold: 150, ..LandSampling::default() },
    );
    assert!(!default.is_empty());
    assert!(strict.is_empty());
}

#[test]
fn map_file_round_trips_through_loader() {
    let path = scratch("map.png");
    RgbaImage::from_pixel(360, 180, Rgba([0, 0, 0, 255])).save(&path).unwrap();
    let raster = globetrail::land::load_raster(&path).unwrap();
    assert_eq!((raster.width(), raster.height()), (360, 180));
    assert!(geo::is_land_at(0.0, 0.0, &raster));
}

#[test]
fn route_files_in_json_and_toml() {
    let json = scratch("routes.json");
    fs::write(
        &json,
        r#"[
            {"name": "A", "start": {"lat": 0, "lng": 0}, "end": {"lat": 0, "lng": 90}},
            {"name": "B", "stops": [{"lat": 1, "lng": 1}, {"lat": 2, "lng": 2}, {"lat": 3, "lng": 3}]}
        ]"#,
    )
    .unwrap();
    let routes = routes_from_configs(&load_route_file(&json).unwrap()).unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[1].segment_count(), 2);

    let toml = scratch("routes.toml");
    fs::write(
        &toml,
        r#"
        [[routes]]
        name = "C"
        stops = [{ lat = 10.0, lng = 10.0 }, { lat = 20.0, lng = 20.0 }]
        "#,
    )
    .unwrap();
    let routes = routes_from_configs(&load_route_file(&toml).unwrap()).unwrap();
    assert_eq!(routes[0].name(), "C");
}

#[test]
fn malformed_route_file_entries_are_rejected() {
    let json = scratch("short.json");
    fs::write(&json, r#"[{"name": "lonely", "stops": [{"lat": 1, "lng": 1}]}]"#).unwrap();
    let err = routes_from_configs(&load_route_file(&json).unwrap()).unwrap_err();
    assert!(matches!(err, GlobeError::MalformedRoute { waypoints: 1, .. }));

    let broken = scratch("broken.json");
    fs::write(&broken, "[{").unwrap();
    assert!(matches!(load_route_file(&broken), Err(GlobeError::RouteFile(_))));

    let broken_toml = scratch("broken.toml");
    fs::write(&broken_toml, "[[routes]\nname=").unwrap();
    let err = load_route_file(&broken_toml).unwrap_err();
    assert!(matches!(err, GlobeError::RouteFileToml(_)));
    assert!(err.to_string().starts_with("failed to parse route file"));
}
