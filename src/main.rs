use clap::{Parser, Subcommand};
use globetrail::animation::RandomDelay;
use globetrail::config::GlobeConfig;
use globetrail::land::{self, LandLoader, LandSampling};
use globetrail::route::{self, build_segments, RouteConfig};
use globetrail::settings::{self, Settings};
use globetrail::trail::Scene;
use globetrail::{render, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "globetrail")]
#[command(author = "Terminal Art Generator")]
#[command(version)]
#[command(about = "Terminal globe with a point-cloud landmass and animated travel routes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the animated globe
    Globe {
        /// Route file (.toml with [[routes]] or a .json array)
        #[arg(short, long)]
        routes: Option<PathBuf>,

        /// World map image used for the landmass
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Frame interval in seconds
        #[arg(short, long, default_value = "0.03")]
        time: f32,

        /// Random seed for reproducible start delays
        #[arg(short, long)]
        seed: Option<u64>,

        /// Start with auto-rotation off
        #[arg(long)]
        no_rotate: bool,

        /// Write logs here instead of the cache directory
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Print every route's Bézier control points
    Segments {
        /// Route file (.toml with [[routes]] or a .json array)
        #[arg(short, long)]
        routes: Option<PathBuf>,
    },

    /// Sample the world map and report the land point cloud
    Land {
        /// World map image
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Print the flat x y z triples instead of a summary
        #[arg(short, long)]
        dump: bool,
    },
}

fn init_logging(log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            let file = File::create(path)?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("globetrail")
        .join("globetrail.log")
}

/// Routes from `--routes`, else the settings file, else the built-in list
fn resolve_routes(cli_routes: Option<&Path>, settings: &Settings) -> Result<Vec<RouteConfig>> {
    if let Some(path) = cli_routes {
        return settings::load_route_file(path);
    }
    if !settings.routes.is_empty() {
        return Ok(settings.routes.clone());
    }
    Ok(route::default_routes())
}

fn resolve_map(cli_map: Option<PathBuf>, settings: &Settings) -> PathBuf {
    cli_map
        .or_else(|| settings.land.map.clone())
        .unwrap_or_else(Settings::default_map_path)
}

fn run_globe(config: GlobeConfig) -> Result<()> {
    let start = Instant::now();
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // Malformed routes are reported before the terminal is taken over
    let mut scene = Scene::from_configs(
        &config.routes,
        config.timings,
        config.marker_timings,
        Box::new(RandomDelay::new(rng)),
        start.elapsed(),
    )?;

    if let Some(map) = config.map.clone() {
        info!(map = %map.display(), "loading landmass");
        scene.attach_land_loader(LandLoader::spawn(map, config.land));
    }

    render::run(&config, scene, start)?;
    Ok(())
}

fn run_segments(configs: &[RouteConfig]) -> Result<()> {
    let routes = route::routes_from_configs(configs)?;
    for r in &routes {
        println!("{}", r.name());
        for seg in build_segments(r) {
            let c = seg.curve;
            println!(
                "  [{}] ({:.3}, {:.3}) -> ({:.3}, {:.3})",
                seg.index, seg.from.point.lat, seg.from.point.lng, seg.to.point.lat, seg.to.point.lng
            );
            for (label, p) in [("p0", c.p0), ("p1", c.p1), ("p2", c.p2), ("p3", c.p3)] {
                println!("      {label} {:>10.4} {:>10.4} {:>10.4}", p.x, p.y, p.z);
            }
        }
    }
    Ok(())
}

fn run_land(map: &Path, sampling: &LandSampling, dump: bool) -> Result<()> {
    // Reported as an error here; the globe view degrades to an empty landmass instead
    let raster = land::load_raster(map)?;
    let cloud = land::generate_land_points(&raster, sampling);

    if dump {
        for xyz in cloud.to_flat().chunks_exact(3) {
            println!("{} {} {}", xyz[0], xyz[1], xyz[2]);
        }
    } else {
        println!(
            "{}: {}x{} raster, {} of {} cells are land",
            map.display(),
            raster.width(),
            raster.height(),
            cloud.len(),
            sampling.cells().count()
        );
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Globe {
            routes,
            map,
            time,
            seed,
            no_rotate,
            log_file,
        } => {
            init_logging(Some(&log_file.unwrap_or_else(default_log_path)))?;
            let settings = Settings::load();

            let mut view = settings.view();
            if no_rotate {
                view.auto_rotate = false;
            }

            let config = GlobeConfig {
                time_step: time.max(0.001),
                seed,
                map: Some(resolve_map(map, &settings)),
                routes: resolve_routes(routes.as_deref(), &settings)?,
                timings: settings.timings(),
                marker_timings: settings.marker_timings(),
                marker_size: settings.marker_size(),
                land: settings.land_sampling(),
                palette: settings.palette(),
                view,
            };
            run_globe(config)
        }
        Commands::Segments { routes } => {
            init_logging(None)?;
            let settings = Settings::load();
            run_segments(&resolve_routes(routes.as_deref(), &settings)?)
        }
        Commands::Land { map, dump } => {
            init_logging(None)?;
            let settings = Settings::load();
            run_land(&resolve_map(map, &settings), &settings.land_sampling(), dump)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "globetrail failed");
            eprintln!("globetrail: {e}");
            ExitCode::FAILURE
        }
    }
}
