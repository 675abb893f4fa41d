//! Terminal globe: applies scene snapshots to a braille canvas
//!
//! The land cloud, route curves and markers are rotated, projected
//! orthographically and culled against the sphere before being plotted at
//! 2x4 dots per character cell.

use crate::config::{blend, GlobeConfig, Palette, Rgb};
use crate::geo::{self, CartesianPoint, RADIUS};
use crate::terminal::{rgb, Terminal};
use crate::trail::{FrameSnapshot, Scene};
use chrono::{Local, Offset};
use crossterm::event::KeyCode;
use std::f64::consts::{FRAC_PI_2, PI};
use std::io;
use std::time::{Duration, Instant};
use tracing::info;

/// Samples per segment when a curve is fully drawn
const CURVE_STEPS: usize = 64;

/// Fraction of the screen-space sphere radius taken by the globe
const GLOBE_SCALE: f64 = 0.4;

/// Marker radius in braille dots per unit of marker size
const MARKER_DOTS: f64 = 1.5;

/// Upper bound on a marker disc's radius in dots
const MAX_MARKER_RADIUS: f64 = 24.0;

const HELP: &str = "q quit  space pause  ←/→ spin  ↑/↓ tilt  +/- zoom  r auto-rotate";

/// Draw layers; higher layers win a braille cell's color
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
enum Layer {
    Globe = 1,
    Land = 2,
    Curve = 3,
    Marker = 4,
}

/// Dot-addressable canvas, 2 dots wide and 4 tall per cell
pub struct BrailleCanvas {
    width: usize,
    height: usize,
    dots: Vec<Option<(u8, Rgb)>>,
}

impl BrailleCanvas {
    pub fn new(cols: u16, rows: u16) -> Self {
        let width = cols as usize * 2;
        let height = rows as usize * 4;
        Self {
            width,
            height,
            dots: vec![None; width * height],
        }
    }

    pub fn clear(&mut self) {
        self.dots.fill(None);
    }

    fn plot(&mut self, x: i32, y: i32, layer: Layer, color: Rgb) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let slot = &mut self.dots[y as usize * self.width + x as usize];
        let covered = matches!(slot, Some((l, _)) if *l > layer as u8);
        if !covered {
            *slot = Some((layer as u8, color));
        }
    }

    fn line(&mut self, from: (i32, i32), to: (i32, i32), layer: Layer, color: Rgb) {
        let (mut x0, mut y0) = from;
        let (x1, y1) = to;
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.plot(x0, y0, layer, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn disc(&mut self, center: (i32, i32), radius: i32, layer: Layer, color: Rgb) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.plot(center.0 + dx, center.1 + dy, layer, color);
                }
            }
        }
    }

    /// Braille glyph and color for a character cell
    pub fn cell(&self, cx: usize, cy: usize) -> Option<(char, Rgb)> {
        const OFFSETS: [(usize, usize, u8); 8] = [
            (0, 0, 0x01), (0, 1, 0x02), (0, 2, 0x04), (1, 0, 0x08),
            (1, 1, 0x10), (1, 2, 0x20), (0, 3, 0x40), (1, 3, 0x80),
        ];

        let (bx, by) = (cx * 2, cy * 4);
        if bx + 1 >= self.width || by + 3 >= self.height {
            return None;
        }

        let mut bits: u8 = 0;
        let mut top: Option<(u8, Rgb)> = None;
        for &(ox, oy, bit) in &OFFSETS {
            if let Some((layer, color)) = self.dots[(by + oy) * self.width + bx + ox] {
                bits |= bit;
                if top.map_or(true, |(l, _)| layer >= l) {
                    top = Some((layer, color));
                }
            }
        }

        let (_, color) = top?;
        char::from_u32(0x2800 + bits as u32).map(|ch| (ch, color))
    }

    fn blit(&self, term: &mut Terminal) {
        let cols = self.width / 2;
        let rows = self.height / 4;
        for cy in 0..rows {
            for cx in 0..cols {
                if let Some((ch, (r, g, b))) = self.cell(cx, cy) {
                    term.set(cx as i32, cy as i32, ch, Some(rgb(r, g, b)));
                }
            }
        }
    }
}

/// Orthographic camera looking at the globe from +Z
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub yaw: f64,
    pub tilt: f64,
    pub zoom: f64,
    /// Braille dots per scene unit
    scale: f64,
    center: (f64, f64),
}

impl Camera {
    pub fn new(yaw: f64, tilt: f64) -> Self {
        Self {
            yaw,
            tilt,
            zoom: 1.0,
            scale: 1.0,
            center: (0.0, 0.0),
        }
    }

    /// Fit the globe to a terminal of `cols` x `rows` cells
    pub fn fit(&mut self, cols: u16, rows: u16) {
        let (w, h) = (cols as f64, rows as f64);
        let radius_cells = (h * 1.8).min(w * 0.8) * GLOBE_SCALE;
        self.scale = radius_cells * 2.0 / RADIUS * self.zoom;
        self.center = (w, h * 2.0);
    }

    /// Dot coordinates of `p`, or `None` when the sphere hides it
    pub fn project(&self, p: &CartesianPoint) -> Option<(i32, i32)> {
        let q = p.rotate(self.yaw, self.tilt);
        let behind = q.z < 0.0;
        let inside_disc = q.x * q.x + q.y * q.y < RADIUS * RADIUS;
        if behind && inside_disc {
            return None;
        }

        let x = self.center.0 + q.x * self.scale;
        // Braille dots are close to square, so both axes share one scale
        let y = self.center.1 - q.y * self.scale;
        Some((x.round() as i32, y.round() as i32))
    }

    /// Like [`Camera::project`] but also hides the back half of surface points
    fn project_surface(&self, p: &CartesianPoint) -> Option<(i32, i32)> {
        if p.rotate(self.yaw, self.tilt).z < 0.0 {
            return None;
        }
        self.project(p)
    }
}

/// Yaw that turns the viewer's time zone toward the camera
pub fn timezone_yaw() -> f64 {
    let offset_minutes = -(Local::now().offset().fix().local_minus_utc() as f64) / 60.0;
    PI * (offset_minutes / 720.0)
}

fn draw_globe(canvas: &mut BrailleCanvas, camera: &Camera, palette: &Palette) {
    let color = palette.globe;
    for lat in (-60..=60).step_by(30) {
        for lng in 0..360 {
            let p = geo::project(lat as f64, lng as f64 - 180.0, RADIUS, 0.0);
            if let Some((x, y)) = camera.project_surface(&p) {
                canvas.plot(x, y, Layer::Globe, color);
            }
        }
    }
    for lng in (-180..180).step_by(30) {
        for lat in -90..=90 {
            let p = geo::project(lat as f64, lng as f64, RADIUS, 0.0);
            if let Some((x, y)) = camera.project_surface(&p) {
                canvas.plot(x, y, Layer::Globe, color);
            }
        }
    }

    // Limb outline
    let r = RADIUS * camera.scale;
    let steps = (r * 8.0).max(64.0) as usize;
    for i in 0..steps {
        let a = i as f64 / steps as f64 * std::f64::consts::TAU;
        let x = camera.center.0 + r * a.cos();
        let y = camera.center.1 - r * a.sin();
        canvas.plot(x.round() as i32, y.round() as i32, Layer::Globe, color);
    }
}

fn draw_routes(
    canvas: &mut BrailleCanvas,
    camera: &Camera,
    scene: &Scene,
    snapshots: &[FrameSnapshot],
    palette: &Palette,
    marker_size: f64,
) {
    for (controller, snap) in scene.controllers().iter().zip(snapshots) {
        let line_color = blend(palette.background, palette.line, snap.opacity);

        for (segment, &progress) in controller.segments().iter().zip(&snap.segment_progress) {
            if progress <= 0.0 {
                continue;
            }
            let steps = ((CURVE_STEPS as f64 * progress).ceil() as usize).max(1);
            let points = segment.curve.sample(steps, progress);
            for pair in points.windows(2) {
                if let (Some(a), Some(b)) = (camera.project(&pair[0]), camera.project(&pair[1])) {
                    canvas.line(a, b, Layer::Curve, line_color);
                }
            }
        }

        for (i, waypoint) in controller.route().waypoints().iter().enumerate() {
            let opacity = snap.marker_visibility.get(i).copied().unwrap_or(0.0);
            let scale = snap.marker_scale.get(i).copied().unwrap_or(0.0);
            if opacity <= 0.01 || scale <= 0.01 {
                continue;
            }
            let base = if i == 0 { palette.origin_dot } else { palette.destination_dot };
            let color = blend(palette.background, base, opacity);
            let p = geo::project_point(waypoint.point, RADIUS);
            if let Some(center) = camera.project_surface(&p) {
                let radius = (marker_size * scale * MARKER_DOTS).clamp(0.0, MAX_MARKER_RADIUS).round() as i32;
                canvas.disc(center, radius, Layer::Marker, color);
            }
        }
    }
}

/// Runtime state for interactive controls
struct ViewState {
    speed: f32,
    paused: bool,
    auto_rotate: bool,
}

impl ViewState {
    fn new(initial_speed: f32, auto_rotate: bool) -> Self {
        Self {
            speed: initial_speed,
            paused: false,
            auto_rotate,
        }
    }

    /// Handle keypress, returns true if should quit
    fn handle_key(&mut self, code: KeyCode, camera: &mut Camera) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char(' ') => self.paused = !self.paused,
            KeyCode::Char('r') => self.auto_rotate = !self.auto_rotate,
            KeyCode::Left | KeyCode::Char('h') => camera.yaw -= 0.1,
            KeyCode::Right | KeyCode::Char('l') => camera.yaw += 0.1,
            KeyCode::Up | KeyCode::Char('k') => camera.tilt = (camera.tilt + 0.05).min(FRAC_PI_2),
            KeyCode::Down | KeyCode::Char('j') => camera.tilt = (camera.tilt - 0.05).max(-FRAC_PI_2),
            KeyCode::Char('+') | KeyCode::Char('=') => camera.zoom = (camera.zoom * 1.2).min(3.0),
            KeyCode::Char('-') | KeyCode::Char('_') => camera.zoom = (camera.zoom / 1.2).max(0.3),
            // Number keys: frame interval (1=fastest, 9=slowest)
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.speed = match c {
                    '1' => 0.005,
                    '2' => 0.01,
                    '3' => 0.016,
                    '4' => 0.03,
                    '5' => 0.05,
                    '6' => 0.07,
                    '7' => 0.1,
                    '8' => 0.15,
                    _ => 0.2,
                };
            }
            _ => {}
        }
        false
    }
}

/// Run the interactive globe until the user quits
pub fn run(config: &GlobeConfig, mut scene: Scene, start: Instant) -> io::Result<()> {
    let mut term = Terminal::new(Some(config.palette.background))?;
    let mut state = ViewState::new(config.time_step, config.view.auto_rotate);
    let mut camera = Camera::new(timezone_yaw(), config.view.tilt);

    let (mut prev_w, mut prev_h) = term.size();
    let mut canvas = BrailleCanvas::new(prev_w, prev_h);
    let mut land_seen = 0;

    // Animation clock; stands still while paused
    let mut clock = start.elapsed();
    let mut last_frame = Instant::now();

    loop {
        let (width, height) = crossterm::terminal::size().unwrap_or(term.size());
        if width != prev_w || height != prev_h {
            term.resize(width, height);
            term.clear_screen()?;
            canvas = BrailleCanvas::new(width, height);
            prev_w = width;
            prev_h = height;
        }

        if let Some((code, _)) = term.check_key()? {
            if state.handle_key(code, &mut camera) {
                break;
            }
        }

        let frame = last_frame.elapsed();
        last_frame = Instant::now();
        if state.paused {
            term.sleep(0.1);
            continue;
        }
        clock += frame;

        if state.auto_rotate {
            camera.yaw += frame.as_secs_f64() * config.view.rotate_speed * 0.1;
        }
        camera.fit(width, height);

        let snapshots = scene.tick(clock);
        if scene.land().len() != land_seen {
            land_seen = scene.land().len();
            info!(points = land_seen, "landmass attached");
        }

        canvas.clear();
        draw_globe(&mut canvas, &camera, &config.palette);
        for p in scene.land().points() {
            if let Some((x, y)) = camera.project_surface(p) {
                canvas.plot(x, y, Layer::Land, config.palette.land);
            }
        }
        draw_routes(&mut canvas, &camera, &scene, &snapshots, &config.palette, config.marker_size);

        term.clear();
        canvas.blit(&mut term);
        let (r, g, b) = config.palette.line;
        term.set_str(1, height as i32 - 1, HELP, Some(rgb(r, g, b)));
        term.present()?;

        let budget = Duration::from_secs_f32(state.speed);
        if let Some(rest) = budget.checked_sub(last_frame.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    Ok(())
}
