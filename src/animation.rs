//! Per-route draw → pause → fade cycle
//!
//! The state is a plain value advanced by [`AnimationState::advance`] against an
//! externally supplied clock, so the whole cycle can be driven by a synthetic
//! timeline. Each tick performs at most one phase transition.

use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Phase of a route's animation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Drawing,
    Pausing,
    Fading,
}

/// Durations driving the cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationTimings {
    /// Time to draw one segment
    pub draw: Duration,
    /// Hold after the last segment is drawn
    pub pause: Duration,
    pub fade: Duration,
    /// Gap between one segment finishing and the next starting
    pub segment_gap: Duration,
    /// Upper bound of the random delay before a cycle starts
    pub max_start_delay: Duration,
    /// Fixed delay added before every cycle after the first
    pub cycle_gap: Duration,
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            draw: Duration::from_millis(3500),
            pause: Duration::from_millis(2000),
            fade: Duration::from_millis(2500),
            segment_gap: Duration::from_millis(50),
            max_start_delay: Duration::from_millis(3000),
            cycle_gap: Duration::from_millis(500),
        }
    }
}

/// Source of the randomized delay before each cycle
pub trait DelaySource {
    /// A delay in `0..=max`
    fn start_delay(&mut self, max: Duration) -> Duration;
}

impl<D: DelaySource + ?Sized> DelaySource for &mut D {
    fn start_delay(&mut self, max: Duration) -> Duration {
        (**self).start_delay(max)
    }
}

impl<D: DelaySource + ?Sized> DelaySource for Box<D> {
    fn start_delay(&mut self, max: Duration) -> Duration {
        (**self).start_delay(max)
    }
}

/// Uniform random delay drawn from any `rand` generator
pub struct RandomDelay<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomDelay<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DelaySource for RandomDelay<R> {
    fn start_delay(&mut self, max: Duration) -> Duration {
        max.mul_f64(self.rng.gen_range(0.0..=1.0))
    }
}

/// Always the same delay, capped at `max`
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDelay(pub Duration);

impl DelaySource for FixedDelay {
    fn start_delay(&mut self, max: Duration) -> Duration {
        self.0.min(max)
    }
}

/// Fraction of `total` covered by `elapsed`, clamped to 0..=1
fn progress(elapsed: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
}

fn initial_visibility(waypoints: usize) -> Vec<f64> {
    let mut vis = vec![0.0; waypoints];
    if let Some(first) = vis.first_mut() {
        *first = 1.0;
    }
    vis
}

/// Animation state of one route, owned by that route's controller
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub phase: Phase,
    /// Segment being drawn; `None` before the first segment starts
    pub current_segment: Option<usize>,
    /// Start of the active segment (Drawing) or of the fade (Fading)
    pub started_at: Duration,
    /// When Waiting or Pausing ends
    pub deadline: Duration,
    /// Draw fraction of the active segment
    pub draw_progress: f64,
    /// Per-waypoint visibility in 0..=1
    pub dot_visibility: Vec<f64>,
    pub opacity: f64,
    /// Completed cycles
    pub cycle: u64,
    segment_count: usize,
}

impl AnimationState {
    /// Fresh state for a newly mounted route with `segment_count` segments
    pub fn new(
        segment_count: usize,
        now: Duration,
        timings: &AnimationTimings,
        delay: &mut impl DelaySource,
    ) -> Self {
        assert!(segment_count > 0, "a route always has at least one segment");
        Self {
            phase: Phase::Waiting,
            current_segment: None,
            started_at: now,
            deadline: now + delay.start_delay(timings.max_start_delay),
            draw_progress: 0.0,
            dot_visibility: initial_visibility(segment_count + 1),
            opacity: 1.0,
            cycle: 0,
            segment_count,
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Active segment as a signed index, -1 when none has started
    pub fn current_segment_index(&self) -> isize {
        self.current_segment.map_or(-1, |k| k as isize)
    }

    /// Draw fraction of every segment: finished ones are 1, pending ones 0
    pub fn segment_progress(&self) -> Vec<f64> {
        (0..self.segment_count)
            .map(|i| match (self.phase, self.current_segment) {
                (Phase::Pausing | Phase::Fading, _) => 1.0,
                (Phase::Drawing, Some(k)) if i < k => 1.0,
                (Phase::Drawing, Some(k)) if i == k => self.draw_progress,
                _ => 0.0,
            })
            .collect()
    }

    /// Advance to `now`, returning the next state
    pub fn advance(
        mut self,
        now: Duration,
        timings: &AnimationTimings,
        delay: &mut impl DelaySource,
    ) -> Self {
        self.step(now, timings, delay);
        self
    }

    /// In-place form of [`AnimationState::advance`]
    pub fn step(&mut self, now: Duration, timings: &AnimationTimings, delay: &mut impl DelaySource) {
        match self.phase {
            Phase::Waiting => {
                if now >= self.deadline {
                    debug!(cycle = self.cycle, "drawing segment 0");
                    self.phase = Phase::Drawing;
                    self.current_segment = Some(0);
                    self.started_at = now;
                    self.draw_progress = 0.0;
                }
            }
            Phase::Drawing => {
                let k = self.current_segment.unwrap_or(0);
                let p = progress(now.saturating_sub(self.started_at), timings.draw);
                self.draw_progress = self.draw_progress.max(p);

                if self.draw_progress >= 1.0 {
                    self.dot_visibility[k + 1] = 1.0;

                    if k + 1 >= self.segment_count {
                        debug!(cycle = self.cycle, "all segments drawn, pausing");
                        self.phase = Phase::Pausing;
                        self.deadline = now + timings.pause;
                    } else {
                        debug!(cycle = self.cycle, segment = k + 1, "drawing next segment");
                        self.current_segment = Some(k + 1);
                        self.started_at = now + timings.segment_gap;
                        self.draw_progress = 0.0;
                    }
                }
            }
            Phase::Pausing => {
                if now >= self.deadline {
                    debug!(cycle = self.cycle, "fading out");
                    self.phase = Phase::Fading;
                    self.started_at = now;
                }
            }
            Phase::Fading => {
                let p = progress(now.saturating_sub(self.started_at), timings.fade);
                self.opacity = 1.0 - p;
                for v in self.dot_visibility.iter_mut().filter(|v| **v > 0.0) {
                    *v = 1.0 - p;
                }

                if p >= 1.0 {
                    let wait = timings.cycle_gap + delay.start_delay(timings.max_start_delay);
                    debug!(cycle = self.cycle, wait_ms = wait.as_millis() as u64, "cycle complete");
                    self.reset(now + wait);
                }
            }
        }
    }

    fn reset(&mut self, deadline: Duration) {
        self.phase = Phase::Waiting;
        self.current_segment = None;
        self.draw_progress = 0.0;
        self.opacity = 1.0;
        self.dot_visibility = initial_visibility(self.segment_count + 1);
        self.deadline = deadline;
        self.cycle += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FRAME: Duration = Duration::from_millis(16);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn run_until(
        mut state: AnimationState,
        from: Duration,
        until: Duration,
        timings: &AnimationTimings,
    ) -> (AnimationState, Duration) {
        let mut now = from;
        let mut delay = FixedDelay(Duration::ZERO);
        while now < until {
            now += FRAME;
            state = state.advance(now, timings, &mut delay);
        }
        (state, now)
    }

    #[test]
    fn starts_waiting_with_origin_visible() {
        let state = AnimationState::new(2, ms(0), &AnimationTimings::default(), &mut FixedDelay(ms(700)));
        assert_eq!(state.phase, Phase::Waiting);
        assert_eq!(state.current_segment_index(), -1);
        assert_eq!(state.dot_visibility, vec![1.0, 0.0, 0.0]);
        assert_eq!(state.deadline, ms(700));
        assert_eq!(state.opacity, 1.0);
    }

    #[test]
    fn waits_for_deadline() {
        let timings = AnimationTimings::default();
        let mut delay = FixedDelay(ms(1000));
        let state = AnimationState::new(1, ms(0), &timings, &mut delay);
        let state = state.advance(ms(999), &timings, &mut delay);
        assert_eq!(state.phase, Phase::Waiting);
        let state = state.advance(ms(1000), &timings, &mut delay);
        assert_eq!(state.phase, Phase::Drawing);
        assert_eq!(state.current_segment, Some(0));
    }

    #[test]
    fn draw_progress_clamps_on_overshoot() {
        let timings = AnimationTimings::default();
        let mut delay = FixedDelay(Duration::ZERO);
        let state = AnimationState::new(2, ms(0), &timings, &mut delay).advance(ms(0), &timings, &mut delay);
        let mid = state.clone().advance(ms(1750), &timings, &mut delay);
        assert!((mid.draw_progress - 0.5).abs() < 1e-9);

        let over = state.advance(ms(3_600_000), &timings, &mut delay);
        // The overshooting tick completes segment 0 and moves on
        assert_eq!(over.current_segment, Some(1));
        assert_eq!(over.segment_progress()[0], 1.0);
        assert!(over.segment_progress().iter().all(|p| *p <= 1.0));
    }

    #[test]
    fn progress_never_decreases_within_segment() {
        let timings = AnimationTimings::default();
        let mut delay = FixedDelay(Duration::ZERO);
        let mut state = AnimationState::new(1, ms(0), &timings, &mut delay).advance(ms(0), &timings, &mut delay);
        let mut last = 0.0;
        // Clock jitter: occasionally step backwards
        for t in [100, 400, 350, 900, 2000, 1500, 3400] {
            state = state.advance(ms(t), &timings, &mut delay);
            assert!(state.draw_progress >= last);
            assert!(state.draw_progress <= 1.0);
            last = state.draw_progress;
        }
    }

    #[test]
    fn single_segment_goes_straight_to_pause() {
        let timings = AnimationTimings::default();
        let mut delay = FixedDelay(Duration::ZERO);
        let state = AnimationState::new(1, ms(0), &timings, &mut delay)
            .advance(ms(0), &timings, &mut delay)
            .advance(ms(3500), &timings, &mut delay);
        assert_eq!(state.phase, Phase::Pausing);
        assert_eq!(state.dot_visibility, vec![1.0, 1.0]);
        assert_eq!(state.deadline, ms(5500));
    }

    #[test]
    fn next_segment_starts_after_gap() {
        let timings = AnimationTimings::default();
        let mut delay = FixedDelay(Duration::ZERO);
        let state = AnimationState::new(2, ms(0), &timings, &mut delay)
            .advance(ms(0), &timings, &mut delay)
            .advance(ms(3500), &timings, &mut delay);
        assert_eq!(state.current_segment, Some(1));
        assert_eq!(state.started_at, ms(3550));
        assert_eq!(state.dot_visibility, vec![1.0, 1.0, 0.0]);

        let state = state.advance(ms(3540), &timings, &mut delay);
        assert_eq!(state.draw_progress, 0.0);
    }

    #[test]
    fn fade_tracks_opacity_on_all_dots() {
        let timings = AnimationTimings::default();
        let (state, now) = run_until(
            AnimationState::new(1, ms(0), &timings, &mut FixedDelay(Duration::ZERO)),
            ms(0),
            ms(3500 + 2000 + 100),
            &timings,
        );
        assert_eq!(state.phase, Phase::Fading);
        let (state, _) = run_until(state, now, now + ms(1000), &timings);
        assert!(state.opacity < 1.0 && state.opacity > 0.0);
        for v in &state.dot_visibility {
            assert!((v - state.opacity).abs() < 1e-9);
        }
    }

    #[test]
    fn full_cycle_returns_to_waiting() {
        let timings = AnimationTimings::default();
        let start = AnimationState::new(3, ms(0), &timings, &mut FixedDelay(Duration::ZERO));
        let nominal = ms(3 * 3500 + 2 * 50 + 2000 + 2500 + 20 * 16);
        let (state, _) = run_until(start, ms(0), nominal, &timings);

        assert_eq!(state.phase, Phase::Waiting);
        assert_eq!(state.current_segment_index(), -1);
        assert_eq!(state.dot_visibility, vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(state.opacity, 1.0);
        assert_eq!(state.cycle, 1);
    }

    #[test]
    fn reset_deadline_includes_cycle_gap() {
        let timings = AnimationTimings::default();
        let mut delay = FixedDelay(ms(300));
        let mut state = AnimationState::new(1, ms(0), &timings, &mut delay);
        let mut now = ms(0);
        while state.cycle == 0 {
            now += FRAME;
            state = state.advance(now, &timings, &mut delay);
        }
        assert_eq!(state.deadline, now + ms(800));
    }

    #[test]
    fn random_delay_stays_in_range() {
        let mut delay = RandomDelay::new(StdRng::seed_from_u64(7));
        for _ in 0..200 {
            assert!(delay.start_delay(ms(3000)) <= ms(3000));
        }
        assert_eq!(FixedDelay(ms(9000)).start_delay(ms(3000)), ms(3000));
    }
}
