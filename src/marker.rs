//! Waypoint marker fade and pulse
//!
//! A marker follows the route's visibility signal through its own fade
//! timeline, so a dot appearing mid-route eases in independently of the
//! route-level pause and fade.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerTimings {
    pub fade: Duration,
    pub pulse_amplitude: f64,
    /// Pulse angular rate, radians per millisecond
    pub pulse_rate: f64,
}

impl Default for MarkerTimings {
    fn default() -> Self {
        Self {
            fade: Duration::from_millis(600),
            pulse_amplitude: 0.35,
            pulse_rate: 0.005,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fade {
    from: f64,
    to: f64,
    start: Duration,
    duration: Duration,
}

impl Fade {
    fn level(&self, now: Duration) -> f64 {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = (now.saturating_sub(self.start).as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }
}

/// What the renderer applies to a marker this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerOutput {
    pub opacity: f64,
    pub scale: f64,
}

/// Fade/pulse controller for one waypoint marker
#[derive(Debug, Clone)]
pub struct MarkerController {
    fade: Fade,
    last_signal: f64,
    last_opacity: f64,
}

impl Default for MarkerController {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerController {
    /// A hidden marker
    pub fn new() -> Self {
        Self {
            fade: Fade {
                from: 0.0,
                to: 0.0,
                start: Duration::ZERO,
                duration: Duration::ZERO,
            },
            last_signal: 0.0,
            last_opacity: 0.0,
        }
    }

    /// Local fade level in 0..=1, before route opacity
    pub fn level(&self, now: Duration) -> f64 {
        self.fade.level(now)
    }

    /// Consume this frame's visibility `signal` and route `global_opacity`
    pub fn update(
        &mut self,
        signal: f64,
        global_opacity: f64,
        now: Duration,
        timings: &MarkerTimings,
    ) -> MarkerOutput {
        let was_on = self.last_signal > 0.0;
        let on = signal > 0.0;

        if on && !was_on {
            self.fade = Fade {
                from: self.fade.level(now),
                to: 1.0,
                start: now,
                duration: timings.fade,
            };
        } else if was_on && !on {
            // Fade out from what was last on screen, route opacity included
            self.fade = Fade {
                from: self.last_opacity,
                to: 0.0,
                start: now,
                duration: timings.fade,
            };
        }
        self.last_signal = signal;

        let level = self.fade.level(now);
        let pulse = if level >= 1.0 && signal >= 1.0 {
            let t = now.as_secs_f64() * 1000.0;
            1.0 + timings.pulse_amplitude * (t * timings.pulse_rate).sin()
        } else {
            1.0
        };

        let global = global_opacity.clamp(0.0, 1.0);
        let opacity = (level * global).clamp(0.0, 1.0);
        self.last_opacity = opacity;

        MarkerOutput {
            opacity,
            scale: level * pulse * global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn rising_edge_fades_in() {
        let timings = MarkerTimings::default();
        let mut m = MarkerController::new();
        let a = m.update(1.0, 1.0, ms(1000), &timings);
        assert_eq!(a.opacity, 0.0);
        let b = m.update(1.0, 1.0, ms(1300), &timings);
        assert!((b.opacity - 0.5).abs() < 1e-9);
        // No pulse until fully faded in
        assert!((b.scale - 0.5).abs() < 1e-9);
        let c = m.update(1.0, 1.0, ms(1600), &timings);
        assert_eq!(c.opacity, 1.0);
    }

    #[test]
    fn pulses_when_steady() {
        let timings = MarkerTimings::default();
        let mut m = MarkerController::new();
        m.update(1.0, 1.0, ms(0), &timings);
        let now = ms(1000);
        let out = m.update(1.0, 1.0, now, &timings);
        let expected = 1.0 + 0.35 * (1000.0_f64 * 0.005).sin();
        assert!((out.scale - expected).abs() < 1e-9);
        assert_eq!(out.opacity, 1.0);
    }

    #[test]
    fn global_opacity_composes_once() {
        let timings = MarkerTimings::default();
        let mut m = MarkerController::new();
        m.update(1.0, 1.0, ms(0), &timings);
        // Route fading: signal below 1 stops the pulse, opacity follows the route
        let out = m.update(0.4, 0.4, ms(2000), &timings);
        assert!((out.opacity - 0.4).abs() < 1e-9);
        assert!((out.scale - 0.4).abs() < 1e-9);
    }

    #[test]
    fn falling_edge_fades_from_last_shown() {
        let timings = MarkerTimings::default();
        let mut m = MarkerController::new();
        m.update(1.0, 1.0, ms(0), &timings);
        m.update(0.02, 0.02, ms(5000), &timings);
        // Cycle reset: route opacity snaps back while this dot's signal drops
        let out = m.update(0.0, 1.0, ms(5016), &timings);
        assert!(out.opacity <= 0.02 + 1e-9);
        let later = m.update(0.0, 1.0, ms(5700), &timings);
        assert_eq!(later.opacity, 0.0);
    }

    #[test]
    fn hidden_marker_stays_hidden() {
        let timings = MarkerTimings::default();
        let mut m = MarkerController::new();
        for t in 0..10 {
            let out = m.update(0.0, 1.0, ms(t * 100), &timings);
            assert_eq!(out.opacity, 0.0);
            assert_eq!(out.scale, 0.0);
        }
    }
}
