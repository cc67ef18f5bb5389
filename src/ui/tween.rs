/// Easing curves and in-flight tweens.
///
/// A tween is fire-and-forget: it is started with a duration and an easing,
/// advanced by frame time, and forgotten once it lands.

use std::time::Duration;

use crate::sim::event::Easing;

/// Map linear progress `t` in [0, 1] through the curve.
pub fn ease(easing: Easing, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    match easing {
        Easing::Linear => t,
        Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
        Easing::EaseInOutCubic => {
            if t < 0.5 {
                4.0 * t * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
            }
        }
        Easing::EaseOutBack => {
            const C1: f32 = 1.70158;
            const C3: f32 = C1 + 1.0;
            1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
        }
    }
}

/// A position in grid units `(row, column)`.
pub type Point = (f32, f32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
    from: Point,
    to: Point,
    elapsed: Duration,
    duration: Duration,
    easing: Easing,
}

impl Tween {
    pub fn new(from: Point, to: Point, duration: Duration, easing: Easing) -> Self {
        Tween { from, to, elapsed: Duration::ZERO, duration, easing }
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = (self.elapsed + dt).min(self.duration);
    }

    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn position(&self) -> Point {
        if self.finished() {
            return self.to;
        }
        let t = ease(self.easing, self.elapsed.as_secs_f32() / self.duration.as_secs_f32());
        (
            self.from.0 + (self.to.0 - self.from.0) * t,
            self.from.1 + (self.to.1 - self.from.1) * t,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 4] = [Easing::Linear, Easing::EaseOutQuad, Easing::EaseInOutCubic, Easing::EaseOutBack];

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn curves_hit_endpoints() {
        for easing in ALL {
            assert!(close(ease(easing, 0.0), 0.0), "{easing:?} at 0");
            assert!(close(ease(easing, 1.0), 1.0), "{easing:?} at 1");
        }
    }

    #[test]
    fn curve_shapes() {
        assert!(close(ease(Easing::Linear, 0.25), 0.25));
        assert!(ease(Easing::EaseOutQuad, 0.25) > 0.25);
        assert!(close(ease(Easing::EaseInOutCubic, 0.5), 0.5));
        assert!(ease(Easing::EaseInOutCubic, 0.25) < 0.25);
        // Overshoots before settling
        assert!(ease(Easing::EaseOutBack, 0.8) > 1.0);
    }

    #[test]
    fn progress_is_clamped() {
        assert!(close(ease(Easing::EaseOutQuad, -1.0), 0.0));
        assert!(close(ease(Easing::EaseOutQuad, 2.0), 1.0));
    }

    #[test]
    fn tween_lands_exactly() {
        let mut tw = Tween::new((0.0, 0.0), (2.0, 4.0), Duration::from_millis(100), Easing::Linear);
        tw.advance(Duration::from_millis(50));
        assert!(!tw.finished());
        let (r, c) = tw.position();
        assert!(close(r, 1.0) && close(c, 2.0));

        tw.advance(Duration::from_millis(80));
        assert!(tw.finished());
        assert_eq!(tw.position(), (2.0, 4.0));
    }

    #[test]
    fn zero_duration_is_instant() {
        let tw = Tween::new((1.0, 1.0), (3.0, 3.0), Duration::ZERO, Easing::EaseOutBack);
        assert!(tw.finished());
        assert_eq!(tw.position(), (3.0, 3.0));
    }
}
