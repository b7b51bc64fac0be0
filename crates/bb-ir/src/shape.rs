//! Easing shapes for slope (ramp) transitions.
//!
//! The interpreter treats a `Shape` as an opaque identifier handed to the
//! ramp service; only the service evaluates the curve.

use core::f32::consts::PI;

/// Interpolation curve used by a ramp toward a new destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Shape {
    #[default]
    Linear,
    Sine,
    Log,
    Expo,
    /// Jump to the destination immediately, then hold.
    Now,
    /// Hold the origin, then jump at the end of the segment.
    Wait,
    /// Overshoot then settle (ease-out-back).
    Over,
    /// Pull back then go (ease-in-back).
    Under,
    /// Bounce into the destination.
    Rebound,
}

const BACK_C1: f32 = 1.70158;
const BACK_C3: f32 = BACK_C1 + 1.0;

impl Shape {
    /// Parse a shape name by its leading character(s), case-insensitively.
    ///
    /// Unrecognized names fall back to `Linear`, so `"LN"`, `"linear"` and
    /// `""` all select the linear ramp.
    pub fn from_name(name: &str) -> Self {
        let mut chars = name.chars().map(|c| c.to_ascii_lowercase());
        match chars.next() {
            Some('s') => Shape::Sine,
            Some('e') => Shape::Expo,
            Some('n') => Shape::Now,
            Some('w') => Shape::Wait,
            Some('o') => Shape::Over,
            Some('u') => Shape::Under,
            Some('r') => Shape::Rebound,
            Some('l') if chars.next() == Some('o') => Shape::Log,
            _ => Shape::Linear,
        }
    }

    /// Map linear progress `t` in `[0, 1]` through this curve.
    pub fn ease(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Shape::Linear => t,
            Shape::Sine => -0.5 * (libm::cosf(PI * t) - 1.0),
            Shape::Log => {
                if t >= 1.0 { 1.0 } else { 1.0 - libm::powf(2.0, -10.0 * t) }
            }
            Shape::Expo => {
                if t <= 0.0 { 0.0 } else { libm::powf(2.0, 10.0 * (t - 1.0)) }
            }
            Shape::Now => if t > 0.0 { 1.0 } else { 0.0 },
            Shape::Wait => if t >= 1.0 { 1.0 } else { 0.0 },
            Shape::Over => {
                let u = t - 1.0;
                1.0 + BACK_C3 * u * u * u + BACK_C1 * u * u
            }
            Shape::Under => BACK_C3 * t * t * t - BACK_C1 * t * t,
            Shape::Rebound => bounce_out(t),
        }
    }
}

fn bounce_out(t: f32) -> f32 {
    const N: f32 = 7.5625;
    const D: f32 = 2.75;
    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let u = t - 1.5 / D;
        N * u * u + 0.75
    } else if t < 2.5 / D {
        let u = t - 2.25 / D;
        N * u * u + 0.9375
    } else {
        let u = t - 2.625 / D;
        N * u * u + 0.984375
    }
}
