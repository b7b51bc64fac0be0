//! Q16.16 fixed-point scalar.
//!
//! All voltages, durations and arithmetic inside the interpreter use this
//! format so the audio-rate context never touches the FPU. Floats only
//! appear at the edges (ingestion and the external control surface).

use core::fmt;

/// Number of fractional bits.
pub const Q16_SHIFT: u32 = 16;

/// A signed Q16.16 fixed-point value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Q16(pub i32);

impl Q16 {
    pub const ZERO: Q16 = Q16(0);
    pub const ONE: Q16 = Q16(1 << Q16_SHIFT);
    pub const HALF: Q16 = Q16(1 << (Q16_SHIFT - 1));
    pub const MAX: Q16 = Q16(i32::MAX);
    pub const MIN: Q16 = Q16(i32::MIN);

    /// Wrap a raw Q16.16 bit pattern.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw Q16.16 bit pattern.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// A whole number.
    pub const fn from_int(n: i16) -> Self {
        Self((n as i32) << Q16_SHIFT)
    }

    /// Convert from float, rounding half away from zero.
    pub fn from_f32(f: f32) -> Self {
        let scaled = f * Self::ONE.0 as f32;
        let rounded = if f >= 0.0 { scaled + 0.5 } else { scaled - 0.5 };
        // `as` saturates out-of-range floats and maps NaN to 0
        Self(rounded as i32)
    }

    /// Convert to float.
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / Self::ONE.0 as f32
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    pub fn saturating_neg(self) -> Self {
        Self(self.0.saturating_neg())
    }

    /// Multiply through a 64-bit intermediate.
    pub fn saturating_mul(self, rhs: Self) -> Self {
        let wide = (self.0 as i64 * rhs.0 as i64) >> Q16_SHIFT;
        Self(clamp_i64(wide))
    }

    /// Divide through a 64-bit intermediate. `None` when `rhs` is zero.
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.0 == 0 {
            return None;
        }
        let wide = ((self.0 as i64) << Q16_SHIFT) / rhs.0 as i64;
        Some(Self(clamp_i64(wide)))
    }

    /// Floor modulo: `a - floor(a / b) * b`.
    ///
    /// Both operands share the Q16 scale, so the remainder is exact on the
    /// raw words. The result follows the sign of the divisor
    /// (`-0.5 mod 1.0 == 0.5`) and lies in `[0, b)` for positive `b`.
    /// `None` when `rhs` is zero.
    pub fn checked_floor_mod(self, rhs: Self) -> Option<Self> {
        if rhs.0 == 0 {
            return None;
        }
        let r = self.0.wrapping_rem(rhs.0);
        // opposite signs, so the sum cannot overflow
        if r != 0 && (r < 0) != (rhs.0 < 0) {
            Some(Self(r + rhs.0))
        } else {
            Some(Self(r))
        }
    }
}

fn clamp_i64(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl From<f32> for Q16 {
    fn from(f: f32) -> Self {
        Self::from_f32(f)
    }
}

impl fmt::Display for Q16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_f32())
    }
}
