/*
 * Fixed-Point Arithmetic (Q17.14)
 *
 * The MLFQS accounting variables (recent_cpu, load_avg) are real-valued
 * but the kernel must not touch the FPU: floating-point state is not
 * saved across context switches. All of that arithmetic happens in a
 * 17.14 signed fixed-point representation instead, wrapped in a small
 * numeric type so the shift discipline never leaks into call sites.
 *
 * Representation: value v is stored as v * f with f = 2^14. Mixed
 * fixed/int operations promote the integer by multiplying with f.
 * Fixed*fixed and fixed/fixed widen through i64 to keep the full
 * intermediate precision.
 */

use core::ops::{Add, Div, Mul, Sub};

const SHIFT: u32 = 14;
const F: i32 = 1 << SHIFT;

/// A signed Q17.14 fixed-point number.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);

    /// Convert an integer to fixed point.
    pub const fn from_int(n: i32) -> Fixed {
        Fixed(n * F)
    }

    /// Truncate toward zero to an integer.
    pub fn trunc(self) -> i32 {
        self.0 / F
    }

    /// Round to the nearest integer, sign-aware.
    pub fn round(self) -> i32 {
        if self.0 >= 0 {
            (self.0 + F / 2) / F
        } else {
            (self.0 - F / 2) / F
        }
    }
}

impl From<i32> for Fixed {
    fn from(n: i32) -> Fixed {
        Fixed::from_int(n)
    }
}

impl Add for Fixed {
    type Output = Fixed;
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 + rhs.0)
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 - rhs.0)
    }
}

impl Add<i32> for Fixed {
    type Output = Fixed;
    fn add(self, n: i32) -> Fixed {
        Fixed(self.0 + n * F)
    }
}

impl Sub<i32> for Fixed {
    type Output = Fixed;
    fn sub(self, n: i32) -> Fixed {
        Fixed(self.0 - n * F)
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed(((self.0 as i64 * rhs.0 as i64) >> SHIFT) as i32)
    }
}

impl Mul<i32> for Fixed {
    type Output = Fixed;
    fn mul(self, n: i32) -> Fixed {
        Fixed(self.0 * n)
    }
}

impl Div for Fixed {
    type Output = Fixed;
    fn div(self, rhs: Fixed) -> Fixed {
        Fixed((((self.0 as i64) << SHIFT) / rhs.0 as i64) as i32)
    }
}

impl Div<i32> for Fixed {
    type Output = Fixed;
    fn div(self, n: i32) -> Fixed {
        Fixed(self.0 / n)
    }
}
