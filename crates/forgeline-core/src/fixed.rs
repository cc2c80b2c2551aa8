use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display/FFI, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// `num / den` as a Fixed64. Returns zero for a zero denominator.
#[inline]
pub fn ratio(num: i64, den: i64) -> Fixed64 {
    Fixed64::from_num(num)
        .checked_div(Fixed64::from_num(den))
        .unwrap_or(Fixed64::ZERO)
}

/// Narrow a u64 to u32, clamping at `u32::MAX` instead of wrapping.
#[inline]
pub fn saturating_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Narrow an i64 to i32, clamping to the i32 range instead of wrapping.
#[inline]
pub fn saturating_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
