//! Wrap-aware arithmetic on absolute 32-bit cycle counts.
//!
//! All values here live on a circle of 2^32 cycles. Two absolute cycle counts can be ordered only
//! when they are known to be within half the circle of each other, which the timing core
//! guarantees by never scheduling a wake further out than [`crate::HORIZON_SPAN`].

/// Signed distance from `from` to `to`, in cycles. Negative when `to` is in the past.
#[inline]
pub const fn delta(from: u32, to: u32) -> i32 {
    to.wrapping_sub(from) as i32
}

/// Cycles elapsed from `from` to `to`, clamped to zero.
///
/// The clamp absorbs transiently negative deltas (wraparound artifacts, out-of-order register
/// writes) so callers never observe an underflowed "almost 2^32 cycles elapsed" value, which
/// would otherwise wedge the event test in an immediately-due loop.
#[inline]
pub const fn elapsed(from: u32, to: u32) -> u32 {
    let d = delta(from, to);
    if d < 0 {
        0
    } else {
        d as u32
    }
}

/// Whichever of two absolute cycle counts comes first.
#[inline]
pub const fn earliest(a: u32, b: u32) -> u32 {
    if delta(a, b) < 0 {
        b
    } else {
        a
    }
}
