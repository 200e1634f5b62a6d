//! Per-processor virtual time for the tandem timing core.
//!
//! Each emulated processor advances a **wrapping 32-bit cycle counter** as its single source of
//! truth for "now". Because the counter wraps silently, ordering is never decided with `<`/`>` on
//! the raw values; everything goes through the signed-difference helpers in [`cycles`].
//!
//! Layered on the clock is the wake **horizon**: the nearest future cycle at which some timing
//! source (a counter target/overflow, a delayed event, the cross-processor tracker) needs the
//! event test to run. The horizon is a conservative lower bound and may only ever be pulled
//! earlier; it is recomputed from scratch whenever it could have gone stale.

#![forbid(unsafe_code)]

mod clock;
pub mod cycles;

pub use clock::{CycleClock, CycleClockState, HORIZON_SPAN};
