//! Integration layer of the tandem timing core.
//!
//! Ties a cycle clock, a counter bank, an interrupt controller, and a delayed-event bank into one
//! [`ProcessorTimingContext`] per processor, and pairs the two contexts into a [`TimingSession`]
//! that drives the block executors and the cross-processor budget hand-off.
//!
//! All state lives in these explicit context structs owned by the session; there are no hidden
//! statics, so multiple sessions can coexist (e.g. in tests).

#![forbid(unsafe_code)]

mod context;
mod session;
mod snapshot;

pub use context::{ProcessorTimingContext, ProcessorTimingState};
pub use session::{BlockExecutor, TimingSession, TimingSessionState};

use tandem_counters::CounterWidth;
use tandem_sched::EventSlot;

/// Cause-line assignments. These are guest-visible contracts of the machine; the tables are
/// constants so snapshots stay portable across builds.
pub mod lines {
    use super::*;

    /// Primary counter bank: four narrow counters.
    pub const PRIMARY_COUNTERS: [(CounterWidth, u8); 4] = [
        (CounterWidth::Bits16, 9),
        (CounterWidth::Bits16, 10),
        (CounterWidth::Bits16, 11),
        (CounterWidth::Bits16, 12),
    ];

    /// Secondary counter bank: eight counters, the first three narrow.
    pub const SECONDARY_COUNTERS: [(CounterWidth, u8); 8] = [
        (CounterWidth::Bits16, 4),
        (CounterWidth::Bits16, 5),
        (CounterWidth::Bits16, 6),
        (CounterWidth::Bits32, 14),
        (CounterWidth::Bits32, 15),
        (CounterWidth::Bits32, 16),
        (CounterWidth::Bits32, 17),
        (CounterWidth::Bits32, 18),
    ];

    /// Delayed-event slots map to the upper cause lines on both processors.
    pub const DELAYED_EVENTS: [u8; EventSlot::COUNT] = [24, 25, 26, 27, 28, 29, 30, 31];
}
