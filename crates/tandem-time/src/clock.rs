use crate::cycles;

/// Upper bound, in cycles, on how far ahead the horizon may sit when no timing source wants an
/// earlier wake. Keeping this well under 2^31 keeps every horizon comparison inside the valid
/// window of the signed-difference arithmetic in [`cycles`].
pub const HORIZON_SPAN: u32 = 1 << 24;

/// A processor's monotonic, silently wrapping cycle clock plus its wake horizon.
///
/// Owned exclusively by the processor's event-test orchestrator. The horizon only ever moves
/// earlier through [`CycleClock::request_wake`]; pushing it later is done solely by
/// [`CycleClock::rearm_horizon`], which resets it to the far default before the orchestrator
/// re-derives the true minimum over all sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleClock {
    cycle: u32,
    horizon: u32,
}

impl CycleClock {
    pub const fn new() -> Self {
        Self {
            cycle: 0,
            horizon: HORIZON_SPAN,
        }
    }

    /// Current absolute cycle count.
    #[inline]
    pub const fn now(&self) -> u32 {
        self.cycle
    }

    /// Absolute cycle of the next mandatory event test.
    #[inline]
    pub const fn horizon(&self) -> u32 {
        self.horizon
    }

    /// Cycles remaining until the horizon; zero when the event test is already due.
    #[inline]
    pub const fn cycles_to_horizon(&self) -> u32 {
        cycles::elapsed(self.cycle, self.horizon)
    }

    /// Advances the clock by `n` cycles, wrapping silently.
    #[inline]
    pub fn advance(&mut self, n: u32) {
        self.cycle = self.cycle.wrapping_add(n);
    }

    /// Requests that the event test run no later than `at`. May only move the horizon earlier.
    #[inline]
    pub fn request_wake(&mut self, at: u32) {
        self.horizon = cycles::earliest(self.horizon, at);
    }

    /// Pushes the horizon back out to the far default, in preparation for re-deriving it as the
    /// minimum over all live timing sources. This is the only way the horizon moves later.
    #[inline]
    pub fn rearm_horizon(&mut self) {
        self.horizon = self.cycle.wrapping_add(HORIZON_SPAN);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub const fn save_state(&self) -> CycleClockState {
        CycleClockState {
            cycle: self.cycle,
            horizon: self.horizon,
        }
    }

    #[inline]
    pub fn restore_state(&mut self, state: CycleClockState) {
        self.cycle = state.cycle;
        self.horizon = state.horizon;
    }
}

impl Default for CycleClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleClockState {
    pub cycle: u32,
    pub horizon: u32,
}
