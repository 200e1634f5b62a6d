use tracing::trace;

/// Slack window, in Primary-equivalent cycles: the Secondary is run even with no owed cycles when
/// one of its wake-ups falls this close, so its interrupts are not starved by a coarse Primary
/// block.
pub const SECONDARY_SLACK: u32 = 28;

/// If the Primary's own next wake is within this many cycles while cycles are still owed, the
/// debt is dropped instead of stalling the Primary's interrupt delivery on a lagging Secondary.
pub const IMMINENT_IRQ_WINDOW: u32 = 16;

/// Converts blocks of Primary progress into a Secondary cycle budget at a fixed ratio.
///
/// The division remainder is carried exactly across hand-offs, so over any long run the two
/// clocks hold `secondary/primary = 1/ratio` with no systematic drift. `owed` is signed: running
/// the Secondary ahead of its budget (to reach a nearby wake-up) leaves a deficit that later
/// Primary progress pays back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetTracker {
    /// Primary cycles per Secondary cycle.
    ratio: u32,
    owed: i64,
    /// Primary cycles not yet amounting to a whole Secondary cycle.
    remainder: u32,
    /// Total cycles force-drained because the Secondary could not keep up.
    dropped: u64,
}

impl BudgetTracker {
    pub const DEFAULT_RATIO: u32 = 8;

    pub fn new(ratio: u32) -> Self {
        Self {
            ratio: ratio.max(1),
            owed: 0,
            remainder: 0,
            dropped: 0,
        }
    }

    #[inline]
    pub fn ratio(&self) -> u32 {
        self.ratio
    }

    #[inline]
    pub fn owed(&self) -> i64 {
        self.owed
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Credits one block of Primary progress.
    pub fn accrue(&mut self, primary_cycles: u32) {
        let total = u64::from(self.remainder) + u64::from(primary_cycles);
        let ratio = u64::from(self.ratio);
        self.owed += (total / ratio) as i64;
        self.remainder = (total % ratio) as u32;
    }

    /// Whether the Secondary should run now: it has budget, or a wake of its own (in Secondary
    /// cycles) falls inside the slack window.
    pub fn should_run_secondary(&self, secondary_wake_in: u32) -> bool {
        if self.owed > 0 {
            return true;
        }
        u64::from(secondary_wake_in) * u64::from(self.ratio) <= u64::from(SECONDARY_SLACK)
    }

    /// Budget to offer the Secondary's block executor. With no positive balance (slack-window
    /// runs), offers just enough to reach the wake.
    pub fn grant(&self, secondary_wake_in: u32) -> u32 {
        if self.owed > 0 {
            self.owed.min(i64::from(u32::MAX)) as u32
        } else {
            secondary_wake_in.max(1)
        }
    }

    /// Debits cycles the Secondary actually consumed (which may be fewer than offered if it hit
    /// its own horizon first, or more on a slack-window run).
    pub fn consume(&mut self, secondary_cycles: u32) {
        self.owed -= i64::from(secondary_cycles);
    }

    /// Drops any positive balance, recording the shortfall. Invoked when the Primary has an
    /// imminent interrupt to deliver and must not stall on a lagging Secondary.
    pub fn force_drain(&mut self) -> u32 {
        let shortfall = self.owed.max(0) as u64;
        if shortfall > 0 {
            self.owed = 0;
            self.dropped += shortfall;
            trace!(shortfall, total_dropped = self.dropped, "force-drained secondary cycle debt");
        }
        shortfall as u32
    }

    pub fn reset(&mut self) {
        self.owed = 0;
        self.remainder = 0;
        self.dropped = 0;
    }

    pub fn save_state(&self) -> BudgetTrackerState {
        BudgetTrackerState {
            ratio: self.ratio,
            owed: self.owed,
            remainder: self.remainder,
            dropped: self.dropped,
        }
    }

    pub fn restore_state(&mut self, state: BudgetTrackerState) {
        self.ratio = state.ratio.max(1);
        self.owed = state.owed;
        self.remainder = state.remainder;
        self.dropped = state.dropped;
    }
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RATIO)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BudgetTrackerState {
    pub ratio: u32,
    pub owed: i64,
    pub remainder: u32,
    pub dropped: u64,
}
