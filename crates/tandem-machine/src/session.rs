use tandem_interrupts::CpuIntercept;
use tandem_sched::{BudgetTracker, IMMINENT_IRQ_WINDOW};
use tracing::trace;

use crate::context::ProcessorTimingContext;

/// A processor's block executor: runs decoded instructions for at most `cycle_budget` cycles and
/// reports how many it actually consumed (fewer if it stopped early at its own horizon or a
/// halt).
pub trait BlockExecutor {
    fn execute_block(&mut self, cycle_budget: u32) -> u32;
}

/// One emulation session's pair of timing contexts plus the budget hand-off between them.
///
/// The two processors are cooperatively interleaved on a single logical thread: the Primary runs
/// a block to its horizon, its event test converts that progress into Secondary budget, and the
/// Secondary is pumped inline until the budget (or its own horizon) is spent.
#[derive(Debug)]
pub struct TimingSession {
    primary: ProcessorTimingContext,
    secondary: ProcessorTimingContext,
    budget: BudgetTracker,
}

impl TimingSession {
    pub fn new() -> Self {
        Self::with_ratio(BudgetTracker::DEFAULT_RATIO)
    }

    /// `ratio` is the fixed number of Primary cycles per Secondary cycle.
    pub fn with_ratio(ratio: u32) -> Self {
        Self {
            primary: ProcessorTimingContext::primary(),
            secondary: ProcessorTimingContext::secondary(),
            budget: BudgetTracker::new(ratio),
        }
    }

    #[inline]
    pub fn primary(&self) -> &ProcessorTimingContext {
        &self.primary
    }

    #[inline]
    pub fn primary_mut(&mut self) -> &mut ProcessorTimingContext {
        &mut self.primary
    }

    #[inline]
    pub fn secondary(&self) -> &ProcessorTimingContext {
        &self.secondary
    }

    #[inline]
    pub fn secondary_mut(&mut self) -> &mut ProcessorTimingContext {
        &mut self.secondary
    }

    #[inline]
    pub fn budget(&self) -> &BudgetTracker {
        &self.budget
    }

    /// Runs one Primary block up to its horizon, runs the Primary event test, then pumps the
    /// Secondary with the budget that block earned. Returns the Primary cycles consumed.
    pub fn run_primary_block(
        &mut self,
        primary_exec: &mut dyn BlockExecutor,
        primary_cpu: &mut dyn CpuIntercept,
        secondary_exec: &mut dyn BlockExecutor,
        secondary_cpu: &mut dyn CpuIntercept,
    ) -> u32 {
        let budget = self.primary.cycles_to_horizon().max(1);
        let consumed = primary_exec.execute_block(budget);
        self.primary.advance(consumed);
        self.primary.run_event_test(primary_cpu);
        self.budget.accrue(consumed);
        self.pump_secondary(secondary_exec, secondary_cpu);
        consumed
    }

    /// Drives the Secondary while the tracker says it should run. Exposed separately so delayed
    /// Secondary work scheduled outside a Primary block (e.g. by a register write) can be pumped
    /// immediately.
    pub fn pump_secondary(
        &mut self,
        secondary_exec: &mut dyn BlockExecutor,
        secondary_cpu: &mut dyn CpuIntercept,
    ) {
        // A Primary interrupt is imminent and the Secondary has not caught up: drop the debt and
        // move on rather than stall Primary interrupt delivery on a lagging Secondary.
        if self.budget.owed() > 0 && self.primary.cycles_to_horizon() <= IMMINENT_IRQ_WINDOW {
            self.budget.force_drain();
            return;
        }

        loop {
            let wake_in = self.secondary.cycles_to_horizon();
            if !self.budget.should_run_secondary(wake_in) {
                break;
            }
            let granted = self.budget.grant(wake_in);
            let consumed = secondary_exec.execute_block(granted);
            trace!(granted, consumed, owed = self.budget.owed(), "secondary hand-off");
            self.secondary.advance(consumed);
            self.budget.consume(consumed);
            self.secondary.run_event_test(secondary_cpu);
            if consumed == 0 || self.budget.owed() <= 0 {
                break;
            }
        }
    }

    /// Atomic full reset of both processors' timing state and the hand-off balance.
    pub fn reset(&mut self) {
        self.primary.reset();
        self.secondary.reset();
        self.budget.reset();
    }

    pub fn save_state(&self) -> TimingSessionState {
        TimingSessionState {
            primary: self.primary.save_state(),
            secondary: self.secondary.save_state(),
            budget: self.budget.save_state(),
        }
    }

    pub fn restore_state(&mut self, state: &TimingSessionState) {
        self.primary.restore_state(&state.primary);
        self.secondary.restore_state(&state.secondary);
        self.budget.restore_state(state.budget);
    }
}

/// Plain persisted form of a whole session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimingSessionState {
    pub primary: crate::context::ProcessorTimingState,
    pub secondary: crate::context::ProcessorTimingState,
    pub budget: tandem_sched::BudgetTrackerState,
}

impl Default for TimingSession {
    fn default() -> Self {
        Self::new()
    }
}
