//! Cross-processor budget hand-off: ratio conservation over long runs, slack-window runs without
//! a positive balance, and the imminent-interrupt force drain.

use pretty_assertions::assert_eq;
use tandem_interrupts::CpuIntercept;
use tandem_machine::{BlockExecutor, TimingSession};

#[derive(Default)]
struct TestCpu {
    enabled: bool,
    raised: Vec<u32>,
}

impl CpuIntercept for TestCpu {
    fn interrupts_structurally_enabled(&self) -> bool {
        self.enabled
    }

    fn raise_exception(&mut self, cause: u32) {
        self.raised.push(cause);
        self.enabled = false;
    }
}

/// Consumes at most `cap` cycles of each offered budget and counts the total.
struct CappedExec {
    cap: u32,
    total: u64,
    calls: u32,
}

impl CappedExec {
    fn new(cap: u32) -> Self {
        Self {
            cap,
            total: 0,
            calls: 0,
        }
    }
}

impl BlockExecutor for CappedExec {
    fn execute_block(&mut self, cycle_budget: u32) -> u32 {
        self.calls += 1;
        let consumed = cycle_budget.min(self.cap);
        self.total += u64::from(consumed);
        consumed
    }
}

#[test]
fn long_run_converges_to_the_configured_ratio() {
    let mut session = TimingSession::with_ratio(8);
    let mut primary_cpu = TestCpu::default();
    let mut secondary_cpu = TestCpu::default();
    // A block size with an awkward remainder mod 8.
    let mut primary_exec = CappedExec::new(9973);
    let mut secondary_exec = CappedExec::new(u32::MAX);

    for _ in 0..1_000 {
        session.run_primary_block(
            &mut primary_exec,
            &mut primary_cpu,
            &mut secondary_exec,
            &mut secondary_cpu,
        );
    }

    // Blocks near an idle counter's overflow wake come in short of the cap, so the primary total
    // is whatever the executor actually consumed; the invariant is the ratio between the totals.
    assert!(primary_exec.total > 9_973 * 900);
    // Exact floor division: the per-block remainders carry, they are never dropped.
    assert_eq!(secondary_exec.total, primary_exec.total / 8);
    assert_eq!(
        u64::from(session.budget().save_state().remainder),
        primary_exec.total % 8
    );
    assert_eq!(session.budget().dropped(), 0);
}

#[test]
fn nearby_secondary_wake_runs_inside_the_slack_window() {
    let mut session = TimingSession::with_ratio(8);
    let mut primary_cpu = TestCpu::default();
    let mut secondary_cpu = TestCpu::default();
    let mut primary_exec = CappedExec::new(7); // not even one secondary cycle of budget
    let mut secondary_exec = CappedExec::new(u32::MAX);

    // Secondary counter 0: target two cycles out, 2 * ratio = 16 <= 28-cycle slack.
    session.secondary_mut().set_intc_mask(!0, &mut secondary_cpu);
    session
        .secondary_mut()
        .counter_write_mode(0, (1 << 3) | (1 << 4) | (1 << 6));
    session.secondary_mut().counter_write_target(0, 2);

    session.run_primary_block(
        &mut primary_exec,
        &mut primary_cpu,
        &mut secondary_exec,
        &mut secondary_cpu,
    );

    assert_eq!(session.budget().owed(), -2, "slack run left a deficit");
    assert_eq!(secondary_exec.total, 2);
    assert_eq!(
        session.secondary().intc().cause(),
        1 << 4,
        "the secondary target fired on time instead of waiting for budget"
    );
}

#[test]
fn imminent_primary_interrupt_force_drains_the_debt() {
    let mut session = TimingSession::with_ratio(8);
    let mut primary_cpu = TestCpu::default();
    let mut secondary_cpu = TestCpu::default();
    let mut primary_exec = CappedExec::new(800);
    // A wedged secondary that makes no progress at all.
    let mut secondary_exec = CappedExec::new(0);

    // After the 800-cycle block the primary's own target is 8 cycles out, inside the
    // imminent-interrupt window.
    session.primary_mut().set_intc_mask(!0, &mut primary_cpu);
    session
        .primary_mut()
        .counter_write_mode(0, (1 << 3) | (1 << 4) | (1 << 6));
    session.primary_mut().counter_write_target(0, 808);

    session.run_primary_block(
        &mut primary_exec,
        &mut primary_cpu,
        &mut secondary_exec,
        &mut secondary_cpu,
    );

    assert_eq!(session.budget().owed(), 0, "debt was dropped, not carried");
    assert_eq!(session.budget().dropped(), 100);
    assert_eq!(secondary_exec.calls, 0, "the lagging secondary was not run");
}
