//! A divided, repeating target counter driven the way the block loop drives it: 801 raw cycles at
//! rate 8 with target 100 fires exactly once, lands back on zero, and carries the one leftover
//! raw cycle into the next reconciliation.

use pretty_assertions::assert_eq;
use tandem_interrupts::CpuIntercept;
use tandem_machine::ProcessorTimingContext;

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
        // Entering the handler blocks further delivery until the guest returns.
        self.enabled = false;
    }
}

#[test]
fn rate_8_target_100_fires_once_in_801_cycles() {
    let mut cpu = TestCpu {
        enabled: true,
        ..Default::default()
    };
    let mut ctx = ProcessorTimingContext::secondary();
    ctx.set_intc_mask(!0, &mut cpu);

    // reset-on-target, irq-on-target, repeat.
    ctx.counter_write_mode(0, (1 << 3) | (1 << 4) | (1 << 6));
    ctx.counter_set_rate(0, 8);
    ctx.counter_write_target(0, 100);

    // The target is 100 ticks = 800 raw cycles out, and it owns the horizon.
    assert_eq!(ctx.cycles_to_horizon(), 800);

    ctx.advance(801);
    ctx.run_event_test(&mut cpu);

    assert_eq!(cpu.raised.len(), 1, "exactly one target interrupt");
    assert_eq!(cpu.raised[0] & (1 << 4), 1 << 4);
    assert_eq!(ctx.counter_read_count(0), 0, "count wrapped to zero at the target");

    // 801 = 100 ticks + 1 leftover raw cycle. Seven more raw cycles complete the next tick.
    ctx.advance(7);
    ctx.run_event_test(&mut cpu);
    assert_eq!(ctx.counter_read_count(0), 1);
    assert_eq!(cpu.raised.len(), 1, "no spurious second firing");
}
