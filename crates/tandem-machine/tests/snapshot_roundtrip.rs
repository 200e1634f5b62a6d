//! Snapshot round-trips must be bit-reproducible and behavior-preserving: identical bytes on
//! re-save, identical firing sequences on identical future input traces, and gate runtime flags
//! re-derived from mode bits rather than persisted.

use pretty_assertions::assert_eq;
use tandem_counters::GateEdge;
use tandem_interrupts::CpuIntercept;
use tandem_machine::{BlockExecutor, TimingSession};
use tandem_sched::EventSlot;
use tandem_snapshot::IoSnapshot;

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
    }
}

struct FullExec;

impl BlockExecutor for FullExec {
    fn execute_block(&mut self, cycle_budget: u32) -> u32 {
        cycle_budget
    }
}

fn programmed_session() -> (TimingSession, TestCpu, TestCpu) {
    let mut session = TimingSession::new();
    let mut primary_cpu = TestCpu {
        enabled: true,
        ..Default::default()
    };
    let mut secondary_cpu = TestCpu {
        enabled: true,
        ..Default::default()
    };

    session.primary_mut().set_intc_mask(!0, &mut primary_cpu);
    session.secondary_mut().set_intc_mask(!0, &mut secondary_cpu);

    session
        .primary_mut()
        .counter_write_mode(2, (1 << 3) | (1 << 4) | (1 << 6));
    session.primary_mut().counter_write_target(2, 3_000);

    session
        .secondary_mut()
        .counter_write_mode(4, (1 << 4) | (1 << 5) | (1 << 6));
    session.secondary_mut().counter_set_rate(4, 16);
    session.secondary_mut().counter_write_target(4, 77);
    session.secondary_mut().schedule_event(EventSlot::Dma1, 123);

    // Make some uneven progress so counts, remainders, and the budget balance are all nonzero.
    for _ in 0..5 {
        session.run_primary_block(
            &mut FullExec,
            &mut primary_cpu,
            &mut FullExec,
            &mut secondary_cpu,
        );
    }

    (session, primary_cpu, secondary_cpu)
}

#[test]
fn resave_is_bit_identical() {
    let (session, _, _) = programmed_session();

    let bytes = IoSnapshot::save_state(&session);
    let mut restored = TimingSession::new();
    restored.load_state(&bytes).unwrap();

    assert_eq!(IoSnapshot::save_state(&restored), bytes);
    assert_eq!(restored.save_state(), session.save_state());
}

#[test]
fn restored_session_replays_identical_firing_sequences() {
    let (mut live, mut live_pcpu, mut live_scpu) = programmed_session();

    let bytes = IoSnapshot::save_state(&live);
    let mut restored = TimingSession::new();
    restored.load_state(&bytes).unwrap();
    let mut rest_pcpu = TestCpu {
        enabled: true,
        raised: live_pcpu.raised.clone(),
    };
    let mut rest_scpu = TestCpu {
        enabled: true,
        raised: live_scpu.raised.clone(),
    };

    for _ in 0..20 {
        live.run_primary_block(&mut FullExec, &mut live_pcpu, &mut FullExec, &mut live_scpu);
        restored.run_primary_block(&mut FullExec, &mut rest_pcpu, &mut FullExec, &mut rest_scpu);

        assert_eq!(rest_pcpu.raised, live_pcpu.raised);
        assert_eq!(rest_scpu.raised, live_scpu.raised);
        assert_eq!(restored.save_state(), live.save_state());
    }
}

#[test]
fn gate_runtime_flags_are_rederived_not_persisted() {
    let mut session = TimingSession::new();
    let mut cpu = TestCpu::default();

    // Count-while-gated counter, saved mid-gate while actively counting.
    session
        .secondary_mut()
        .counter_write_mode(1, (1 << 0) | (2 << 1));
    session.secondary_mut().gate_edge(GateEdge::Start);
    session.secondary_mut().advance(40);
    session.secondary_mut().run_event_test(&mut cpu);
    assert_eq!(session.secondary_mut().counter_read_count(1), 40);

    let bytes = IoSnapshot::save_state(&session);
    let mut restored = TimingSession::new();
    restored.load_state(&bytes).unwrap();

    // The restored counter idles until the next gate start: the mid-gate "counting" flag is
    // derived state and is deliberately not in the snapshot.
    restored.secondary_mut().advance(100);
    assert_eq!(restored.secondary_mut().counter_read_count(1), 40);

    restored.secondary_mut().gate_edge(GateEdge::Start);
    restored.secondary_mut().advance(10);
    assert_eq!(restored.secondary_mut().counter_read_count(1), 50);
}
