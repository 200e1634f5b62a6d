use tandem_counters::{CounterBank, CounterState, GateEdge};
use tandem_interrupts::{CpuIntercept, Intc, IntcState};
use tandem_sched::{DelayedEvents, DelayedSlotState, EventSink, EventSlot};
use tandem_time::{CycleClock, CycleClockState};
use tracing::debug;

use crate::lines;

/// Raises a delayed-event slot's cause line when the slot expires.
struct CauseLines<'a> {
    intc: &'a mut Intc,
    lines: &'a [u8; EventSlot::COUNT],
}

impl EventSink for CauseLines<'_> {
    fn delayed_event_fired(&mut self, slot: EventSlot) {
        debug!(?slot, "delayed event fired");
        self.intc.raise(self.lines[slot.index()]);
    }
}

/// One processor's complete timing state: cycle clock, counter bank, interrupt controller, and
/// delayed-event slots.
///
/// Owned exclusively by the processor's orchestrator; every operation takes `&mut self` and the
/// two processors of a session never touch each other's context directly.
#[derive(Debug)]
pub struct ProcessorTimingContext {
    clock: CycleClock,
    counters: CounterBank,
    intc: Intc,
    events: DelayedEvents,
    event_lines: [u8; EventSlot::COUNT],
}

impl ProcessorTimingContext {
    pub fn primary() -> Self {
        Self::with_layout(&lines::PRIMARY_COUNTERS)
    }

    pub fn secondary() -> Self {
        Self::with_layout(&lines::SECONDARY_COUNTERS)
    }

    fn with_layout(layout: &[(tandem_counters::CounterWidth, u8)]) -> Self {
        Self {
            clock: CycleClock::new(),
            counters: CounterBank::new(layout),
            intc: Intc::new(),
            events: DelayedEvents::new(),
            event_lines: lines::DELAYED_EVENTS,
        }
    }

    #[inline]
    pub fn now(&self) -> u32 {
        self.clock.now()
    }

    #[inline]
    pub fn cycles_to_horizon(&self) -> u32 {
        self.clock.cycles_to_horizon()
    }

    #[inline]
    pub fn intc(&self) -> &Intc {
        &self.intc
    }

    #[inline]
    pub fn counters(&self) -> &CounterBank {
        &self.counters
    }

    /// Advances the cycle clock by the cycles a block executor just consumed.
    #[inline]
    pub fn advance(&mut self, cycles: u32) {
        self.clock.advance(cycles);
    }

    /// The event test: reconcile all counters and run their boundary tests, expire due delayed
    /// events, re-derive the horizon, then give the CPU a chance to take whatever became pending.
    ///
    /// Idempotent at a fixed cycle: a second call with no intervening clock advance latches no
    /// further firings.
    pub fn run_event_test(&mut self, cpu: &mut dyn CpuIntercept) {
        let now = self.clock.now();
        self.counters.run_events(now, &mut self.intc);
        let mut sink = CauseLines {
            intc: &mut self.intc,
            lines: &self.event_lines,
        };
        self.events.poll(now, &mut sink);
        self.recompute_horizon();
        self.intc.evaluate(cpu);
    }

    /// Re-derives the horizon as the minimum over all live timing sources. Safe to call at any
    /// time; the horizon never persists staleness because it is always recomputable from the
    /// counter and event state.
    pub fn recompute_horizon(&mut self) {
        let now = self.clock.now();
        self.clock.rearm_horizon();
        if let Some(at) = self.counters.next_wake(now) {
            self.clock.request_wake(at);
        }
        if let Some(at) = self.events.next_wake(now) {
            self.clock.request_wake(at);
        }
    }

    // Register I/O surface. Every write can only move an event earlier than previously believed,
    // so each one refreshes the horizon immediately rather than waiting for the next event test.

    pub fn counter_read_count(&mut self, index: usize) -> u32 {
        let now = self.clock.now();
        self.counters.counter_mut(index).read_count(now)
    }

    pub fn counter_read_mode(&self, index: usize) -> u32 {
        self.counters.counter(index).read_mode()
    }

    pub fn counter_read_target(&self, index: usize) -> u32 {
        self.counters.counter(index).read_target()
    }

    pub fn counter_write_count(&mut self, index: usize, value: u32) {
        let now = self.clock.now();
        self.counters.counter_mut(index).write_count(now, value);
        self.recompute_horizon();
    }

    pub fn counter_write_mode(&mut self, index: usize, raw: u32) {
        let now = self.clock.now();
        self.counters.counter_mut(index).write_mode(now, raw);
        self.recompute_horizon();
    }

    pub fn counter_write_target(&mut self, index: usize, value: u32) {
        let now = self.clock.now();
        self.counters.counter_mut(index).write_target(now, value);
        self.recompute_horizon();
    }

    pub fn counter_set_rate(&mut self, index: usize, rate: u32) {
        let now = self.clock.now();
        self.counters.counter_mut(index).set_rate(now, rate);
        self.recompute_horizon();
    }

    /// Gate edge from the video-timing collaborator, applied bank-wide.
    pub fn gate_edge(&mut self, edge: GateEdge) {
        let now = self.clock.now();
        self.counters.gate_edge(edge, now);
        self.recompute_horizon();
    }

    /// Alternate-source tick notification for one externally clocked counter. May fire, so the
    /// CPU is consulted immediately.
    pub fn external_tick(&mut self, index: usize, ticks: u32, cpu: &mut dyn CpuIntercept) {
        self.counters
            .counter_mut(index)
            .external_tick(ticks, &mut self.intc);
        self.recompute_horizon();
        self.intc.evaluate(cpu);
    }

    /// Schedules a delayed event `delay` cycles from now; see
    /// [`DelayedEvents::schedule`] for the slot-replacement rule.
    pub fn schedule_event(&mut self, slot: EventSlot, delay: u32) {
        let now = self.clock.now();
        self.events.schedule(slot, now, delay);
        self.clock.request_wake(now.wrapping_add(delay));
    }

    pub fn cancel_event(&mut self, slot: EventSlot) {
        self.events.cancel(slot);
    }

    // Interrupt-controller surface: every mutation is edge-triggered, so each one re-evaluates
    // delivery instead of waiting for the next event test.

    pub fn raise_line(&mut self, line: u8, cpu: &mut dyn CpuIntercept) {
        self.intc.raise(line);
        self.intc.evaluate(cpu);
    }

    pub fn acknowledge_lines(&mut self, mask: u32) {
        self.intc.acknowledge(mask);
    }

    pub fn set_intc_mask(&mut self, mask: u32, cpu: &mut dyn CpuIntercept) {
        self.intc.set_mask(mask);
        self.intc.evaluate(cpu);
    }

    pub fn set_master_enable(&mut self, enabled: bool, cpu: &mut dyn CpuIntercept) {
        self.intc.set_master_enable(enabled);
        self.intc.evaluate(cpu);
    }

    /// Full power-on reset of clock, counters, interrupt state, and event slots.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.counters.reset();
        self.intc.reset();
        self.events.reset();
    }

    pub fn save_state(&self) -> ProcessorTimingState {
        ProcessorTimingState {
            clock: self.clock.save_state(),
            counters: self.counters.save_state(),
            intc: self.intc.save_state(),
            events: self.events.save_state(),
        }
    }

    /// Restores persisted state verbatim and re-derives everything that is deliberately not
    /// persisted: per-counter gate flags (from the mode bits) and any horizon tightening from the
    /// restored counter/event state.
    pub fn restore_state(&mut self, state: &ProcessorTimingState) {
        self.clock.restore_state(state.clock);
        self.counters.restore_state(&state.counters);
        self.intc.restore_state(state.intc);
        self.events.restore_state(state.events);

        // Only tighten: the persisted horizon is already a lower bound on every source, so this
        // keeps restored bytes bit-identical while repairing an inconsistent input.
        let now = self.clock.now();
        if let Some(at) = self.counters.next_wake(now) {
            self.clock.request_wake(at);
        }
        if let Some(at) = self.events.next_wake(now) {
            self.clock.request_wake(at);
        }
    }
}

/// Plain persisted form of one processor's timing context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessorTimingState {
    pub clock: CycleClockState,
    pub counters: Vec<CounterState>,
    pub intc: IntcState,
    pub events: [DelayedSlotState; EventSlot::COUNT],
}
