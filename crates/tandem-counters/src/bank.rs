use tandem_interrupts::Intc;
use tandem_time::cycles;

use crate::counter::{Counter, CounterState, CounterWidth, GateEdge};

/// A processor's fixed bank of programmable counters.
///
/// The slot layout (width and interrupt line per slot) is a construction-time constant of the
/// machine, not mutable state; only the counters' contents change at runtime.
#[derive(Debug, Clone)]
pub struct CounterBank {
    counters: Vec<Counter>,
}

impl CounterBank {
    pub fn new(layout: &[(CounterWidth, u8)]) -> Self {
        Self {
            counters: layout
                .iter()
                .map(|&(width, irq_line)| Counter::new(width, irq_line))
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    #[inline]
    pub fn counter(&self, index: usize) -> &Counter {
        &self.counters[index]
    }

    #[inline]
    pub fn counter_mut(&mut self, index: usize) -> &mut Counter {
        &mut self.counters[index]
    }

    /// Runs the full reconciliation pass (catch-up, target test, overflow test, post-wrap target
    /// re-test) over every counter.
    pub fn run_events(&mut self, now: u32, intc: &mut Intc) {
        for counter in &mut self.counters {
            counter.run_events(now, intc);
        }
    }

    /// Applies a gate edge to every gate-enabled counter. The gate source is shared bank-wide
    /// (e.g. a blanking signal); counters that have gating disabled ignore it.
    pub fn gate_edge(&mut self, edge: GateEdge, now: u32) {
        for counter in &mut self.counters {
            counter.gate_edge(edge, now);
        }
    }

    /// Earliest absolute wake cycle over all counters, if any counter wants one.
    pub fn next_wake(&self, now: u32) -> Option<u32> {
        let mut best: Option<u32> = None;
        for counter in &self.counters {
            if let Some(at) = counter.next_wake(now) {
                best = Some(match best {
                    Some(current) => cycles::earliest(current, at),
                    None => at,
                });
            }
        }
        best
    }

    pub fn reset(&mut self) {
        for counter in &mut self.counters {
            counter.reset();
        }
    }

    pub fn save_state(&self) -> Vec<CounterState> {
        self.counters.iter().map(Counter::save_state).collect()
    }

    /// Restores counter contents slot-by-slot. Extra persisted slots are ignored and missing ones
    /// keep their reset state, so a layout-compatible snapshot always restores cleanly.
    pub fn restore_state(&mut self, states: &[CounterState]) {
        for (counter, &state) in self.counters.iter_mut().zip(states) {
            counter.restore_state(state);
        }
    }
}
