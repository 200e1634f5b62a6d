use tandem_interrupts::Intc;
use tandem_time::{cycles, HORIZON_SPAN};

use crate::mode::{CounterMode, GatePolicy};

/// Sentinel bit marking the target as already spent this epoch: it re-arms only when the next
/// overflow starts a fresh epoch (or a register write replaces it). Targets themselves are at
/// most 32 bits wide, so bit 32 is free for both counter widths.
pub const TARGET_SPENT: u64 = 1 << 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterWidth {
    Bits16,
    Bits32,
}

impl CounterWidth {
    /// Largest representable count; one past this overflows.
    #[inline]
    pub const fn max_count(self) -> u64 {
        match self {
            CounterWidth::Bits16 => 0xFFFF,
            CounterWidth::Bits32 => 0xFFFF_FFFF,
        }
    }
}

/// Edge of the externally driven gate signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEdge {
    /// Gate asserted (e.g. blanking interval begins).
    Start,
    /// Gate deasserted.
    End,
}

/// One programmable interval counter.
///
/// Counters live in a fixed-size [`crate::CounterBank`] and are never individually allocated or
/// freed; a subsystem reset re-initializes them in place to power-on defaults.
#[derive(Debug, Clone)]
pub struct Counter {
    /// Logical count as of `sync_cycle`. Held as `u64` because reconciliation may push it past
    /// the width bound; the overflow test brings it back in range.
    count: u64,
    /// Programmed target, possibly tagged [`TARGET_SPENT`].
    target: u64,
    /// Cycle divisor for internally clocked counters.
    rate: u32,
    width: CounterWidth,
    mode: CounterMode,
    /// Cause-register bit this counter raises, for both target and overflow hits.
    irq_line: u8,
    /// Cycle at which `count` was last exact. Re-pinned behind "now" to carry the sub-rate
    /// remainder.
    sync_cycle: u32,

    // Gate-derived runtime state. Never persisted; re-derived from `mode` on restore.
    counting: bool,
    gate_seen: bool,
}

impl Counter {
    pub fn new(width: CounterWidth, irq_line: u8) -> Self {
        let mut counter = Self {
            count: 0,
            target: TARGET_SPENT,
            rate: 1,
            width,
            mode: CounterMode::from_bits(0),
            irq_line,
            sync_cycle: 0,
            counting: true,
            gate_seen: false,
        };
        counter.mode.irq_armed = true;
        counter
    }

    #[inline]
    pub fn width(&self) -> CounterWidth {
        self.width
    }

    #[inline]
    pub fn irq_line(&self) -> u8 {
        self.irq_line
    }

    #[inline]
    pub fn mode(&self) -> &CounterMode {
        &self.mode
    }

    #[inline]
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Raw counter value, masked to the counter's width. Reconciles first so reads observe
    /// elapsed time.
    pub fn read_count(&mut self, now: u32) -> u32 {
        self.reconcile(now);
        (self.count & self.width.max_count()) as u32
    }

    /// Target without the spent tag.
    #[inline]
    pub fn read_target(&self) -> u32 {
        (self.target & !TARGET_SPENT) as u32
    }

    #[inline]
    pub fn read_mode(&self) -> u32 {
        self.mode.to_bits()
    }

    /// Advances `count` by whole elapsed ticks and re-pins `sync_cycle` so the fractional tick is
    /// carried instead of lost.
    ///
    /// Externally clocked counters advance only via [`Counter::external_tick`]; a gated-off
    /// counter accrues nothing. Both still re-pin so stale deltas never accumulate.
    pub fn reconcile(&mut self, now: u32) {
        if self.mode.alt_source || !self.counting {
            self.sync_cycle = now;
            return;
        }
        let delta = cycles::elapsed(self.sync_cycle, now);
        let rate = self.rate.max(1);
        self.count += u64::from(delta / rate);
        self.sync_cycle = now.wrapping_sub(delta % rate);
    }

    /// Applies the one-shot/repeat and pulse/toggle rules for one firing. The cause line is only
    /// latched while armed; a one-shot pulse therefore fires exactly once until a mode write
    /// re-arms it.
    fn fire(&mut self, intc: &mut Intc) {
        if self.mode.irq_armed {
            intc.raise(self.irq_line);
        }
        if self.mode.toggle {
            self.mode.irq_armed = !self.mode.irq_armed;
        } else if !self.mode.repeat {
            self.mode.irq_armed = false;
        }
    }

    /// Fires and consumes the target if the count has reached it. Returns whether it hit.
    pub fn test_target(&mut self, intc: &mut Intc) -> bool {
        if self.target & TARGET_SPENT != 0 || self.count < self.target {
            return false;
        }
        if self.mode.irq_on_target {
            self.fire(intc);
        }
        if self.mode.reset_on_target {
            self.count -= self.target;
        } else {
            self.target |= TARGET_SPENT;
        }
        true
    }

    /// Fires and wraps an overflowed count. Clears the spent tag so the target can hit again in
    /// the new epoch. Returns whether it wrapped; the caller must then re-run the target test,
    /// since one reconciliation can step past both the wrap point and a target just beyond it.
    pub fn test_overflow(&mut self, intc: &mut Intc) -> bool {
        let max = self.width.max_count();
        if self.count <= max {
            return false;
        }
        if self.mode.irq_on_overflow {
            self.fire(intc);
        }
        self.count -= max + 1;
        self.target &= !TARGET_SPENT;
        true
    }

    /// Full reconciliation pass: catch up with elapsed cycles, then run the boundary tests in
    /// target / overflow / target order.
    pub fn run_events(&mut self, now: u32, intc: &mut Intc) {
        self.reconcile(now);
        self.test_target(intc);
        if self.test_overflow(intc) {
            self.test_target(intc);
        }
    }

    /// Advances an externally clocked counter by `ticks` source events (e.g. scanlines) and runs
    /// the boundary tests.
    pub fn external_tick(&mut self, ticks: u32, intc: &mut Intc) {
        if !self.mode.alt_source || !self.counting {
            return;
        }
        self.count += u64::from(ticks);
        self.test_target(intc);
        if self.test_overflow(intc) {
            self.test_target(intc);
        }
    }

    /// Applies one gate edge under the counter's gate policy. Reconciles first so elapsed time is
    /// attributed to the counting regime that was in effect when it passed.
    pub fn gate_edge(&mut self, edge: GateEdge, now: u32) {
        if !self.mode.gate_enable {
            return;
        }
        self.reconcile(now);
        match (self.mode.gate_policy, edge) {
            (GatePolicy::PauseWhileGated, GateEdge::Start) => {
                self.counting = false;
            }
            (GatePolicy::PauseWhileGated, GateEdge::End) => {
                self.counting = true;
                self.sync_cycle = now;
            }
            (GatePolicy::ResetOnGateEnd, GateEdge::Start) => {}
            (GatePolicy::ResetOnGateEnd, GateEdge::End) => {
                self.count = 0;
                self.sync_cycle = now;
            }
            (GatePolicy::CountWhileGated, GateEdge::Start) => {
                self.counting = true;
                self.sync_cycle = now;
            }
            (GatePolicy::CountWhileGated, GateEdge::End) => {
                self.counting = false;
            }
            (GatePolicy::ResetOnFirstGate, GateEdge::Start) => {
                if !self.gate_seen {
                    self.gate_seen = true;
                    self.count = 0;
                    self.sync_cycle = now;
                }
            }
            (GatePolicy::ResetOnFirstGate, GateEdge::End) => {}
        }
    }

    /// Absolute cycle of the nearer of the armed target and the overflow, or `None` when the
    /// counter is stopped, externally clocked, or both boundaries are beyond the horizon span.
    pub fn next_wake(&self, now: u32) -> Option<u32> {
        if self.mode.alt_source || !self.counting {
            return None;
        }
        let rate = u64::from(self.rate.max(1));
        let since_sync = u64::from(cycles::elapsed(self.sync_cycle, now));

        let mut best: Option<u64> = None;
        let mut consider = |ticks_away: u64| {
            // Absolute: sync_cycle + ticks*rate; as a delta from now.
            let delta = (ticks_away * rate).saturating_sub(since_sync);
            if delta <= u64::from(HORIZON_SPAN) && best.map_or(true, |b| delta < b) {
                best = Some(delta);
            }
        };

        if self.target & TARGET_SPENT == 0 && self.mode.irq_on_target {
            consider(self.target.saturating_sub(self.count));
        }
        consider((self.width.max_count() + 1).saturating_sub(self.count));

        best.map(|delta| now.wrapping_add(delta as u32))
    }

    /// Writes the raw count register, re-pinning the sync point. A count rewound below the target
    /// re-arms it; a count at or past the target disarms it so the next reconciliation does not
    /// fire spuriously.
    pub fn write_count(&mut self, now: u32, value: u32) {
        self.count = u64::from(value) & self.width.max_count();
        self.sync_cycle = now;
        if self.count < self.target & !TARGET_SPENT {
            self.target &= !TARGET_SPENT;
        } else {
            self.target |= TARGET_SPENT;
        }
    }

    /// Writes the target register. A target at or behind the current count is immediately marked
    /// spent (disarmed until the next overflow) instead of firing on the next reconciliation.
    pub fn write_target(&mut self, now: u32, value: u32) {
        self.reconcile(now);
        self.target = u64::from(value);
        if self.count >= self.target {
            self.target |= TARGET_SPENT;
        }
    }

    /// Writes the mode register: resets the count, re-arms the interrupt flag, opens a fresh
    /// target epoch, and re-derives the gate runtime state from the new mode bits.
    pub fn write_mode(&mut self, now: u32, raw: u32) {
        self.mode = CounterMode::from_bits(raw);
        self.mode.irq_armed = true;
        self.count = 0;
        self.sync_cycle = now;
        self.target &= !TARGET_SPENT;
        if self.target <= self.count {
            self.target |= TARGET_SPENT;
        }
        self.rederive_gate_state();
    }

    /// Sets the cycle divisor. A rate of zero counts as one.
    pub fn set_rate(&mut self, now: u32, rate: u32) {
        self.reconcile(now);
        self.rate = rate;
        self.sync_cycle = now;
    }

    /// Re-derives the gate-driven runtime flags from the mode bits alone. Used at mode writes and
    /// on snapshot restore; the flags are deliberately not persisted so persisted and derived
    /// state cannot diverge.
    pub fn rederive_gate_state(&mut self) {
        self.gate_seen = false;
        self.counting =
            !(self.mode.gate_enable && self.mode.gate_policy == GatePolicy::CountWhileGated);
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.width, self.irq_line);
    }

    pub fn save_state(&self) -> CounterState {
        CounterState {
            count: self.count,
            target: self.target,
            rate: self.rate,
            mode: self.mode.to_bits(),
            sync_cycle: self.sync_cycle,
        }
    }

    pub fn restore_state(&mut self, state: CounterState) {
        self.count = state.count;
        self.target = state.target;
        self.rate = state.rate;
        self.mode = CounterMode::from_bits(state.mode);
        self.sync_cycle = state.sync_cycle;
        self.rederive_gate_state();
    }
}

/// Persisted per-counter state. Width and interrupt line are bank-layout constants, not state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterState {
    pub count: u64,
    pub target: u64,
    pub rate: u32,
    pub mode: u32,
    pub sync_cycle: u32,
}
