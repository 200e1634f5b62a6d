//! TLV snapshot encoding for a whole timing session.
//!
//! Counter widths, interrupt-line tables, and gate-derived runtime flags are construction-time
//! or derived properties and are deliberately not persisted; gate flags are re-derived from the
//! restored mode bits by [`crate::ProcessorTimingContext::restore_state`].

use tandem_counters::CounterState;
use tandem_interrupts::IntcState;
use tandem_sched::{BudgetTrackerState, DelayedSlotState, EventSlot};
use tandem_snapshot::codec::{Decoder, Encoder};
use tandem_snapshot::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};
use tandem_time::CycleClockState;

use crate::context::ProcessorTimingState;
use crate::session::{TimingSession, TimingSessionState};

const TAG_PRIMARY: u16 = 1;
const TAG_SECONDARY: u16 = 2;
const TAG_BUDGET: u16 = 3;

// A context never has more counters than this; a claimed larger count is a corrupt snapshot, not
// an allocation request.
const MAX_COUNTERS: u32 = 64;

fn encode_context(state: &ProcessorTimingState) -> Vec<u8> {
    let mut e = Encoder::new()
        .u32(state.clock.cycle)
        .u32(state.clock.horizon)
        .u32(state.counters.len() as u32);
    for c in &state.counters {
        e = e
            .u64(c.count)
            .u64(c.target)
            .u32(c.rate)
            .u32(c.mode)
            .u32(c.sync_cycle);
    }
    e = e
        .u32(state.intc.cause)
        .u32(state.intc.mask)
        .bool(state.intc.master_enable);
    for slot in &state.events {
        e = e.bool(slot.active).u32(slot.start_cycle).u32(slot.delay);
    }
    e.finish()
}

fn decode_context(bytes: &[u8]) -> SnapshotResult<ProcessorTimingState> {
    let mut d = Decoder::new(bytes);
    let clock = CycleClockState {
        cycle: d.u32()?,
        horizon: d.u32()?,
    };

    let count = d.u32()?;
    if count > MAX_COUNTERS {
        return Err(SnapshotError::InvalidFieldEncoding("context counter count"));
    }
    let mut counters = Vec::with_capacity(count as usize);
    for _ in 0..count {
        counters.push(CounterState {
            count: d.u64()?,
            target: d.u64()?,
            rate: d.u32()?,
            mode: d.u32()?,
            sync_cycle: d.u32()?,
        });
    }

    let intc = IntcState {
        cause: d.u32()?,
        mask: d.u32()?,
        master_enable: d.bool()?,
    };

    let mut events = [DelayedSlotState::default(); EventSlot::COUNT];
    for slot in &mut events {
        *slot = DelayedSlotState {
            active: d.bool()?,
            start_cycle: d.u32()?,
            delay: d.u32()?,
        };
    }

    Ok(ProcessorTimingState {
        clock,
        counters,
        intc,
        events,
    })
}

fn encode_budget(state: BudgetTrackerState) -> Vec<u8> {
    Encoder::new()
        .u32(state.ratio)
        .i64(state.owed)
        .u32(state.remainder)
        .u64(state.dropped)
        .finish()
}

fn decode_budget(bytes: &[u8]) -> SnapshotResult<BudgetTrackerState> {
    let mut d = Decoder::new(bytes);
    Ok(BudgetTrackerState {
        ratio: d.u32()?,
        owed: d.i64()?,
        remainder: d.u32()?,
        dropped: d.u64()?,
    })
}

impl IoSnapshot for TimingSession {
    const DEVICE_ID: [u8; 4] = *b"TSYN";
    const DEVICE_VERSION: SnapshotVersion = SnapshotVersion::new(1, 0);

    fn save_state(&self) -> Vec<u8> {
        let state = TimingSession::save_state(self);
        let mut w = SnapshotWriter::new(Self::DEVICE_ID, Self::DEVICE_VERSION);
        w.field_bytes(TAG_PRIMARY, encode_context(&state.primary));
        w.field_bytes(TAG_SECONDARY, encode_context(&state.secondary));
        w.field_bytes(TAG_BUDGET, encode_budget(state.budget));
        w.finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let r = SnapshotReader::parse_versioned(bytes, Self::DEVICE_ID, Self::DEVICE_VERSION)?;
        let state = TimingSessionState {
            primary: decode_context(r.require_field(TAG_PRIMARY, "primary context")?)?,
            secondary: decode_context(r.require_field(TAG_SECONDARY, "secondary context")?)?,
            budget: decode_budget(r.require_field(TAG_BUDGET, "budget tracker")?)?,
        };
        self.restore_state(&state);
        Ok(())
    }
}
