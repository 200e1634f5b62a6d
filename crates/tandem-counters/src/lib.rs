//! Programmable interval counter bank for the tandem timing core.
//!
//! Each processor carries a fixed-size bank of hardware counters. A counter divides its
//! processor's cycle clock by a programmable rate (or is clocked by an external source such as a
//! video scanline), raises an interrupt line when it reaches a programmed target or overflows its
//! 16/32-bit width, and can be started/stopped/reset by an external gate signal under one of four
//! policies.
//!
//! Counting is **lazy**: a counter stores the count it had at `sync_cycle` and is reconciled with
//! elapsed cycles only when something needs the true value (the event test, a register read, a
//! gate edge). The sub-rate remainder is preserved across reconciliations by re-pinning
//! `sync_cycle` behind "now", so no fraction of a cycle is ever lost.

#![forbid(unsafe_code)]

mod bank;
mod counter;
mod mode;

pub use bank::CounterBank;
pub use counter::{Counter, CounterState, CounterWidth, GateEdge, TARGET_SPENT};
pub use mode::{CounterMode, GatePolicy};
