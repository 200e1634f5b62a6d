//! Scheduling glue for the tandem timing core: the named-slot delayed-event queue used by
//! DMA/peripheral completion logic, and the cross-processor budget tracker that keeps the two
//! cycle clocks at a fixed ratio across block-wise stepping.

#![forbid(unsafe_code)]

mod budget;
mod delayed;

pub use budget::{BudgetTracker, BudgetTrackerState, IMMINENT_IRQ_WINDOW, SECONDARY_SLACK};
pub use delayed::{DelayedEvents, DelayedSlotState, EventSink, EventSlot};
