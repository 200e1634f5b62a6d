use tandem_time::cycles;

/// The fixed set of delayed-event slots. One one-shot pending callback per slot; peripheral
/// models pick their slot by name rather than allocating queue entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSlot {
    Dma0,
    Dma1,
    Dma2,
    Dma3,
    Dma4,
    Dma5,
    Dma6,
    /// Inter-processor link FIFO completion.
    Link,
}

impl EventSlot {
    pub const COUNT: usize = 8;

    pub const ALL: [EventSlot; EventSlot::COUNT] = [
        EventSlot::Dma0,
        EventSlot::Dma1,
        EventSlot::Dma2,
        EventSlot::Dma3,
        EventSlot::Dma4,
        EventSlot::Dma5,
        EventSlot::Dma6,
        EventSlot::Link,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Receiver for expired delayed events; typically raises the corresponding interrupt cause line.
pub trait EventSink {
    fn delayed_event_fired(&mut self, slot: EventSlot);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelayedSlotState {
    pub active: bool,
    pub start_cycle: u32,
    pub delay: u32,
}

/// Per-processor bank of one-shot delayed events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelayedEvents {
    slots: [DelayedSlotState; EventSlot::COUNT],
}

impl DelayedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `slot` to fire `delay` cycles after `now`.
    ///
    /// Scheduling an already-active slot silently replaces the pending firing; nothing is
    /// queued. Peripheral models that need back-to-back completions must wait for the first
    /// firing before scheduling the next.
    pub fn schedule(&mut self, slot: EventSlot, now: u32, delay: u32) {
        self.slots[slot.index()] = DelayedSlotState {
            active: true,
            start_cycle: now,
            delay,
        };
    }

    pub fn cancel(&mut self, slot: EventSlot) {
        self.slots[slot.index()].active = false;
    }

    #[inline]
    pub fn is_active(&self, slot: EventSlot) -> bool {
        self.slots[slot.index()].active
    }

    /// Fires every slot whose delay has elapsed.
    pub fn poll(&mut self, now: u32, sink: &mut dyn EventSink) {
        for slot in EventSlot::ALL {
            let state = &mut self.slots[slot.index()];
            if state.active && cycles::elapsed(state.start_cycle, now) >= state.delay {
                state.active = false;
                sink.delayed_event_fired(slot);
            }
        }
    }

    /// Earliest absolute cycle at which an active slot is due.
    pub fn next_wake(&self, now: u32) -> Option<u32> {
        let mut best: Option<u32> = None;
        for state in &self.slots {
            if !state.active {
                continue;
            }
            let remaining = state.delay.saturating_sub(cycles::elapsed(state.start_cycle, now));
            let at = now.wrapping_add(remaining);
            best = Some(match best {
                Some(current) => cycles::earliest(current, at),
                None => at,
            });
        }
        best
    }

    pub fn reset(&mut self) {
        self.slots = Default::default();
    }

    pub fn save_state(&self) -> [DelayedSlotState; EventSlot::COUNT] {
        self.slots
    }

    pub fn restore_state(&mut self, slots: [DelayedSlotState; EventSlot::COUNT]) {
        self.slots = slots;
    }
}
