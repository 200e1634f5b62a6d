//! Interrupt cause/mask state for one emulated processor.
//!
//! This crate holds only the controller-side state (pending cause bits, mask, master enable).
//! Whether the CPU can structurally take an interrupt right now, and what taking one means, are
//! the CPU core's business and are reached through [`CpuIntercept`].

#![forbid(unsafe_code)]

/// CPU-side collaborator consulted when deciding whether a pending interrupt can actually be
/// delivered, and invoked to deliver it.
pub trait CpuIntercept {
    /// Whether the CPU is structurally able to take an interrupt (not inside an exception
    /// handler, interrupts not globally disabled in processor state).
    fn interrupts_structurally_enabled(&self) -> bool;

    /// Delivers an interrupt exception carrying the given unmasked-pending cause bits.
    fn raise_exception(&mut self, cause: u32);
}

/// Cause/mask/master-enable state for one processor's interrupt controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Intc {
    cause: u32,
    mask: u32,
    master_enable: bool,
}

impl Intc {
    pub const fn new() -> Self {
        Self {
            cause: 0,
            mask: 0,
            master_enable: true,
        }
    }

    #[inline]
    pub const fn cause(&self) -> u32 {
        self.cause
    }

    #[inline]
    pub const fn mask(&self) -> u32 {
        self.mask
    }

    #[inline]
    pub const fn master_enabled(&self) -> bool {
        self.master_enable
    }

    /// Latches the given cause line pending. The caller is responsible for following every
    /// mutation with [`Intc::evaluate`]; a newly raised line must be able to interrupt the CPU
    /// between scheduled wake-ups, not just at the next event test.
    #[inline]
    pub fn raise(&mut self, line: u8) {
        debug_assert!(line < 32);
        self.cause |= 1 << line;
    }

    /// Clears the given pending cause bits (acknowledge write from the guest).
    #[inline]
    pub fn acknowledge(&mut self, lines: u32) {
        self.cause &= !lines;
    }

    #[inline]
    pub fn set_mask(&mut self, mask: u32) {
        self.mask = mask;
    }

    #[inline]
    pub fn set_master_enable(&mut self, enabled: bool) {
        self.master_enable = enabled;
    }

    /// Whether an unmasked cause bit is pending with the controller-side enables open.
    #[inline]
    pub const fn pending(&self) -> bool {
        self.master_enable && (self.cause & self.mask) != 0
    }

    /// Delivers a pending interrupt to the CPU if the controller and the CPU both allow it.
    ///
    /// Called after every mutation of cause/mask/master-enable (edge trigger) and from the
    /// periodic event test (level check); both call sites are required for a masked-then-unmasked
    /// line to fire promptly.
    pub fn evaluate(&self, cpu: &mut dyn CpuIntercept) {
        if self.pending() && cpu.interrupts_structurally_enabled() {
            cpu.raise_exception(self.cause & self.mask);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub const fn save_state(&self) -> IntcState {
        IntcState {
            cause: self.cause,
            mask: self.mask,
            master_enable: self.master_enable,
        }
    }

    #[inline]
    pub fn restore_state(&mut self, state: IntcState) {
        self.cause = state.cause;
        self.mask = state.mask;
        self.master_enable = state.master_enable;
    }
}

impl Default for Intc {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntcState {
    pub cause: u32,
    pub mask: u32,
    pub master_enable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

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

    #[test]
    fn masked_line_does_not_deliver() {
        let mut cpu = TestCpu {
            enabled: true,
            ..Default::default()
        };
        let mut intc = Intc::new();
        intc.raise(4);
        intc.evaluate(&mut cpu);
        assert_eq!(cpu.raised, Vec::<u32>::new());

        intc.set_mask(1 << 4);
        intc.evaluate(&mut cpu);
        assert_eq!(cpu.raised, vec![1 << 4]);
    }

    #[test]
    fn structural_disable_blocks_delivery() {
        let mut cpu = TestCpu::default();
        let mut intc = Intc::new();
        intc.set_mask(!0);
        intc.raise(0);
        intc.evaluate(&mut cpu);
        assert!(cpu.raised.is_empty());

        cpu.enabled = true;
        intc.evaluate(&mut cpu);
        assert_eq!(cpu.raised, vec![1]);
    }

    #[test]
    fn master_enable_gates_pending() {
        let mut intc = Intc::new();
        intc.set_mask(!0);
        intc.raise(7);
        assert!(intc.pending());
        intc.set_master_enable(false);
        assert!(!intc.pending());
    }

    #[test]
    fn acknowledge_clears_only_named_lines() {
        let mut intc = Intc::new();
        intc.raise(1);
        intc.raise(9);
        intc.acknowledge(1 << 1);
        assert_eq!(intc.cause(), 1 << 9);
    }
}
