//! The ARM CoreSight DAP + APB collaborator this crate consumes.
//!
//! The PIC32 engine never touches this; only the STM32 flash driver does.
//! Nothing here drives SWD/JTAG wire protocol directly -- that, like the
//! physical adapter, is out of scope. `ArmDebugPort` is the boundary: an
//! implementation that already knows how to do word-sized memory access
//! through AP/CSW/TAR/DRW and how to enumerate Cortex-M debug targets.

use crate::error::Result;

/// A CPU core register, as addressed by the ARM debug architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreRegister {
    /// General-purpose register rN.
    R(u8),
    /// Program counter.
    Pc,
    /// Stack pointer.
    Sp,
    /// Link register.
    Lr,
    /// Program status register.
    Xpsr,
}

/// A single Cortex-M debug target reachable through an [`ArmDebugPort`].
///
/// Every read may fail; `STM32Device` treats such a failure as evidence of
/// read protection rather than a fatal condition (spec.md section 4.5/7).
pub trait CortexMTarget {
    /// Reads a CPU core register. Requires the core to be halted.
    fn read_cpu_register(&mut self, register: CoreRegister) -> Result<u32>;

    /// Reads a 32-bit word from this target's memory map.
    fn read_memory(&mut self, address: u32) -> Result<u32>;

    /// Writes a 32-bit word to this target's memory map.
    fn write_memory(&mut self, address: u32, value: u32) -> Result<()>;

    /// Halts the core for debug.
    fn debug_halt(&mut self) -> Result<()>;

    /// Resumes the core from a debug halt.
    fn debug_resume(&mut self) -> Result<()>;

    /// Issues a core/system reset.
    fn reset(&mut self) -> Result<()>;

    /// Formats the current register file for display. Returns a string
    /// rather than writing to a log backend, so callers decide where it
    /// goes.
    fn print_registers(&mut self) -> Result<String>;
}

/// The ARM CoreSight Debug Access Port plus APB bridge, as consumed by
/// vendor drivers that sit behind an ARM DAP TAP (currently just STM32).
pub trait ArmDebugPort {
    /// Reads a 32-bit word from the target's memory-mapped address space.
    fn read_memory(&mut self, address: u32) -> Result<u32>;

    /// Writes a 32-bit word to the target's memory-mapped address space.
    fn write_memory(&mut self, address: u32, value: u32) -> Result<()>;

    /// The number of Cortex-M debug targets reachable through this DAP.
    fn num_targets(&self) -> usize;

    /// Returns the `i`th debug target.
    fn target(&mut self, index: usize) -> Option<&mut dyn CortexMTarget>;
}
