//! The boundary to the physical JTAG adapter.
//!
//! `JtagInterface` is consumed, never implemented, by this crate's devices:
//! it abstracts TCK/TMS/TDI/TDO pin wiggling and the USB (or other)
//! transport underneath. Every method takes the chain index of the TAP the
//! scan targets; the interface is responsible for padding every other TAP
//! in the chain with BYPASS bits.

use crate::arm::ArmDebugPort;
use crate::error::Result;

/// TAP-level scan primitives plus deferred/committed scheduling, as
/// consumed by [`crate::device::JtagDevice`].
///
/// All operations on one chain are totally ordered (spec.md section 5):
/// deferred scans queued with the `*Deferred` methods must be flushed by
/// [`JtagInterface::commit`] before a subsequent read whose correctness
/// depends on them.
pub trait JtagInterface {
    /// Shifts `n_bits` of `data` into the IR of the TAP at `tap_index`,
    /// discarding the capture.
    fn set_ir(&mut self, tap_index: usize, data: &[u8], n_bits: usize) -> Result<()>;

    /// Like [`Self::set_ir`], but the interface may defer the actual
    /// hardware transaction until the next [`Self::commit`].
    fn set_ir_deferred(&mut self, tap_index: usize, data: &[u8], n_bits: usize) -> Result<()>;

    /// Shifts `n_bits` of `data` into the IR of the TAP at `tap_index`,
    /// capturing the previous IR contents into `out`. Never deferred: the
    /// caller needs the capture immediately.
    fn set_ir_captured(
        &mut self,
        tap_index: usize,
        data: &[u8],
        out: &mut [u8],
        n_bits: usize,
    ) -> Result<()>;

    /// Shifts `n_bits` of `send` into the DR of the TAP at `tap_index`,
    /// capturing the result into `recv`.
    fn scan_dr(
        &mut self,
        tap_index: usize,
        send: &[u8],
        recv: &mut [u8],
        n_bits: usize,
    ) -> Result<()>;

    /// Like [`Self::scan_dr`], but the interface may defer the actual
    /// hardware transaction until the next [`Self::commit`].
    fn scan_dr_deferred(&mut self, tap_index: usize, send: &[u8], n_bits: usize) -> Result<()>;

    /// Whether this interface can scan the write half and read half of a DR
    /// shift as two separate calls (some transports pipeline this for
    /// throughput).
    fn is_split_scan_supported(&self) -> bool;

    /// Write half of a split DR scan. Only valid if
    /// [`Self::is_split_scan_supported`] is `true`.
    fn scan_dr_split_write(&mut self, tap_index: usize, send: &[u8], n_bits: usize) -> Result<()>;

    /// Read half of a split DR scan. Only valid if
    /// [`Self::is_split_scan_supported`] is `true`.
    fn scan_dr_split_read(&mut self, tap_index: usize, recv: &mut [u8], n_bits: usize)
        -> Result<()>;

    /// Shifts raw data through the currently-selected register without
    /// changing TAP state, used by protocols that need to stream bits
    /// outside the IR/DR abstraction.
    fn shift_data(
        &mut self,
        tap_index: usize,
        send: &[u8],
        recv: &mut [u8],
        n_bits: usize,
    ) -> Result<()>;

    /// Clocks `n` dummy TCK cycles with TMS low.
    fn send_dummy_clocks(&mut self, tap_index: usize, n: usize) -> Result<()>;

    /// Like [`Self::send_dummy_clocks`], deferred until the next
    /// [`Self::commit`].
    fn send_dummy_clocks_deferred(&mut self, tap_index: usize, n: usize) -> Result<()>;

    /// Drives the TAP state machine back to Run-Test/Idle.
    fn reset_to_idle(&mut self, tap_index: usize) -> Result<()>;

    /// Drives the TAP state machine into Shift-DR, ready for
    /// [`Self::shift_data`].
    fn enter_shift_dr(&mut self, tap_index: usize) -> Result<()>;

    /// Flushes any scans queued by the `*Deferred` methods to hardware.
    fn commit(&mut self) -> Result<()>;

    /// Returns the ARM debug access port discovered at `index`, if any --
    /// used by devices that need a collaborator at a specific chain
    /// position (an STM32 boundary-scan TAP looking up the ARM DAP
    /// immediately before it).
    fn get_arm_dap(&mut self, index: usize) -> Option<&mut dyn ArmDebugPort>;
}
