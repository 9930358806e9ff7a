//! The common state every TAP on the chain shares: its chain index, IR
//! length, IDCODE, and the IR shift cache.
//!
//! Vendor-specific devices (PIC32, STM32, ...) hold a [`JtagDevice`] by
//! composition rather than by inheritance -- the "deep inheritance" shape of
//! the original tool (`JtagDevice` -> vendor -> family -> part, with
//! multiple inheritance for capability mixins) is flattened here into
//! `Device = (CommonDeviceState, VendorDriver)`, per the design note in
//! spec.md section 9.

use crate::error::{Error, Result};
use crate::idcode::IdCode;
use crate::interface::JtagInterface;

/// A TAP's position in the scan chain. Index 0 is nearest TDO; it is
/// immutable once a device is constructed.
pub type ChainPosition = usize;

/// IR shift cache plus chain bookkeeping shared by every TAP.
///
/// All operations forward to the [`JtagInterface`] tagged with this
/// device's chain index; the interface pads every other TAP in the chain
/// with BYPASS bits.
pub struct JtagDevice {
    idcode: IdCode,
    chain_index: ChainPosition,
    ir_length: usize,
    /// Cached IR contents, up to 4 bytes (32 bits). Initialized to all-ones
    /// (JTAG BYPASS) per spec.md section 3.
    cached_ir: [u8; 4],
}

fn byte_count(n_bits: usize) -> usize {
    n_bits.div_ceil(8)
}

impl JtagDevice {
    /// Constructs the common device state. Does not touch the chain: any
    /// initialization that queries the chain belongs in a device's
    /// post-construction probe phase, run only once every TAP has been
    /// discovered and is correctly padding in BYPASS.
    pub fn new(idcode: IdCode, chain_index: ChainPosition, ir_length: usize) -> Self {
        Self {
            idcode,
            chain_index,
            ir_length,
            cached_ir: [0xFF; 4],
        }
    }

    /// The length of this device's instruction register, in bits.
    pub fn ir_length(&self) -> usize {
        self.ir_length
    }

    /// This device's position within the scan chain. Lower numbers are
    /// closer to TDO, higher closer to TDI.
    pub fn chain_index(&self) -> ChainPosition {
        self.chain_index
    }

    /// This device's 32-bit JEDEC IDCODE.
    pub fn idcode(&self) -> IdCode {
        self.idcode
    }

    fn check_cache(&self, data: &[u8], n_bits: usize) -> Result<bool> {
        if n_bits > 32 {
            return Err(Error::IrTooLong(n_bits));
        }
        let bytes = byte_count(n_bits);
        Ok(self.cached_ir[..bytes] == data[..bytes])
    }

    fn update_cache(&mut self, data: &[u8], n_bits: usize) {
        let bytes = byte_count(n_bits);
        self.cached_ir[..bytes].copy_from_slice(&data[..bytes]);
    }

    /// Shifts `data` into this device's IR using its cached length,
    /// suppressing the hardware transaction if the cache already holds
    /// these bits.
    pub fn set_ir(&mut self, iface: &mut dyn JtagInterface, data: &[u8]) -> Result<()> {
        self.set_ir_n(iface, data, self.ir_length)
    }

    /// Shifts `data` into this device's IR using an explicit bit count
    /// (used by PIC32/STM32 sub-protocols whose opcode width differs from
    /// the TAP's IR length is not the case here, but mirrors the original
    /// API taking an explicit `count`).
    pub fn set_ir_n(
        &mut self,
        iface: &mut dyn JtagInterface,
        data: &[u8],
        n_bits: usize,
    ) -> Result<()> {
        if self.check_cache(data, n_bits)? {
            return Ok(());
        }
        iface.set_ir(self.chain_index, data, n_bits)?;
        self.update_cache(data, n_bits);
        Ok(())
    }

    /// Deferred counterpart of [`Self::set_ir`]; may be cache-suppressed.
    /// Only suppressed below the full 32 bits -- a deferred scan at the
    /// 32-bit boundary may not round-trip identically, so it's always sent.
    pub fn set_ir_deferred(&mut self, iface: &mut dyn JtagInterface, data: &[u8]) -> Result<()> {
        let n_bits = self.ir_length;
        if n_bits < 32 && self.check_cache(data, n_bits)? {
            return Ok(());
        }
        iface.set_ir_deferred(self.chain_index, data, n_bits)?;
        self.update_cache(data, n_bits);
        Ok(())
    }

    /// Shifts `data` into this device's IR, capturing the previous IR
    /// contents into `out`. Never cache-suppressed: the caller needs the
    /// capture.
    pub fn set_ir_captured(
        &mut self,
        iface: &mut dyn JtagInterface,
        data: &[u8],
        out: &mut [u8],
    ) -> Result<()> {
        let n_bits = self.ir_length;
        if n_bits > 32 {
            return Err(Error::IrTooLong(n_bits));
        }
        iface.set_ir_captured(self.chain_index, data, out, n_bits)?;
        self.update_cache(data, n_bits);
        Ok(())
    }

    /// Shifts `send` into this device's DR, capturing the result into
    /// `recv`.
    pub fn scan_dr(
        &self,
        iface: &mut dyn JtagInterface,
        send: &[u8],
        recv: &mut [u8],
        n_bits: usize,
    ) -> Result<()> {
        iface.scan_dr(self.chain_index, send, recv, n_bits)
    }

    /// Deferred counterpart of [`Self::scan_dr`].
    pub fn scan_dr_deferred(
        &self,
        iface: &mut dyn JtagInterface,
        send: &[u8],
        n_bits: usize,
    ) -> Result<()> {
        iface.scan_dr_deferred(self.chain_index, send, n_bits)
    }

    /// Whether the interface supports split DR scans for this device.
    pub fn is_split_scan_supported(&self, iface: &dyn JtagInterface) -> bool {
        iface.is_split_scan_supported()
    }

    /// Write half of a split DR scan.
    pub fn scan_dr_split_write(
        &self,
        iface: &mut dyn JtagInterface,
        send: &[u8],
        n_bits: usize,
    ) -> Result<()> {
        iface.scan_dr_split_write(self.chain_index, send, n_bits)
    }

    /// Read half of a split DR scan.
    pub fn scan_dr_split_read(
        &self,
        iface: &mut dyn JtagInterface,
        recv: &mut [u8],
        n_bits: usize,
    ) -> Result<()> {
        iface.scan_dr_split_read(self.chain_index, recv, n_bits)
    }

    /// Shifts raw data without changing TAP state.
    pub fn shift_data(
        &self,
        iface: &mut dyn JtagInterface,
        send: &[u8],
        recv: &mut [u8],
        n_bits: usize,
    ) -> Result<()> {
        iface.shift_data(self.chain_index, send, recv, n_bits)
    }

    /// Clocks `n` dummy TCK cycles.
    pub fn send_dummy_clocks(&self, iface: &mut dyn JtagInterface, n: usize) -> Result<()> {
        iface.send_dummy_clocks(self.chain_index, n)
    }

    /// Deferred counterpart of [`Self::send_dummy_clocks`].
    pub fn send_dummy_clocks_deferred(
        &self,
        iface: &mut dyn JtagInterface,
        n: usize,
    ) -> Result<()> {
        iface.send_dummy_clocks_deferred(self.chain_index, n)
    }

    /// Drives this TAP's state machine back to Run-Test/Idle.
    pub fn reset_to_idle(&self, iface: &mut dyn JtagInterface) -> Result<()> {
        iface.reset_to_idle(self.chain_index)
    }

    /// Drives this TAP's state machine into Shift-DR.
    pub fn enter_shift_dr(&self, iface: &mut dyn JtagInterface) -> Result<()> {
        iface.enter_shift_dr(self.chain_index)
    }

    /// Flushes any scans deferred against this interface.
    pub fn commit(&self, iface: &mut dyn JtagInterface) -> Result<()> {
        iface.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockJtagInterface;

    #[test]
    fn ir_cache_suppresses_identical_short_ir() {
        let mut iface = MockJtagInterface::new();
        let mut dev = JtagDevice::new(IdCode::new(0x4BA0_0477), 0, 5);
        dev.set_ir(&mut iface, &[0b0000_0100]).unwrap();
        dev.set_ir(&mut iface, &[0b0000_0100]).unwrap();
        assert_eq!(iface.ir_transaction_count(), 1);
    }

    #[test]
    fn set_ir_captured_is_never_suppressed() {
        let mut iface = MockJtagInterface::new();
        let mut dev = JtagDevice::new(IdCode::new(0x4BA0_0477), 0, 5);
        let mut out = [0u8; 1];
        dev.set_ir_captured(&mut iface, &[0b0000_0100], &mut out)
            .unwrap();
        dev.set_ir_captured(&mut iface, &[0b0000_0100], &mut out)
            .unwrap();
        assert_eq!(iface.ir_transaction_count(), 2);
    }

    #[test]
    fn ir_too_long_is_rejected() {
        let mut iface = MockJtagInterface::new();
        let mut dev = JtagDevice::new(IdCode::new(0x4BA0_0477), 0, 40);
        let data = [0u8; 5];
        let err = dev.set_ir_n(&mut iface, &data, 40).unwrap_err();
        assert!(matches!(err, Error::IrTooLong(40)));
    }
}
