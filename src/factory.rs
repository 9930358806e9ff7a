//! IDCODE -> vendor -> concrete device dispatch.
//!
//! Mirrors `JtagDevice::CreateDevice`'s manufacturer switch: a TAP whose
//! manufacturer or part isn't recognized produces a logged warning and `None`,
//! never a hard failure -- one unrecognized TAP must not prevent using the
//! rest of the chain. Only a recognized-but-malformed device (e.g. a PIC32
//! construction that itself fails for a reason other than "part unknown")
//! propagates an error.

use tracing::warn;

use crate::capability::{
    format_serial_number, Capabilities, DebuggerInterface, LockableDevice, ProgrammableDevice,
    SerialNumberedDevice,
};
use crate::device::ChainPosition;
use crate::error::{Error, Result};
use crate::idcode::IdCode;
use crate::interface::JtagInterface;
use crate::pic32::Pic32Device;
use crate::stm32::Stm32Device;
use crate::vendor;

/// JEDEC manufacturer field values this crate knows how to dispatch on.
pub mod manufacturer {
    /// ARM Ltd.
    pub const ARM: u16 = 0x23B;
    /// Freescale Semiconductor.
    pub const FREESCALE: u16 = 0x01B;
    /// Microchip Technology.
    pub const MICROCHIP: u16 = 0x029;
    /// Philips Semiconductors (now NXP).
    pub const PHILIPS: u16 = 0x015;
    /// STMicroelectronics.
    pub const STMICRO: u16 = 0x020;
    /// Xilinx.
    pub const XILINX: u16 = 0x049;
}

/// A classified device, tagged by which vendor driver backs it.
///
/// This replaces the original tool's deep class hierarchy
/// (`JtagDevice` -> vendor -> family -> part, with capability mixins via
/// multiple inheritance) with a flat tagged union plus a
/// [`Capabilities`] bitset callers can query before reaching for one of the
/// `as_*` accessors.
pub enum Device {
    /// A Microchip PIC32 microcontroller.
    Pic32(Pic32Device),
    /// An STMicroelectronics STM32 microcontroller.
    Stm32(Stm32Device),
}

impl Device {
    /// The capability facets this device exposes.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Device::Pic32(_) => Capabilities::PROGRAMMABLE,
            Device::Stm32(_) => Capabilities::PROGRAMMABLE
                .with(Capabilities::LOCKABLE)
                .with(Capabilities::SERIAL_NUMBERED)
                .with(Capabilities::DEBUGGER),
        }
    }

    /// A short human-readable summary, as `PrintInfo` assembles for display.
    pub fn describe(&self) -> String {
        match self {
            Device::Pic32(d) => d.describe(),
            Device::Stm32(d) => d.describe(),
        }
    }

    /// This device as a [`ProgrammableDevice`], if it is one.
    pub fn as_programmable(&mut self) -> Option<&mut dyn ProgrammableDevice> {
        match self {
            Device::Pic32(d) => Some(d),
            Device::Stm32(d) => Some(d),
        }
    }

    /// This device as a [`LockableDevice`], if it is one.
    pub fn as_lockable(&mut self) -> Option<&mut dyn LockableDevice> {
        match self {
            Device::Pic32(_) => None,
            Device::Stm32(d) => Some(d),
        }
    }

    /// This device as a [`SerialNumberedDevice`], if it is one.
    pub fn as_serial_numbered(&mut self) -> Option<&mut dyn SerialNumberedDevice> {
        match self {
            Device::Pic32(_) => None,
            Device::Stm32(d) => Some(d),
        }
    }

    /// This device as a [`DebuggerInterface`], if it is one.
    pub fn as_debugger(&mut self) -> Option<&mut dyn DebuggerInterface> {
        match self {
            Device::Pic32(_) => None,
            Device::Stm32(d) => Some(d),
        }
    }

    /// Assembles a `PrintInfo`-style report, querying whichever capability
    /// facets this device exposes in the same order the original tool did:
    /// programmable, FPGA, CPLD, debugger, serial-numbered, lockable. No
    /// concrete device implements [`crate::capability::Fpga`] or
    /// [`crate::capability::Cpld`] yet, so those facets never contribute a
    /// line, but the ordering still reserves their place.
    pub fn print_info(&mut self, iface: &mut dyn JtagInterface) -> Result<String> {
        let mut out = format!("{}\n", self.describe());

        let is_programmed = if let Some(programmable) = self.as_programmable() {
            let programmed = programmable.is_programmed(iface)?;
            out.push_str(&format!("Programmed: {programmed}\n"));
            programmed
        } else {
            false
        };

        if let Some(debugger) = self.as_debugger() {
            out.push_str(&debugger.print_registers(iface)?);
            out.push('\n');
        }

        if let Some(serial) = self.as_serial_numbered() {
            let report = format_serial_number(serial, iface, is_programmed)?;
            out.push_str(&format!("Serial number: {report}\n"));
        }

        if let Some(lockable) = self.as_lockable() {
            let locked = lockable.is_read_locked(iface);
            out.push_str(&format!(
                "Read locked: {} ({:?})\n",
                locked.value(),
                locked.certainty()
            ));
        }

        Ok(out)
    }
}

/// Classifies a TAP discovered at `chain_index` with `ir_length`-bit
/// instruction register, from its 32-bit IDCODE.
///
/// Returns `Ok(None)` for a manufacturer this crate doesn't implement a
/// driver for (Freescale, Philips, Xilinx, or an unrecognized ID entirely)
/// and for a recognized-manufacturer part this crate doesn't classify (a
/// non-PIC32 Microchip part). Only recognized-and-implemented devices that
/// themselves fail to construct (e.g. an STM32 boundary-scan TAP found at
/// chain position 0) propagate an error.
pub fn create_device(
    idcode: IdCode,
    chain_index: ChainPosition,
    ir_length: usize,
) -> Result<Option<Device>> {
    match idcode.manufacturer() {
        manufacturer::ARM => {
            // The ARM DAP itself isn't a device this crate classifies: it's
            // supplied to STM32 boundary-scan TAPs as a collaborator via
            // `JtagInterface::get_arm_dap`, already implemented by whatever
            // adapter sits underneath. There's nothing further to construct
            // here.
            Ok(None)
        }
        manufacturer::FREESCALE => {
            vendor::freescale_create_device(idcode);
            Ok(None)
        }
        manufacturer::MICROCHIP => match Pic32Device::new(idcode, chain_index, ir_length) {
            Ok(device) => Ok(Some(Device::Pic32(device))),
            Err(Error::UnknownPic32Device(devid)) => {
                warn!(devid = format_args!("{devid:#010x}"), "unrecognized Microchip device, not a known PIC32 part");
                Ok(None)
            }
            Err(other) => Err(other),
        },
        manufacturer::PHILIPS => {
            vendor::philips_create_device(idcode);
            Ok(None)
        }
        manufacturer::STMICRO => {
            Ok(Some(Device::Stm32(Stm32Device::new(idcode, chain_index, ir_length)?)))
        }
        manufacturer::XILINX => {
            vendor::xilinx_create_device(idcode);
            Ok(None)
        }
        other => {
            warn!(manufacturer = format_args!("{other:#05x}"), raw = format_args!("{:#010x}", idcode.raw()), "manufacturer ID not recognized");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idcode_for(manufacturer: u16, part: u16) -> IdCode {
        IdCode::new((2u32 << 28) | ((part as u32) << 12) | ((manufacturer as u32) << 1) | 1)
    }

    #[test]
    fn unknown_manufacturer_is_not_fatal() {
        let idcode = idcode_for(0x7FF, 0x1234);
        let device = create_device(idcode, 0, 5).unwrap();
        assert!(device.is_none());
    }

    #[test]
    fn freescale_stub_is_not_fatal() {
        let idcode = idcode_for(manufacturer::FREESCALE, 0x1234);
        let device = create_device(idcode, 0, 5).unwrap();
        assert!(device.is_none());
    }

    #[test]
    fn stm32_dispatches_by_part_number() {
        // part 0x0431 = F411E, see Stm32Model::from_part_number
        let idcode = idcode_for(manufacturer::STMICRO, 0x0431);
        let device = create_device(idcode, 1, 5).unwrap().unwrap();
        assert!(matches!(device, Device::Stm32(_)));
    }

    #[test]
    fn stm32_at_chain_position_zero_propagates_error() {
        let idcode = idcode_for(manufacturer::STMICRO, 0x0431);
        let err = create_device(idcode, 0, 5).unwrap_err();
        assert!(matches!(err, Error::Stm32MustNotBeFirst));
    }

    #[test]
    fn unrecognized_pic32_devid_is_not_fatal() {
        let idcode = idcode_for(manufacturer::MICROCHIP, 0x1234);
        let device = create_device(idcode, 0, 5).unwrap();
        assert!(device.is_none());
    }

    struct StubCortex;

    impl crate::arm::CortexMTarget for StubCortex {
        fn read_cpu_register(&mut self, _register: crate::arm::CoreRegister) -> Result<u32> {
            Ok(0)
        }

        fn read_memory(&mut self, _address: u32) -> Result<u32> {
            Ok(0xFFFF_FFFF)
        }

        fn write_memory(&mut self, _address: u32, _value: u32) -> Result<()> {
            Ok(())
        }

        fn debug_halt(&mut self) -> Result<()> {
            Ok(())
        }

        fn debug_resume(&mut self) -> Result<()> {
            Ok(())
        }

        fn reset(&mut self) -> Result<()> {
            Ok(())
        }

        fn print_registers(&mut self) -> Result<String> {
            Ok("r0=00000000".to_string())
        }
    }

    struct StubDap {
        cortex: StubCortex,
    }

    impl crate::arm::ArmDebugPort for StubDap {
        fn read_memory(&mut self, _address: u32) -> Result<u32> {
            Ok(0xFFFF_FFFF)
        }

        fn write_memory(&mut self, _address: u32, _value: u32) -> Result<()> {
            Ok(())
        }

        fn num_targets(&self) -> usize {
            1
        }

        fn target(&mut self, index: usize) -> Option<&mut dyn crate::arm::CortexMTarget> {
            if index == 0 {
                Some(&mut self.cortex)
            } else {
                None
            }
        }
    }

    #[test]
    fn print_info_enumerates_every_facet_in_order() {
        let idcode = idcode_for(manufacturer::STMICRO, 0x0431);
        let mut device = create_device(idcode, 1, 5).unwrap().unwrap();

        let mut iface = crate::test_support::MockJtagInterface::new();
        iface.register_arm_dap(0, Box::new(StubDap { cortex: StubCortex }));

        let report = device.print_info(&mut iface).unwrap();

        let programmed_at = report.find("Programmed:").expect("missing programmed line");
        let registers_at = report.find("r0=").expect("missing register dump");
        let serial_at = report.find("Serial number:").expect("missing serial number line");
        let locked_at = report.find("Read locked:").expect("missing read-locked line");
        assert!(programmed_at < registers_at);
        assert!(registers_at < serial_at);
        assert!(serial_at < locked_at);
    }
}
