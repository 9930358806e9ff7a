//! Capability facets queryable on any classified device.
//!
//! The original tool used RTTI-style `dynamic_cast` to ask "is this a
//! programmable device? a lockable one?". Per the design note in spec.md
//! section 9, that's flattened here into a declarative [`Capabilities`]
//! bitset plus a handful of narrow traits that a concrete device opts into;
//! callers query membership with [`Capabilities::contains`] and then use the
//! matching `as_*` accessor on [`crate::factory::Device`] to get a trait
//! object, instead of pointer-cast introspection.

use crate::error::Result;
use crate::interface::JtagInterface;
use crate::uncertain::UncertainBoolean;

/// Bitset of capability facets a device may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Supports [`ProgrammableDevice`].
    pub const PROGRAMMABLE: Capabilities = Capabilities(1 << 0);
    /// Supports [`SerialNumberedDevice`].
    pub const SERIAL_NUMBERED: Capabilities = Capabilities(1 << 1);
    /// Supports [`LockableDevice`].
    pub const LOCKABLE: Capabilities = Capabilities(1 << 2);
    /// Supports [`DebuggerInterface`].
    pub const DEBUGGER: Capabilities = Capabilities(1 << 3);
    /// Supports [`Fpga`].
    pub const FPGA: Capabilities = Capabilities(1 << 4);
    /// Supports [`Cpld`].
    pub const CPLD: Capabilities = Capabilities(1 << 5);

    /// The empty set.
    pub const fn empty() -> Self {
        Capabilities(0)
    }

    /// Whether `self` contains every bit set in `other`.
    pub const fn contains(self, other: Capabilities) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Returns the union of `self` and `other`.
    pub const fn with(self, other: Capabilities) -> Self {
        Capabilities(self.0 | other.0)
    }
}

/// A device that accepts firmware images and can be erased, programmed and
/// blank-checked.
///
/// Every method takes the [`JtagInterface`] it scans through explicitly --
/// devices don't own the adapter (spec.md section 5), so the capability
/// traits can't either.
pub trait ProgrammableDevice {
    /// Whether the device currently holds a non-blank program.
    fn is_programmed(&mut self, iface: &mut dyn JtagInterface) -> Result<bool>;

    /// Mass-erases the device's nonvolatile memory.
    fn erase(&mut self, iface: &mut dyn JtagInterface) -> Result<()>;

    /// Checks whether nonvolatile memory reads back as fully erased.
    fn blank_check(&mut self, iface: &mut dyn JtagInterface) -> Result<bool>;

    /// Programs `image` to nonvolatile memory.
    fn program(
        &mut self,
        iface: &mut dyn JtagInterface,
        image: &crate::firmware::FirmwareImage,
    ) -> Result<()>;
}

/// A device that carries a factory-programmed, per-die serial number.
pub trait SerialNumberedDevice {
    /// Length of the serial number in bytes.
    fn serial_number_len(&self) -> usize;

    /// Length of the serial number in bits.
    fn serial_number_len_bits(&self) -> usize {
        self.serial_number_len() * 8
    }

    /// Whether reading the serial number requires resetting the device
    /// first -- if so, and the device [`ProgrammableDevice::is_programmed`],
    /// `PrintInfo` must skip the read rather than disturb running code.
    fn reading_serial_requires_reset(&self) -> bool;

    /// Raw serial number bytes.
    fn serial_number(&mut self, iface: &mut dyn JtagInterface) -> Result<Vec<u8>>;

    /// A human-readable rendering of the serial number.
    fn pretty_serial_number(&mut self, iface: &mut dyn JtagInterface) -> Result<String>;
}

/// A device with a probe-able read/write protection scheme.
pub trait LockableDevice {
    /// Whether the device currently refuses to let the debugger read its
    /// memory contents.
    fn is_read_locked(&mut self, iface: &mut dyn JtagInterface) -> UncertainBoolean;

    /// Engages the read lock. On some parts this is effectively
    /// irreversible without a mass erase.
    fn set_read_lock(&mut self, iface: &mut dyn JtagInterface) -> Result<()>;

    /// Disengages the read lock. On some parts this triggers an implicit
    /// mass erase as a side effect.
    fn clear_read_lock(&mut self, iface: &mut dyn JtagInterface) -> Result<()>;
}

/// A device exposing CPU-level debug control.
pub trait DebuggerInterface {
    /// Halts the CPU for debug.
    fn debug_halt(&mut self, iface: &mut dyn JtagInterface) -> Result<()>;

    /// Resumes the CPU from a debug halt.
    fn debug_resume(&mut self, iface: &mut dyn JtagInterface) -> Result<()>;

    /// Issues a CPU/system reset.
    fn reset(&mut self, iface: &mut dyn JtagInterface) -> Result<()>;

    /// Formats the current CPU register file for display.
    fn print_registers(&mut self, iface: &mut dyn JtagInterface) -> Result<String>;
}

/// Formats a serial-numbered device's serial number for display, honoring
/// spec section 4.3's skip rule: a device that needs a reset to read its
/// serial number must not have that read attempted while it's programmed
/// (and presumably running) -- only the length is reported instead.
pub fn format_serial_number(
    device: &mut dyn SerialNumberedDevice,
    iface: &mut dyn JtagInterface,
    is_programmed: bool,
) -> Result<String> {
    if device.reading_serial_requires_reset() && is_programmed {
        return Ok(format!(
            "{} bytes (read skipped -- device is running)",
            device.serial_number_len()
        ));
    }
    device.pretty_serial_number(iface)
}

/// An FPGA device. VID/PID user registers may only be read while the device
/// is unprogrammed -- reading them on a configured part can be destructive.
pub trait Fpga {
    /// Reads the user-defined VID/PID registers. Callers must not invoke
    /// this on a programmed (configured) device.
    fn read_user_vid_pid(&mut self, iface: &mut dyn JtagInterface) -> Result<(u32, u32)>;
}

/// A CPLD device. No CPLD family is implemented by this crate; the trait
/// exists so the capability set is complete and future drivers have
/// somewhere to plug in.
pub trait Cpld {}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSerialDevice {
        requires_reset: bool,
    }

    impl SerialNumberedDevice for FakeSerialDevice {
        fn serial_number_len(&self) -> usize {
            4
        }

        fn reading_serial_requires_reset(&self) -> bool {
            self.requires_reset
        }

        fn serial_number(&mut self, _iface: &mut dyn JtagInterface) -> Result<Vec<u8>> {
            Ok(vec![1, 2, 3, 4])
        }

        fn pretty_serial_number(&mut self, _iface: &mut dyn JtagInterface) -> Result<String> {
            Ok("01020304".to_string())
        }
    }

    #[test]
    fn serial_read_is_skipped_while_running_if_reset_is_required() {
        let mut device = FakeSerialDevice { requires_reset: true };
        let mut iface = crate::test_support::MockJtagInterface::new();
        let report = format_serial_number(&mut device, &mut iface, true).unwrap();
        assert!(report.contains("skipped"));
        assert!(report.contains('4'));
    }

    #[test]
    fn serial_read_proceeds_when_device_is_not_programmed() {
        let mut device = FakeSerialDevice { requires_reset: true };
        let mut iface = crate::test_support::MockJtagInterface::new();
        let report = format_serial_number(&mut device, &mut iface, false).unwrap();
        assert_eq!(report, "01020304");
    }

    #[test]
    fn serial_read_proceeds_when_reset_is_not_required() {
        let mut device = FakeSerialDevice { requires_reset: false };
        let mut iface = crate::test_support::MockJtagInterface::new();
        let report = format_serial_number(&mut device, &mut iface, true).unwrap();
        assert_eq!(report, "01020304");
    }
}
