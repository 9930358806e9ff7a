//! The classified PIC32 device: common TAP state plus the static table row
//! identifying the part, wired up to [`ProgrammableDevice`].

use std::thread::sleep;
use std::time::Duration;

use tracing::{debug, info};

use crate::capability::ProgrammableDevice;
use crate::device::{ChainPosition, JtagDevice};
use crate::error::{fmt_kib, Error, Result};
use crate::firmware::FirmwareImage;
use crate::idcode::IdCode;
use crate::interface::JtagInterface;

use super::engine;
use super::{lookup, Pic32DeviceInfo};

const BOOT_FLASH_BASE: u32 = 0xBFC0_0000;
const PROGRAM_FLASH_BASE: u32 = 0xBD00_0000;
const ERASE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A PIC32 microcontroller reached through its MIPS EJTAG/MTAP TAP.
pub struct Pic32Device {
    tap: JtagDevice,
    devinfo: &'static Pic32DeviceInfo,
}

impl Pic32Device {
    /// Classifies a PIC32 device from its 32-bit device ID, looking up the
    /// static table for SRAM/flash geometry. Fails if `devid` isn't listed.
    pub fn new(idcode: IdCode, chain_index: ChainPosition, ir_length: usize) -> Result<Self> {
        let devid = idcode.raw();
        let devinfo = lookup(devid).ok_or(Error::UnknownPic32Device(devid))?;
        Ok(Self {
            tap: JtagDevice::new(idcode, chain_index, ir_length),
            devinfo,
        })
    }

    /// The static table row this device was classified against.
    pub fn device_info(&self) -> &'static Pic32DeviceInfo {
        self.devinfo
    }

    /// A short human-readable summary, as `PrintInfo` assembles for display.
    pub fn describe(&self) -> String {
        format!(
            "Microchip {} ({} KB SRAM, {} KB code flash, {} boot flash)",
            self.devinfo.name,
            self.devinfo.sram_kb,
            self.devinfo.program_flash_kb,
            fmt_kib(self.devinfo.boot_flash_kb)
        )
    }

    /// Runs the chain-dependent post-discovery probe: resets both TAPs into
    /// a known mode so later operations start from MCHP mode.
    pub fn post_init_probes(&mut self, iface: &mut dyn JtagInterface) -> Result<()> {
        engine::enter_mtap_mode(&mut self.tap, iface)?;
        engine::enter_ejtag_mode(&mut self.tap, iface)?;
        self.tap.reset_to_idle(iface)
    }

    /// Attempts a soft reset of the target CPU. The original tool never
    /// implemented this; neither does this crate.
    pub fn reset(&mut self, _iface: &mut dyn JtagInterface) -> Result<()> {
        Err(Error::NotImplemented {
            operation: "PIC32 soft reset",
        })
    }

    fn blank_check_region(
        &mut self,
        iface: &mut dyn JtagInterface,
        base: u32,
        len_kb: f32,
        label: &str,
    ) -> Result<bool> {
        let end = base + (len_kb * 1024.0) as u32;
        let mut ptr = base;
        while ptr < end {
            let value = engine::serial_execute_memory_read(&mut self.tap, iface, ptr)?;
            if value != 0xFFFF_FFFF {
                debug!(address = format_args!("{ptr:#010x}"), value, label, "non-blank word found");
                return Ok(false);
            }
            ptr += 4;
        }
        Ok(true)
    }
}

impl ProgrammableDevice for Pic32Device {
    /// Checks whether the device's reset vector is blank (erased). A
    /// cheaper substitute for a full blank check: an erased reset vector
    /// means the chip won't boot.
    fn is_programmed(&mut self, iface: &mut dyn JtagInterface) -> Result<bool> {
        self.tap.reset_to_idle(iface)?;
        engine::enter_serial_exec_mode(&mut self.tap, iface)?;
        let vector = engine::serial_execute_memory_read(&mut self.tap, iface, BOOT_FLASH_BASE)?;
        Ok(vector != 0xFFFF_FFFF)
    }

    /// Bulk-erases the device, then blank-checks both the boot and program
    /// flash regions.
    fn erase(&mut self, iface: &mut dyn JtagInterface) -> Result<()> {
        info!(part = self.devinfo.name, "bulk erasing PIC32 device");

        engine::enter_mtap_mode(&mut self.tap, iface)?;
        engine::send_mchp_command(&mut self.tap, iface, engine::MCHP_ERASE)?;
        engine::send_mchp_command(&mut self.tap, iface, engine::MCHP_DE_ASSERT_RST)?;

        loop {
            let status = engine::get_status(&mut self.tap, iface)?;
            if !status.flash_busy() && status.cfg_rdy() {
                break;
            }
            sleep(ERASE_POLL_INTERVAL);
        }

        self.tap.reset_to_idle(iface)?;
        engine::enter_serial_exec_mode(&mut self.tap, iface)?;

        if !self.blank_check_region(iface, BOOT_FLASH_BASE, self.devinfo.boot_flash_kb, "boot")? {
            return Ok(());
        }
        self.blank_check_region(
            iface,
            PROGRAM_FLASH_BASE,
            self.devinfo.program_flash_kb as f32,
            "program",
        )?;
        Ok(())
    }

    /// Blank-checks both flash regions without erasing first.
    fn blank_check(&mut self, iface: &mut dyn JtagInterface) -> Result<bool> {
        self.tap.reset_to_idle(iface)?;
        engine::enter_serial_exec_mode(&mut self.tap, iface)?;
        let boot_blank =
            self.blank_check_region(iface, BOOT_FLASH_BASE, self.devinfo.boot_flash_kb, "boot")?;
        if !boot_blank {
            return Ok(false);
        }
        self.blank_check_region(
            iface,
            PROGRAM_FLASH_BASE,
            self.devinfo.program_flash_kb as f32,
            "program",
        )
    }

    fn program(&mut self, _iface: &mut dyn JtagInterface, _image: &FirmwareImage) -> Result<()> {
        Err(Error::NotImplemented {
            operation: "PIC32 flash programming",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockJtagInterface;

    fn make_device() -> Pic32Device {
        let devinfo = &super::super::PIC32_DEVICES[0];
        Pic32Device::new(IdCode::new(devinfo.devid), 0, 5).unwrap()
    }

    #[test]
    fn unknown_devid_is_rejected() {
        let err = Pic32Device::new(IdCode::new(0xFFFF_FFFF), 0, 5).unwrap_err();
        assert!(matches!(err, Error::UnknownPic32Device(_)));
    }

    #[test]
    fn reset_is_not_implemented() {
        let mut dev = make_device();
        let mut iface = MockJtagInterface::new();
        let err = dev.reset(&mut iface).unwrap_err();
        assert!(matches!(
            err,
            Error::NotImplemented {
                operation: "PIC32 soft reset"
            }
        ));
    }

    #[test]
    fn program_is_not_implemented() {
        let mut dev = make_device();
        let mut iface = MockJtagInterface::new();
        let image = FirmwareImage::new(&[0u8; 4]);
        let err = ProgrammableDevice::program(&mut dev, &mut iface, &image).unwrap_err();
        assert!(matches!(err, Error::NotImplemented { .. }));
    }
}
