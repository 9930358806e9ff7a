//! The classified STM32 device: a boundary-scan TAP plus the ARM DAP
//! collaborator that does all the actual work.

use tracing::info;

use crate::arm::ArmDebugPort;
use crate::capability::{DebuggerInterface, LockableDevice, ProgrammableDevice, SerialNumberedDevice};
use crate::device::{ChainPosition, JtagDevice};
use crate::error::{Error, Result};
use crate::firmware::FirmwareImage;
use crate::idcode::IdCode;
use crate::interface::JtagInterface;
use crate::uncertain::{Certainty, UncertainBoolean};

use super::{flash, ProtectionLevel, Stm32InitInfo, Stm32Model, Stm32SerialNumber};
use super::{FLASH_MEMORY_BASE, SRAM_MEMORY_BASE};

/// An STM32 microcontroller reached through its boundary-scan TAP plus an
/// ARM DAP one chain position earlier.
pub struct Stm32Device {
    tap: JtagDevice,
    model: Option<Stm32Model>,
    init: Stm32InitInfo,
    protection_level: Option<ProtectionLevel>,
    flash_kb: u32,
    serial: Option<Stm32SerialNumber>,
}

impl Stm32Device {
    /// Classifies an STM32 boundary-scan TAP. Fails if constructed at chain
    /// position 0 -- the ARM DAP must precede it.
    pub fn new(idcode: IdCode, chain_index: ChainPosition, ir_length: usize) -> Result<Self> {
        if chain_index == 0 {
            return Err(Error::Stm32MustNotBeFirst);
        }
        let model = Stm32Model::from_part_number(idcode.part_number());
        let init = model.map(Stm32Model::init_info).unwrap_or(Stm32InitInfo {
            ram_kb: 0,
            flash_sfr_base: 0,
            unique_id_base: 0,
            flash_size_base: 0,
        });
        Ok(Self {
            tap: JtagDevice::new(idcode, chain_index, ir_length),
            model,
            init,
            protection_level: None,
            flash_kb: 0,
            serial: None,
        })
    }

    fn dap<'i>(&self, iface: &'i mut dyn JtagInterface) -> Result<&'i mut dyn ArmDebugPort> {
        let index = self.tap.chain_index() - 1;
        iface.get_arm_dap(index).ok_or(Error::MissingDap(index))
    }

    /// A short human-readable summary, as `PrintInfo` assembles for display.
    pub fn describe(&self) -> String {
        format!(
            "ST {} ({} KB SRAM, {} KB flash)",
            self.model.map(Stm32Model::name).unwrap_or("(unknown STM32)"),
            self.init.ram_kb,
            self.flash_kb
        )
    }

    /// Runs the chain-dependent post-discovery probe: finds the ARM DAP,
    /// probes the lock state, and (if unlocked) reads flash size and serial
    /// number. Pass `quiet = true` to skip all probing -- useful against a
    /// part that might be alarmed by unexpected SFR reads.
    pub fn post_init_probes(&mut self, iface: &mut dyn JtagInterface, quiet: bool) -> Result<()> {
        if quiet {
            self.protection_level = Some(ProtectionLevel::Unprobed);
            self.flash_kb = 0;
            self.serial = None;
            return Ok(());
        }

        self.probe_locks(iface);

        if !self.is_read_locked(iface).value() {
            let dap = self.dap(iface)?;
            match flash::read_flash_size_kb(dap, &self.init) {
                Ok(kb) => self.flash_kb = kb,
                Err(_) => {
                    self.flash_kb = 0;
                    flash::warn_read_failed("flash size register");
                }
            }

            let dap = self.dap(iface)?;
            match flash::read_serial_number(dap, &self.init) {
                Ok(serial) => self.serial = Some(serial),
                Err(_) => {
                    self.serial = None;
                    flash::warn_read_failed("factory unique ID");
                }
            }
        }

        Ok(())
    }

    fn probe_locks(&mut self, iface: &mut dyn JtagInterface) {
        if self.protection_level.is_some() {
            return;
        }
        let level = match self.dap(iface) {
            Ok(dap) => flash::probe_locks_nondestructive(dap, &self.init),
            Err(_) => ProtectionLevel::Level1,
        };
        self.protection_level = Some(level);
    }
}

impl ProgrammableDevice for Stm32Device {
    fn is_programmed(&mut self, iface: &mut dyn JtagInterface) -> Result<bool> {
        self.probe_locks(iface);
        if self.protection_level != Some(ProtectionLevel::Unlocked) {
            return Ok(true);
        }
        let dap = self.dap(iface)?;
        Ok(dap.read_memory(FLASH_MEMORY_BASE)? != 0xFFFF_FFFF)
    }

    fn erase(&mut self, iface: &mut dyn JtagInterface) -> Result<()> {
        info!(model = ?self.model, "erasing STM32 flash");
        let init = self.init;
        let dap = self.dap(iface)?;
        flash::erase(dap, &init)
    }

    fn blank_check(&mut self, iface: &mut dyn JtagInterface) -> Result<bool> {
        let flash_kb = self.flash_kb;
        let dap = self.dap(iface)?;
        flash::blank_check(dap, FLASH_MEMORY_BASE, flash_kb)
    }

    fn program(&mut self, iface: &mut dyn JtagInterface, image: &FirmwareImage) -> Result<()> {
        let init = self.init;
        let dap = self.dap(iface)?;
        flash::program(dap, &init, FLASH_MEMORY_BASE, image)
    }
}

impl LockableDevice for Stm32Device {
    fn is_read_locked(&mut self, iface: &mut dyn JtagInterface) -> UncertainBoolean {
        self.probe_locks(iface);
        match self.protection_level {
            Some(ProtectionLevel::Level2) => UncertainBoolean::new(true, Certainty::Certain),
            Some(ProtectionLevel::Unlocked) => UncertainBoolean::new(false, Certainty::Certain),
            Some(ProtectionLevel::Unprobed) => UncertainBoolean::new(true, Certainty::Useless),
            Some(ProtectionLevel::Level1) | None => {
                UncertainBoolean::new(true, Certainty::VeryLikely)
            }
        }
    }

    fn set_read_lock(&mut self, iface: &mut dyn JtagInterface) -> Result<()> {
        let init = self.init;
        let dap = self.dap(iface)?;
        flash::set_read_lock(dap, &init)?;
        self.protection_level = None;
        Ok(())
    }

    fn clear_read_lock(&mut self, iface: &mut dyn JtagInterface) -> Result<()> {
        let init = self.init;
        let dap = self.dap(iface)?;
        flash::clear_read_lock(dap, &init)?;
        self.protection_level = None;
        Ok(())
    }
}

impl SerialNumberedDevice for Stm32Device {
    fn serial_number_len(&self) -> usize {
        12
    }

    fn reading_serial_requires_reset(&self) -> bool {
        false
    }

    fn serial_number(&mut self, iface: &mut dyn JtagInterface) -> Result<Vec<u8>> {
        let init = self.init;
        let dap = self.dap(iface)?;
        Ok(flash::read_serial_number(dap, &init)?.raw_bytes().to_vec())
    }

    fn pretty_serial_number(&mut self, iface: &mut dyn JtagInterface) -> Result<String> {
        let init = self.init;
        let dap = self.dap(iface)?;
        Ok(flash::read_serial_number(dap, &init)?.to_string())
    }
}

impl DebuggerInterface for Stm32Device {
    fn debug_halt(&mut self, iface: &mut dyn JtagInterface) -> Result<()> {
        self.dap(iface)?
            .target(0)
            .ok_or(Error::MissingDap(self.tap.chain_index()))?
            .debug_halt()
    }

    fn debug_resume(&mut self, iface: &mut dyn JtagInterface) -> Result<()> {
        self.dap(iface)?
            .target(0)
            .ok_or(Error::MissingDap(self.tap.chain_index()))?
            .debug_resume()
    }

    fn reset(&mut self, iface: &mut dyn JtagInterface) -> Result<()> {
        self.dap(iface)?
            .target(0)
            .ok_or(Error::MissingDap(self.tap.chain_index()))?
            .reset()
    }

    fn print_registers(&mut self, iface: &mut dyn JtagInterface) -> Result<String> {
        self.dap(iface)?
            .target(0)
            .ok_or(Error::MissingDap(self.tap.chain_index()))?
            .print_registers()
    }
}

/// Dumps CPU registers, flash and SRAM accessibility the way the original
/// tool's lock-probe diagnostic does -- one probe read per region, each
/// interpreted as locked on failure rather than propagated.
pub fn print_lock_probe_details(
    device: &mut Stm32Device,
    iface: &mut dyn JtagInterface,
) -> Result<String> {
    let level = device.is_read_locked(iface).value();
    let mut out = format!(
        "STM32 read protection level: {}\n",
        if level { "locked" } else { "unlocked" }
    );

    let dap = device.dap(iface)?;
    let cpu = match dap.target(0) {
        Some(cpu) => cpu,
        None => return Ok(out),
    };

    match cpu.read_cpu_register(crate::arm::CoreRegister::R(0)) {
        Ok(_) => out.push_str("CPU registers: unlocked\n"),
        Err(_) => out.push_str("CPU registers: locked\n"),
    }
    match cpu.read_memory(FLASH_MEMORY_BASE) {
        Ok(_) => out.push_str("Flash: unlocked\n"),
        Err(_) => out.push_str("Flash: locked\n"),
    }
    match cpu.read_memory(SRAM_MEMORY_BASE) {
        Ok(_) => out.push_str("SRAM: unlocked\n"),
        Err(_) => out.push_str("SRAM: locked\n"),
    }
    Ok(out)
}
