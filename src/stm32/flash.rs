//! Lock probing, option-byte/flash unlock, erase/program/blank-check.
//!
//! Every function here takes the [`ArmDebugPort`] collaborator explicitly;
//! nothing is cached on it, matching the "devices don't own the adapter"
//! rule in spec.md section 5. `Stm32Device` is the only caller and owns the
//! lock-state cache (`ProbeLocksNondestructive` only probes once).

use std::thread::sleep;
use std::time::Duration;

use tracing::{trace, warn};

use crate::arm::ArmDebugPort;
use crate::error::{Error, Result};
use crate::firmware::FirmwareImage;

use super::{reg, ProtectionLevel, Stm32InitInfo, Stm32SerialNumber};

const FLASH_CR_LOCK_BIT: u32 = 1 << 31;
const FLASH_OPTCR_LOCK_BIT: u32 = 1 << 0;
const FLASH_OPTCR_OPTSTRT_BIT: u32 = 1 << 1;
const FLASH_SR_BSY_BIT: u32 = 1 << 16;
const FLASH_KEY1: u32 = 0x4567_0123;
const FLASH_KEY2: u32 = 0xCDEF_89AB;
const FLASH_OPTKEY1: u32 = 0x0819_2A3B;
const FLASH_OPTKEY2: u32 = 0x4C5D_6E7F;
const MASS_ERASE_CR: u32 = 0x1_0204;
const PROGRAM_OP_SIZE_X32: u32 = 0x200;
const FLASH_CR_PG_BIT: u32 = 1;
const INITIAL_BACKOFF: Duration = Duration::from_micros(100);

fn sfr(init: &Stm32InitInfo, offset: u32) -> u32 {
    init.flash_sfr_base + offset
}

/// Reads `FLASH_OPTCR` and classifies the protection level. A transport
/// fault is interpreted as level 1 (limited JTAG access, which rules out
/// level 2).
pub fn probe_locks_nondestructive(
    dap: &mut dyn ArmDebugPort,
    init: &Stm32InitInfo,
) -> ProtectionLevel {
    match dap.read_memory(sfr(init, reg::OPTCR)) {
        Ok(optcr) => {
            trace!(optcr = format_args!("{optcr:#010x}"), "read FLASH_OPTCR");
            ProtectionLevel::from_optcr(optcr)
        }
        Err(_) => ProtectionLevel::Level1,
    }
}

/// Unlocks `FLASH_OPTCR` if it reports locked.
pub fn unlock_flash_options(dap: &mut dyn ArmDebugPort, init: &Stm32InitInfo) -> Result<()> {
    let cr = dap.read_memory(sfr(init, reg::OPTCR)).unwrap_or(1);
    if cr & FLASH_OPTCR_LOCK_BIT == 0 {
        return Ok(());
    }
    dap.write_memory(sfr(init, reg::OPTKEYR), FLASH_OPTKEY1)?;
    dap.write_memory(sfr(init, reg::OPTKEYR), FLASH_OPTKEY2)?;
    let cr = dap.read_memory(sfr(init, reg::OPTCR)).unwrap_or(0);
    if cr & FLASH_OPTCR_LOCK_BIT != 0 {
        return Err(Error::OptionRegisterStillLocked);
    }
    Ok(())
}

/// Unlocks `FLASH_CR` if it reports locked.
pub fn unlock_flash(dap: &mut dyn ArmDebugPort, init: &Stm32InitInfo) -> Result<()> {
    let cr = dap.read_memory(sfr(init, reg::CR))?;
    if cr & FLASH_CR_LOCK_BIT == 0 {
        return Ok(());
    }
    dap.write_memory(sfr(init, reg::KEYR), FLASH_KEY1)?;
    dap.write_memory(sfr(init, reg::KEYR), FLASH_KEY2)?;
    let cr = dap.read_memory(sfr(init, reg::CR))?;
    if cr & FLASH_CR_LOCK_BIT != 0 {
        return Err(Error::FlashStillLocked);
    }
    Ok(())
}

/// Polls `FLASH_SR.BSY` until clear, with exponential back-off starting at
/// 100 us.
pub fn poll_until_flash_not_busy(dap: &mut dyn ArmDebugPort, init: &Stm32InitInfo) -> Result<()> {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        let sr = dap.read_memory(sfr(init, reg::SR))?;
        if sr & FLASH_SR_BSY_BIT == 0 {
            return Ok(());
        }
        sleep(backoff);
        backoff *= 10;
    }
}

/// Mass-erases flash: unlock, wait ready, trigger, wait done.
pub fn erase(dap: &mut dyn ArmDebugPort, init: &Stm32InitInfo) -> Result<()> {
    unlock_flash(dap, init)?;
    poll_until_flash_not_busy(dap, init)?;
    dap.write_memory(sfr(init, reg::CR), MASS_ERASE_CR)?;
    poll_until_flash_not_busy(dap, init)
}

/// Reads `flash_base .. flash_base + flash_kb*1024` in 4-byte words and
/// returns whether every word reads as `0xFFFFFFFF`.
pub fn blank_check(
    dap: &mut dyn ArmDebugPort,
    flash_base: u32,
    flash_kb: u32,
) -> Result<bool> {
    let end = flash_base + flash_kb * 1024;
    let mut addr = flash_base;
    while addr < end {
        let word = dap.read_memory(addr)?;
        if word != 0xFFFF_FFFF {
            return Ok(false);
        }
        addr += 4;
    }
    Ok(true)
}

/// Programs `image` starting at `flash_base`. Halts the CPU first; if the
/// first word of flash isn't blank, erases before programming; skips any
/// image word equal to `0xFFFFFFFF` since flash is already blank there.
/// Resets and resumes the CPU once done.
pub fn program(
    dap: &mut dyn ArmDebugPort,
    init: &Stm32InitInfo,
    flash_base: u32,
    image: &FirmwareImage,
) -> Result<()> {
    {
        let cpu = dap
            .target(0)
            .ok_or_else(|| Error::transport_fault(flash_base))?;
        cpu.debug_halt()?;
    }

    if dap.read_memory(flash_base)? != 0xFFFF_FFFF {
        erase(dap, init)?;
    }

    unlock_flash(dap, init)?;
    poll_until_flash_not_busy(dap, init)?;

    let base_cr = (dap.read_memory(sfr(init, reg::CR))? & !0x0000_0301) | PROGRAM_OP_SIZE_X32;

    for (offset, word) in image.words().enumerate() {
        let addr = flash_base + (offset as u32) * 4;
        if word == 0xFFFF_FFFF {
            continue;
        }

        dap.write_memory(sfr(init, reg::CR), base_cr | FLASH_CR_PG_BIT)?;
        dap.write_memory(addr, word)?;
        poll_until_flash_not_busy(dap, init)?;
        dap.write_memory(sfr(init, reg::CR), base_cr)?;
    }

    let cpu = dap
        .target(0)
        .ok_or_else(|| Error::transport_fault(flash_base))?;
    cpu.reset()?;
    cpu.debug_resume()
}

/// Engages the level-1 read lock and commits it with `OPTSTRT`.
pub fn set_read_lock(dap: &mut dyn ArmDebugPort, init: &Stm32InitInfo) -> Result<()> {
    unlock_flash_options(dap, init)?;
    let cr = dap.read_memory(sfr(init, reg::OPTCR))?;
    let cr = (cr & 0xFFFF_00FF) | 0x5500 | FLASH_OPTCR_OPTSTRT_BIT;
    dap.write_memory(sfr(init, reg::OPTCR), cr)
}

/// Clears the read lock (`RDP = 0xAA`) and commits it. The silicon performs
/// an implicit mass erase as a side effect of clearing level-1 protection.
pub fn clear_read_lock(dap: &mut dyn ArmDebugPort, init: &Stm32InitInfo) -> Result<()> {
    unlock_flash(dap, init)?;
    unlock_flash_options(dap, init)?;
    let cr = dap.read_memory(sfr(init, reg::OPTCR))?;
    let cr = (cr & 0xFFFF_00FF) | 0x0000_AA00 | FLASH_OPTCR_OPTSTRT_BIT;
    dap.write_memory(sfr(init, reg::OPTCR), cr)
}

/// Reads and decodes the 96-bit factory unique ID. Only meaningful when
/// unlocked; callers should skip this while read-locked.
pub fn read_serial_number(
    dap: &mut dyn ArmDebugPort,
    init: &Stm32InitInfo,
) -> Result<Stm32SerialNumber> {
    let w0 = dap.read_memory(init.unique_id_base)?;
    let w1 = dap.read_memory(init.unique_id_base + 4)?;
    let w2 = dap.read_memory(init.unique_id_base + 8)?;
    Ok(Stm32SerialNumber::decode([w0, w1, w2]))
}

/// Reads the flash-size register, if unlocked.
pub fn read_flash_size_kb(dap: &mut dyn ArmDebugPort, init: &Stm32InitInfo) -> Result<u32> {
    Ok(dap.read_memory(init.flash_size_base)? >> 16)
}

pub(crate) fn warn_read_failed(context: &str) {
    warn!(context, "STM32: read failed even though device doesn't appear to be locked");
}
