//! IR opcodes, MTAP command bytes, and the serial instruction-execution
//! protocol itself.
//!
//! Every function here takes the [`crate::device::JtagDevice`] and the
//! [`crate::interface::JtagInterface`] it scans through explicitly, the same
//! shape `JtagDevice`'s own methods use -- there is no hidden global state,
//! so a caller can interleave PIC32 engine calls with other TAPs on the
//! chain between scans.

use tracing::warn;

use crate::device::JtagDevice;
use crate::error::{Error, Result};
use crate::interface::JtagInterface;

use super::{EjtagControlRegister, Pic32StatusByte};

/// Selects the MIPS EJTAG implementation-code register (unused; spec.md
/// non-goal).
#[allow(dead_code)]
pub(crate) const INST_IMPCODE: u8 = 0x03;
/// Selects the EJTAG address register (the address of the pending DMSEG
/// transaction).
pub(crate) const INST_ADDRESS: u8 = 0x08;
/// Selects the EJTAG data register (the data word of the pending DMSEG
/// transaction).
pub(crate) const INST_DATA: u8 = 0x09;
/// Selects the EJTAG control register.
pub(crate) const INST_CONTROL: u8 = 0x0A;
/// Latches the boot source to JTAG serial-exec mode.
pub(crate) const INST_DEBUGBOOT: u8 = 0x0C;
/// EJTAG fastdata stream (unused; spec.md non-goal).
#[allow(dead_code)]
pub(crate) const INST_FASTDATA: u8 = 0x0E;
/// Selects the Microchip command TAP.
pub(crate) const INST_MTAP_SW_MCHP: u8 = 0x04;
/// Selects the MIPS EJTAG TAP.
pub(crate) const INST_MTAP_SW_EJTAG: u8 = 0x05;
/// Shifts an 8-bit MCHP command into the command TAP.
pub(crate) const INST_MTAP_COMMAND: u8 = 0x07;

/// No-op; returns the device status byte in the capture.
pub(crate) const MCHP_STATUS: u8 = 0x00;
/// Asserts the device-wide reset.
pub(crate) const MCHP_ASSERT_RST: u8 = 0xD1;
/// De-asserts the device-wide reset.
pub(crate) const MCHP_DE_ASSERT_RST: u8 = 0xD0;
/// Triggers a bulk (chip) erase.
pub(crate) const MCHP_ERASE: u8 = 0xFC;
/// Enables NVM access for serial-exec memory operations.
pub(crate) const MCHP_FLASH_ENABLE: u8 = 0xFE;

/// DMSEG base address the EJTAG probe emulates memory through.
#[allow(dead_code)]
pub(crate) const DMSEG_BASE: u32 = 0xFF20_0000;
/// Capture value seen on the address phase when the target has unexpectedly
/// reset mid-session.
const RESET_SENTINEL: u32 = 0xFF20_0200;
/// NOP encoded in microMIPS, used to feed fetch cycles that don't matter.
const MICROMIPS_NOP: u32 = 0x0C00_0C00;

fn set_ir5(dev: &mut JtagDevice, iface: &mut dyn JtagInterface, opcode: u8) -> Result<()> {
    dev.set_ir_n(iface, &[opcode], 5)
}

/// Selects the Microchip command TAP and returns the state machine to idle.
pub fn enter_mtap_mode(dev: &mut JtagDevice, iface: &mut dyn JtagInterface) -> Result<()> {
    set_ir5(dev, iface, INST_MTAP_SW_MCHP)?;
    dev.reset_to_idle(iface)
}

/// Selects the MIPS EJTAG TAP and returns the state machine to idle.
pub fn enter_ejtag_mode(dev: &mut JtagDevice, iface: &mut dyn JtagInterface) -> Result<()> {
    set_ir5(dev, iface, INST_MTAP_SW_EJTAG)?;
    dev.reset_to_idle(iface)
}

/// Shifts an 8-bit MCHP command and returns the captured status byte.
/// Requires the TAP to already be in MCHP mode (see [`enter_mtap_mode`]).
pub fn send_mchp_command(
    dev: &mut JtagDevice,
    iface: &mut dyn JtagInterface,
    cmd: u8,
) -> Result<u8> {
    set_ir5(dev, iface, INST_MTAP_COMMAND)?;
    let mut capture = [0u8; 1];
    dev.scan_dr(iface, &[cmd], &mut capture, 8)?;
    Ok(capture[0])
}

/// Reads the device status byte via `MCHP_STATUS`. Requires MCHP mode.
pub fn get_status(
    dev: &mut JtagDevice,
    iface: &mut dyn JtagInterface,
) -> Result<Pic32StatusByte> {
    enter_mtap_mode(dev, iface)?;
    Ok(Pic32StatusByte::from(send_mchp_command(
        dev,
        iface,
        MCHP_STATUS,
    )?))
}

/// Drives the MTAP/EJTAG reset handshake and enables serial-exec mode.
/// Ends with one forced instruction cycle (`debug_irq=1`) that pushes the
/// CPU into the debug exception handler.
pub fn enter_serial_exec_mode(dev: &mut JtagDevice, iface: &mut dyn JtagInterface) -> Result<()> {
    enter_mtap_mode(dev, iface)?;
    send_mchp_command(dev, iface, MCHP_ASSERT_RST)?;
    let status = get_status(dev, iface)?;
    if !status.reset_active() {
        return Err(Error::ResetNotAsserted);
    }

    enter_ejtag_mode(dev, iface)?;
    set_ir5(dev, iface, INST_DEBUGBOOT)?;

    enter_mtap_mode(dev, iface)?;
    send_mchp_command(dev, iface, MCHP_DE_ASSERT_RST)?;
    let status = get_status(dev, iface)?;
    if status.reset_active() {
        return Err(Error::ResetStillAsserted);
    }

    send_mchp_command(dev, iface, MCHP_FLASH_ENABLE)?;

    serial_execute_instruction(dev, iface, 0, true)
}

fn wait_for_ejtag_memory_operation(
    dev: &mut JtagDevice,
    iface: &mut dyn JtagInterface,
    mut first: bool,
) -> Result<EjtagControlRegister> {
    loop {
        let mut write_reg = EjtagControlRegister::new();
        write_reg.set_proc_access(true);
        write_reg.set_probe_enable(true);
        write_reg.set_debug_vector_pos(true);
        if first {
            write_reg.set_debug_irq(true);
            first = false;
        }

        set_ir5(dev, iface, INST_CONTROL)?;
        let mut capture = [0u8; 4];
        dev.scan_dr(iface, &write_reg.word.to_le_bytes(), &mut capture, 32)?;
        let read_reg = EjtagControlRegister {
            word: u32::from_le_bytes(capture),
        };
        if read_reg.proc_access() {
            if read_reg.access_size() != 2 {
                warn!(size = read_reg.access_size(), "EJTAG request size isn't word");
            }
            return Ok(read_reg);
        }
    }
}

/// Executes a single microMIPS instruction word via the serial-exec
/// protocol. `first` must be `true` only for the one forced cycle at the
/// start of [`enter_serial_exec_mode`].
pub fn serial_execute_instruction(
    dev: &mut JtagDevice,
    iface: &mut dyn JtagInterface,
    insn: u32,
    first: bool,
) -> Result<()> {
    enter_ejtag_mode(dev, iface)?;

    let read_reg = wait_for_ejtag_memory_operation(dev, iface, first)?;

    set_ir5(dev, iface, INST_ADDRESS)?;
    let mut addr_capture = [0u8; 4];
    dev.scan_dr(iface, &[0u8; 4], &mut addr_capture, 32)?;
    let capture = u32::from_le_bytes(addr_capture);

    if read_reg.proc_we() {
        warn!(capture, "EJTAG exec request isn't a read");
    }
    if capture == RESET_SENTINEL && !first {
        warn!("target CPU appears to have reset during serial execution");
    }

    set_ir5(dev, iface, INST_DATA)?;
    let mut data_capture = [0u8; 4];
    dev.scan_dr(iface, &insn.to_le_bytes(), &mut data_capture, 32)?;

    let mut write_reg = EjtagControlRegister::new();
    write_reg.set_proc_access(false);
    write_reg.set_probe_enable(true);
    write_reg.set_debug_vector_pos(true);
    set_ir5(dev, iface, INST_CONTROL)?;
    let mut ack = [0u8; 4];
    dev.scan_dr(iface, &write_reg.word.to_le_bytes(), &mut ack, 32)?;

    Ok(())
}

/// Writes a 32-bit word to `addr` by streaming five microMIPS instructions
/// (`lui`/`ori`/`sw`) through the serial-exec protocol.
pub fn serial_execute_memory_write(
    dev: &mut JtagDevice,
    iface: &mut dyn JtagInterface,
    addr: u32,
    data: u32,
) -> Result<()> {
    serial_execute_instruction(dev, iface, (addr & 0xFFFF_0000) | 0x41A4, false)?; // lui a0, addr_hi
    serial_execute_instruction(dev, iface, (addr << 16) | 0x5084, false)?; // ori a0, a0, addr_lo
    serial_execute_instruction(dev, iface, (data & 0xFFFF_0000) | 0x41A5, false)?; // lui a1, data_hi
    serial_execute_instruction(dev, iface, (data << 16) | 0x50A5, false)?; // ori a1, a1, data_lo
    serial_execute_instruction(dev, iface, 0x0000_F8A4, false) // sw a1, 0(a0)
}

/// Reads a 32-bit word from `addr`: the target CPU redirects the load
/// through DMSEG, which the engine observes as a write transaction after
/// feeding however many fetch-reads the CPU needs first.
pub fn serial_execute_memory_read(
    dev: &mut JtagDevice,
    iface: &mut dyn JtagInterface,
    addr: u32,
) -> Result<u32> {
    serial_execute_instruction(dev, iface, 0xFF20_41B3, false)?; // lui s3, 0xff20
    serial_execute_instruction(dev, iface, (addr & 0xFFFF_0000) | 0x41A8, false)?; // lui t0, addr_hi
    serial_execute_instruction(dev, iface, (addr << 16) | 0x5108, false)?; // ori t0, t0, addr_lo
    serial_execute_instruction(dev, iface, 0x0000_FD28, false)?; // lw t1, 0(t0)
    serial_execute_instruction(dev, iface, 0x0000_F933, false)?; // sw t1, 0(s3)
    serial_execute_instruction(dev, iface, MICROMIPS_NOP, false)?; // nop, nop

    loop {
        enter_ejtag_mode(dev, iface)?;
        let read_reg = wait_for_ejtag_memory_operation(dev, iface, false)?;

        if !read_reg.proc_we() {
            // Fetch-read: feed a NOP and keep waiting for the write.
            set_ir5(dev, iface, INST_DATA)?;
            let mut capture = [0u8; 4];
            dev.scan_dr(iface, &MICROMIPS_NOP.to_le_bytes(), &mut capture, 32)?;

            let mut write_reg = EjtagControlRegister::new();
            write_reg.set_proc_access(false);
            write_reg.set_probe_enable(true);
            write_reg.set_debug_vector_pos(true);
            set_ir5(dev, iface, INST_CONTROL)?;
            let mut ack = [0u8; 4];
            dev.scan_dr(iface, &write_reg.word.to_le_bytes(), &mut ack, 32)?;
            continue;
        }

        set_ir5(dev, iface, INST_ADDRESS)?;
        let mut addr_capture = [0u8; 4];
        dev.scan_dr(iface, &[0u8; 4], &mut addr_capture, 32)?;
        let capture = u32::from_le_bytes(addr_capture);

        if read_reg.access_size() != 2 {
            warn!(size = read_reg.access_size(), "EJTAG request size isn't word");
        }
        if capture == RESET_SENTINEL {
            warn!("target CPU appears to have reset during serial execution");
        }

        set_ir5(dev, iface, INST_DATA)?;
        let mut data_capture = [0u8; 4];
        dev.scan_dr(iface, &[0u8; 4], &mut data_capture, 32)?;
        let data = u32::from_le_bytes(data_capture);

        let mut write_reg = EjtagControlRegister::new();
        write_reg.set_proc_access(false);
        write_reg.set_probe_enable(true);
        write_reg.set_debug_vector_pos(true);
        set_ir5(dev, iface, INST_CONTROL)?;
        let mut ack = [0u8; 4];
        dev.scan_dr(iface, &write_reg.word.to_le_bytes(), &mut ack, 32)?;

        return Ok(data);
    }
}
