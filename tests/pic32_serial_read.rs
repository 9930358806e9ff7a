//! Verifies that a serial-exec memory read feeds a NOP for every fetch-read
//! cycle the CPU needs before its store actually lands, and that the word
//! captured off that store is what the read returns.

use chainhal::device::JtagDevice;
use chainhal::idcode::IdCode;
use chainhal::pic32::engine::serial_execute_memory_read;
use chainhal::test_support::{MockJtagInterface, Transaction};

const MICROMIPS_NOP: u32 = 0x0C00_0C00;

fn control_word(proc_access: bool, proc_we: bool, access_size: u8) -> [u8; 4] {
    let mut word = 0u32;
    if proc_access {
        word |= 1 << 18;
    }
    if proc_we {
        word |= 1 << 19;
    }
    word |= (access_size as u32 & 0b11) << 20;
    word.to_le_bytes()
}

#[test]
fn fetch_reads_are_fed_nops_until_the_store_lands() {
    let mut iface = MockJtagInterface::new();
    let mut dev = JtagDevice::new(IdCode::new(0x2920_1093), 0, 5);

    // Six setup instructions stream through serial_execute_instruction
    // (lui s3 / lui t0 / ori t0 / lw t1 / sw t1 / nop), each one cycle of
    // wait-for-access, address, data, control-ack.
    for _ in 0..6 {
        iface.push_dr_response(control_word(true, false, 2));
        iface.push_dr_response([0u8; 4]);
        iface.push_dr_response([0u8; 4]);
        iface.push_dr_response([0u8; 4]);
    }

    // Two fetch-read cycles the CPU needs before its store is visible.
    for _ in 0..2 {
        iface.push_dr_response(control_word(true, false, 2)); // proc_we = false
        iface.push_dr_response([0u8; 4]); // NOP feed ack
        iface.push_dr_response([0u8; 4]); // control ack
    }

    // The real store: proc_we = true, carrying the value to return.
    iface.push_dr_response(control_word(true, true, 2));
    iface.push_dr_response([0u8; 4]); // address capture
    iface.push_dr_response(0xCAFE_BABEu32.to_le_bytes());
    iface.push_dr_response([0u8; 4]); // control ack

    let result = serial_execute_memory_read(&mut dev, &mut iface, 0xA000_0000).unwrap();
    assert_eq!(result, 0xCAFE_BABE);

    let nops_fed = iface
        .log()
        .iter()
        .filter(|t| match t {
            Transaction::ScanDr { send, n_bits: 32, .. } => {
                send.len() == 4 && u32::from_le_bytes(send.as_slice().try_into().unwrap()) == MICROMIPS_NOP
            }
            _ => false,
        })
        .count();
    // One of those is the setup sequence's own trailing "nop, nop" instruction
    // word; the other two are fed to stall the CPU during its fetch-reads.
    assert_eq!(nops_fed, 3);
}
