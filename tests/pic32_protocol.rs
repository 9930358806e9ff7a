//! Verifies the exact MTAP/EJTAG handshake `enter_serial_exec_mode` drives:
//! assert reset, confirm it, switch to EJTAG and latch debug boot, de-assert
//! reset, confirm that too, enable flash access, then force one serial-exec
//! cycle with `DebugIRQ` set.

use chainhal::device::JtagDevice;
use chainhal::idcode::IdCode;
use chainhal::pic32::engine::enter_serial_exec_mode;
use chainhal::test_support::{MockJtagInterface, Transaction};

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
fn reset_handshake_and_forced_cycle_run_in_order() {
    let mut iface = MockJtagInterface::new();
    let mut dev = JtagDevice::new(IdCode::new(0x2920_1093), 0, 5);

    iface.push_dr_response([0x00]); // ASSERT_RST command ack, not inspected
    iface.push_dr_response([0x40]); // STATUS: reset_active = 1
    iface.push_dr_response([0x00]); // DE_ASSERT_RST command ack, not inspected
    iface.push_dr_response([0x00]); // STATUS: reset_active = 0
    iface.push_dr_response([0x00]); // FLASH_ENABLE command ack, not inspected
    iface.push_dr_response(control_word(true, false, 2)); // forced cycle: PrAcc already set
    iface.push_dr_response([0u8; 4]); // address capture, unused for the forced cycle
    iface.push_dr_response([0u8; 4]); // data capture, unused
    iface.push_dr_response([0u8; 4]); // control register ack, unused

    enter_serial_exec_mode(&mut dev, &mut iface).unwrap();

    let eight_bit_sends: Vec<u8> = iface
        .log()
        .iter()
        .filter_map(|t| match t {
            Transaction::ScanDr { send, n_bits: 8, .. } => Some(send[0]),
            _ => None,
        })
        .collect();
    assert_eq!(eight_bit_sends, vec![0xD1, 0x00, 0xD0, 0x00, 0xFE]);

    let ir_opcodes: Vec<u8> = iface
        .log()
        .iter()
        .filter_map(|t| match t {
            Transaction::SetIr { data, .. } => Some(data[0]),
            _ => None,
        })
        .collect();
    assert_eq!(ir_opcodes.first(), Some(&0x04)); // INST_MTAP_SW_MCHP selected first
    assert_eq!(ir_opcodes.iter().filter(|&&op| op == 0x0C).count(), 1); // DEBUGBOOT latched exactly once
    let debugboot_pos = ir_opcodes.iter().position(|&op| op == 0x0C).unwrap();
    let first_ejtag_pos = ir_opcodes.iter().position(|&op| op == 0x05).unwrap();
    assert!(first_ejtag_pos < debugboot_pos); // switched to EJTAG mode before latching DEBUGBOOT

    let first_control_write = iface
        .log()
        .iter()
        .find_map(|t| match t {
            Transaction::ScanDr { send, n_bits: 32, .. } => {
                Some(u32::from_le_bytes(send.as_slice().try_into().unwrap()))
            }
            _ => None,
        })
        .unwrap();
    assert_ne!(first_control_write & (1 << 12), 0); // DebugIRQ forced on the opening cycle
}
