//! Vendor dispatch stubs for manufacturers this crate doesn't implement a
//! concrete driver for.
//!
//! `FreescaleDevice::CreateDevice` in the original tool decoded the part
//! number and stepping purely to print them in the "unimplemented" warning,
//! then returned nil -- commented-out code hinted at an intended
//! PIC32-via-Freescale dispatch that was never finished. That behavior is
//! preserved verbatim rather than guessed at.

use tracing::warn;

use crate::idcode::IdCode;

/// Logs an "unimplemented Freescale device" warning and declines to classify
/// it, matching `FreescaleDevice::CreateDevice`.
pub fn freescale_create_device(idcode: IdCode) {
    warn!(
        part = format_args!("{:#06x}", idcode.part_number()),
        stepping = idcode.version(),
        "unimplemented Freescale device"
    );
}

/// Logs a "Philips not implemented" warning and declines to classify it.
/// The original tool's comment speculated about CoolRunner XPLA3 dice
/// needing Xilinx-family dispatch instead; nothing in this pack resolves
/// that, so the stub stays a stub.
pub fn philips_create_device(idcode: IdCode) {
    warn!(
        raw = format_args!("{:#010x}", idcode.raw()),
        "Philips not implemented -- is this an older XPLA3 die?"
    );
}

/// Logs an "unimplemented Xilinx device" warning and declines to classify
/// it. Xilinx FPGA bitstream loading is explicitly out of scope.
pub fn xilinx_create_device(idcode: IdCode) {
    warn!(
        part = format_args!("{:#06x}", idcode.part_number()),
        "unimplemented Xilinx device"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stubs_do_not_panic() {
        let idcode = IdCode::new(0x4BA0_0477);
        freescale_create_device(idcode);
        philips_create_device(idcode);
        xilinx_create_device(idcode);
    }
}
