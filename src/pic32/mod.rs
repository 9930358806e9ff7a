//! MIPS EJTAG + Microchip MTAP engine for PIC32 targets.
//!
//! A PIC32 TAP multiplexes two register maps behind one IR: the Microchip
//! command TAP (`INST_MTAP_SW_MCHP`) and the MIPS EJTAG TAP
//! (`INST_MTAP_SW_EJTAG`). `engine` drives the mode switches and the serial
//! instruction-execution protocol used to read/write target memory one word
//! at a time; `device` wraps that engine behind the capability traits every
//! classified device exposes.

pub mod device;
pub mod engine;

pub use device::Pic32Device;

/// CPU core used by a PIC32 part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pic32Cpu {
    /// MIPS32 M4K core (PIC32MX).
    M4K,
    /// microAptiv core (PIC32MM, PIC32MZ/MK).
    MAptiv,
}

/// Device family grouping, used only for display -- flash/SRAM sizes come
/// from the table row itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pic32Family {
    /// PIC32MX1xx/2xx.
    Mx12,
    /// PIC32MX3xx/4xx.
    Mx34,
    /// PIC32MX5xx/6xx/7xx.
    Mx567,
    /// PIC32MM.
    Mm,
}

/// One row of the static PIC32 device table, keyed by the 32-bit EJTAG
/// device ID read back from the IDCODE TAP.
#[derive(Debug, Clone, Copy)]
pub struct Pic32DeviceInfo {
    /// 32-bit device ID field, as returned on the chain (IDCODE with the
    /// manufacturer/fixed bits already stripped by the factory).
    pub devid: u32,
    /// Marketing part name.
    pub name: &'static str,
    /// Family grouping.
    pub family: Pic32Family,
    /// CPU core.
    pub cpu: Pic32Cpu,
    /// SRAM size, in KB.
    pub sram_kb: u32,
    /// Program flash size, in KB.
    pub program_flash_kb: u32,
    /// Boot flash size, in KB. Fractional on PIC32MM (5.75 KB).
    pub boot_flash_kb: f32,
}

/// Static PIC32 device table. A representative cross-section of each family
/// rather than Microchip's full part catalog; `lookup` fails closed on any
/// device ID not listed here.
pub static PIC32_DEVICES: &[Pic32DeviceInfo] = &[
    Pic32DeviceInfo {
        devid: 0x4A07_A053,
        name: "PIC32MX110F016B",
        family: Pic32Family::Mx12,
        cpu: Pic32Cpu::M4K,
        sram_kb: 4,
        program_flash_kb: 16,
        boot_flash_kb: 3.0,
    },
    Pic32DeviceInfo {
        devid: 0x4A07_9053,
        name: "PIC32MX120F032B",
        family: Pic32Family::Mx12,
        cpu: Pic32Cpu::M4K,
        sram_kb: 8,
        program_flash_kb: 32,
        boot_flash_kb: 3.0,
    },
    Pic32DeviceInfo {
        devid: 0x4A07_8053,
        name: "PIC32MX130F064B",
        family: Pic32Family::Mx12,
        cpu: Pic32Cpu::M4K,
        sram_kb: 16,
        program_flash_kb: 64,
        boot_flash_kb: 3.0,
    },
    Pic32DeviceInfo {
        devid: 0x4A07_B053,
        name: "PIC32MX150F128B",
        family: Pic32Family::Mx12,
        cpu: Pic32Cpu::M4K,
        sram_kb: 32,
        program_flash_kb: 128,
        boot_flash_kb: 3.0,
    },
    Pic32DeviceInfo {
        devid: 0x0938_D053,
        name: "PIC32MX330F064H",
        family: Pic32Family::Mx34,
        cpu: Pic32Cpu::M4K,
        sram_kb: 16,
        program_flash_kb: 64,
        boot_flash_kb: 12.0,
    },
    Pic32DeviceInfo {
        devid: 0x0934_D053,
        name: "PIC32MX340F512H",
        family: Pic32Family::Mx34,
        cpu: Pic32Cpu::M4K,
        sram_kb: 32,
        program_flash_kb: 512,
        boot_flash_kb: 12.0,
    },
    Pic32DeviceInfo {
        devid: 0x0938_E053,
        name: "PIC32MX350F256H",
        family: Pic32Family::Mx34,
        cpu: Pic32Cpu::M4K,
        sram_kb: 64,
        program_flash_kb: 256,
        boot_flash_kb: 12.0,
    },
    Pic32DeviceInfo {
        devid: 0x0938_F053,
        name: "PIC32MX450F256H",
        family: Pic32Family::Mx34,
        cpu: Pic32Cpu::M4K,
        sram_kb: 64,
        program_flash_kb: 256,
        boot_flash_kb: 12.0,
    },
    Pic32DeviceInfo {
        devid: 0x0936_A053,
        name: "PIC32MX534F064H",
        family: Pic32Family::Mx567,
        cpu: Pic32Cpu::M4K,
        sram_kb: 16,
        program_flash_kb: 64,
        boot_flash_kb: 12.0,
    },
    Pic32DeviceInfo {
        devid: 0x0630_0053,
        name: "PIC32MX575F256H",
        family: Pic32Family::Mx567,
        cpu: Pic32Cpu::M4K,
        sram_kb: 64,
        program_flash_kb: 256,
        boot_flash_kb: 12.0,
    },
    Pic32DeviceInfo {
        devid: 0x04D0_7053,
        name: "PIC32MM0016GPL020",
        family: Pic32Family::Mm,
        cpu: Pic32Cpu::MAptiv,
        sram_kb: 4,
        program_flash_kb: 16,
        boot_flash_kb: 5.75,
    },
    Pic32DeviceInfo {
        devid: 0x04D0_8053,
        name: "PIC32MM0064GPL028",
        family: Pic32Family::Mm,
        cpu: Pic32Cpu::MAptiv,
        sram_kb: 8,
        program_flash_kb: 64,
        boot_flash_kb: 5.75,
    },
];

/// Looks up a device table row by device ID.
pub fn lookup(devid: u32) -> Option<&'static Pic32DeviceInfo> {
    PIC32_DEVICES.iter().find(|row| row.devid == devid)
}

/// 32-bit EJTAG control register (`INST_CONTROL`), as driven and read during
/// serial execution. Bit positions are taken directly from the MIPS EJTAG
/// specification (table 6 of the EJTAG 2.6 debug control register),
/// independent of whichever field order the original C++ bitfield overlay
/// used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EjtagControlRegister {
    /// Raw 32-bit register value.
    pub word: u32,
}

impl EjtagControlRegister {
    const PROC_ACCESS_BIT: u32 = 1 << 18;
    const PROC_WE_BIT: u32 = 1 << 19;
    const ACCESS_SIZE_SHIFT: u32 = 20;
    const ACCESS_SIZE_MASK: u32 = 0b11;
    const PROBE_ENABLE_BIT: u32 = 1 << 14;
    const DEBUG_VECTOR_POS_BIT: u32 = 1 << 2;
    const DEBUG_IRQ_BIT: u32 = 1 << 12;

    /// Builds a zeroed control register.
    pub fn new() -> Self {
        Self::default()
    }

    /// `PrAcc`: the CPU is stalled waiting for the probe to service a
    /// DMSEG transaction.
    pub fn proc_access(&self) -> bool {
        self.word & Self::PROC_ACCESS_BIT != 0
    }

    /// Sets `PrAcc`.
    pub fn set_proc_access(&mut self, value: bool) {
        self.set_bit(Self::PROC_ACCESS_BIT, value);
    }

    /// `PrnW`: `true` if the CPU is writing to DMSEG, `false` if reading or
    /// fetching.
    pub fn proc_we(&self) -> bool {
        self.word & Self::PROC_WE_BIT != 0
    }

    /// Sets `PrnW`.
    pub fn set_proc_we(&mut self, value: bool) {
        self.set_bit(Self::PROC_WE_BIT, value);
    }

    /// `PRnW` access size: 0 = byte, 1 = halfword, 2 = word, 3 = triple
    /// (unused here).
    pub fn access_size(&self) -> u8 {
        ((self.word >> Self::ACCESS_SIZE_SHIFT) & Self::ACCESS_SIZE_MASK) as u8
    }

    /// `PrRst`/`ProbEn`: host asserts control of the debug pipeline.
    pub fn probe_enable(&self) -> bool {
        self.word & Self::PROBE_ENABLE_BIT != 0
    }

    /// Sets `ProbEn`.
    pub fn set_probe_enable(&mut self, value: bool) {
        self.set_bit(Self::PROBE_ENABLE_BIT, value);
    }

    /// `DV`: redirect the debug exception vector to DMSEG emulated memory.
    pub fn set_debug_vector_pos(&mut self, value: bool) {
        self.set_bit(Self::DEBUG_VECTOR_POS_BIT, value);
    }

    /// `DebugIRQ`: force a debug interrupt so the CPU enters debug mode at
    /// the DMSEG vector. Only asserted on the very first serial-exec cycle
    /// of a session.
    pub fn set_debug_irq(&mut self, value: bool) {
        self.set_bit(Self::DEBUG_IRQ_BIT, value);
    }

    fn set_bit(&mut self, mask: u32, value: bool) {
        if value {
            self.word |= mask;
        } else {
            self.word &= !mask;
        }
    }
}

/// Decoded `MCHP_STATUS` response byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pic32StatusByte {
    /// Raw byte, as returned by `MCHP_STATUS`.
    pub byte: u8,
}

impl Pic32StatusByte {
    /// Code-protect bit is clear -- device is NOT code-protected.
    pub fn code_protect_off(self) -> bool {
        self.byte & 0x01 != 0
    }

    /// An NVM operation reported an error.
    pub fn nvm_error(self) -> bool {
        self.byte & 0x02 != 0
    }

    /// Device configuration is ready (post bulk-erase poll target).
    pub fn cfg_rdy(self) -> bool {
        self.byte & 0x08 != 0
    }

    /// A flash operation is in progress.
    pub fn flash_busy(self) -> bool {
        self.byte & 0x10 != 0
    }

    /// Flash access has been enabled via `MCHP_FLASH_ENABLE`.
    pub fn flash_en(self) -> bool {
        self.byte & 0x20 != 0
    }

    /// The device is currently held in reset.
    pub fn reset_active(self) -> bool {
        self.byte & 0x40 != 0
    }
}

impl From<u8> for Pic32StatusByte {
    fn from(byte: u8) -> Self {
        Self { byte }
    }
}
