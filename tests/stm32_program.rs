//! Verifies the erase-then-program ordering and the blank-word skip
//! optimization in the STM32 flash driver, against a minimal [`ArmDebugPort`]
//! double that simulates just enough of `FLASH_KEYR`/`FLASH_SR`/`FLASH_CR`
//! to drive the real unlock and program code paths.

use std::collections::HashMap;

use chainhal::arm::{ArmDebugPort, CoreRegister, CortexMTarget};
use chainhal::error::{Error, Result};
use chainhal::firmware::FirmwareImage;
use chainhal::stm32::{flash, Stm32InitInfo, Stm32Model, FLASH_MEMORY_BASE};

const FLASH_KEY1: u32 = 0x4567_0123;
const FLASH_KEY2: u32 = 0xCDEF_89AB;
const FLASH_CR_LOCK_BIT: u32 = 1 << 31;
const MASS_ERASE_CR: u32 = 0x1_0204;

struct MockCortex {
    halts: u32,
    resumes: u32,
    resets: u32,
}

impl CortexMTarget for MockCortex {
    fn read_cpu_register(&mut self, _register: CoreRegister) -> Result<u32> {
        Err(Error::NotImplemented { operation: "mock core register read" })
    }

    fn read_memory(&mut self, _address: u32) -> Result<u32> {
        Err(Error::NotImplemented { operation: "mock core memory read" })
    }

    fn write_memory(&mut self, _address: u32, _value: u32) -> Result<()> {
        Err(Error::NotImplemented { operation: "mock core memory write" })
    }

    fn debug_halt(&mut self) -> Result<()> {
        self.halts += 1;
        Ok(())
    }

    fn debug_resume(&mut self) -> Result<()> {
        self.resumes += 1;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        Ok(())
    }

    fn print_registers(&mut self) -> Result<String> {
        Ok(String::new())
    }
}

/// Backs just enough of the flash SFR block to exercise the real unlock key
/// sequence and mass-erase/program register writes.
struct MockFlashDap {
    mem: HashMap<u32, u32>,
    writes: Vec<(u32, u32)>,
    key_stage: u8,
    sr_addr: u32,
    cr_addr: u32,
    keyr_addr: u32,
    cpu: MockCortex,
}

impl MockFlashDap {
    fn new(init: &Stm32InitInfo, initial_flash_word: u32) -> Self {
        let mut mem = HashMap::new();
        mem.insert(init.flash_sfr_base + 0x10, FLASH_CR_LOCK_BIT);
        mem.insert(FLASH_MEMORY_BASE, initial_flash_word);
        Self {
            mem,
            writes: Vec::new(),
            key_stage: 0,
            sr_addr: init.flash_sfr_base + 0x0C,
            cr_addr: init.flash_sfr_base + 0x10,
            keyr_addr: init.flash_sfr_base + 0x04,
            cpu: MockCortex { halts: 0, resumes: 0, resets: 0 },
        }
    }
}

impl ArmDebugPort for MockFlashDap {
    fn read_memory(&mut self, address: u32) -> Result<u32> {
        if address == self.sr_addr {
            return Ok(0); // FLASH_SR.BSY always clear -- no need to simulate busy-wait
        }
        Ok(*self.mem.get(&address).unwrap_or(&0xFFFF_FFFF))
    }

    fn write_memory(&mut self, address: u32, value: u32) -> Result<()> {
        self.writes.push((address, value));
        if address == self.keyr_addr {
            match (self.key_stage, value) {
                (0, FLASH_KEY1) => self.key_stage = 1,
                (1, FLASH_KEY2) => {
                    *self.mem.entry(self.cr_addr).or_insert(0) &= !FLASH_CR_LOCK_BIT;
                    self.key_stage = 0;
                }
                _ => self.key_stage = 0,
            }
            return Ok(());
        }
        self.mem.insert(address, value);
        Ok(())
    }

    fn num_targets(&self) -> usize {
        1
    }

    fn target(&mut self, index: usize) -> Option<&mut dyn CortexMTarget> {
        if index == 0 {
            Some(&mut self.cpu)
        } else {
            None
        }
    }
}

#[test]
fn program_erases_before_writing_when_flash_is_not_blank() {
    let init = Stm32Model::F411E.init_info();
    let mut dap = MockFlashDap::new(&init, 0x1234_5678); // not blank -> erase required
    let image = FirmwareImage::new(&0xDEAD_BEEFu32.to_le_bytes());

    flash::program(&mut dap, &init, FLASH_MEMORY_BASE, &image).unwrap();

    assert_eq!(dap.cpu.halts, 1);
    assert_eq!(dap.cpu.resumes, 1);
    assert_eq!(dap.cpu.resets, 1);

    let mass_erase_pos = dap
        .writes
        .iter()
        .position(|&(addr, val)| addr == init.flash_sfr_base + 0x10 && val == MASS_ERASE_CR)
        .expect("mass erase was never triggered");
    let word_write_pos = dap
        .writes
        .iter()
        .position(|&(addr, val)| addr == FLASH_MEMORY_BASE && val == 0xDEAD_BEEF)
        .expect("programmed word was never written");
    assert!(mass_erase_pos < word_write_pos);
}

#[test]
fn program_skips_words_that_are_already_blank() {
    let init = Stm32Model::F411E.init_info();
    let mut dap = MockFlashDap::new(&init, 0xFFFF_FFFF); // already blank -> no erase needed

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
    bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    let image = FirmwareImage::new(&bytes);

    flash::program(&mut dap, &init, FLASH_MEMORY_BASE, &image).unwrap();

    let second_word_addr = FLASH_MEMORY_BASE + 4;
    assert!(!dap.writes.iter().any(|&(addr, _)| addr == second_word_addr));
    assert!(dap
        .writes
        .iter()
        .any(|&(addr, val)| addr == FLASH_MEMORY_BASE && val == 0xDEAD_BEEF));
    assert!(!dap
        .writes
        .iter()
        .any(|&(addr, val)| addr == init.flash_sfr_base + 0x10 && val == MASS_ERASE_CR));
}
