//! A collection of on-chip debugging tools to communicate with silicon over
//! a JTAG scan chain.
//!
//! The crate discovers devices on a chain by their IDCODE, classifies them by
//! vendor and part, and then performs vendor-specific programming, erase,
//! blank-check, lock/unlock and CPU debug operations via the appropriate
//! on-chip debug transport: ARM CoreSight DAP + APB for ARM cores, MIPS
//! EJTAG + Microchip MTAP for PIC32.
//!
//! The physical JTAG adapter (TCK/TMS/TDI/TDO pin wiggling, USB transport) is
//! out of scope here; this crate consumes it through the [`JtagInterface`]
//! trait.

#![warn(missing_docs)]

pub mod arm;
pub mod capability;
pub mod device;
pub mod error;
pub mod factory;
pub mod firmware;
pub mod idcode;
pub mod interface;
pub mod pic32;
pub mod stm32;
pub mod test_support;
pub mod uncertain;
pub mod vendor;

pub use crate::device::{ChainPosition, JtagDevice};
pub use crate::error::Error;
pub use crate::factory::create_device;
pub use crate::firmware::FirmwareImage;
pub use crate::idcode::IdCode;
pub use crate::interface::JtagInterface;
pub use crate::uncertain::{Certainty, UncertainBoolean};
