//! Error taxonomy for the classification and programming pipeline.
//!
//! Protocol anomalies that the MIPS EJTAG/STM32 flash engines can continue
//! past (unexpected access size, unexpected read/write direction, a probable
//! target reset mid-session) are logged via `tracing::warn!` at the call
//! site and are never represented as an [`Error`] variant -- spec section 7
//! requires they never abort the calling operation.

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The overarching error type for device classification, discovery and
/// programming.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// `SetIR` was asked to shift more than 32 bits.
    #[error("IR value exceeds the maximum supported length of 32 bits (got {0} bits)")]
    IrTooLong(usize),

    /// An STM32 boundary-scan TAP was constructed at chain position 0; the
    /// ARM DAP must precede it.
    #[error(
        "STM32 boundary-scan TAP must not be the first device in the scan chain -- where's the ARM DAP?"
    )]
    Stm32MustNotBeFirst,

    /// The 32-bit PIC32 device ID did not match any row of the static device
    /// table.
    #[error("unknown PIC32 device ID 0x{0:08x}")]
    UnknownPic32Device(u32),

    /// `EnterSerialExecMode` asserted MCHP reset but the status byte never
    /// showed `reset_active`.
    #[error("device should be in reset, but isn't")]
    ResetNotAsserted,

    /// `EnterSerialExecMode` de-asserted MCHP reset but the status byte
    /// still showed `reset_active`.
    #[error("device should not be in reset, but is")]
    ResetStillAsserted,

    /// `FLASH_CR` (or `FLASH_OPTCR`) still reads as locked after the
    /// documented unlock key sequence.
    #[error("flash is still locked after the unlock key sequence")]
    FlashStillLocked,

    /// `FLASH_OPTCR` still reads as locked after the option unlock sequence.
    #[error("option register is still locked after the unlock key sequence")]
    OptionRegisterStillLocked,

    /// An operation that the original tool never implemented for this
    /// device (PIC32 `Program`, PIC32 `Reset`).
    #[error("{operation} is not implemented for this device")]
    NotImplemented {
        /// Human-readable name of the unsupported operation.
        operation: &'static str,
    },

    /// A read or write through the ARM DAP/APB collaborator failed. During a
    /// lock probe this is caught and folded into the protection level
    /// instead of propagating; during erase/program it is surfaced as-is.
    #[error("transport fault accessing target memory at {address:#010x}")]
    TransportFault {
        /// The address that was being accessed when the fault occurred.
        address: u32,
        /// The underlying collaborator error, if any was provided.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// `STM32Device` was constructed without a preceding ARM DAP TAP.
    #[error("no ARM debug access port found at chain position {0}")]
    MissingDap(usize),
}

impl Error {
    /// Builds a [`Error::TransportFault`] with no further detail, the common
    /// case when the DAP collaborator only reports "it didn't work".
    pub fn transport_fault(address: u32) -> Self {
        Error::TransportFault {
            address,
            source: None,
        }
    }
}

/// A lightweight formatting helper for `PrintInfo`-style summaries; not an
/// error, just shared `Display` glue used by device `describe()` impls.
pub(crate) fn fmt_kib(kib: f32) -> String {
    if kib.fract() == 0.0 {
        format!("{} KB", kib as u32)
    } else {
        format!("{kib:.2} KB")
    }
}
