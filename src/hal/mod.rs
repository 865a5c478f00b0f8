//! Hardware Abstraction Layer
//!
//! The engine consumes three services, each expressed as a trait the
//! platform implements:
//!
//! - [`dma`]: General purpose DMA controller (channels and operations)
//! - [`flow_control`]: Flow-control request slots gating CPort TX buffers
//! - [`cport`]: CPort transmit registers (watermark, end-of-message, reset)
//!
//! A single platform type usually implements all three; [`TxHardware`] names
//! that combination.

pub mod cport;
pub mod dma;
pub mod flow_control;

pub use cport::CPortRegisters;
pub use dma::{
    BurstLen, ByteSwap, ChannelParams, DmaController, DmaDevice, DmaEvents, DmaIncrement,
    DmaTransfer, TransferSize, XferTag,
};
pub use flow_control::FlowControl;

/// Failure reported by a hardware service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HwError {
    /// Destination FIFO has no room for the operation
    NoSpace,
    /// Resource is in use
    Busy,
    /// No free channel, request or operation descriptor
    NoResource,
    /// Any other hardware or driver failure
    Fault,
}

impl core::fmt::Display for HwError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            HwError::NoSpace => "no space",
            HwError::Busy => "busy",
            HwError::NoResource => "no resource",
            HwError::Fault => "fault",
        })
    }
}

/// Result type alias for hardware service calls
pub type HwResult<T> = core::result::Result<T, HwError>;

/// Everything the TX engine needs from the platform.
///
/// Implemented automatically for any type providing the three services.
pub trait TxHardware: DmaController + FlowControl + CPortRegisters {}

impl<T: DmaController + FlowControl + CPortRegisters> TxHardware for T {}
