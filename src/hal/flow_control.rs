//! Flow-control request service
//!
//! A request slot gates a DMA channel's writes into one CPort's TX buffer so
//! the hardware FIFO is not overrun. A request is connected to at most one
//! CPort at a time and must be activated before data moves.

use super::HwResult;

/// Hardware flow-control (request) service
///
/// Methods take `&self` for the same reason as
/// [`DmaController`](super::DmaController). None of them may call back into
/// the engine.
pub trait FlowControl {
    /// Request slot handle
    type Request: Copy;

    /// Open the service
    fn open(&self) -> HwResult<()>;

    /// Close the service
    fn close(&self);

    /// Number of request slots not yet allocated
    fn free_request_count(&self) -> usize;

    /// Allocate a request slot
    fn alloc_request(&self) -> HwResult<Self::Request>;

    /// Return a request slot
    fn free_request(&self, req: Self::Request);

    /// Route a CPort's TX buffer through the request
    fn connect(&self, cport: u16, req: Self::Request) -> HwResult<()>;

    /// Remove the CPort routing from the request
    fn disconnect(&self, req: Self::Request) -> HwResult<()>;

    /// Activate the request
    fn activate(&self, req: Self::Request) -> HwResult<()>;

    /// Deactivate the request
    fn deactivate(&self, req: Self::Request) -> HwResult<()>;

    /// Check whether the request is active
    fn is_activated(&self, req: Self::Request) -> bool;

    /// Tell the request the current transfer is finished
    fn transfer_completed(&self, req: Self::Request) -> HwResult<()>;

    /// DMA peripheral id the request drives
    fn peripheral_id(&self, req: Self::Request) -> u32;
}
