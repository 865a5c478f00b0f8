//! DMA controller service
//!
//! The engine never programs the DMA controller directly. It allocates
//! channels and operation descriptors through [`DmaController`] and hands each
//! operation a [`DmaTransfer`] carrying an [`XferTag`]. The platform's DMA
//! interrupt glue routes every event raised for that operation back to
//! `TxEngine::handle_dma_event` together with the tag.

use super::HwResult;

// =============================================================================
// Channel Parameters
// =============================================================================

/// Endpoint type on either side of a DMA channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaDevice {
    /// System memory
    #[default]
    Memory,
    /// UniPro CPort transmit buffers
    Unipro,
}

/// Address increment behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaIncrement {
    /// Let the controller choose
    #[default]
    Auto,
    /// Increment after each beat
    Increment,
    /// Keep the address fixed
    Fixed,
}

/// Bus transfer width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferSize {
    /// 8-bit beats
    Bits8 = 8,
    /// 16-bit beats
    Bits16 = 16,
    /// 32-bit beats
    Bits32 = 32,
    /// 64-bit beats (matches the CPort TX buffer word)
    #[default]
    Bits64 = 64,
}

/// DMA burst length configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BurstLen {
    /// 1 beat burst
    Burst1 = 1,
    /// 4 beat burst
    Burst4 = 4,
    /// 8 beat burst
    Burst8 = 8,
    /// 16 beat burst
    #[default]
    Burst16 = 16,
}

/// Byte swapping applied by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ByteSwap {
    /// No swapping
    #[default]
    None,
    /// Swap within 16-bit units
    Swap16,
    /// Swap within 32-bit units
    Swap32,
    /// Swap within 64-bit units
    Swap64,
}

/// Parameters used when allocating a memory → CPort channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelParams {
    /// Source endpoint
    pub src_dev: DmaDevice,
    /// Source peripheral id
    pub src_devid: u32,
    /// Source increment
    pub src_inc: DmaIncrement,
    /// Destination endpoint
    pub dst_dev: DmaDevice,
    /// Destination peripheral id (flow-control request line)
    pub dst_devid: u32,
    /// Destination increment
    pub dst_inc: DmaIncrement,
    /// Bus transfer width
    pub transfer_size: TransferSize,
    /// Burst length
    pub burst_len: BurstLen,
    /// Byte swapping
    pub swap: ByteSwap,
}

impl ChannelParams {
    /// Memory to UniPro parameters targeting the given request line
    #[must_use]
    pub const fn mem_to_unipro(peripheral_id: u32) -> Self {
        Self {
            src_dev: DmaDevice::Memory,
            src_devid: 0,
            src_inc: DmaIncrement::Auto,
            dst_dev: DmaDevice::Unipro,
            dst_devid: peripheral_id,
            dst_inc: DmaIncrement::Auto,
            transfer_size: TransferSize::Bits64,
            burst_len: BurstLen::Burst16,
            swap: ByteSwap::None,
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Set of events reported for one DMA operation.
///
/// A single notification may carry several events; the engine handles them
/// in the order START, COMPLETE, ERROR, RECOVERED, DEQUEUED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaEvents(u8);

impl DmaEvents {
    /// No events
    pub const NONE: Self = Self(0);
    /// Operation is about to move data
    pub const START: Self = Self(1 << 0);
    /// Operation finished
    pub const COMPLETE: Self = Self(1 << 1);
    /// Operation hit a flow-control error
    pub const ERROR: Self = Self(1 << 2);
    /// Hardware recovered from a previous error
    pub const RECOVERED: Self = Self(1 << 3);
    /// Operation was removed from the channel before completing
    pub const DEQUEUED: Self = Self(1 << 4);
    /// Every event the engine subscribes to
    pub const ALL: Self = Self(0x1F);

    /// Create from raw bits
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bits
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every event in `other` is set
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// Check whether no event is set
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for DmaEvents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for DmaEvents {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// =============================================================================
// Transfers
// =============================================================================

/// Opaque token identifying the descriptor an operation belongs to.
///
/// Packs the descriptor slot and its generation, so events arriving after the
/// descriptor was freed are recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct XferTag(u32);

impl XferTag {
    pub(crate) const fn new(slot: u16, generation: u16) -> Self {
        Self(((generation as u32) << 16) | slot as u32)
    }

    /// Rebuild a tag from the raw value stored by the DMA driver
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value for storage in a hardware operation descriptor
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn slot(self) -> u16 {
        self.0 as u16
    }

    #[inline]
    pub(crate) const fn generation(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

/// One scatter-gather operation handed to [`DmaController::enqueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaTransfer {
    /// Descriptor the events belong to
    pub tag: XferTag,
    /// Source address in memory
    pub src_addr: usize,
    /// Destination address in the CPort TX buffer
    pub dst_addr: usize,
    /// Bytes to move
    pub len: usize,
    /// Events to report back
    pub events: DmaEvents,
}

// =============================================================================
// DMA Controller Trait
// =============================================================================

/// General purpose DMA controller service
///
/// Methods take `&self`: the service is shared between the dispatcher and
/// the event context and is expected to serialize its own register access.
/// [`enqueue`](Self::enqueue) and [`dequeue`](Self::dequeue) may report
/// events synchronously; the engine never holds its own locks across them.
pub trait DmaController {
    /// Channel handle
    type Channel: Copy;
    /// Operation descriptor handle
    type Op: Copy;

    /// Open the controller
    fn open(&self) -> HwResult<()>;

    /// Close the controller
    fn close(&self);

    /// Number of channels not yet allocated
    fn free_channel_count(&self) -> usize;

    /// Allocate a channel
    fn alloc_channel(&self, params: &ChannelParams) -> HwResult<Self::Channel>;

    /// Return a channel
    fn free_channel(&self, chan: Self::Channel);

    /// Allocate an operation descriptor with `sg_count` entries
    fn op_alloc(&self, sg_count: usize) -> HwResult<Self::Op>;

    /// Release an operation descriptor
    fn op_free(&self, op: Self::Op) -> HwResult<()>;

    /// Queue an operation on a channel
    fn enqueue(&self, chan: Self::Channel, op: Self::Op, xfer: &DmaTransfer) -> HwResult<()>;

    /// Remove a queued operation; the controller reports DEQUEUED for it
    fn dequeue(&self, chan: Self::Channel, op: Self::Op) -> HwResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_contains() {
        let events = DmaEvents::START | DmaEvents::COMPLETE;

        assert!(events.contains(DmaEvents::START));
        assert!(events.contains(DmaEvents::COMPLETE));
        assert!(!events.contains(DmaEvents::ERROR));
        assert!(!events.contains(DmaEvents::NONE));
        assert!(DmaEvents::ALL.contains(DmaEvents::DEQUEUED));
    }

    #[test]
    fn events_from_bits_masks_unknown() {
        assert_eq!(DmaEvents::from_bits(0xFF), DmaEvents::ALL);
        assert!(DmaEvents::from_bits(0xE0).is_empty());
    }

    #[test]
    fn tag_packs_slot_and_generation() {
        let tag = XferTag::new(7, 0x1234);

        assert_eq!(tag.slot(), 7);
        assert_eq!(tag.generation(), 0x1234);
        assert_eq!(XferTag::from_raw(tag.raw()), tag);
    }

    #[test]
    fn mem_to_unipro_params() {
        let params = ChannelParams::mem_to_unipro(3);

        assert_eq!(params.src_dev, DmaDevice::Memory);
        assert_eq!(params.dst_dev, DmaDevice::Unipro);
        assert_eq!(params.dst_devid, 3);
        assert_eq!(params.transfer_size, TransferSize::Bits64);
        assert_eq!(params.burst_len, BurstLen::Burst16);
        assert_eq!(params.swap, ByteSwap::None);
    }
}
