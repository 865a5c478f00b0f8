//! Transfer descriptors and the arena that stores them.
//!
//! Descriptors live in fixed slots for their whole life, so partial DMA
//! operations can keep referring to them by [`XferTag`]. Every free bumps
//! the slot generation, which turns late hardware events for a recycled
//! slot into lookups that miss instead of touching the wrong send.

use heapless::Vec;

use crate::driver::callback::Completion;
use crate::hal::XferTag;

/// State of one queued send
#[derive(Debug)]
pub(crate) struct TxDescriptor<O> {
    /// Owning CPort
    pub cport: u16,
    /// Source buffer address (borrowed, not owned)
    pub addr: usize,
    /// Total message length
    pub len: usize,
    /// Bytes handed to DMA so far
    pub offset: usize,
    /// Bytes of the operation currently on a channel
    pub in_flight: usize,
    /// Pool index while an operation is outstanding
    pub channel: Option<usize>,
    /// Hardware operation while outstanding
    pub op: Option<O>,
    /// Flow control reported an error for this send
    pub failed: bool,
    /// Caller notification
    pub completion: Option<Completion>,
}

impl<O> TxDescriptor<O> {
    pub const fn new(cport: u16, addr: usize, len: usize, completion: Option<Completion>) -> Self {
        Self {
            cport,
            addr,
            len,
            offset: 0,
            in_flight: 0,
            channel: None,
            op: None,
            failed: false,
            completion,
        }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.len.saturating_sub(self.offset)
    }

    /// Every byte has been handed to DMA
    #[inline]
    pub fn is_fully_submitted(&self) -> bool {
        self.offset >= self.len
    }

    /// Record an operation of `chunk` bytes on `channel`
    pub fn begin(&mut self, channel: usize, op: O, chunk: usize) {
        self.channel = Some(channel);
        self.op = Some(op);
        self.offset += chunk;
        self.in_flight = chunk;
    }

    /// Undo [`begin`](Self::begin) after the hardware refused the operation
    pub fn abort(&mut self) -> Option<O> {
        self.offset -= self.in_flight;
        self.in_flight = 0;
        self.channel = None;
        self.op.take()
    }

    /// Detach from the channel after a partial operation finished
    pub fn detach(&mut self) {
        self.in_flight = 0;
        self.channel = None;
    }
}

struct Slot<O> {
    generation: u16,
    desc: Option<TxDescriptor<O>>,
}

/// Fixed-capacity descriptor storage
pub(crate) struct DescriptorArena<O, const N: usize> {
    slots: [Slot<O>; N],
    free: Vec<u16, N>,
}

impl<O, const N: usize> DescriptorArena<O, N> {
    pub fn new() -> Self {
        debug_assert!(N <= u16::MAX as usize);

        let mut free = Vec::new();
        for slot in (0..N).rev() {
            let _ = free.push(slot as u16);
        }

        Self {
            slots: core::array::from_fn(|_| Slot {
                generation: 0,
                desc: None,
            }),
            free,
        }
    }

    /// Store a descriptor, returning its tag, or `None` when full
    pub fn alloc(&mut self, desc: TxDescriptor<O>) -> Option<XferTag> {
        let slot = self.free.pop()?;
        let entry = &mut self.slots[slot as usize];
        entry.desc = Some(desc);
        Some(XferTag::new(slot, entry.generation))
    }

    pub fn get(&self, tag: XferTag) -> Option<&TxDescriptor<O>> {
        let entry = self.slots.get(tag.slot() as usize)?;
        if entry.generation != tag.generation() {
            return None;
        }
        entry.desc.as_ref()
    }

    pub fn get_mut(&mut self, tag: XferTag) -> Option<&mut TxDescriptor<O>> {
        let entry = self.slots.get_mut(tag.slot() as usize)?;
        if entry.generation != tag.generation() {
            return None;
        }
        entry.desc.as_mut()
    }

    /// Remove a descriptor and retire its tag
    pub fn free(&mut self, tag: XferTag) -> Option<TxDescriptor<O>> {
        let entry = self.slots.get_mut(tag.slot() as usize)?;
        if entry.generation != tag.generation() {
            return None;
        }
        let desc = entry.desc.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        let _ = self.free.push(tag.slot());
        Some(desc)
    }

    /// Descriptors currently stored
    pub fn in_use(&self) -> usize {
        N - self.free.len()
    }
}
