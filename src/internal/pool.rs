//! DMA channel pool.
//!
//! Each pool entry pairs a DMA channel with the flow-control request that
//! gates it. Entry 0 carries CPort 0 exclusively; every other CPort shares the
//! remaining entries by modulo. A channel stays connected to the last CPort
//! it served until a different CPort needs it.

use heapless::Vec;

use crate::hal::{FlowControl, HwResult};
use crate::internal::constants::{CONTROL_CHANNEL, CONTROL_CPORT};

/// Pick the pool entry serving `cport` out of `channel_count` entries
///
/// CPort 0 always maps to entry 0. Other CPorts map to
/// `((cport - 1) % (channel_count - 1)) + 1`, which never yields entry 0.
#[must_use]
pub const fn pick_channel(cport: u16, channel_count: usize) -> usize {
    if cport == CONTROL_CPORT || channel_count < 2 {
        return CONTROL_CHANNEL;
    }
    ((cport as usize - 1) % (channel_count - 1)) + 1
}

/// Error-handling state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum ChannelState {
    Normal,
    /// TX watermark forced to zero after a flow-control error
    Halted,
}

#[derive(Debug)]
pub(crate) struct Channel<C, R> {
    pub dma: C,
    pub req: R,
    /// CPort the request is currently connected to
    pub cport: Option<u16>,
    /// Watermark to restore once the channel recovers
    pub saved_watermark: u32,
    pub state: ChannelState,
}

impl<C, R> Channel<C, R> {
    pub const fn new(dma: C, req: R) -> Self {
        Self {
            dma,
            req,
            cport: None,
            saved_watermark: 0,
            state: ChannelState::Normal,
        }
    }
}

pub(crate) struct ChannelPool<C, R, const N: usize> {
    channels: Vec<Channel<C, R>, N>,
}

impl<C, R: Copy, const N: usize> ChannelPool<C, R, N> {
    pub const fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    pub fn push(&mut self, channel: Channel<C, R>) -> Result<(), Channel<C, R>> {
        self.channels.push(channel)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Channel<C, R>> {
        self.channels.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Channel<C, R>> {
        self.channels.get_mut(index)
    }

    /// Remove every channel, leaving the pool empty
    pub fn take_all(&mut self) -> Vec<Channel<C, R>, N> {
        core::mem::take(&mut self.channels)
    }

    /// Point the channel's request at `cport` and activate it
    ///
    /// An active request is deactivated first. The request is only
    /// reconnected when it currently serves a different CPort.
    pub fn bind<F>(&mut self, index: usize, cport: u16, fc: &F) -> HwResult<()>
    where
        F: FlowControl<Request = R> + ?Sized,
    {
        let Some(chan) = self.channels.get_mut(index) else {
            return Err(crate::hal::HwError::NoResource);
        };

        if chan.cport.is_some() && fc.is_activated(chan.req) {
            let _ = fc.deactivate(chan.req);
        }

        if chan.cport != Some(cport) {
            if chan.cport.take().is_some() {
                let _ = fc.disconnect(chan.req);
            }
            fc.connect(cport, chan.req)?;
            chan.cport = Some(cport);
        }

        fc.activate(chan.req)
    }
}
