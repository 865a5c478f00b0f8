//! Dispatcher pass: CPort scan, channel submission and reset flushing.

#[cfg(feature = "log")]
use log::{debug, warn};

use super::engine::{TxEngine, TxState};
use crate::driver::error::TransferError;
use crate::hal::{DmaEvents, DmaTransfer, HwError, TxHardware, XferTag};
use crate::internal::constants::{RESUME_DST_SKIP, SG_ENTRIES_PER_OP};
use crate::internal::pool::pick_channel;
use crate::sync::WorkSignal;

/// What a pass does with one CPort
enum CPortWork {
    Idle,
    Flush,
    Submit(XferTag),
}

impl<H: TxHardware, const CPORTS: usize, const CHANNELS: usize, const DESCS: usize>
    TxState<H, CPORTS, CHANNELS, DESCS>
{
    fn work_for(&self, cport: u16) -> CPortWork {
        let Some(queue) = self.queues.get(usize::from(cport)) else {
            return CPortWork::Idle;
        };
        if queue.pending_reset {
            return CPortWork::Flush;
        }
        let Some(tag) = queue.front() else {
            return CPortWork::Idle;
        };
        match self.arena.get(tag) {
            Some(desc) if desc.channel.is_none() => CPortWork::Submit(tag),
            _ => CPortWork::Idle,
        }
    }
}

impl<H, S, const CPORTS: usize, const CHANNELS: usize, const DESCS: usize>
    TxEngine<H, S, CPORTS, CHANNELS, DESCS>
where
    H: TxHardware,
    S: WorkSignal,
{
    /// Run one pass over every CPort
    ///
    /// Starting after the CPort serviced last, each CPort is visited once:
    /// a pending reset is flushed, and an idle queue head is submitted on the
    /// CPort's channel. A CPort whose submission fails is skipped until the
    /// next pass. Returns the number of operations handed to the hardware.
    pub fn dispatch(&self) -> usize {
        let count = usize::from(self.cport_count);
        if count == 0 {
            return 0;
        }

        let start = self.state.with_ref(|st| usize::from(st.next_cport)) % count;
        let mut last_serviced = None;
        let mut started = 0;

        for step in 0..count {
            let cport = ((start + step) % count) as u16;
            match self.state.with_ref(|st| st.work_for(cport)) {
                CPortWork::Idle => {}
                CPortWork::Flush => {
                    self.flush(cport);
                    last_serviced = Some(cport);
                }
                CPortWork::Submit(tag) => match self.submit(cport, tag) {
                    Ok(()) => {
                        started += 1;
                        last_serviced = Some(cport);
                    }
                    Err(err) => Self::report_submit_failure(cport, err),
                },
            }
        }

        if let Some(cport) = last_serviced {
            let next = ((usize::from(cport) + 1) % count) as u16;
            self.state.with(|st| st.next_cport = next);
        }
        started
    }

    /// Hand the next chunk of the descriptor at the head of `cport` to DMA
    fn submit(&self, cport: u16, tag: XferTag) -> Result<(), HwError> {
        let op = self.hw.op_alloc(SG_ENTRIES_PER_OP)?;
        let capacity = self.config.transport_capacity;

        let prepared = self.state.with(|st| {
            let TxState { arena, pool, .. } = st;
            let index = pick_channel(cport, pool.len());
            let dma = pool.get(index)?.dma;
            let desc = arena.get_mut(tag)?;
            if desc.channel.is_some() {
                return None;
            }

            let chunk = desc.remaining().min(capacity);
            let mut dst_addr = self.hw.tx_buffer_addr(cport);
            if desc.offset != 0 {
                dst_addr += RESUME_DST_SKIP;
            }
            let xfer = DmaTransfer {
                tag,
                src_addr: desc.addr + desc.offset,
                dst_addr,
                len: chunk,
                events: DmaEvents::ALL,
            };
            desc.begin(index, op, chunk);
            Some((dma, xfer))
        });

        let Some((dma, xfer)) = prepared else {
            let _ = self.hw.op_free(op);
            return Err(HwError::Fault);
        };

        #[cfg(feature = "log")]
        debug!("xfer: cport={} len={}", cport, xfer.len);

        if let Err(err) = self.hw.enqueue(dma, op, &xfer) {
            self.state.with(|st| {
                if let Some(desc) = st.arena.get_mut(tag) {
                    desc.abort();
                }
            });
            let _ = self.hw.op_free(op);
            return Err(err);
        }
        Ok(())
    }

    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    fn report_submit_failure(cport: u16, err: HwError) {
        match err {
            HwError::NoSpace => {
                #[cfg(feature = "log")]
                debug!("cport {}: no TX FIFO space, retrying later", cport);
            }
            _ => {
                #[cfg(feature = "log")]
                warn!("cport {}: DMA submit failed: {}", cport, err);
            }
        }
    }

    /// Carry out a pending reset on `cport`
    ///
    /// Drops queued sends from the tail until the first one owning a
    /// channel, completing each with [`TransferError::ConnectionReset`]. The
    /// send on a channel is left to finish normally.
    fn flush(&self, cport: u16) {
        loop {
            let dropped = self.state.with(|st| {
                let TxState { arena, queues, .. } = st;
                let queue = &mut queues[usize::from(cport)];
                let tag = queue.back()?;
                if arena.get(tag)?.channel.is_some() {
                    return None;
                }
                queue.pop_back();
                arena.free(tag)
            });
            let Some(desc) = dropped else {
                break;
            };
            if let Some(completion) = desc.completion {
                completion.complete(Err(TransferError::ConnectionReset.into()));
            }
        }

        if let Err(_err) = self.hw.reset_cport(cport) {
            #[cfg(feature = "log")]
            warn!("cport {}: reset failed: {}", cport, _err);
        }

        let reset = self.state.with(|st| {
            let queue = &mut st.queues[usize::from(cport)];
            queue.pending_reset = false;
            queue.reset_completion.take()
        });
        if let Some(reset) = reset {
            reset.complete(cport);
        }
    }
}
