//! DMA event handling.
//!
//! Events for one operation arrive in the DMA driver's interrupt context.
//! START binds the channel's request to the CPort, COMPLETE either finishes
//! the message or frees the channel for the next chunk, ERROR and RECOVERED
//! park and resume the CPort through its TX watermark, and DEQUEUED drops the
//! send.

#[cfg(feature = "log")]
use log::warn;

use super::engine::{TxEngine, TxState};
use crate::driver::callback::Completion;
use crate::driver::error::{Result, TransferError};
use crate::hal::{DmaEvents, TxHardware, XferTag};
use crate::internal::constants::WATERMARK_HALT;
use crate::internal::pool::ChannelState;
use crate::sync::WorkSignal;

/// Send finished by a COMPLETE event
struct Finished {
    completion: Option<Completion>,
    result: Result<()>,
}

impl<H, S, const CPORTS: usize, const CHANNELS: usize, const DESCS: usize>
    TxEngine<H, S, CPORTS, CHANNELS, DESCS>
where
    H: TxHardware,
    S: WorkSignal,
{
    /// Process events the DMA driver reported for the operation tagged `tag`
    ///
    /// Events are handled in the order START, COMPLETE, ERROR, RECOVERED,
    /// DEQUEUED. ERROR and RECOVERED end processing of the notification.
    /// Never blocks; the only wait is the bounded deactivation poll on
    /// RECOVERED.
    ///
    /// # Errors
    ///
    /// - [`TransferError::UnknownTransfer`] for a tag with no live descriptor
    /// - [`TransferError::HardwareSubmitFailure`] if START could not connect
    ///   or activate the request; the chunk is retried by the dispatcher
    /// - [`TransferError::HardwareTransferFailure`] if ERROR parked the CPort
    /// - [`TransferError::RecoveryTimeout`] if the request stayed active
    ///   through the whole RECOVERED poll
    pub fn handle_dma_event(&self, tag: XferTag, events: DmaEvents) -> Result<()> {
        if events.contains(DmaEvents::START) {
            self.on_start(tag)?;
        }
        if events.contains(DmaEvents::COMPLETE) {
            self.on_complete(tag)?;
        }
        if events.contains(DmaEvents::ERROR) {
            return self.on_error(tag);
        }
        if events.contains(DmaEvents::RECOVERED) {
            return self.on_recovered(tag);
        }
        if events.contains(DmaEvents::DEQUEUED) {
            self.on_dequeued(tag)?;
        }
        Ok(())
    }

    fn on_start(&self, tag: XferTag) -> Result<()> {
        let aborted = self.state.with(|st| -> core::result::Result<_, TransferError> {
            let TxState { arena, pool, .. } = st;
            let desc = arena.get_mut(tag).ok_or(TransferError::UnknownTransfer)?;
            let index = desc.channel.ok_or(TransferError::UnknownTransfer)?;

            match pool.bind(index, desc.cport, &self.hw) {
                Ok(()) => Ok(None),
                Err(_err) => {
                    #[cfg(feature = "log")]
                    warn!("cport {}: failed to bind flow control: {}", desc.cport, _err);
                    Ok(desc.abort())
                }
            }
        })?;

        let Some(op) = aborted else {
            return Ok(());
        };
        let _ = self.hw.op_free(op);
        self.signal.post();
        Err(TransferError::HardwareSubmitFailure.into())
    }

    fn on_complete(&self, tag: XferTag) -> Result<()> {
        let finished = self.state.with(|st| -> core::result::Result<_, TransferError> {
            let TxState {
                arena,
                queues,
                pool,
                ..
            } = st;
            let desc = arena.get_mut(tag).ok_or(TransferError::UnknownTransfer)?;
            let cport = desc.cport;
            let index = desc.channel;

            if let Some(op) = desc.op.take() {
                if self.hw.op_free(op).is_err() {
                    #[cfg(feature = "log")]
                    warn!("cport {}: failed to free DMA op", cport);
                }
            }

            if !desc.is_fully_submitted() && !desc.failed {
                desc.detach();
                return Ok(None);
            }

            let result = if desc.failed {
                Err(TransferError::HardwareTransferFailure.into())
            } else {
                Ok(())
            };

            if desc.is_fully_submitted() {
                self.hw.set_eom(cport);
            }
            if let Some(chan) = index.and_then(|index| pool.get(index)) {
                let _ = self.hw.transfer_completed(chan.req);
            }
            queues[usize::from(cport)].remove(tag);
            let completion = arena.free(tag).and_then(|desc| desc.completion);
            Ok(Some(Finished { completion, result }))
        })?;

        if let Some(Finished {
            completion: Some(completion),
            result,
        }) = finished
        {
            completion.complete(result);
        }
        self.signal.post();
        Ok(())
    }

    fn on_error(&self, tag: XferTag) -> Result<()> {
        self.state.with(|st| -> Result<()> {
            let TxState { arena, pool, .. } = st;
            let desc = arena.get_mut(tag).ok_or(TransferError::UnknownTransfer)?;
            let chan = desc
                .channel
                .and_then(|index| pool.get_mut(index))
                .ok_or(TransferError::UnknownTransfer)?;

            if !self.hw.is_activated(chan.req) {
                return Ok(());
            }

            let cport = chan.cport.unwrap_or(desc.cport);
            chan.saved_watermark = self.hw.read_tx_watermark(cport);
            self.hw.write_tx_watermark(cport, WATERMARK_HALT);
            chan.state = ChannelState::Halted;
            desc.failed = true;

            #[cfg(feature = "log")]
            warn!("cport {}: TX error, watermark parked", cport);

            Err(TransferError::HardwareTransferFailure.into())
        })
    }

    fn on_recovered(&self, tag: XferTag) -> Result<()> {
        let limit = self.config.recovery_poll_limit;

        let req = self.state.with(|st| -> core::result::Result<_, TransferError> {
            let TxState { arena, pool, .. } = st;
            let desc = arena.get(tag).ok_or(TransferError::UnknownTransfer)?;
            desc.channel
                .and_then(|index| pool.get(index))
                .map(|chan| chan.req)
                .ok_or(TransferError::UnknownTransfer)
        })?;

        // Poll with the state unlocked; the register restore re-enters below.
        let settled = (0..limit).any(|_| !self.hw.is_activated(req));

        self.state.with(|st| -> Result<()> {
            let TxState { arena, pool, .. } = st;
            let desc = arena.get_mut(tag).ok_or(TransferError::UnknownTransfer)?;
            let chan = desc
                .channel
                .and_then(|index| pool.get_mut(index))
                .ok_or(TransferError::UnknownTransfer)?;

            if chan.state == ChannelState::Halted {
                let cport = chan.cport.unwrap_or(desc.cport);
                self.hw.write_tx_watermark(cport, chan.saved_watermark);
                chan.state = ChannelState::Normal;
                if settled {
                    desc.failed = false;
                }
            }
            let _ = self.hw.transfer_completed(chan.req);

            if settled {
                Ok(())
            } else {
                #[cfg(feature = "log")]
                warn!("cport {}: request still active after recovery", desc.cport);
                Err(TransferError::RecoveryTimeout.into())
            }
        })
    }

    fn on_dequeued(&self, tag: XferTag) -> Result<()> {
        let completion = self.state.with(|st| -> core::result::Result<_, TransferError> {
            let TxState { arena, queues, .. } = st;
            let desc = arena.get_mut(tag).ok_or(TransferError::UnknownTransfer)?;
            if let Some(op) = desc.op.take() {
                let _ = self.hw.op_free(op);
            }
            queues[usize::from(desc.cport)].remove(tag);
            Ok(arena.free(tag).and_then(|desc| desc.completion))
        })?;

        if let Some(completion) = completion {
            completion.complete(Err(TransferError::ConnectionReset.into()));
        }
        self.signal.post();
        Ok(())
    }
}
