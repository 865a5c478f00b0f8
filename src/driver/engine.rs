//! TX engine: queues, channel pool and the producer-facing API.
//!
//! The engine owns one FIFO per CPort, a pool of DMA channels and a slot
//! arena of descriptors. Producers queue sends and wake the dispatcher; the
//! dispatcher ([`dispatch`](TxEngine::dispatch)) moves queue heads onto
//! channels; the DMA event context
//! ([`handle_dma_event`](TxEngine::handle_dma_event)) advances them.
//!
//! All shared state sits behind one [`CriticalSectionCell`]. Hardware calls
//! that may raise events synchronously (`enqueue`, `dequeue`) and every
//! completion callback run with the cell released.

use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "log")]
use log::{info, warn};

use crate::driver::callback::{Completion, ResetCompletion};
use crate::driver::config::TxConfig;
use crate::driver::error::{ConfigError, Result, SubmitError, TransferError};
use crate::hal::{DmaController, FlowControl, TxHardware};
use crate::internal::constants::{
    DEFAULT_CPORTS, DEFAULT_DESCRIPTORS, DEFAULT_MAX_CHANNELS, MIN_CHANNELS,
};
use crate::internal::descriptor::{DescriptorArena, TxDescriptor};
use crate::internal::pool::{Channel, ChannelPool};
use crate::internal::queue::CPortQueue;
use crate::sync::{CriticalSectionCell, WorkSignal};

type PoolOf<H, const N: usize> =
    ChannelPool<<H as DmaController>::Channel, <H as FlowControl>::Request, N>;

/// Everything guarded by the engine's critical section
pub(crate) struct TxState<H: TxHardware, const CPORTS: usize, const CHANNELS: usize, const DESCS: usize>
{
    pub(crate) arena: DescriptorArena<<H as DmaController>::Op, DESCS>,
    pub(crate) queues: [CPortQueue<DESCS>; CPORTS],
    pub(crate) pool: PoolOf<H, CHANNELS>,
    /// CPort the next dispatch pass starts from
    pub(crate) next_cport: u16,
}

/// UniPro TX DMA engine
///
/// # Type Parameters
///
/// * `H` - Platform hardware (DMA controller, flow control, CPort registers)
/// * `S` - Dispatcher wake-up signal
/// * `CPORTS` - Number of CPorts with a transmit queue
/// * `CHANNELS` - Maximum channels held in the pool
/// * `DESCS` - Maximum sends outstanding across all CPorts
pub struct TxEngine<
    H: TxHardware,
    S: WorkSignal,
    const CPORTS: usize,
    const CHANNELS: usize,
    const DESCS: usize,
> {
    pub(super) hw: H,
    pub(super) signal: S,
    pub(super) config: TxConfig,
    pub(super) cport_count: u16,
    pub(super) state: CriticalSectionCell<TxState<H, CPORTS, CHANNELS, DESCS>>,
    pub(super) running: AtomicBool,
    torn_down: AtomicBool,
}

/// Engine sized with the default CPort, channel and descriptor counts
pub type TxEngineDefault<H, S> =
    TxEngine<H, S, { DEFAULT_CPORTS }, { DEFAULT_MAX_CHANNELS }, { DEFAULT_DESCRIPTORS }>;

impl<H, S, const CPORTS: usize, const CHANNELS: usize, const DESCS: usize>
    TxEngine<H, S, CPORTS, CHANNELS, DESCS>
where
    H: TxHardware,
    S: WorkSignal,
{
    // =========================================================================
    // Initialization
    // =========================================================================

    /// Open the hardware services and secure the channel pool
    ///
    /// Programs the handshake threshold into every CPort's TX watermark, then
    /// allocates `min(max_channels, CHANNELS, free channels, free requests)`
    /// channel/request pairs. Anything allocated is released again on failure.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidConfig`] if the configuration is rejected
    /// - [`ConfigError::NoDevice`] if a service cannot be opened or fewer
    ///   than two channels are available
    /// - [`ConfigError::AllocationFailed`] if a request or channel allocation
    ///   fails
    pub fn init(config: TxConfig, hw: H, signal: S) -> Result<Self> {
        config.validate()?;

        if DmaController::open(&hw).is_err() {
            #[cfg(feature = "log")]
            warn!("unipro tx: DMA controller unavailable");
            return Err(ConfigError::NoDevice.into());
        }

        let threshold = config.handshake.to_watermark_bits();
        for cport in 0..hw.cport_count() {
            let value = hw.read_tx_watermark(cport);
            hw.write_tx_watermark(cport, value | threshold);
        }

        if FlowControl::open(&hw).is_err() {
            #[cfg(feature = "log")]
            warn!("unipro tx: flow control unavailable");
            DmaController::close(&hw);
            return Err(ConfigError::NoDevice.into());
        }

        let usable = config
            .max_channels
            .min(CHANNELS)
            .min(hw.free_channel_count())
            .min(hw.free_request_count());
        if usable < MIN_CHANNELS {
            #[cfg(feature = "log")]
            warn!("unipro tx: only {} channels available", usable);
            Self::close_services(&hw);
            return Err(ConfigError::NoDevice.into());
        }

        let mut pool = ChannelPool::new();
        for _ in 0..usable {
            if let Err(err) = Self::alloc_channel(&hw, &config, &mut pool) {
                for chan in pool.take_all() {
                    Self::release_channel(&hw, chan);
                }
                Self::close_services(&hw);
                return Err(err.into());
            }
        }

        #[cfg(feature = "log")]
        info!("unipro tx: {} DMA channels ready", pool.len());

        let cport_count = hw.cport_count().min(u16::try_from(CPORTS).unwrap_or(u16::MAX));

        Ok(Self {
            hw,
            signal,
            config,
            cport_count,
            state: CriticalSectionCell::new(TxState {
                arena: DescriptorArena::new(),
                queues: core::array::from_fn(|_| CPortQueue::new()),
                pool,
                next_cport: 0,
            }),
            running: AtomicBool::new(true),
            torn_down: AtomicBool::new(false),
        })
    }

    fn alloc_channel(
        hw: &H,
        config: &TxConfig,
        pool: &mut PoolOf<H, CHANNELS>,
    ) -> core::result::Result<(), ConfigError> {
        let req = hw
            .alloc_request()
            .map_err(|_| ConfigError::AllocationFailed)?;

        let params = config.channel_params(hw.peripheral_id(req));
        let dma = match hw.alloc_channel(&params) {
            Ok(dma) => dma,
            Err(_) => {
                hw.free_request(req);
                return Err(ConfigError::AllocationFailed);
            }
        };

        pool.push(Channel::new(dma, req)).map_err(|chan| {
            Self::release_channel(hw, chan);
            ConfigError::AllocationFailed
        })
    }

    fn release_channel(
        hw: &H,
        chan: Channel<<H as DmaController>::Channel, <H as FlowControl>::Request>,
    ) {
        if chan.cport.is_some() {
            if hw.is_activated(chan.req) {
                let _ = hw.deactivate(chan.req);
            }
            let _ = hw.disconnect(chan.req);
        }
        hw.free_channel(chan.dma);
        hw.free_request(chan.req);
    }

    fn close_services(hw: &H) {
        FlowControl::close(hw);
        DmaController::close(hw);
    }

    // =========================================================================
    // Producer API
    // =========================================================================

    /// Queue `buf` for transmission on `cport`
    ///
    /// Returns once the send is queued; `completion` fires exactly once when
    /// it finishes, fails or is dropped by a reset. Zero-length buffers are
    /// accepted and complete after a single empty operation.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::Stopped`] after [`stop`](Self::stop)
    /// - [`SubmitError::InvalidCPort`] if `cport` is out of range
    /// - [`SubmitError::Backpressure`] while a reset is pending on `cport`
    /// - [`SubmitError::OutOfMemory`] if every descriptor is in use
    pub fn async_send(
        &self,
        cport: u16,
        buf: &'static [u8],
        completion: Option<Completion>,
    ) -> Result<()> {
        // SAFETY: a 'static buffer outlives every DMA operation.
        unsafe { self.async_send_raw(cport, buf.as_ptr(), buf.len(), completion) }
    }

    /// Queue a raw buffer for transmission on `cport`
    ///
    /// # Safety
    ///
    /// `len` bytes at `addr` must stay valid and unmodified until
    /// `completion` fires. Without a completion the buffer must simply
    /// outlive the engine.
    ///
    /// # Errors
    ///
    /// Same as [`async_send`](Self::async_send).
    pub unsafe fn async_send_raw(
        &self,
        cport: u16,
        addr: *const u8,
        len: usize,
        completion: Option<Completion>,
    ) -> Result<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(SubmitError::Stopped.into());
        }
        self.check_cport(cport)?;

        self.state.with(|st| {
            let TxState { arena, queues, .. } = st;
            let queue = &mut queues[usize::from(cport)];
            if queue.pending_reset {
                return Err(SubmitError::Backpressure);
            }
            let tag = arena
                .alloc(TxDescriptor::new(cport, addr as usize, len, completion))
                .ok_or(SubmitError::OutOfMemory)?;
            if queue.push_back(tag).is_err() {
                arena.free(tag);
                return Err(SubmitError::OutOfMemory);
            }
            Ok(())
        })?;

        self.signal.post();
        Ok(())
    }

    /// Mark `cport` for reset
    ///
    /// New sends on the CPort are refused until the dispatcher has dropped
    /// every queued send not yet on a channel, reset the CPort and fired
    /// `completion`.
    ///
    /// # Errors
    ///
    /// [`SubmitError::InvalidCPort`] if `cport` is out of range.
    pub fn request_reset(&self, cport: u16, completion: Option<ResetCompletion>) -> Result<()> {
        self.check_cport(cport)?;
        self.state.with(|st| {
            let queue = &mut st.queues[usize::from(cport)];
            queue.pending_reset = true;
            if completion.is_some() {
                queue.reset_completion = completion;
            }
        });
        self.signal.post();
        Ok(())
    }

    /// Wake the dispatcher so it processes a pending reset on `cport`
    pub fn reset_notify(&self, _cport: u16) {
        self.signal.post();
    }

    fn check_cport(&self, cport: u16) -> Result<()> {
        if cport >= self.cport_count {
            #[cfg(feature = "log")]
            warn!("unipro tx: invalid cport {}, dropping message", cport);
            return Err(SubmitError::InvalidCPort.into());
        }
        Ok(())
    }

    // =========================================================================
    // Dispatcher Lifecycle
    // =========================================================================

    /// Run dispatch passes until [`stop`](Self::stop) is called
    ///
    /// Blocks on the work signal between passes. Intended as the body of
    /// the dedicated dispatcher context.
    pub fn run(&self) {
        loop {
            self.signal.wait();
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            self.dispatch();
        }
    }

    /// Refuse new sends and make [`run`](Self::run) return
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            self.signal.post();
        }
    }

    /// Check whether the engine accepts sends
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the engine and release every resource
    ///
    /// Call only once the dispatcher has returned from [`run`](Self::run).
    /// In-flight operations are dequeued; every outstanding send completes
    /// with [`TransferError::ConnectionReset`] and every pending reset fires
    /// its completion. Calling it again is a no-op.
    pub fn teardown(&self) {
        self.stop();
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }

        for cport in 0..self.cport_count {
            self.drain_cport(cport);
        }

        let channels = self.state.with(|st| st.pool.take_all());
        for chan in channels {
            Self::release_channel(&self.hw, chan);
        }
        Self::close_services(&self.hw);

        #[cfg(feature = "log")]
        info!("unipro tx: torn down");
    }

    fn drain_cport(&self, cport: u16) {
        loop {
            let drained = self.state.with(|st| {
                let TxState {
                    arena,
                    queues,
                    pool,
                    ..
                } = st;
                let tag = queues[usize::from(cport)].pop_back()?;
                let desc = arena.free(tag)?;
                let in_flight = match (desc.channel, desc.op) {
                    (Some(index), Some(op)) => pool.get(index).map(|chan| (chan.dma, op)),
                    _ => None,
                };
                Some((desc.completion, in_flight))
            });
            let Some((completion, in_flight)) = drained else {
                break;
            };

            if let Some((dma, op)) = in_flight {
                let _ = self.hw.dequeue(dma, op);
                let _ = self.hw.op_free(op);
            }
            if let Some(completion) = completion {
                completion.complete(Err(TransferError::ConnectionReset.into()));
            }
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

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Configuration the engine was built with
    pub fn config(&self) -> &TxConfig {
        &self.config
    }

    /// Platform hardware
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Dispatcher wake-up signal
    pub fn signal(&self) -> &S {
        &self.signal
    }

    /// Number of CPorts accepting sends
    pub fn cport_count(&self) -> u16 {
        self.cport_count
    }

    /// Number of channels in the pool
    pub fn channel_count(&self) -> usize {
        self.state.with_ref(|st| st.pool.len())
    }

    /// Sends queued on `cport`, including one on a channel
    pub fn queued(&self, cport: u16) -> usize {
        self.state
            .with_ref(|st| st.queues.get(usize::from(cport)).map_or(0, CPortQueue::len))
    }

    /// Sends accepted but not yet completed, across all CPorts
    pub fn outstanding(&self) -> usize {
        self.state.with_ref(|st| st.arena.in_use())
    }

    /// Check whether a reset is waiting for the dispatcher
    pub fn is_reset_pending(&self, cport: u16) -> bool {
        self.state.with_ref(|st| {
            st.queues
                .get(usize::from(cport))
                .is_some_and(|queue| queue.pending_reset)
        })
    }

    /// CPort the channel's request is currently connected to
    pub fn channel_cport(&self, index: usize) -> Option<u16> {
        self.state
            .with_ref(|st| st.pool.get(index).and_then(|chan| chan.cport))
    }
}
