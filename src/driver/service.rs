//! Hosted TX service: dispatcher thread plus blocking sends.
//!
//! Wraps a [`TxEngine`] driven by a condvar [`Semaphore`] and runs
//! [`TxEngine::run`] on a dedicated named thread. The DMA driver glue keeps
//! calling [`TxEngine::handle_dma_event`] through [`TxService::engine`].

#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

use std::string::String;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

#[cfg(feature = "log")]
use log::warn;

use super::callback::{Completion, ResetCompletion};
use super::config::TxConfig;
use super::engine::TxEngine;
use super::error::{ConfigError, Result, SubmitError, TransferError};
use crate::hal::{DmaController, FlowControl, TxHardware};
use crate::internal::constants::{DEFAULT_CPORTS, DEFAULT_DESCRIPTORS, DEFAULT_MAX_CHANNELS};
use crate::sync::{Semaphore, WorkSignal};

/// Name of the dispatcher thread
pub const DISPATCHER_THREAD_NAME: &str = "unipro-tx";

/// Engine plus the thread running its dispatcher
///
/// Dropping the service stops the dispatcher, joins it and tears the engine
/// down.
pub struct TxService<H: TxHardware, const CPORTS: usize, const CHANNELS: usize, const DESCS: usize>
{
    engine: Arc<TxEngine<H, Semaphore, CPORTS, CHANNELS, DESCS>>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

/// Service sized with the default CPort, channel and descriptor counts
pub type TxServiceDefault<H> =
    TxService<H, { DEFAULT_CPORTS }, { DEFAULT_MAX_CHANNELS }, { DEFAULT_DESCRIPTORS }>;

impl<H, const CPORTS: usize, const CHANNELS: usize, const DESCS: usize>
    TxService<H, CPORTS, CHANNELS, DESCS>
where
    H: TxHardware + Send + Sync + 'static,
    <H as DmaController>::Channel: Send,
    <H as DmaController>::Op: Send,
    <H as FlowControl>::Request: Send,
{
    /// Initialize the engine and spawn its dispatcher thread
    ///
    /// # Errors
    ///
    /// Any error from [`TxEngine::init`], or [`ConfigError::WorkerSpawn`] if
    /// the thread cannot be created (the engine is torn down again).
    pub fn start(config: TxConfig, hw: H) -> Result<Self> {
        let engine = Arc::new(TxEngine::init(config, hw, Semaphore::new(0))?);

        let runner = Arc::clone(&engine);
        let worker = thread::Builder::new()
            .name(String::from(DISPATCHER_THREAD_NAME))
            .spawn(move || runner.run());
        let worker = match worker {
            Ok(worker) => worker,
            Err(_err) => {
                #[cfg(feature = "log")]
                warn!("unipro tx: cannot spawn dispatcher: {}", _err);
                engine.teardown();
                return Err(ConfigError::WorkerSpawn.into());
            }
        };
        let worker_id = worker.thread().id();

        Ok(Self {
            engine,
            worker: Some(worker),
            worker_id,
        })
    }

    /// Queue `buf` and block until it has been sent or dropped
    ///
    /// # Errors
    ///
    /// - [`SubmitError::WouldDeadlock`] when called on the dispatcher thread
    /// - Any rejection from [`TxEngine::async_send`]
    /// - The transfer error the send completed with
    pub fn sync_send(&self, cport: u16, buf: &[u8]) -> Result<()> {
        if thread::current().id() == self.worker_id {
            return Err(SubmitError::WouldDeadlock.into());
        }

        let waiter = Arc::new(SyncWaiter::new());
        let ctx = Arc::into_raw(Arc::clone(&waiter)).cast::<()>();
        let completion = Completion::new(sync_send_done, ctx);

        // SAFETY: `buf` stays borrowed until the completion has fired, and the
        // engine fires it only once the descriptor no longer references `buf`.
        let queued =
            unsafe { self.engine.async_send_raw(cport, buf.as_ptr(), buf.len(), Some(completion)) };
        if let Err(err) = queued {
            // SAFETY: the completion was never stored; reclaim its reference.
            drop(unsafe { Arc::from_raw(ctx.cast::<SyncWaiter>()) });
            return Err(err);
        }

        waiter.wait()
    }
}

impl<H: TxHardware, const CPORTS: usize, const CHANNELS: usize, const DESCS: usize>
    TxService<H, CPORTS, CHANNELS, DESCS>
{
    /// Queue `buf` without waiting; see [`TxEngine::async_send`]
    ///
    /// # Errors
    ///
    /// Same as [`TxEngine::async_send`].
    pub fn async_send(
        &self,
        cport: u16,
        buf: &'static [u8],
        completion: Option<Completion>,
    ) -> Result<()> {
        self.engine.async_send(cport, buf, completion)
    }

    /// Mark `cport` for reset; see [`TxEngine::request_reset`]
    ///
    /// # Errors
    ///
    /// Same as [`TxEngine::request_reset`].
    pub fn request_reset(&self, cport: u16, completion: Option<ResetCompletion>) -> Result<()> {
        self.engine.request_reset(cport, completion)
    }

    /// Wake the dispatcher for a pending reset
    pub fn reset_notify(&self, cport: u16) {
        self.engine.reset_notify(cport);
    }

    /// Engine shared with the DMA event context
    pub fn engine(&self) -> &Arc<TxEngine<H, Semaphore, CPORTS, CHANNELS, DESCS>> {
        &self.engine
    }

    /// Stop the dispatcher and release the hardware
    pub fn shutdown(mut self) {
        self.stop_worker();
        self.engine.teardown();
    }

    fn stop_worker(&mut self) {
        self.engine.stop();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                #[cfg(feature = "log")]
                warn!("unipro tx: dispatcher panicked");
            }
        }
    }
}

impl<H: TxHardware, const CPORTS: usize, const CHANNELS: usize, const DESCS: usize> Drop
    for TxService<H, CPORTS, CHANNELS, DESCS>
{
    fn drop(&mut self) {
        self.stop_worker();
        self.engine.teardown();
    }
}

/// Rendezvous between a blocked `sync_send` caller and its completion
struct SyncWaiter {
    done: Semaphore,
    result: Mutex<Option<Result<()>>>,
}

impl SyncWaiter {
    const fn new() -> Self {
        Self {
            done: Semaphore::new(0),
            result: Mutex::new(None),
        }
    }

    fn finish(&self, result: Result<()>) {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
        self.done.post();
    }

    fn wait(&self) -> Result<()> {
        self.done.wait();
        self.result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or(Err(TransferError::ConnectionReset.into()))
    }
}

fn sync_send_done(result: Result<()>, ctx: *const ()) {
    // SAFETY: ctx is the reference leaked by `sync_send` for this completion,
    // which fires exactly once.
    let waiter = unsafe { Arc::from_raw(ctx.cast::<SyncWaiter>()) };
    waiter.finish(result);
}
