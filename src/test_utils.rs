//! Testing utilities and mock implementations
//!
//! This module provides mock implementations for testing the TX engine
//! on the host without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::sync::atomic::{AtomicUsize, Ordering};
use std::boxed::Box;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::vec::Vec;

use crate::driver::callback::{Completion, ResetCompletion};
use crate::driver::engine::TxEngine;
use crate::driver::error::Result;
use crate::hal::{
    CPortRegisters, ChannelParams, DmaController, DmaEvents, DmaTransfer, FlowControl, HwError,
    HwResult,
};
use crate::sync::WorkSignal;

/// Base address of the simulated CPort TX buffers
pub const MOCK_TX_BUFFER_BASE: usize = 0x5000_0000;

/// Spacing between simulated CPort TX buffers
pub const MOCK_TX_BUFFER_STRIDE: usize = 0x1000;

/// First request handle handed out by the mock
pub const MOCK_FIRST_REQUEST: u8 = 10;

// =============================================================================
// Mock Hardware
// =============================================================================

/// Operation accepted by [`MockHardware::enqueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueuedOp {
    pub chan: u8,
    pub op: u32,
    pub xfer: DmaTransfer,
}

/// Observable state and failure knobs of [`MockHardware`]
#[derive(Debug)]
pub struct MockState {
    // Open/close
    pub fail_dma_open: bool,
    pub fail_fc_open: bool,
    pub dma_open: bool,
    pub fc_open: bool,

    // Allocation
    pub free_channels: usize,
    pub free_requests: usize,
    /// Fail the n-th request allocation (0-based)
    pub fail_request_alloc_at: Option<usize>,
    /// Fail the n-th channel allocation (0-based)
    pub fail_channel_alloc_at: Option<usize>,
    pub request_allocs: usize,
    pub channel_params: Vec<ChannelParams>,
    pub channels_live: Vec<u8>,
    pub requests_live: Vec<u8>,
    pub fail_op_alloc: bool,
    pub next_op: u32,
    pub ops_live: HashSet<u32>,

    // Operations
    /// Errors returned by the next `enqueue` calls, in order
    pub enqueue_errors: VecDeque<HwError>,
    /// Operations waiting for the test to drive their events
    pub pending: VecDeque<EnqueuedOp>,
    /// Every operation ever accepted
    pub submitted: Vec<EnqueuedOp>,
    pub dequeued: Vec<u32>,

    // Flow control
    pub fail_connect: bool,
    pub fail_activate: bool,
    pub connects: Vec<(u16, u8)>,
    pub disconnects: Vec<u8>,
    pub active: HashSet<u8>,
    pub activated_polls: usize,
    pub transfers_completed: Vec<u8>,

    // CPort registers
    pub cport_count: u16,
    pub watermarks: HashMap<u16, u32>,
    pub watermark_writes: Vec<(u16, u32)>,
    pub eoms: Vec<u16>,
    pub resets: Vec<u16>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            fail_dma_open: false,
            fail_fc_open: false,
            dma_open: false,
            fc_open: false,
            free_channels: 4,
            free_requests: 4,
            fail_request_alloc_at: None,
            fail_channel_alloc_at: None,
            request_allocs: 0,
            channel_params: Vec::new(),
            channels_live: Vec::new(),
            requests_live: Vec::new(),
            fail_op_alloc: false,
            next_op: 1,
            ops_live: HashSet::new(),
            enqueue_errors: VecDeque::new(),
            pending: VecDeque::new(),
            submitted: Vec::new(),
            dequeued: Vec::new(),
            fail_connect: false,
            fail_activate: false,
            connects: Vec::new(),
            disconnects: Vec::new(),
            active: HashSet::new(),
            activated_polls: 0,
            transfers_completed: Vec::new(),
            cport_count: 8,
            watermarks: HashMap::new(),
            watermark_writes: Vec::new(),
            eoms: Vec::new(),
            resets: Vec::new(),
        }
    }
}

/// Mock platform implementing every hardware service the engine needs
///
/// Clones share state, so a test can keep a handle after moving one into
/// the engine.
///
/// # Example
///
/// ```ignore
/// let hw = MockHardware::new();
/// hw.state().free_channels = 2;
///
/// let engine = TestEngine::init(TxConfig::new(), hw.clone(), CountingSignal::new())?;
/// engine.async_send(1, b"hello", None)?;
/// engine.dispatch();
///
/// assert_eq!(hw.state().pending.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHardware {
    inner: Arc<Mutex<MockState>>,
}

impl MockHardware {
    /// Create a mock with four channels, four requests and eight CPorts
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the shared state for inspection or to set failure knobs
    ///
    /// Never hold the guard while calling into the engine.
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Take the oldest operation not yet driven by the test
    pub fn pop_pending(&self) -> Option<EnqueuedOp> {
        self.state().pending.pop_front()
    }

    /// Current watermark register value
    pub fn watermark(&self, cport: u16) -> u32 {
        self.state().watermarks.get(&cport).copied().unwrap_or(0)
    }

    /// Force a request's activation state, as the hardware would
    pub fn set_active(&self, req: u8, active: bool) {
        let mut state = self.state();
        if active {
            state.active.insert(req);
        } else {
            state.active.remove(&req);
        }
    }

    /// Request connected to `cport`, if any
    pub fn request_for(&self, cport: u16) -> Option<u8> {
        self.state()
            .connects
            .iter()
            .rev()
            .find(|(c, _)| *c == cport)
            .map(|(_, req)| *req)
    }
}

impl DmaController for MockHardware {
    type Channel = u8;
    type Op = u32;

    fn open(&self) -> HwResult<()> {
        let mut state = self.state();
        if state.fail_dma_open {
            return Err(HwError::Fault);
        }
        state.dma_open = true;
        Ok(())
    }

    fn close(&self) {
        self.state().dma_open = false;
    }

    fn free_channel_count(&self) -> usize {
        let state = self.state();
        state.free_channels.saturating_sub(state.channels_live.len())
    }

    fn alloc_channel(&self, params: &ChannelParams) -> HwResult<u8> {
        let mut state = self.state();
        let index = state.channel_params.len();
        if state.fail_channel_alloc_at == Some(index) {
            return Err(HwError::NoResource);
        }
        state.channel_params.push(*params);
        let chan = index as u8;
        state.channels_live.push(chan);
        Ok(chan)
    }

    fn free_channel(&self, chan: u8) {
        self.state().channels_live.retain(|c| *c != chan);
    }

    fn op_alloc(&self, sg_count: usize) -> HwResult<u32> {
        assert_eq!(sg_count, 1);
        let mut state = self.state();
        if state.fail_op_alloc {
            return Err(HwError::NoResource);
        }
        let op = state.next_op;
        state.next_op += 1;
        state.ops_live.insert(op);
        Ok(op)
    }

    fn op_free(&self, op: u32) -> HwResult<()> {
        if self.state().ops_live.remove(&op) {
            Ok(())
        } else {
            Err(HwError::Fault)
        }
    }

    fn enqueue(&self, chan: u8, op: u32, xfer: &DmaTransfer) -> HwResult<()> {
        let mut state = self.state();
        if let Some(err) = state.enqueue_errors.pop_front() {
            return Err(err);
        }
        let entry = EnqueuedOp {
            chan,
            op,
            xfer: *xfer,
        };
        state.pending.push_back(entry);
        state.submitted.push(entry);
        Ok(())
    }

    fn dequeue(&self, _chan: u8, op: u32) -> HwResult<()> {
        let mut state = self.state();
        state.pending.retain(|entry| entry.op != op);
        state.dequeued.push(op);
        Ok(())
    }
}

impl FlowControl for MockHardware {
    type Request = u8;

    fn open(&self) -> HwResult<()> {
        let mut state = self.state();
        if state.fail_fc_open {
            return Err(HwError::Fault);
        }
        state.fc_open = true;
        Ok(())
    }

    fn close(&self) {
        self.state().fc_open = false;
    }

    fn free_request_count(&self) -> usize {
        let state = self.state();
        state.free_requests.saturating_sub(state.requests_live.len())
    }

    fn alloc_request(&self) -> HwResult<u8> {
        let mut state = self.state();
        let index = state.request_allocs;
        state.request_allocs += 1;
        if state.fail_request_alloc_at == Some(index) {
            return Err(HwError::NoResource);
        }
        let req = MOCK_FIRST_REQUEST + index as u8;
        state.requests_live.push(req);
        Ok(req)
    }

    fn free_request(&self, req: u8) {
        self.state().requests_live.retain(|r| *r != req);
    }

    fn connect(&self, cport: u16, req: u8) -> HwResult<()> {
        let mut state = self.state();
        if state.fail_connect {
            return Err(HwError::Busy);
        }
        state.connects.push((cport, req));
        Ok(())
    }

    fn disconnect(&self, req: u8) -> HwResult<()> {
        self.state().disconnects.push(req);
        Ok(())
    }

    fn activate(&self, req: u8) -> HwResult<()> {
        let mut state = self.state();
        if state.fail_activate {
            return Err(HwError::Fault);
        }
        state.active.insert(req);
        Ok(())
    }

    fn deactivate(&self, req: u8) -> HwResult<()> {
        self.state().active.remove(&req);
        Ok(())
    }

    fn is_activated(&self, req: u8) -> bool {
        let mut state = self.state();
        state.activated_polls += 1;
        state.active.contains(&req)
    }

    fn transfer_completed(&self, req: u8) -> HwResult<()> {
        let mut state = self.state();
        state.transfers_completed.push(req);
        state.active.remove(&req);
        Ok(())
    }

    fn peripheral_id(&self, req: u8) -> u32 {
        0x100 + u32::from(req)
    }
}

impl CPortRegisters for MockHardware {
    fn cport_count(&self) -> u16 {
        self.state().cport_count
    }

    fn tx_buffer_addr(&self, cport: u16) -> usize {
        MOCK_TX_BUFFER_BASE + usize::from(cport) * MOCK_TX_BUFFER_STRIDE
    }

    fn read_tx_watermark(&self, cport: u16) -> u32 {
        self.watermark(cport)
    }

    fn write_tx_watermark(&self, cport: u16, value: u32) {
        let mut state = self.state();
        state.watermarks.insert(cport, value);
        state.watermark_writes.push((cport, value));
    }

    fn set_eom(&self, cport: u16) {
        self.state().eoms.push(cport);
    }

    fn reset_cport(&self, cport: u16) -> HwResult<()> {
        self.state().resets.push(cport);
        Ok(())
    }
}

// =============================================================================
// Event Driving
// =============================================================================

/// Deliver START then COMPLETE for the oldest pending operation
pub fn run_next<S, const CPORTS: usize, const CHANNELS: usize, const DESCS: usize>(
    engine: &TxEngine<MockHardware, S, CPORTS, CHANNELS, DESCS>,
) -> Option<EnqueuedOp>
where
    S: WorkSignal,
{
    let entry = engine.hardware().pop_pending()?;
    engine
        .handle_dma_event(entry.xfer.tag, DmaEvents::START)
        .expect("start");
    engine
        .handle_dma_event(entry.xfer.tag, DmaEvents::COMPLETE)
        .expect("complete");
    Some(entry)
}

/// Dispatch and complete operations until nothing is left to send
pub fn run_to_idle<S, const CPORTS: usize, const CHANNELS: usize, const DESCS: usize>(
    engine: &TxEngine<MockHardware, S, CPORTS, CHANNELS, DESCS>,
) -> Vec<EnqueuedOp>
where
    S: WorkSignal,
{
    let mut done = Vec::new();
    loop {
        engine.dispatch();
        match run_next(engine) {
            Some(entry) => done.push(entry),
            None => return done,
        }
    }
}

// =============================================================================
// Signals and Callbacks
// =============================================================================

/// Non-blocking [`WorkSignal`] counting posts
#[derive(Debug, Default)]
pub struct CountingSignal {
    posts: AtomicUsize,
    total: AtomicUsize,
}

impl CountingSignal {
    pub const fn new() -> Self {
        Self {
            posts: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }

    /// Posts not yet consumed by `wait`
    pub fn pending(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    /// Posts since creation
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl WorkSignal for CountingSignal {
    fn post(&self) {
        self.posts.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn wait(&self) {
        loop {
            let current = self.posts.load(Ordering::SeqCst);
            if current > 0
                && self
                    .posts
                    .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                return;
            }
            std::thread::yield_now();
        }
    }
}

struct LogEntry {
    log: &'static CallbackLog,
    id: usize,
}

/// Records send and reset completions in the order they fire
#[derive(Debug, Default)]
pub struct CallbackLog {
    sends: Mutex<Vec<(usize, Result<()>)>>,
    resets: Mutex<Vec<u16>>,
}

impl CallbackLog {
    /// Leak a fresh log so completions may point at it
    pub fn leak() -> &'static Self {
        Box::leak(Box::default())
    }

    /// Completion recording `(id, result)`
    pub fn completion(&'static self, id: usize) -> Completion {
        let entry: &'static LogEntry = Box::leak(Box::new(LogEntry { log: self, id }));
        Completion::new(record_send, core::ptr::from_ref(entry).cast())
    }

    /// Reset completion recording the CPort
    pub fn reset_completion(&'static self) -> ResetCompletion {
        ResetCompletion::new(record_reset, core::ptr::from_ref(self).cast())
    }

    pub fn sends(&self) -> Vec<(usize, Result<()>)> {
        self.sends
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn resets(&self) -> Vec<u16> {
        self.resets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

fn record_send(result: Result<()>, ctx: *const ()) {
    // SAFETY: ctx was produced from a leaked `LogEntry` in `completion`
    let entry = unsafe { &*ctx.cast::<LogEntry>() };
    entry
        .log
        .sends
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push((entry.id, result));
}

fn record_reset(cport: u16, ctx: *const ()) {
    // SAFETY: ctx was produced from a `&'static CallbackLog`
    let log = unsafe { &*ctx.cast::<CallbackLog>() };
    log.resets
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push(cport);
}
