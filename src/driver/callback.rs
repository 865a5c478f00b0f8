//! Completion callbacks handed in by producers.
//!
//! Callbacks are plain function pointers plus an opaque context pointer so
//! descriptors stay allocation-free. They run from the dispatcher (flush),
//! from the DMA event context (complete, dequeued) or from teardown, never
//! while engine state is locked, and may submit new sends.

use super::error::Result;

/// Send completion function: receives the final status and the context
pub type SendCallback = fn(result: Result<()>, ctx: *const ());

/// Reset completion function: receives the CPort and the context
pub type ResetCallback = fn(cport: u16, ctx: *const ());

/// Callback fired exactly once when a send finishes, fails or is dropped
#[derive(Debug, Clone, Copy)]
pub struct Completion {
    callback: SendCallback,
    ctx: *const (),
}

impl Completion {
    /// Create a completion with a context pointer
    ///
    /// The context must stay valid until the callback has run.
    #[must_use]
    pub const fn new(callback: SendCallback, ctx: *const ()) -> Self {
        Self { callback, ctx }
    }

    /// Create a completion without context
    #[must_use]
    pub const fn from_fn(callback: SendCallback) -> Self {
        Self {
            callback,
            ctx: core::ptr::null(),
        }
    }

    #[inline]
    pub(crate) fn complete(self, result: Result<()>) {
        (self.callback)(result, self.ctx);
    }
}

// SAFETY: the context pointer is opaque to the engine and only handed back to
// the producer's callback; the producer vouches for its thread safety.
unsafe impl Send for Completion {}

/// Callback fired once a pending CPort reset has been carried out
#[derive(Debug, Clone, Copy)]
pub struct ResetCompletion {
    callback: ResetCallback,
    ctx: *const (),
}

impl ResetCompletion {
    /// Create a reset completion with a context pointer
    #[must_use]
    pub const fn new(callback: ResetCallback, ctx: *const ()) -> Self {
        Self { callback, ctx }
    }

    #[inline]
    pub(crate) fn complete(self, cport: u16) {
        (self.callback)(cport, self.ctx);
    }
}

// SAFETY: see `Completion`.
unsafe impl Send for ResetCompletion {}
