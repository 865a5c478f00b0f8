//! UniPro TX DMA Engine
//!
//! A `no_std`, `no_alloc` transmit path moving messages from memory into
//! UniPro CPort transmit buffers with a general purpose DMA controller.
//!
//! Producers queue messages per CPort. A dispatcher hands the head of each
//! queue to a DMA channel, splitting large messages into operations of at
//! most `transport_capacity` bytes. Hardware events drive each send to
//! completion, and every send reports back through exactly one callback.
//!
//! # Architecture
//!
//! The engine is organized into three layers:
//!
//! 1. **Engine Layer** ([`driver`]): Queues, dispatch pass, DMA event state
//!    machine, and the optional hosted service
//! 2. **Sync Layer** ([`sync`]): Critical-section cell and the dispatcher's
//!    wake-up signal
//! 3. **HAL Layer** ([`hal`]): Traits for the DMA controller, flow-control
//!    requests, and CPort registers the platform provides
//!
//! ## Channel Assignment
//!
//! - CPort 0 owns channel 0
//! - Every other CPort `c` uses channel `((c - 1) % (N - 1)) + 1`
//! - At most one operation per CPort is in flight; messages on a CPort are
//!   sent in order
//!
//! # Features
//!
//! - `std` (default): condvar [`Semaphore`](sync::Semaphore), dispatcher
//!   thread, blocking [`TxService::sync_send`]
//! - `log`: Emit diagnostics through the `log` facade
//! - `defmt`: Enable defmt formatting for public types
//!
//! # Example
//!
//! ```ignore
//! use unipro_tx_dma::{Completion, TxConfig, TxService};
//!
//! // `Platform` implements DmaController + FlowControl + CPortRegisters
//! let service: TxService<Platform, 44, 4, 64> =
//!     TxService::start(TxConfig::new(), Platform::take())?;
//!
//! // DMA interrupt glue
//! let engine = service.engine().clone();
//! platform_on_dma_event(move |tag, events| {
//!     let _ = engine.handle_dma_event(tag, events);
//! });
//!
//! service.sync_send(3, &message)?;
//! service.async_send(5, STATUS_FRAME, Some(Completion::from_fn(on_sent)))?;
//! ```
//!
//! Without `std`, build a [`TxEngine`] directly with a platform
//! [`WorkSignal`](sync::WorkSignal) and call [`TxEngine::run`] from the
//! dispatcher task.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here and in Cargo.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

#[cfg(feature = "std")]
extern crate std;

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod hal;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub(crate) mod test_utils;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::callback::{Completion, ResetCallback, ResetCompletion, SendCallback};
pub use driver::config::{HandshakeThreshold, TxConfig};
pub use driver::engine::{TxEngine, TxEngineDefault};
pub use driver::error::{
    ConfigError, ConfigResult, Error, Result, SubmitError, SubmitResult, TransferError,
};
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub use driver::service::{TxService, TxServiceDefault};
pub use hal::{
    CPortRegisters, DmaController, DmaEvents, DmaTransfer, FlowControl, HwError, HwResult,
    TxHardware, XferTag,
};
pub use internal::pool::pick_channel;

/// Shared engine constants.
///
/// These are grouped into a dedicated module to keep the top-level facade
/// focused on engine types and hardware traits.
pub mod constants {
    pub use crate::internal::constants::{
        // Channels
        CONTROL_CHANNEL,
        CONTROL_CPORT,
        // Pool sizing
        DEFAULT_CPORTS,
        DEFAULT_DESCRIPTORS,
        DEFAULT_MAX_CHANNELS,
        // Transfers
        DEFAULT_TRANSPORT_CAPACITY,
        // Flow control
        HANDSHAKE_THRESHOLD_SHIFT,
        HANDSHAKE_THRESHOLD_STANDARD,
        HANDSHAKE_THRESHOLD_WMB,
        MIN_CHANNELS,
        // Recovery
        RECOVERY_POLL_LIMIT,
        RESUME_DST_SKIP,
        SG_ENTRIES_PER_OP,
        WATERMARK_HALT,
    };
}
