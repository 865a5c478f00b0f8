//! Internal Implementation Details
//!
//! This module contains implementation details that are not part of the public API.
//! Types in this module may change without notice between minor versions.
//!
//! # Contents
//!
//! - [`constants`]: Internal constants and magic numbers
//! - [`descriptor`]: Transfer descriptors and their slot arena
//! - [`queue`]: Per-CPort FIFO of descriptor tags
//! - [`pool`]: DMA channel / flow-control request pool
//!
//! # Stability
//!
//! **WARNING:** Apart from the items re-exported at the crate root, everything
//! here is `pub(crate)` only and subject to change without notice.

pub(crate) mod constants;
pub(crate) mod descriptor;
pub(crate) mod pool;
pub(crate) mod queue;
