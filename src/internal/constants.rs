//! Centralized Constants
//!
//! Single source of truth for the magic numbers used by the TX engine.
//!
//! # Organization
//!
//! Constants are grouped by category:
//! - **Pool sizing**: Channel and descriptor defaults
//! - **Transfer sizing**: Per-operation capacity and buffer layout
//! - **Flow control**: TX watermark handshake values
//! - **Recovery**: Bounded polling limits
//!
//! Register layouts belong to the platform's `CPortRegisters` implementation
//! and are not described here.

// =============================================================================
// Pool Sizing
// =============================================================================

/// Minimum usable channels: channel 0 is reserved for CPort 0
pub const MIN_CHANNELS: usize = 2;

/// Default upper bound on channels taken from the DMA controller
pub const DEFAULT_MAX_CHANNELS: usize = 4;

/// Default number of CPorts managed by an engine
pub const DEFAULT_CPORTS: usize = 44;

/// Default number of descriptors (outstanding sends across all CPorts)
pub const DEFAULT_DESCRIPTORS: usize = 64;

/// CPort reserved for control traffic
pub const CONTROL_CPORT: u16 = 0;

/// Channel reserved for [`CONTROL_CPORT`]
pub const CONTROL_CHANNEL: usize = 0;

// =============================================================================
// Transfer Sizing
// =============================================================================

/// Default maximum bytes moved by one DMA operation
pub const DEFAULT_TRANSPORT_CAPACITY: usize = 2048;

/// Bytes skipped at the start of the CPort TX buffer when resuming a
/// partially sent message (one 64-bit word)
pub const RESUME_DST_SKIP: usize = core::mem::size_of::<u64>();

/// Scatter-gather entries per DMA operation
pub const SG_ENTRIES_PER_OP: usize = 1;

// =============================================================================
// Flow Control
// =============================================================================

/// Bit position of the handshake threshold in the TX watermark register
pub const HANDSHAKE_THRESHOLD_SHIFT: u32 = 8;

/// Handshake threshold for the standard TX path
pub const HANDSHAKE_THRESHOLD_STANDARD: u32 = 0x20;

/// Handshake threshold when the write-merge buffer is in use
pub const HANDSHAKE_THRESHOLD_WMB: u32 = 0x10;

/// Watermark value that halts hardware data issuance
pub const WATERMARK_HALT: u32 = 0;

// =============================================================================
// Recovery
// =============================================================================

/// Iterations spent waiting for request deactivation after a TX error
pub const RECOVERY_POLL_LIMIT: u32 = 100;
