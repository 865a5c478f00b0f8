//! Core driver components for the UniPro TX DMA engine.
//!
//! - [`config`] - Configuration types and builder patterns
//! - [`error`] - Error types and result aliases
//! - [`callback`] - Completion callbacks carried by sends and resets
//! - [`engine`] - The engine, its queues and the producer API
//! - `dispatch` - The dispatcher pass (methods on [`TxEngine`])
//! - `completion` - DMA event handling (methods on [`TxEngine`])
//! - [`service`] - Dispatcher thread and blocking sends (`std` only)
//!
//! # Example
//!
//! ```ignore
//! use unipro_tx_dma::driver::{TxConfig, TxEngine, Error};
//!
//! let config = TxConfig::new().with_max_channels(3);
//! ```

// Submodules
pub mod callback;
mod completion;
pub mod config;
mod dispatch;
pub mod engine;
pub mod error;
#[cfg(feature = "std")]
pub mod service;

// Re-exports for convenience
pub use callback::{Completion, ResetCallback, ResetCompletion, SendCallback};
pub use config::{HandshakeThreshold, TxConfig};
pub use engine::{TxEngine, TxEngineDefault};
pub use error::{
    ConfigError, ConfigResult, Error, Result, SubmitError, SubmitResult, TransferError,
};
#[cfg(feature = "std")]
pub use service::{DISPATCHER_THREAD_NAME, TxService, TxServiceDefault};
