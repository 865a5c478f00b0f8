//! Error types for the UniPro TX DMA engine
//!
//! Errors are organized by the stage at which they surface:
//! - [`ConfigError`]: Bring-up failures returned by `init`
//! - [`SubmitError`]: Synchronous rejections of a send request
//! - [`TransferError`]: Failures delivered through completion callbacks or
//!   returned to the DMA driver from the event handler
//!
//! The unified [`Error`] enum wraps all domain errors and is what callbacks
//! and most engine methods carry.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Initialization errors
///
/// These errors occur while opening the hardware services and securing the
/// channel pool. They are fatal to bringing the engine up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// DMA or flow-control service unavailable, or fewer than two usable
    /// channels
    NoDevice,
    /// A request or DMA channel allocation failed part way through the pool
    AllocationFailed,
    /// Invalid configuration parameter
    InvalidConfig,
    /// The dispatcher thread could not be spawned
    WorkerSpawn,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::NoDevice => "no such device",
            ConfigError::AllocationFailed => "channel allocation failed",
            ConfigError::InvalidConfig => "invalid configuration",
            ConfigError::WorkerSpawn => "failed to spawn dispatcher",
        }
    }
}

// =============================================================================
// Submission Errors
// =============================================================================

/// Send request rejections
///
/// Returned synchronously by `async_send`/`sync_send`; no descriptor exists
/// when one of these is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubmitError {
    /// CPort id is not managed by this engine
    InvalidCPort,
    /// CPort is being reset
    Backpressure,
    /// Descriptor storage exhausted
    OutOfMemory,
    /// Engine has been stopped
    Stopped,
    /// Blocking send attempted from the dispatcher thread
    WouldDeadlock,
}

impl core::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SubmitError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SubmitError::InvalidCPort => "invalid cport",
            SubmitError::Backpressure => "cport reset pending",
            SubmitError::OutOfMemory => "out of descriptors",
            SubmitError::Stopped => "engine stopped",
            SubmitError::WouldDeadlock => "blocking send from dispatcher",
        }
    }
}

// =============================================================================
// Transfer Errors
// =============================================================================

/// Errors raised while a descriptor is owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// The DMA or flow-control hardware rejected a submission
    HardwareSubmitFailure,
    /// Flow control observed a transfer error
    HardwareTransferFailure,
    /// Send dropped by a CPort reset or engine teardown
    ConnectionReset,
    /// Request never deactivated while recovering from a transfer error
    RecoveryTimeout,
    /// Event tag does not name a live descriptor
    UnknownTransfer,
}

impl core::fmt::Display for TransferError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TransferError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransferError::HardwareSubmitFailure => "hardware submit failure",
            TransferError::HardwareTransferFailure => "hardware transfer failure",
            TransferError::ConnectionReset => "connection reset",
            TransferError::RecoveryTimeout => "recovery timed out",
            TransferError::UnknownTransfer => "unknown transfer",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// ```ignore
/// match result {
///     Err(Error::Submit(SubmitError::Backpressure)) => { /* retry after reset */ }
///     Err(Error::Transfer(TransferError::ConnectionReset)) => { /* dropped */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Initialization error
    Config(ConfigError),
    /// Send rejected
    Submit(SubmitError),
    /// Transfer failed
    Transfer(TransferError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Submit(e) => write!(f, "submit: {}", e.as_str()),
            Error::Transfer(e) => write!(f, "transfer: {}", e.as_str()),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<SubmitError> for Error {
    fn from(e: SubmitError) -> Self {
        Error::Submit(e)
    }
}

impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        Error::Transfer(e)
    }
}

/// Result type alias for engine operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for initialization
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for send requests
pub type SubmitResult<T> = core::result::Result<T, SubmitError>;

// =============================================================================
// Unit Tests
// =============================================================================
