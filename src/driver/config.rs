//! Configuration types for the UniPro TX DMA engine

use crate::driver::error::{ConfigError, ConfigResult};
use crate::hal::{BurstLen, ByteSwap, ChannelParams, TransferSize};
use crate::internal::constants::{
    DEFAULT_MAX_CHANNELS, DEFAULT_TRANSPORT_CAPACITY, HANDSHAKE_THRESHOLD_SHIFT,
    HANDSHAKE_THRESHOLD_STANDARD, HANDSHAKE_THRESHOLD_WMB, MIN_CHANNELS, RECOVERY_POLL_LIMIT,
};

/// Flow-control handshake threshold programmed into every CPort TX watermark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandshakeThreshold {
    /// Standard TX path (0x20)
    #[default]
    Standard,
    /// Write-merge buffer in front of the CPort (0x10)
    WriteMergeBuffer,
}

impl HandshakeThreshold {
    /// Bits ORed into the TX watermark register
    #[must_use]
    pub const fn to_watermark_bits(self) -> u32 {
        let threshold = match self {
            HandshakeThreshold::Standard => HANDSHAKE_THRESHOLD_STANDARD,
            HandshakeThreshold::WriteMergeBuffer => HANDSHAKE_THRESHOLD_WMB,
        };
        threshold << HANDSHAKE_THRESHOLD_SHIFT
    }
}

/// TX engine configuration
///
/// Built with `with_*` methods:
///
/// ```ignore
/// let config = TxConfig::new()
///     .with_max_channels(3)
///     .with_handshake(HandshakeThreshold::WriteMergeBuffer);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxConfig {
    /// Upper bound on channels taken from the DMA controller
    pub max_channels: usize,
    /// Maximum bytes moved by one DMA operation
    pub transport_capacity: usize,
    /// Handshake threshold written at init
    pub handshake: HandshakeThreshold,
    /// Iterations spent waiting for request deactivation on recovery
    pub recovery_poll_limit: u32,
    /// Bus transfer width of each channel
    pub transfer_size: TransferSize,
    /// Burst length of each channel
    pub burst_len: BurstLen,
    /// Byte swapping of each channel
    pub swap: ByteSwap,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TxConfig {
    /// Create a configuration with default values
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_channels: DEFAULT_MAX_CHANNELS,
            transport_capacity: DEFAULT_TRANSPORT_CAPACITY,
            handshake: HandshakeThreshold::Standard,
            recovery_poll_limit: RECOVERY_POLL_LIMIT,
            transfer_size: TransferSize::Bits64,
            burst_len: BurstLen::Burst16,
            swap: ByteSwap::None,
        }
    }

    /// Set the channel limit
    #[must_use]
    pub const fn with_max_channels(mut self, max_channels: usize) -> Self {
        self.max_channels = max_channels;
        self
    }

    /// Set the per-operation byte limit
    #[must_use]
    pub const fn with_transport_capacity(mut self, capacity: usize) -> Self {
        self.transport_capacity = capacity;
        self
    }

    /// Set the handshake threshold
    #[must_use]
    pub const fn with_handshake(mut self, handshake: HandshakeThreshold) -> Self {
        self.handshake = handshake;
        self
    }

    /// Set the recovery poll limit
    #[must_use]
    pub const fn with_recovery_poll_limit(mut self, limit: u32) -> Self {
        self.recovery_poll_limit = limit;
        self
    }

    /// Set the channel transfer width
    #[must_use]
    pub const fn with_transfer_size(mut self, size: TransferSize) -> Self {
        self.transfer_size = size;
        self
    }

    /// Set the channel burst length
    #[must_use]
    pub const fn with_burst_len(mut self, burst_len: BurstLen) -> Self {
        self.burst_len = burst_len;
        self
    }

    /// Set channel byte swapping
    #[must_use]
    pub const fn with_swap(mut self, swap: ByteSwap) -> Self {
        self.swap = swap;
        self
    }

    /// Check the configuration for values the engine cannot run with
    pub const fn validate(&self) -> ConfigResult<()> {
        if self.max_channels < MIN_CHANNELS {
            return Err(ConfigError::InvalidConfig);
        }
        if self.transport_capacity == 0 {
            return Err(ConfigError::InvalidConfig);
        }
        if self.recovery_poll_limit == 0 {
            return Err(ConfigError::InvalidConfig);
        }
        Ok(())
    }

    /// Channel parameters for a request line
    #[must_use]
    pub const fn channel_params(&self, peripheral_id: u32) -> ChannelParams {
        let mut params = ChannelParams::mem_to_unipro(peripheral_id);
        params.transfer_size = self.transfer_size;
        params.burst_len = self.burst_len;
        params.swap = self.swap;
        params
    }
}
