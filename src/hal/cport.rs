//! UniPro CPort transmit registers

use super::HwResult;

/// CPort-side registers touched by the TX path
pub trait CPortRegisters {
    /// Number of CPorts implemented by the hardware
    fn cport_count(&self) -> u16;

    /// Address of the CPort's TX buffer window
    fn tx_buffer_addr(&self, cport: u16) -> usize;

    /// Read the CPort's TX buffer watermark (space offset) register
    fn read_tx_watermark(&self, cport: u16) -> u32;

    /// Write the CPort's TX buffer watermark (space offset) register
    fn write_tx_watermark(&self, cport: u16, value: u32);

    /// Raise the end-of-message marker after the last byte of a message
    fn set_eom(&self, cport: u16);

    /// Reset the CPort's transmit state
    fn reset_cport(&self, cport: u16) -> HwResult<()>;
}
