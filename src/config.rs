//! Generation parameters

use crate::encoder::imm8;
use crate::error::{Result, RomError};
use crate::layout::MAX_MESSAGE_LEN;

pub const DEFAULT_MESSAGE: &str = "Hello, world!";

/// Busy-wait loop counts. A count of 0 runs 256 times on the 6502
/// since the loop decrements before testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayCounts {
    /// wait_short iterations
    pub short: u8,
    /// wait_long outer (Y) iterations
    pub outer: u8,
    /// wait_long inner (X) iterations per outer pass
    pub inner: u8,
}

impl DelayCounts {
    pub fn new(short: u32, outer: u32, inner: u32) -> Result<Self> {
        Ok(Self {
            short: imm8(short)?,
            outer: imm8(outer)?,
            inner: imm8(inner)?,
        })
    }
}

impl Default for DelayCounts {
    fn default() -> Self {
        Self {
            short: 0xFF,
            outer: 0xFF,
            inner: 0xFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomConfig {
    /// Message bytes, without the terminator
    pub message: Vec<u8>,
    pub delays: DelayCounts,
}

impl RomConfig {
    pub fn new(message: impl Into<Vec<u8>>, delays: DelayCounts) -> Self {
        Self {
            message: message.into(),
            delays,
        }
    }

    /// The print loop stops at the first zero and indexes with X.
    pub fn validate(&self) -> Result<()> {
        if let Some(index) = self.message.iter().position(|&b| b == 0) {
            return Err(RomError::EmbeddedTerminator { index });
        }
        if self.message.len() > MAX_MESSAGE_LEN {
            return Err(RomError::MessageTooLong {
                len: self.message.len(),
                max: MAX_MESSAGE_LEN,
            });
        }
        Ok(())
    }
}

impl Default for RomConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE, DelayCounts::default())
    }
}
