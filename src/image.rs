//! ROM image buffer and write cursor
//!
//! The image covers a fixed address window. All writes go through the
//! cursor, which is addressed absolutely so layout constants can be used
//! directly. A write that would land outside the window fails and leaves
//! the buffer untouched.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::error::{Result, RomError};
use crate::layout::{FILL_BYTE, ROM_BASE, ROM_SIZE};

pub struct Image {
    base: u16,
    bytes: Vec<u8>,
    // u32 so the cursor can sit one past 0xFFFF after the last vector byte
    cursor: u32,
}

impl Image {
    pub fn new(base: u16, size: usize, fill: u8) -> Self {
        Self {
            base,
            bytes: vec![fill; size],
            cursor: base as u32,
        }
    }

    /// Empty 32KB ROM at 0x8000, NOP filled
    pub fn rom() -> Self {
        Self::new(ROM_BASE, ROM_SIZE, FILL_BYTE)
    }

    /// Current write address
    pub fn pos(&self) -> u32 {
        self.cursor
    }

    pub fn seek(&mut self, address: u16) {
        self.cursor = address as u32;
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    /// One past the last address in the window
    pub fn end(&self) -> u32 {
        self.base as u32 + self.bytes.len() as u32
    }

    pub fn contains(&self, address: u32) -> bool {
        address >= self.base as u32 && address < self.end()
    }

    /// Emit one byte at the cursor
    pub fn write(&mut self, byte: u8) -> Result<()> {
        self.write_bytes(&[byte])
    }

    /// Emit a 16-bit word (little-endian)
    pub fn write_word(&mut self, word: u16) -> Result<()> {
        self.write_bytes(&word.to_le_bytes())
    }

    /// Emit raw bytes. The whole span is bounds checked before anything is stored.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let last = self.cursor + bytes.len() as u32 - 1;
        for address in [self.cursor, last] {
            if !self.contains(address) {
                return Err(RomError::AddressOutOfWindow { address });
            }
        }
        let offset = (self.cursor - self.base as u32) as usize;
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len() as u32;
        Ok(())
    }

    /// Byte at an absolute address, if it is inside the window
    pub fn read(&self, address: u32) -> Option<u8> {
        if self.contains(address) {
            Some(self.bytes[(address - self.base as u32) as usize])
        } else {
            None
        }
    }

    /// Bytes from `address` to the end of the window
    pub fn slice_from(&self, address: u32) -> &[u8] {
        if self.contains(address) {
            &self.bytes[(address - self.base as u32) as usize..]
        } else {
            &[]
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the whole window out as a flat binary
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!("writing {} bytes to {}", self.bytes.len(), path.display());
        fs::write(path, &self.bytes)?;
        info!("wrote ROM image: {} ({} bytes)", path.display(), self.bytes.len());
        Ok(())
    }
}
