//! lcd6502_rom - "Hello, world" ROM for a 6502 + 65C22 + HD44780 board
//!
//! Generates a 32KB EEPROM image mapped at 0x8000-0xFFFF: startup code
//! that wakes and configures a character LCD over the VIA, prints a
//! zero-terminated message, and halts. Vectors point at 0x8000.

pub mod codegen;
pub mod config;
pub mod disasm;
pub mod encoder;
pub mod error;
pub mod image;
pub mod layout;

pub use codegen::{Rom, RomCodeGen};
pub use config::{DelayCounts, RomConfig};
pub use error::{Result, RomError};
pub use image::Image;
pub use layout::Region;

/// Generate a ROM for `config`
pub fn generate(config: &RomConfig) -> Result<Rom> {
    RomCodeGen::generate(config)
}
