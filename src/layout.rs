//! Address map for the LCD ROM
//!
//! Memory Layout (28C256 EEPROM mapped at 0x8000-0xFFFF):
//!   0x8000-0x80FF  Mainline (entry point)
//!   0x8100-0x811F  lcd_instruction subroutine
//!   0x8120-0x813F  print_char subroutine
//!   0x8140-0x815F  wait_short subroutine
//!   0x8160-0x817F  wait_long subroutine
//!   0x8200-...     Message (zero terminated)
//!   0xFFFC-0xFFFD  Reset vector
//!   0xFFFE-0xFFFF  IRQ vector
//!
//! I/O (65C22 VIA):
//!   0x6000  PORTB, LCD data bus
//!   0x6001  PORTA, LCD control lines (E, RW, RS)
//!   0x6002  DDRB
//!   0x6003  DDRA

use std::fmt;

use crate::error::{Result, RomError};

/// ROM window
pub const ROM_BASE: u16 = 0x8000;
pub const ROM_SIZE: usize = 0x8000;
pub const ROM_END: u32 = ROM_BASE as u32 + ROM_SIZE as u32;

/// Unwritten bytes are NOP
pub const FILL_BYTE: u8 = 0xEA;

// Code and data
pub const ENTRY: u16 = 0x8000;
pub const LCD_INSTRUCTION: u16 = 0x8100;
pub const PRINT_CHAR: u16 = 0x8120;
pub const WAIT_SHORT: u16 = 0x8140;
pub const WAIT_LONG: u16 = 0x8160;
pub const SUBROUTINE_SLOT: u16 = 0x20;
pub const MESSAGE: u16 = 0x8200;

// Vectors
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

// VIA registers
pub const PORTB: u16 = 0x6000;
pub const PORTA: u16 = 0x6001;
pub const DDRB: u16 = 0x6002;
pub const DDRA: u16 = 0x6003;

// LCD control lines on PORTA
pub const E: u8 = 0x80;
pub const RW: u8 = 0x40;
pub const RS: u8 = 0x20;

/// X is 8 bits wide, so the terminator must sit at index 255 or below.
pub const MAX_MESSAGE_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Code,
    Data,
    Vectors,
}

/// A named, half-open address range `[start, end)` occupied in the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: &'static str,
    pub kind: RegionKind,
    pub start: u32,
    pub end: u32,
}

impl Region {
    pub fn new(name: &'static str, kind: RegionKind, start: u32, end: u32) -> Self {
        Self {
            name,
            kind,
            start,
            end,
        }
    }

    pub fn code(name: &'static str, start: u32, end: u32) -> Self {
        Self::new(name, RegionKind::Code, start, end)
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [${:04X}-${:04X}]",
            self.name,
            self.start,
            self.end.saturating_sub(1).max(self.start)
        )
    }
}

/// Reject the first pair of regions that share an address.
pub fn check_collisions(regions: &[Region]) -> Result<()> {
    for (i, first) in regions.iter().enumerate() {
        for second in &regions[i + 1..] {
            if first.overlaps(second) {
                return Err(RomError::RegionCollision {
                    first: first.clone(),
                    second: second.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Subroutine bodies must stay inside their fixed slot.
pub fn check_slot(region: &Region) -> Result<()> {
    let limit = region.start + SUBROUTINE_SLOT as u32;
    if region.end > limit {
        return Err(RomError::SlotOverflow {
            region: region.clone(),
            limit,
        });
    }
    Ok(())
}
