//! Error types for ROM generation
//!
//! Every failure is detected while the image is being built, from static
//! inputs. Nothing is silently dropped or truncated.

use std::io;

use thiserror::Error;

use crate::layout::Region;

pub type Result<T> = std::result::Result<T, RomError>;

#[derive(Error, Debug)]
pub enum RomError {
    #[error("write at ${address:04X} falls outside the ROM window")]
    AddressOutOfWindow { address: u32 },

    #[error("region {first} overlaps region {second}")]
    RegionCollision { first: Region, second: Region },

    #[error("region {region} runs past the end of its slot at ${limit:04X}")]
    SlotOverflow { region: Region, limit: u32 },

    #[error("immediate value {value} does not fit in 8 bits")]
    ImmediateOutOfRange { value: u32 },

    #[error("branch at ${from:04X} cannot reach ${target:04X} (offset {offset})")]
    BranchOutOfRange { from: u32, target: u32, offset: i64 },

    #[error("undefined label: {name}")]
    UndefinedLabel { name: String },

    #[error("message is {len} bytes, the print loop can index at most {max}")]
    MessageTooLong { len: usize, max: usize },

    #[error("message contains a zero byte at index {index}")]
    EmbeddedTerminator { index: usize },

    #[error("failed to write ROM image: {0}")]
    Io(#[from] io::Error),
}
