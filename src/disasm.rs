//! Decoder for the instructions the generator emits
//!
//! Used for `--listing` and for walking generated code in tests. Opcodes
//! outside the generator's repertoire are not decoded.

use std::fmt;
use std::fmt::Write;

use crate::codegen::Rom;
use crate::encoder::*;
use crate::layout::RegionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Implied,
    Immediate(u8),
    Absolute(u16),
    AbsoluteX(u16),
    Relative(i8),
}

impl Operand {
    fn size(self) -> u32 {
        match self {
            Operand::Implied => 0,
            Operand::Immediate(_) | Operand::Relative(_) => 1,
            Operand::Absolute(_) | Operand::AbsoluteX(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub address: u32,
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub operand: Operand,
}

impl Decoded {
    /// Instruction size in bytes
    pub fn size(&self) -> u32 {
        1 + self.operand.size()
    }

    /// Address of the following instruction
    pub fn next(&self) -> u32 {
        self.address + self.size()
    }

    /// Absolute destination of a branch
    pub fn branch_target(&self) -> Option<u32> {
        match self.operand {
            Operand::Relative(offset) => Some(branch_target(self.address, offset)),
            _ => None,
        }
    }
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand {
            Operand::Implied => write!(f, "{}", self.mnemonic),
            Operand::Immediate(value) => write!(f, "{} #${:02X}", self.mnemonic, value),
            Operand::Absolute(address) => write!(f, "{} ${:04X}", self.mnemonic, address),
            Operand::AbsoluteX(address) => write!(f, "{} ${:04X},X", self.mnemonic, address),
            Operand::Relative(_) => {
                write!(f, "{} ${:04X}", self.mnemonic, self.branch_target().unwrap_or_default())
            }
        }
    }
}

enum Mode {
    Implied,
    Immediate,
    Absolute,
    AbsoluteX,
    Relative,
}

fn lookup(opcode: u8) -> Option<(&'static str, Mode)> {
    let entry = match opcode {
        LDA_IMM => ("LDA", Mode::Immediate),
        LDA_ABS => ("LDA", Mode::Absolute),
        LDA_ABS_X => ("LDA", Mode::AbsoluteX),
        LDX_IMM => ("LDX", Mode::Immediate),
        LDY_IMM => ("LDY", Mode::Immediate),
        STA_ABS => ("STA", Mode::Absolute),
        JMP_ABS => ("JMP", Mode::Absolute),
        JSR => ("JSR", Mode::Absolute),
        BEQ => ("BEQ", Mode::Relative),
        BNE => ("BNE", Mode::Relative),
        TAX => ("TAX", Mode::Implied),
        TXA => ("TXA", Mode::Implied),
        TAY => ("TAY", Mode::Implied),
        TYA => ("TYA", Mode::Implied),
        TXS => ("TXS", Mode::Implied),
        PHA => ("PHA", Mode::Implied),
        PLA => ("PLA", Mode::Implied),
        INX => ("INX", Mode::Implied),
        DEX => ("DEX", Mode::Implied),
        DEY => ("DEY", Mode::Implied),
        RTS => ("RTS", Mode::Implied),
        _ => return None,
    };
    Some(entry)
}

/// Decode the instruction at the start of `bytes`, which sit at `address`.
pub fn decode(bytes: &[u8], address: u32) -> Option<Decoded> {
    let (&opcode, rest) = bytes.split_first()?;
    let (mnemonic, mode) = lookup(opcode)?;
    let word = || -> Option<u16> {
        match rest {
            [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    };
    let operand = match mode {
        Mode::Implied => Operand::Implied,
        Mode::Immediate => Operand::Immediate(*rest.first()?),
        Mode::Relative => Operand::Relative(*rest.first()? as i8),
        Mode::Absolute => Operand::Absolute(word()?),
        Mode::AbsoluteX => Operand::AbsoluteX(word()?),
    };
    Some(Decoded {
        address,
        opcode,
        mnemonic,
        operand,
    })
}

/// Decode a straight run of code from `start` up to `end`
pub fn decode_range(bytes: &[u8], start: u32, end: u32) -> Vec<Decoded> {
    let mut out = Vec::new();
    let mut address = start;
    let mut offset = 0usize;
    while address < end {
        match decode(&bytes[offset..], address) {
            Some(inst) => {
                offset += inst.size() as usize;
                address = inst.next();
                out.push(inst);
            }
            None => break,
        }
    }
    out
}

/// Assembly listing of every code region
pub fn listing(rom: &Rom) -> String {
    let image = rom.image();
    let mut out = String::new();
    for region in rom.regions().iter().filter(|r| r.kind == RegionKind::Code) {
        let _ = writeln!(out, "; {}", region);
        let mut address = region.start;
        while address < region.end {
            let bytes = image.slice_from(address);
            match decode(bytes, address) {
                Some(inst) => {
                    let raw: Vec<String> = bytes[..inst.size() as usize]
                        .iter()
                        .map(|b| format!("{:02X}", b))
                        .collect();
                    let _ = writeln!(out, "${:04X}  {:<9} {}", address, raw.join(" "), inst);
                    address = inst.next();
                }
                None => {
                    let byte = bytes.first().copied().unwrap_or_default();
                    let _ = writeln!(out, "${:04X}  {:02X}        .byte ${:02X}", address, byte, byte);
                    address += 1;
                }
            }
        }
        out.push('\n');
    }
    out
}
