//! 6502 instruction encoder
//!
//! Only the handful of instructions the LCD program needs. Each method
//! writes one instruction at the image cursor: opcode first, then the
//! operand (absolute addresses low byte first).

use log::trace;

use crate::error::{Result, RomError};
use crate::image::Image;

pub const LDA_IMM: u8 = 0xA9;
pub const LDA_ABS: u8 = 0xAD;
pub const LDA_ABS_X: u8 = 0xBD;
pub const LDX_IMM: u8 = 0xA2;
pub const LDY_IMM: u8 = 0xA0;
pub const STA_ABS: u8 = 0x8D;
pub const JMP_ABS: u8 = 0x4C;
pub const JSR: u8 = 0x20;
pub const BEQ: u8 = 0xF0;
pub const BNE: u8 = 0xD0;
pub const TAX: u8 = 0xAA;
pub const TXA: u8 = 0x8A;
pub const TAY: u8 = 0xA8;
pub const TYA: u8 = 0x98;
pub const TXS: u8 = 0x9A;
pub const PHA: u8 = 0x48;
pub const PLA: u8 = 0x68;
pub const INX: u8 = 0xE8;
pub const DEX: u8 = 0xCA;
pub const DEY: u8 = 0x88;
pub const RTS: u8 = 0x60;

/// Size of a relative branch (opcode + offset)
pub const BRANCH_LEN: u32 = 2;

/// Narrow a value to an 8-bit immediate operand
pub fn imm8(value: u32) -> Result<u8> {
    u8::try_from(value).map_err(|_| RomError::ImmediateOutOfRange { value })
}

/// Offset for a branch at `branch_at` landing on `target`.
/// The CPU counts from the byte after the two-byte branch.
pub fn relative_offset(branch_at: u32, target: u32) -> Result<i8> {
    let offset = target as i64 - (branch_at as i64 + BRANCH_LEN as i64);
    i8::try_from(offset).map_err(|_| RomError::BranchOutOfRange {
        from: branch_at,
        target,
        offset,
    })
}

/// Inverse of `relative_offset`
pub fn branch_target(branch_at: u32, offset: i8) -> u32 {
    (branch_at as i64 + BRANCH_LEN as i64 + offset as i64) as u32
}

impl Image {
    fn op(&mut self, opcode: u8, name: &str) -> Result<()> {
        trace!("${:04X}  {}", self.pos(), name);
        self.write(opcode)
    }

    fn op_imm(&mut self, opcode: u8, name: &str, value: u8) -> Result<()> {
        trace!("${:04X}  {} #${:02X}", self.pos(), name, value);
        self.write_bytes(&[opcode, value])
    }

    fn op_abs(&mut self, opcode: u8, name: &str, address: u16) -> Result<()> {
        trace!("${:04X}  {} ${:04X}", self.pos(), name, address);
        let [lo, hi] = address.to_le_bytes();
        self.write_bytes(&[opcode, lo, hi])
    }

    fn op_rel(&mut self, opcode: u8, name: &str, offset: i8) -> Result<()> {
        trace!("${:04X}  {} {:+}", self.pos(), name, offset);
        self.write_bytes(&[opcode, offset as u8])
    }

    // Loads and stores

    pub fn lda_imm(&mut self, value: u8) -> Result<()> {
        self.op_imm(LDA_IMM, "LDA", value)
    }

    pub fn ldx_imm(&mut self, value: u8) -> Result<()> {
        self.op_imm(LDX_IMM, "LDX", value)
    }

    pub fn ldy_imm(&mut self, value: u8) -> Result<()> {
        self.op_imm(LDY_IMM, "LDY", value)
    }

    pub fn lda_abs(&mut self, address: u16) -> Result<()> {
        self.op_abs(LDA_ABS, "LDA", address)
    }

    /// LDA address,X
    pub fn lda_abs_x(&mut self, address: u16) -> Result<()> {
        self.op_abs(LDA_ABS_X, "LDA,X", address)
    }

    pub fn sta_abs(&mut self, address: u16) -> Result<()> {
        self.op_abs(STA_ABS, "STA", address)
    }

    // Control flow

    pub fn jmp(&mut self, address: u16) -> Result<()> {
        self.op_abs(JMP_ABS, "JMP", address)
    }

    pub fn jsr(&mut self, address: u16) -> Result<()> {
        self.op_abs(JSR, "JSR", address)
    }

    pub fn beq(&mut self, offset: i8) -> Result<()> {
        self.op_rel(BEQ, "BEQ", offset)
    }

    pub fn bne(&mut self, offset: i8) -> Result<()> {
        self.op_rel(BNE, "BNE", offset)
    }

    pub fn rts(&mut self) -> Result<()> {
        self.op(RTS, "RTS")
    }

    // Implied

    pub fn tax(&mut self) -> Result<()> {
        self.op(TAX, "TAX")
    }

    pub fn txa(&mut self) -> Result<()> {
        self.op(TXA, "TXA")
    }

    pub fn tay(&mut self) -> Result<()> {
        self.op(TAY, "TAY")
    }

    pub fn tya(&mut self) -> Result<()> {
        self.op(TYA, "TYA")
    }

    pub fn txs(&mut self) -> Result<()> {
        self.op(TXS, "TXS")
    }

    pub fn pha(&mut self) -> Result<()> {
        self.op(PHA, "PHA")
    }

    pub fn pla(&mut self) -> Result<()> {
        self.op(PLA, "PLA")
    }

    pub fn inx(&mut self) -> Result<()> {
        self.op(INX, "INX")
    }

    pub fn dex(&mut self) -> Result<()> {
        self.op(DEX, "DEX")
    }

    pub fn dey(&mut self) -> Result<()> {
        self.op(DEY, "DEY")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitted(image: &Image, from: u32) -> Vec<u8> {
        image.as_bytes()[(from - image.base() as u32) as usize..(image.pos() - image.base() as u32) as usize]
            .to_vec()
    }

    #[test]
    fn test_absolute_operands_are_little_endian() {
        let mut image = Image::rom();
        image.sta_abs(0x6002).unwrap();
        image.lda_abs_x(0x8200).unwrap();
        image.jsr(0x8140).unwrap();
        image.jmp(0x8013).unwrap();
        image.lda_abs(0x6000).unwrap();
        assert_eq!(
            emitted(&image, 0x8000),
            vec![
                0x8D, 0x02, 0x60, 0xBD, 0x00, 0x82, 0x20, 0x40, 0x81, 0x4C, 0x13, 0x80, 0xAD, 0x00,
                0x60
            ]
        );
    }

    #[test]
    fn test_immediates_and_implied() {
        let mut image = Image::rom();
        image.ldx_imm(0xFF).unwrap();
        image.txs().unwrap();
        image.lda_imm(0x38).unwrap();
        image.ldy_imm(0x10).unwrap();
        image.pha().unwrap();
        image.txa().unwrap();
        image.tya().unwrap();
        image.pla().unwrap();
        image.tay().unwrap();
        image.tax().unwrap();
        image.inx().unwrap();
        image.dex().unwrap();
        image.dey().unwrap();
        image.rts().unwrap();
        assert_eq!(
            emitted(&image, 0x8000),
            vec![
                0xA2, 0xFF, 0x9A, 0xA9, 0x38, 0xA0, 0x10, 0x48, 0x8A, 0x98, 0x68, 0xA8, 0xAA, 0xE8,
                0xCA, 0x88, 0x60
            ]
        );
    }

    #[test]
    fn test_cursor_advances_by_instruction_length() {
        let mut image = Image::rom();
        image.seek(0x8140);
        image.ldx_imm(0xFF).unwrap();
        assert_eq!(image.pos(), 0x8142);
        image.sta_abs(0x6000).unwrap();
        assert_eq!(image.pos(), 0x8145);
        image.bne(-3).unwrap();
        assert_eq!(image.pos(), 0x8147);
        image.rts().unwrap();
        assert_eq!(image.pos(), 0x8148);
    }

    #[test]
    fn test_relative_offset_backward_loop() {
        // DEX at $8145, BNE at $8146 back to the DEX
        assert_eq!(relative_offset(0x8146, 0x8145).unwrap(), -3);
        // LDX at $8167 through BNE at $816D in the nested wait
        assert_eq!(relative_offset(0x816D, 0x8167).unwrap(), -8);
        assert_eq!(relative_offset(0x8013, 0x801C).unwrap(), 7);
    }

    #[test]
    fn test_relative_offset_round_trip() {
        let at = 0x9000;
        for offset in i8::MIN..=i8::MAX {
            let target = branch_target(at, offset);
            assert_eq!(relative_offset(at, target).unwrap(), offset);
        }
    }

    #[test]
    fn test_relative_offset_out_of_range() {
        assert!(relative_offset(0x8000, 0x8081).is_ok());
        let err = relative_offset(0x8000, 0x8082).unwrap_err();
        assert!(matches!(err, RomError::BranchOutOfRange { offset: 128, .. }));
        assert!(relative_offset(0x8100, 0x8082).is_ok());
        assert!(relative_offset(0x8100, 0x8081).is_err());
    }

    #[test]
    fn test_imm8_range() {
        assert_eq!(imm8(255).unwrap(), 0xFF);
        assert!(matches!(
            imm8(256).unwrap_err(),
            RomError::ImmediateOutOfRange { value: 256 }
        ));
    }

    #[test]
    fn test_branch_encodes_twos_complement() {
        let mut image = Image::rom();
        image.beq(7).unwrap();
        image.bne(-8).unwrap();
        assert_eq!(emitted(&image, 0x8000), vec![0xF0, 0x07, 0xD0, 0xF8]);
    }
}
