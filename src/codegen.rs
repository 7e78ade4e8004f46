//! 6502 code generator for the LCD "hello" ROM
//!
//! Lays out the program at the fixed addresses in `layout`:
//!   mainline at the reset entry, four subroutines in 32-byte slots,
//!   the message at 0x8200 and the vector table at 0xFFFC.
//!
//! Subroutines call each other through the fixed address map. Loop and
//! exit branches inside a region use local labels, resolved in two
//! passes: the first lays everything out and records where each label
//! lands, the second re-emits into a fresh image with every forward
//! reference known.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};

use crate::config::RomConfig;
use crate::encoder::relative_offset;
use crate::error::{Result, RomError};
use crate::image::Image;
use crate::layout::{
    check_collisions, check_slot, Region, RegionKind, DDRA, DDRB, E, ENTRY, IRQ_VECTOR,
    LCD_INSTRUCTION, MESSAGE, PORTA, PORTB, PRINT_CHAR, RESET_VECTOR, RS, RW, WAIT_LONG,
    WAIT_SHORT,
};

// HD44780 instructions
const LCD_FUNCTION_SET: u8 = 0x38; // 8-bit bus, 2 lines, 5x8 font
const LCD_DISPLAY_ON: u8 = 0x0F; // display, cursor and blink on
const LCD_ENTRY_MODE: u8 = 0x06; // increment, no shift
const LCD_CLEAR: u8 = 0x01;

/// Function set is sent this many times before configuration, since the
/// controller's bus mode is unknown at power on.
const WAKE_UP_REPEATS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Layout,
    Final,
}

/// A finished ROM: the image plus the regions placed in it
pub struct Rom {
    image: Image,
    regions: Vec<Region>,
}

impl Rom {
    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.image.into_bytes()
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        self.image.write_to(path)
    }
}

pub struct RomCodeGen<'a> {
    config: &'a RomConfig,
    image: Image,
    labels: HashMap<&'static str, u32>,
    regions: Vec<Region>,
    pass: Pass,
}

impl<'a> RomCodeGen<'a> {
    fn new(config: &'a RomConfig, labels: HashMap<&'static str, u32>, pass: Pass) -> Self {
        Self {
            config,
            image: Image::rom(),
            labels,
            regions: Vec::new(),
            pass,
        }
    }

    /// Build the complete ROM
    pub fn generate(config: &'a RomConfig) -> Result<Rom> {
        config.validate()?;

        let mut layout = Self::new(config, HashMap::new(), Pass::Layout);
        layout.emit_all()?;
        debug!("layout pass placed {} labels", layout.labels.len());

        let mut codegen = Self::new(config, layout.labels, Pass::Final);
        codegen.emit_all()?;

        check_collisions(&codegen.regions)?;

        info!(
            "generated {} byte ROM, {} regions, message {} bytes",
            codegen.image.as_bytes().len(),
            codegen.regions.len(),
            config.message.len()
        );

        Ok(Rom {
            image: codegen.image,
            regions: codegen.regions,
        })
    }

    fn emit_all(&mut self) -> Result<()> {
        self.place("mainline", RegionKind::Code, ENTRY, Self::emit_mainline)?;
        self.place_subroutine("lcd_instruction", LCD_INSTRUCTION, Self::emit_lcd_instruction)?;
        self.place_subroutine("print_char", PRINT_CHAR, Self::emit_print_char)?;
        self.place_subroutine("wait_short", WAIT_SHORT, Self::emit_wait_short)?;
        self.place_subroutine("wait_long", WAIT_LONG, Self::emit_wait_long)?;
        self.place("message", RegionKind::Data, MESSAGE, Self::emit_message)?;
        self.place("vectors", RegionKind::Vectors, RESET_VECTOR, Self::emit_vectors)?;
        Ok(())
    }

    /// Seek to `start`, run `body`, and record the span it wrote
    fn place<F>(&mut self, name: &'static str, kind: RegionKind, start: u16, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.image.seek(start);
        body(self)?;
        let region = Region::new(name, kind, start as u32, self.image.pos());
        if self.pass == Pass::Final {
            debug!("placed {} ({} bytes)", region, region.len());
        }
        self.regions.push(region);
        Ok(())
    }

    fn place_subroutine<F>(&mut self, name: &'static str, start: u16, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.place(name, RegionKind::Code, start, body)?;
        match self.regions.last() {
            Some(region) => check_slot(region),
            None => Ok(()),
        }
    }

    /// Define a label at current position
    fn label(&mut self, name: &'static str) {
        self.labels.insert(name, self.image.pos());
    }

    /// Address of a label. During layout a label not yet seen resolves to
    /// the current position so sizes come out right.
    fn resolve(&self, name: &'static str) -> Result<u32> {
        match (self.labels.get(name), self.pass) {
            (Some(&address), _) => Ok(address),
            (None, Pass::Layout) => Ok(self.image.pos()),
            (None, Pass::Final) => Err(RomError::UndefinedLabel {
                name: name.to_string(),
            }),
        }
    }

    fn beq_to(&mut self, name: &'static str) -> Result<()> {
        let offset = relative_offset(self.image.pos(), self.resolve(name)?)?;
        self.image.beq(offset)
    }

    fn bne_to(&mut self, name: &'static str) -> Result<()> {
        let offset = relative_offset(self.image.pos(), self.resolve(name)?)?;
        self.image.bne(offset)
    }

    fn jmp_to(&mut self, name: &'static str) -> Result<()> {
        let target = self.resolve(name)?;
        self.image.jmp(target as u16)
    }

    /// LDA #cmd; JSR lcd_instruction
    fn send_instruction(&mut self, cmd: u8) -> Result<()> {
        self.image.lda_imm(cmd)?;
        self.image.jsr(LCD_INSTRUCTION)
    }

    /// Reset entry: hardware init, LCD setup, print the message, halt
    fn emit_mainline(&mut self) -> Result<()> {
        // Stack at $01FF
        self.image.ldx_imm(0xFF)?;
        self.image.txs()?;

        // PORTB drives the LCD data bus, PORTA's top three bits the control lines
        self.image.lda_imm(0xFF)?;
        self.image.sta_abs(DDRB)?;
        self.image.lda_imm(E | RW | RS)?;
        self.image.sta_abs(DDRA)?;

        for _ in 0..WAKE_UP_REPEATS {
            self.send_instruction(LCD_FUNCTION_SET)?;
        }
        self.send_instruction(LCD_FUNCTION_SET)?;
        self.send_instruction(LCD_DISPLAY_ON)?;
        self.send_instruction(LCD_ENTRY_MODE)?;

        // Clear can't be polled for completion, wait it out
        self.send_instruction(LCD_CLEAR)?;
        self.image.jsr(WAIT_LONG)?;

        self.emit_print_loop()
    }

    /// X indexes the message; stop at the terminator and spin forever.
    fn emit_print_loop(&mut self) -> Result<()> {
        self.image.ldx_imm(0x00)?;

        self.label("print_loop");
        self.image.lda_abs_x(MESSAGE)?;
        self.beq_to("print_done")?;
        self.image.jsr(PRINT_CHAR)?;
        self.image.inx()?;
        self.jmp_to("print_loop")?;

        self.label("print_done");
        self.jmp_to("print_done")
    }

    fn emit_lcd_instruction(&mut self) -> Result<()> {
        self.emit_lcd_send(0)
    }

    fn emit_print_char(&mut self) -> Result<()> {
        self.emit_lcd_send(RS)
    }

    /// Latch A into the LCD: data on PORTB, then pulse E with `control`
    /// held on the other lines. Preserves A.
    fn emit_lcd_send(&mut self, control: u8) -> Result<()> {
        self.image.pha()?;
        self.image.jsr(WAIT_SHORT)?;
        self.image.sta_abs(PORTB)?;

        self.image.lda_imm(control)?;
        self.image.sta_abs(PORTA)?;
        self.image.lda_imm(control | E)?;
        self.image.sta_abs(PORTA)?;
        self.image.lda_imm(control)?;
        self.image.sta_abs(PORTA)?;

        self.image.pla()?;
        self.image.rts()
    }

    /// Single countdown on X. Preserves A and X.
    fn emit_wait_short(&mut self) -> Result<()> {
        self.image.pha()?;
        self.image.txa()?;
        self.image.pha()?;

        self.image.ldx_imm(self.config.delays.short)?;
        self.label("wait_short_loop");
        self.image.dex()?;
        self.bne_to("wait_short_loop")?;

        self.image.pla()?;
        self.image.tax()?;
        self.image.pla()?;
        self.image.rts()
    }

    /// Nested countdown, Y outer and X inner. Preserves A, X and Y.
    fn emit_wait_long(&mut self) -> Result<()> {
        self.image.pha()?;
        self.image.txa()?;
        self.image.pha()?;
        self.image.tya()?;
        self.image.pha()?;

        self.image.ldy_imm(self.config.delays.outer)?;
        self.label("wait_long_outer");
        self.image.ldx_imm(self.config.delays.inner)?;
        self.label("wait_long_inner");
        self.image.dex()?;
        self.bne_to("wait_long_inner")?;
        self.image.dey()?;
        self.bne_to("wait_long_outer")?;

        self.image.pla()?;
        self.image.tay()?;
        self.image.pla()?;
        self.image.tax()?;
        self.image.pla()?;
        self.image.rts()
    }

    /// Message bytes plus the zero terminator
    fn emit_message(&mut self) -> Result<()> {
        self.image.write_bytes(&self.config.message)?;
        self.image.write(0x00)
    }

    /// Reset and IRQ both enter the mainline
    fn emit_vectors(&mut self) -> Result<()> {
        self.image.seek(RESET_VECTOR);
        self.image.write_word(ENTRY)?;
        self.image.seek(IRQ_VECTOR);
        self.image.write_word(ENTRY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DelayCounts;
    use crate::encoder::{BNE, DEX, JSR};

    fn bytes_at(rom: &Rom, address: u32, len: usize) -> Vec<u8> {
        rom.image().slice_from(address)[..len].to_vec()
    }

    #[test]
    fn test_generate() {
        let config = RomConfig::default();
        let rom = RomCodeGen::generate(&config).unwrap();
        assert_eq!(rom.as_bytes().len(), 32768);
        // Starts with LDX #$FF; TXS
        assert_eq!(bytes_at(&rom, 0x8000, 3), vec![0xA2, 0xFF, 0x9A]);
        assert_eq!(rom.regions().len(), 7);
    }

    #[test]
    fn test_mainline_layout() {
        let rom = RomCodeGen::generate(&RomConfig::default()).unwrap();
        let mainline = rom.region("mainline").unwrap();
        assert_eq!(mainline.start, 0x8000);
        assert_eq!(mainline.end, 0x8044);

        // LDA #$01; JSR lcd_instruction; JSR wait_long
        assert_eq!(
            bytes_at(&rom, 0x802B, 8),
            vec![0xA9, 0x01, 0x20, 0x00, 0x81, 0x20, 0x60, 0x81]
        );

        // print loop: LDX #0; LDA $8200,X; BEQ +7; JSR print_char; INX; JMP loop; JMP self
        assert_eq!(
            bytes_at(&rom, 0x8033, 17),
            vec![
                0xA2, 0x00, 0xBD, 0x00, 0x82, 0xF0, 0x07, 0x20, 0x20, 0x81, 0xE8, 0x4C, 0x35, 0x80,
                0x4C, 0x41, 0x80
            ]
        );
    }

    #[test]
    fn test_wake_up_sends_function_set_three_times() {
        let rom = RomCodeGen::generate(&RomConfig::default()).unwrap();
        let send = [0xA9, LCD_FUNCTION_SET, JSR, 0x00, 0x81];
        let body = bytes_at(&rom, 0x800D, 20);
        for chunk in body.chunks(5) {
            assert_eq!(chunk, send);
        }
    }

    #[test]
    fn test_lcd_send_subroutines() {
        let rom = RomCodeGen::generate(&RomConfig::default()).unwrap();
        assert_eq!(
            bytes_at(&rom, 0x8100, 24),
            vec![
                0x48, 0x20, 0x40, 0x81, 0x8D, 0x00, 0x60, 0xA9, 0x00, 0x8D, 0x01, 0x60, 0xA9,
                0x80, 0x8D, 0x01, 0x60, 0xA9, 0x00, 0x8D, 0x01, 0x60, 0x68, 0x60
            ]
        );
        assert_eq!(
            bytes_at(&rom, 0x8120, 24),
            vec![
                0x48, 0x20, 0x40, 0x81, 0x8D, 0x00, 0x60, 0xA9, 0x20, 0x8D, 0x01, 0x60, 0xA9,
                0xA0, 0x8D, 0x01, 0x60, 0xA9, 0x20, 0x8D, 0x01, 0x60, 0x68, 0x60
            ]
        );
    }

    #[test]
    fn test_wait_loops_branch_offsets() {
        let rom = RomCodeGen::generate(&RomConfig::default()).unwrap();
        assert_eq!(
            bytes_at(&rom, 0x8140, 12),
            vec![0x48, 0x8A, 0x48, 0xA2, 0xFF, DEX, BNE, 0xFD, 0x68, 0xAA, 0x68, 0x60]
        );
        assert_eq!(
            bytes_at(&rom, 0x8160, 21),
            vec![
                0x48, 0x8A, 0x48, 0x98, 0x48, 0xA0, 0xFF, 0xA2, 0xFF, DEX, BNE, 0xFD, 0x88, BNE,
                0xF8, 0x68, 0xA8, 0x68, 0xAA, 0x68, 0x60
            ]
        );
    }

    #[test]
    fn test_delay_counts_are_emitted() {
        let config = RomConfig::new("Hi", DelayCounts::new(10, 20, 30).unwrap());
        let rom = RomCodeGen::generate(&config).unwrap();
        assert_eq!(bytes_at(&rom, 0x8143, 2), vec![0xA2, 10]);
        assert_eq!(bytes_at(&rom, 0x8165, 4), vec![0xA0, 20, 0xA2, 30]);
    }

    #[test]
    fn test_message_and_vectors() {
        let rom = RomCodeGen::generate(&RomConfig::new("OK", DelayCounts::default())).unwrap();
        assert_eq!(bytes_at(&rom, 0x8200, 4), vec![b'O', b'K', 0x00, 0xEA]);
        assert_eq!(bytes_at(&rom, 0xFFFC, 4), vec![0x00, 0x80, 0x00, 0x80]);
        let message = rom.region("message").unwrap();
        assert_eq!((message.start, message.end), (0x8200, 0x8203));
        let vectors = rom.region("vectors").unwrap();
        assert_eq!((vectors.start, vectors.end), (0xFFFC, 0x10000));
    }

    #[test]
    fn test_regions_fit_slots() {
        let rom = RomCodeGen::generate(&RomConfig::default()).unwrap();
        for name in ["lcd_instruction", "print_char", "wait_short", "wait_long"] {
            let region = rom.region(name).unwrap();
            assert!(region.len() <= 32, "{} is {} bytes", name, region.len());
        }
    }

    #[test]
    fn test_invalid_message_rejected() {
        let config = RomConfig::new(vec![b'x'; 300], DelayCounts::default());
        assert!(matches!(
            RomCodeGen::generate(&config),
            Err(RomError::MessageTooLong { .. })
        ));
    }

    #[test]
    fn test_undefined_label_in_final_pass() {
        let config = RomConfig::default();
        let mut codegen = RomCodeGen::new(&config, HashMap::new(), Pass::Final);
        assert!(matches!(
            codegen.jmp_to("nowhere"),
            Err(RomError::UndefinedLabel { .. })
        ));
    }
}
