//! CD+G subcode packet layout and payload decoders.
//!
//! Every packet is 24 bytes:
//!
//! ```text
//! byte 0      command      (low 6 bits = 0x09 for graphics)
//! byte 1      instruction  (low 6 bits select the operation)
//! bytes 2-3   parity Q
//! bytes 4-19  data         (16 bytes, operation specific)
//! bytes 20-23 parity P
//! ```
//!
//! Only the low 6 bits of any byte carry subchannel data; the top two bits
//! belong to the P and Q channels and are masked off everywhere.
//!
//! The payload decoders are pure and never fail. Range checks against the
//! canvas (colors, tile coordinates) happen when a payload is applied.

use kh_core::graphics::Rgb;
use thiserror::Error;

/// Size of one subcode packet in bytes
pub const PACKET_SIZE: usize = 24;

/// Size of the data field in bytes
pub const DATA_SIZE: usize = 16;

/// Mask selecting the subchannel bits (R..W) of a subcode byte
pub const SUBCODE_MASK: u8 = 0x3F;

/// Command value identifying CD+G graphics packets
pub const CDG_COMMAND: u8 = 0x09;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("subcode packet must be 24 bytes, got {0}")]
    BadLength(usize),
}

/// Graphics instructions defined by the Red Book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Instruction {
    MemoryPreset = 1,
    BorderPreset = 2,
    TileBlock = 6,
    ScrollPreset = 20,
    ScrollCopy = 24,
    DefineTransparent = 28,
    ColorsLow = 30,
    ColorsHigh = 31,
    TileBlockXor = 38,
}

impl Instruction {
    /// Decode an instruction byte. Unknown codes return `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code & SUBCODE_MASK {
            1 => Some(Instruction::MemoryPreset),
            2 => Some(Instruction::BorderPreset),
            6 => Some(Instruction::TileBlock),
            20 => Some(Instruction::ScrollPreset),
            24 => Some(Instruction::ScrollCopy),
            28 => Some(Instruction::DefineTransparent),
            30 => Some(Instruction::ColorsLow),
            31 => Some(Instruction::ColorsHigh),
            38 => Some(Instruction::TileBlockXor),
            _ => None,
        }
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One raw subcode packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubcodePacket {
    pub command: u8,
    pub instruction: u8,
    pub parity_q: [u8; 2],
    pub data: [u8; DATA_SIZE],
    pub parity_p: [u8; 4],
}

impl SubcodePacket {
    /// Build a graphics packet with zeroed parity.
    pub fn new(instruction: Instruction, data: [u8; DATA_SIZE]) -> Self {
        Self {
            command: CDG_COMMAND,
            instruction: instruction.code(),
            parity_q: [0; 2],
            data,
            parity_p: [0; 4],
        }
    }

    pub fn from_bytes(bytes: &[u8; PACKET_SIZE]) -> Self {
        let mut data = [0; DATA_SIZE];
        data.copy_from_slice(&bytes[4..20]);
        Self {
            command: bytes[0],
            instruction: bytes[1],
            parity_q: [bytes[2], bytes[3]],
            data,
            parity_p: [bytes[20], bytes[21], bytes[22], bytes[23]],
        }
    }

    /// Parse a packet from a slice that must be exactly [`PACKET_SIZE`] long.
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        let bytes: &[u8; PACKET_SIZE] = bytes
            .try_into()
            .map_err(|_| PacketError::BadLength(bytes.len()))?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; PACKET_SIZE] {
        let mut out = [0; PACKET_SIZE];
        out[0] = self.command;
        out[1] = self.instruction;
        out[2..4].copy_from_slice(&self.parity_q);
        out[4..20].copy_from_slice(&self.data);
        out[20..24].copy_from_slice(&self.parity_p);
        out
    }

    /// True when this packet carries a CD+G graphics instruction.
    #[inline]
    pub fn is_graphics(&self) -> bool {
        self.command & SUBCODE_MASK == CDG_COMMAND
    }

    /// The decoded instruction, or `None` for non-graphics packets and
    /// unknown instruction codes.
    pub fn instruction(&self) -> Option<Instruction> {
        if self.is_graphics() {
            Instruction::from_code(self.instruction)
        } else {
            None
        }
    }
}

/// Fill the whole canvas with one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryPreset {
    pub color: u8,
    /// Nonzero on retransmissions of the same preset
    pub repeat: u8,
}

impl MemoryPreset {
    pub fn decode(data: &[u8; DATA_SIZE]) -> Self {
        Self {
            color: (data[0] & 0x0F).min(15),
            repeat: data[1] & 0x0F,
        }
    }
}

/// Fill the border area with one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderPreset {
    pub color: u8,
}

impl BorderPreset {
    pub fn decode(data: &[u8; DATA_SIZE]) -> Self {
        Self {
            color: (data[0] & 0x0F).min(15),
        }
    }
}

/// A 6×12 two-color tile addressed on the 50×18 tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBlock {
    pub color0: u8,
    pub color1: u8,
    pub row: u8,
    pub column: u8,
    /// One byte per scanline; bit 5 is the leftmost pixel.
    pub pixels: [u8; 12],
}

impl TileBlock {
    pub const WIDTH: usize = 6;
    pub const HEIGHT: usize = 12;

    pub fn decode(data: &[u8; DATA_SIZE]) -> Self {
        let mut pixels = [0; 12];
        pixels.copy_from_slice(&data[4..16]);
        Self {
            color0: data[0] & 0x0F,
            color1: data[1] & 0x0F,
            row: data[2] & 0x1F,
            column: data[3] & 0x3F,
            pixels,
        }
    }

    /// Top scanline of the tile in canvas pixels
    #[inline]
    pub fn top(&self) -> usize {
        self.row as usize * Self::HEIGHT
    }

    /// Left column of the tile in canvas pixels
    #[inline]
    pub fn left(&self) -> usize {
        self.column as usize * Self::WIDTH
    }
}

/// Horizontal part of a scroll command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalShift {
    None,
    Right,
    Left,
}

/// Vertical part of a scroll command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalShift {
    None,
    Down,
    Up,
}

/// Scroll the canvas by one tile and/or set the sub-tile display offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scroll {
    /// Fill color for preset scrolling
    pub color: u8,
    pub h_cmd: u8,
    /// Horizontal display offset, 0-5 on well-formed streams
    pub h_offset: u8,
    pub v_cmd: u8,
    /// Vertical display offset, 0-11 on well-formed streams
    pub v_offset: u8,
}

impl Scroll {
    pub fn decode(data: &[u8; DATA_SIZE]) -> Self {
        let h_scroll = data[1] & SUBCODE_MASK;
        let v_scroll = data[2] & SUBCODE_MASK;
        Self {
            color: data[0] & 0x0F,
            h_cmd: (h_scroll & 0x30) >> 4,
            h_offset: h_scroll & 0x07,
            v_cmd: (v_scroll & 0x30) >> 4,
            v_offset: v_scroll & 0x0F,
        }
    }

    pub fn horizontal(&self) -> HorizontalShift {
        match self.h_cmd {
            1 => HorizontalShift::Right,
            2 => HorizontalShift::Left,
            _ => HorizontalShift::None,
        }
    }

    pub fn vertical(&self) -> VerticalShift {
        match self.v_cmd {
            1 => VerticalShift::Down,
            2 => VerticalShift::Up,
            _ => VerticalShift::None,
        }
    }
}

/// Eight palette entries, for either the low (0-7) or high (8-15) half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTable {
    pub colors: [Rgb; 8],
}

impl ColorTable {
    /// Each color is 12-bit RGB spread over two bytes of six usable bits:
    ///
    /// ```text
    /// first:  [- - r3 r2 r1 r0 g3 g2]
    /// second: [- - g1 g0 b3 b2 b1 b0]
    /// ```
    pub fn decode(data: &[u8; DATA_SIZE]) -> Self {
        let mut colors = [Rgb::BLACK; 8];
        for (color, pair) in colors.iter_mut().zip(data.chunks_exact(2)) {
            let (first, second) = (pair[0], pair[1]);
            let red = (first & 0x3C) >> 2;
            let green = ((first & 0x03) << 2) | ((second & 0x30) >> 4);
            let blue = second & 0x0F;
            *color = Rgb::from_rgb444(red, green, blue);
        }
        Self { colors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(prefix: &[u8]) -> [u8; DATA_SIZE] {
        let mut d = [0; DATA_SIZE];
        d[..prefix.len()].copy_from_slice(prefix);
        d
    }

    #[test]
    fn test_instruction_codes() {
        assert_eq!(Instruction::from_code(1), Some(Instruction::MemoryPreset));
        assert_eq!(Instruction::from_code(38), Some(Instruction::TileBlockXor));
        // P/Q bits are ignored
        assert_eq!(Instruction::from_code(0xC6), Some(Instruction::TileBlock));
        assert_eq!(Instruction::from_code(3), None);
        assert_eq!(Instruction::ColorsHigh.code(), 31);
    }

    #[test]
    fn test_packet_layout() {
        let mut raw = [0u8; PACKET_SIZE];
        raw[0] = 0x49; // graphics with a stray Q bit
        raw[1] = 30;
        raw[2] = 0xAA;
        raw[3] = 0xBB;
        for (i, b) in raw[4..20].iter_mut().enumerate() {
            *b = i as u8;
        }
        raw[20..].copy_from_slice(&[1, 2, 3, 4]);

        let p = SubcodePacket::from_bytes(&raw);
        assert!(p.is_graphics());
        assert_eq!(p.instruction(), Some(Instruction::ColorsLow));
        assert_eq!(p.parity_q, [0xAA, 0xBB]);
        assert_eq!(p.data[0], 0);
        assert_eq!(p.data[15], 15);
        assert_eq!(p.parity_p, [1, 2, 3, 4]);
        assert_eq!(p.to_bytes(), raw);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(
            SubcodePacket::parse(&[0u8; 23]),
            Err(PacketError::BadLength(23))
        );
        assert!(SubcodePacket::parse(&[0u8; 24]).is_ok());
    }

    #[test]
    fn test_non_graphics_packet_has_no_instruction() {
        let mut p = SubcodePacket::new(Instruction::MemoryPreset, [0; DATA_SIZE]);
        p.command = 0x08;
        assert!(!p.is_graphics());
        assert_eq!(p.instruction(), None);
    }

    #[test]
    fn test_memory_preset_decode() {
        let mp = MemoryPreset::decode(&data(&[0xF7, 0x31]));
        assert_eq!(mp.color, 7);
        assert_eq!(mp.repeat, 1);
    }

    #[test]
    fn test_border_preset_decode() {
        assert_eq!(BorderPreset::decode(&data(&[0x3C])).color, 12);
    }

    #[test]
    fn test_tile_block_decode() {
        let mut d = data(&[0x11, 0x22, 0xE5, 0xC9]);
        d[4] = 0b111111;
        d[15] = 0b100001;
        let tb = TileBlock::decode(&d);
        assert_eq!(tb.color0, 1);
        assert_eq!(tb.color1, 2);
        assert_eq!(tb.row, 5);
        assert_eq!(tb.column, 9);
        assert_eq!(tb.top(), 60);
        assert_eq!(tb.left(), 54);
        assert_eq!(tb.pixels[0], 0b111111);
        assert_eq!(tb.pixels[11], 0b100001);
    }

    #[test]
    fn test_scroll_decode() {
        // h: cmd 2, offset 5; v: cmd 1, offset 11
        let s = Scroll::decode(&data(&[0x04, 0x25, 0x1B]));
        assert_eq!(s.color, 4);
        assert_eq!(s.horizontal(), HorizontalShift::Left);
        assert_eq!(s.h_offset, 5);
        assert_eq!(s.vertical(), VerticalShift::Down);
        assert_eq!(s.v_offset, 11);

        let none = Scroll::decode(&data(&[0, 0x30, 0x30]));
        assert_eq!(none.horizontal(), HorizontalShift::None);
        assert_eq!(none.vertical(), VerticalShift::None);
    }

    #[test]
    fn test_color_table_decode() {
        // slot 0: pure red, slot 1: pure green, slot 2: pure blue, slot 7: white
        let mut d = [0u8; DATA_SIZE];
        d[0] = 0x3C;
        d[2] = 0x03;
        d[3] = 0x30;
        d[5] = 0x0F;
        d[14] = 0x3F;
        d[15] = 0x3F;
        let table = ColorTable::decode(&d);
        assert_eq!(table.colors[0], Rgb::new(255, 0, 0));
        assert_eq!(table.colors[1], Rgb::new(0, 255, 0));
        assert_eq!(table.colors[2], Rgb::new(0, 0, 255));
        assert_eq!(table.colors[3], Rgb::BLACK);
        assert_eq!(table.colors[7], Rgb::new(255, 255, 255));
    }

    #[test]
    fn test_color_table_channel_bits() {
        // r=0b1010, g=0b0110, b=0b0011
        let mut d = [0u8; DATA_SIZE];
        d[0] = (0b1010 << 2) | 0b01;
        d[1] = (0b10 << 4) | 0b0011;
        let c = ColorTable::decode(&d).colors[0];
        assert_eq!(c, Rgb::new(10 * 17, 6 * 17, 3 * 17));
    }
}
