//! CD+G raster engine.
//!
//! The canvas is a 300×216 indexed surface (one byte per pixel, values
//! 0-15) plus a 16-entry palette. It is divided into a 50×18 grid of 6×12
//! tiles; the outermost tile ring is border and is cropped away on output.
//!
//! Packets are applied strictly in arrival order. Several commands depend on
//! what came before (memory preset retransmissions, XOR tiles, scrolling),
//! so the canvas is a fold over the packet sequence and nothing else.
//!
//! Corrupted payloads are rejected whole: a command either applies fully or
//! leaves the canvas untouched.

use crate::packet::{
    BorderPreset, ColorTable, HorizontalShift, Instruction, MemoryPreset, Scroll, SubcodePacket,
    TileBlock, VerticalShift,
};
use kh_core::graphics::{FixedPalette, IndexedPalette, Rgb};
use kh_core::logging::{log, LogCategory, LogLevel};
use kh_core::types::Frame;
use serde::{Deserialize, Serialize};

/// Full canvas width in pixels
pub const FULL_WIDTH: usize = 300;

/// Full canvas height in pixels
pub const FULL_HEIGHT: usize = 216;

/// Width of the displayed window
pub const VISIBLE_WIDTH: usize = 288;

/// Height of the displayed window
pub const VISIBLE_HEIGHT: usize = 192;

/// Left/right border width (one tile column)
pub const BORDER_WIDTH: usize = 6;

/// Top border height (one tile row)
pub const BORDER_HEIGHT: usize = 12;

/// Tile grid dimensions
pub const TILE_COLUMNS: u8 = 50;
pub const TILE_ROWS: u8 = 18;

pub const PALETTE_SIZE: usize = 16;

/// Largest horizontal display offset
pub const MAX_H_OFFSET: u8 = 5;

/// Largest vertical display offset
pub const MAX_V_OFFSET: u8 = 11;

const FULL_SIZE: usize = FULL_WIDTH * FULL_HEIGHT;

// Border preset paints rows above 12 and below 203 entirely
const BORDER_LAST_INTERIOR_ROW: usize = 202;

/// How a tile block combines with the existing pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMode {
    Normal,
    Xor,
}

/// What fills the band vacated by a one-tile scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    /// Fill with the command's color
    Preset,
    /// Wrap the band shifted out back in on the opposite edge
    Copy,
}

/// Which half of the palette a color table loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorBank {
    Low,
    High,
}

impl ColorBank {
    fn first_index(self) -> usize {
        match self {
            ColorBank::Low => 0,
            ColorBank::High => 8,
        }
    }
}

/// The visible part of the canvas together with the palette to show it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdgFrame {
    /// 288×192 palette indices, row-major
    pub pixels: Vec<u8>,
    pub palette: [Rgb; PALETTE_SIZE],
}

impl CdgFrame {
    #[inline]
    pub fn index_at(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * VISIBLE_WIDTH + x]
    }

    /// Resolve every pixel through the palette into an ARGB frame.
    pub fn to_argb(&self) -> Frame {
        let lut: [u32; PALETTE_SIZE] = self.palette.map(Rgb::to_argb);
        Frame {
            width: VISIBLE_WIDTH as u32,
            height: VISIBLE_HEIGHT as u32,
            pixels: self
                .pixels
                .iter()
                .map(|&i| lut[(i & 0x0F) as usize])
                .collect(),
        }
    }
}

/// Persistent CD+G video surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CanvasState", into = "CanvasState")]
pub struct Canvas {
    pixels: Vec<u8>,
    palette: FixedPalette<PALETTE_SIZE>,
    h_offset: u8,
    v_offset: u8,
    last_was_memory_preset: bool,
}

impl Canvas {
    /// Black canvas, black palette, zero offsets.
    pub fn new() -> Self {
        Self {
            pixels: vec![0; FULL_SIZE],
            palette: FixedPalette::new(),
            h_offset: 0,
            v_offset: 0,
            last_was_memory_preset: false,
        }
    }

    /// Restore the freshly created state.
    pub fn reset(&mut self) {
        self.pixels.fill(0);
        self.palette = FixedPalette::new();
        self.h_offset = 0;
        self.v_offset = 0;
        self.last_was_memory_preset = false;
    }

    /// Apply one packet. Returns whether pixels or palette changed.
    ///
    /// Packets that are not CD+G graphics instructions are ignored and do
    /// not touch any state, including the memory preset repeat tracking.
    pub fn apply(&mut self, packet: &SubcodePacket) -> bool {
        if !packet.is_graphics() {
            return false;
        }

        let instruction = packet.instruction();
        let data = &packet.data;
        let changed = match instruction {
            Some(Instruction::MemoryPreset) => self.memory_preset(&MemoryPreset::decode(data)),
            Some(Instruction::BorderPreset) => self.border_preset(&BorderPreset::decode(data)),
            Some(Instruction::TileBlock) => self.tile_block(&TileBlock::decode(data), TileMode::Normal),
            Some(Instruction::TileBlockXor) => self.tile_block(&TileBlock::decode(data), TileMode::Xor),
            Some(Instruction::ScrollPreset) => self.scroll(&Scroll::decode(data), ScrollMode::Preset),
            Some(Instruction::ScrollCopy) => self.scroll(&Scroll::decode(data), ScrollMode::Copy),
            Some(Instruction::ColorsLow) => self.load_colors(&ColorTable::decode(data), ColorBank::Low),
            Some(Instruction::ColorsHigh) => self.load_colors(&ColorTable::decode(data), ColorBank::High),
            Some(Instruction::DefineTransparent) => {
                log(LogCategory::Stubs, LogLevel::Trace, || {
                    "define transparent color is not supported, ignoring".to_string()
                });
                false
            }
            None => {
                log(LogCategory::Packet, LogLevel::Trace, || {
                    format!("unknown graphics instruction {:#04x}", packet.instruction)
                });
                false
            }
        };
        self.last_was_memory_preset = instruction == Some(Instruction::MemoryPreset);
        changed
    }

    /// Fill the entire canvas, border included.
    ///
    /// A preset flagged as a repeat is skipped when the previous packet
    /// applied through [`Canvas::apply`] was a memory preset as well; the
    /// disc retransmits presets and they must not re-flash the screen.
    pub fn memory_preset(&mut self, preset: &MemoryPreset) -> bool {
        if preset.color as usize >= PALETTE_SIZE {
            log(LogCategory::Raster, LogLevel::Debug, || {
                format!("rejected memory preset with color {}", preset.color)
            });
            return false;
        }
        if self.last_was_memory_preset && preset.repeat != 0 {
            return false;
        }
        self.pixels.fill(preset.color);
        true
    }

    /// Paint the border ring, leaving the 288×192 interior alone.
    pub fn border_preset(&mut self, preset: &BorderPreset) -> bool {
        let color = preset.color;
        if color as usize >= PALETTE_SIZE {
            log(LogCategory::Raster, LogLevel::Debug, || {
                format!("rejected border preset with color {}", color)
            });
            return false;
        }
        for (y, row) in self.pixels.chunks_exact_mut(FULL_WIDTH).enumerate() {
            if y < BORDER_HEIGHT || y > BORDER_LAST_INTERIOR_ROW {
                row.fill(color);
            } else {
                row[..BORDER_WIDTH].fill(color);
                row[FULL_WIDTH - BORDER_WIDTH..].fill(color);
            }
        }
        true
    }

    /// Draw a 6×12 tile. Bit 5 of each scanline byte is the leftmost pixel;
    /// a set bit selects `color1`, a clear bit `color0`.
    pub fn tile_block(&mut self, tile: &TileBlock, mode: TileMode) -> bool {
        if tile.row >= TILE_ROWS
            || tile.column >= TILE_COLUMNS
            || tile.color0 as usize >= PALETTE_SIZE
            || tile.color1 as usize >= PALETTE_SIZE
        {
            log(LogCategory::Raster, LogLevel::Debug, || {
                format!(
                    "rejected tile block row={} column={} colors={}/{}",
                    tile.row, tile.column, tile.color0, tile.color1
                )
            });
            return false;
        }

        let (top, left) = (tile.top(), tile.left());
        for (dy, &bits) in tile.pixels.iter().enumerate() {
            let start = (top + dy) * FULL_WIDTH + left;
            let line = &mut self.pixels[start..start + TileBlock::WIDTH];
            for (dx, pixel) in line.iter_mut().enumerate() {
                let color = if bits & (0x20 >> dx) != 0 {
                    tile.color1
                } else {
                    tile.color0
                };
                match mode {
                    TileMode::Normal => *pixel = color,
                    TileMode::Xor => *pixel ^= color,
                }
            }
        }
        true
    }

    /// Shift by one tile as requested, then latch the display offsets.
    ///
    /// Preset mode fills the vacated band: the right edge after a left
    /// shift, the left edge after a right shift, the bottom after an up
    /// shift and the top after a down shift.
    pub fn scroll(&mut self, scroll: &Scroll, mode: ScrollMode) -> bool {
        let fill = scroll.color;
        if mode == ScrollMode::Preset && fill as usize >= PALETTE_SIZE {
            log(LogCategory::Raster, LogLevel::Debug, || {
                format!("rejected scroll preset with color {}", fill)
            });
            return false;
        }

        match scroll.horizontal() {
            HorizontalShift::Left => {
                for row in self.pixels.chunks_exact_mut(FULL_WIDTH) {
                    row.rotate_left(BORDER_WIDTH);
                    if mode == ScrollMode::Preset {
                        row[FULL_WIDTH - BORDER_WIDTH..].fill(fill);
                    }
                }
            }
            HorizontalShift::Right => {
                for row in self.pixels.chunks_exact_mut(FULL_WIDTH) {
                    row.rotate_right(BORDER_WIDTH);
                    if mode == ScrollMode::Preset {
                        row[..BORDER_WIDTH].fill(fill);
                    }
                }
            }
            HorizontalShift::None => {}
        }

        let band = BORDER_HEIGHT * FULL_WIDTH;
        match scroll.vertical() {
            VerticalShift::Up => {
                self.pixels.rotate_left(band);
                if mode == ScrollMode::Preset {
                    self.pixels[FULL_SIZE - band..].fill(fill);
                }
            }
            VerticalShift::Down => {
                self.pixels.rotate_right(band);
                if mode == ScrollMode::Preset {
                    self.pixels[..band].fill(fill);
                }
            }
            VerticalShift::None => {}
        }

        if scroll.h_offset > MAX_H_OFFSET || scroll.v_offset > MAX_V_OFFSET {
            log(LogCategory::Raster, LogLevel::Debug, || {
                format!(
                    "clamping scroll offsets h={} v={}",
                    scroll.h_offset, scroll.v_offset
                )
            });
        }
        self.h_offset = scroll.h_offset.min(MAX_H_OFFSET);
        self.v_offset = scroll.v_offset.min(MAX_V_OFFSET);
        true
    }

    /// Load eight palette entries. Returns true if any entry changed value.
    pub fn load_colors(&mut self, table: &ColorTable, bank: ColorBank) -> bool {
        let first = bank.first_index();
        let mut changed = false;
        for (i, &color) in table.colors.iter().enumerate() {
            changed |= self.palette.set_color(first + i, color);
        }
        changed
    }

    /// Crop the displayable 288×192 window, shifted by the current offsets.
    pub fn current_frame(&self) -> CdgFrame {
        let mut pixels = Vec::with_capacity(VISIBLE_WIDTH * VISIBLE_HEIGHT);
        let x0 = BORDER_WIDTH + self.h_offset as usize;
        for y in 0..VISIBLE_HEIGHT {
            let src_row = BORDER_HEIGHT + y + self.v_offset as usize;
            let start = src_row * FULL_WIDTH + x0;
            pixels.extend_from_slice(&self.pixels[start..start + VISIBLE_WIDTH]);
        }
        CdgFrame {
            pixels,
            palette: *self.palette.colors(),
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * FULL_WIDTH + x]
    }

    /// The full 300×216 raster, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn palette(&self) -> &[Rgb; PALETTE_SIZE] {
        self.palette.colors()
    }

    pub fn h_offset(&self) -> u8 {
        self.h_offset
    }

    pub fn v_offset(&self) -> u8 {
        self.v_offset
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized form of a [`Canvas`]. Pixels are one hex digit each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasState {
    pub pixels: String,
    pub palette: FixedPalette<PALETTE_SIZE>,
    pub h_offset: u8,
    pub v_offset: u8,
    #[serde(default)]
    pub last_was_memory_preset: bool,
}

impl From<Canvas> for CanvasState {
    fn from(c: Canvas) -> Self {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let pixels = c.pixels.iter().map(|&p| HEX[(p & 0x0F) as usize] as char).collect();
        Self {
            pixels,
            palette: c.palette,
            h_offset: c.h_offset,
            v_offset: c.v_offset,
            last_was_memory_preset: c.last_was_memory_preset,
        }
    }
}

impl TryFrom<CanvasState> for Canvas {
    type Error = String;

    fn try_from(s: CanvasState) -> Result<Self, Self::Error> {
        if s.pixels.len() != FULL_SIZE {
            return Err(format!(
                "canvas state has {} pixels, expected {}",
                s.pixels.len(),
                FULL_SIZE
            ));
        }
        if s.h_offset > MAX_H_OFFSET || s.v_offset > MAX_V_OFFSET {
            return Err(format!(
                "canvas offsets out of range: h={} v={}",
                s.h_offset, s.v_offset
            ));
        }
        let pixels = s
            .pixels
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| "canvas state pixels must be hex digits".to_string())?;
        Ok(Self {
            pixels,
            palette: s.palette,
            h_offset: s.h_offset,
            v_offset: s.v_offset,
            last_was_memory_preset: s.last_was_memory_preset,
        })
    }
}
