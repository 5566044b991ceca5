//! CD+G (Compact Disc + Graphics) decoder
//!
//! CD+G hides low-resolution graphics commands in the subchannel of an
//! audio CD; karaoke discs and ripped `.cdg` files use it for on-screen
//! lyrics. This crate interprets that command stream.
//!
//! # Architecture
//!
//! - **packet**: the 24-byte subcode packet and its typed payloads
//! - **canvas**: the persistent 300×216 indexed raster and 16-entry palette;
//!   packets are folded into it strictly in arrival order
//! - **stream**: splits a `.cdg` byte stream into packets and maps playback
//!   time (300 packets per second) to packet positions
//! - **player**: [`CdgPlayer`], a [`kh_core::Player`] that steps a mounted
//!   stream one display frame at a time
//!
//! Only a centred 288×192 window of the canvas is meant to be shown; see
//! [`Canvas::current_frame`].

pub mod canvas;
pub mod packet;
mod player;
pub mod stream;

pub use canvas::{Canvas, CdgFrame, ColorBank, ScrollMode, TileMode};
pub use packet::{Instruction, PacketError, SubcodePacket};
pub use player::{CdgError, CdgPlayer, DEFAULT_FPS, GRAPHICS_MOUNT};
pub use stream::{CdgStream, StreamError};
