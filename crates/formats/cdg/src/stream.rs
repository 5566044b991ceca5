//! `.cdg` byte streams and CD subcode timing.
//!
//! A `.cdg` file is the raw subchannel dump of the disc: 24-byte packets,
//! four per CD sector, 75 sectors per second. That fixes the cadence at
//! 300 packets per second, which is all that is needed to map a playback
//! time to "how many packets have been applied".

use crate::canvas::Canvas;
use crate::packet::{PacketError, SubcodePacket, PACKET_SIZE};
use kh_core::logging::{log, LogCategory, LogLevel};
use std::path::Path;
use thiserror::Error;

pub const PACKETS_PER_SECTOR: usize = 4;

/// Bytes per CD sector of subcode data
pub const SECTOR_SIZE: usize = PACKET_SIZE * PACKETS_PER_SECTOR;

pub const SECTORS_PER_SECOND: u64 = 75;

pub const PACKETS_PER_SECOND: u64 = SECTORS_PER_SECOND * PACKETS_PER_SECTOR as u64;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("CD+G stream contains no complete packet")]
    Empty,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
}

/// A fully loaded packet sequence.
#[derive(Debug, Clone)]
pub struct CdgStream {
    packets: Vec<SubcodePacket>,
    byte_len: usize,
}

impl CdgStream {
    /// Split raw bytes into packets. A trailing partial packet is dropped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StreamError> {
        let chunks = bytes.chunks_exact(PACKET_SIZE);
        let remainder = chunks.remainder().len();
        let packets = chunks
            .map(SubcodePacket::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if remainder != 0 {
            log(LogCategory::Stream, LogLevel::Warn, || {
                format!("ignoring {} trailing bytes after the last packet", remainder)
            });
        }
        if packets.is_empty() {
            return Err(StreamError::Empty);
        }

        log(LogCategory::Stream, LogLevel::Info, || {
            format!("loaded {} packets ({} bytes)", packets.len(), bytes.len())
        });
        Ok(Self {
            packets,
            byte_len: bytes.len(),
        })
    }

    /// Read a `.cdg` file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StreamError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn packet(&self, index: usize) -> Option<&SubcodePacket> {
        self.packets.get(index)
    }

    pub fn packets(&self) -> &[SubcodePacket] {
        &self.packets
    }

    /// Track length, counted in whole sectors.
    pub fn duration_ms(&self) -> u64 {
        let sectors = (self.byte_len / SECTOR_SIZE) as u64;
        sectors * 1000 / SECTORS_PER_SECOND
    }

    /// Number of packets due by playback time `ms`, capped at the stream length.
    pub fn packet_index_at(&self, ms: u64) -> usize {
        let due = ms.saturating_mul(PACKETS_PER_SECOND) / 1000;
        usize::try_from(due).map_or(self.packets.len(), |due| due.min(self.packets.len()))
    }

    /// Earliest playback time at which the first `count` packets are all due.
    pub fn time_of_packet_count(count: usize) -> u64 {
        (count as u64 * 1000).div_ceil(PACKETS_PER_SECOND)
    }

    /// Playback time at which the last visible change has been applied.
    ///
    /// Runs the whole stream through a scratch canvas. Returns 0 when no
    /// packet changes anything.
    pub fn last_change_ms(&self) -> u64 {
        let mut canvas = Canvas::new();
        let last = self
            .packets
            .iter()
            .enumerate()
            .filter(|(_, p)| canvas.apply(p))
            .last()
            .map(|(i, _)| i);
        match last {
            Some(i) => Self::time_of_packet_count(i + 1),
            None => 0,
        }
    }
}
