//! CD+G playback driver

use crate::canvas::{Canvas, CdgFrame};
use crate::stream::{CdgStream, StreamError};
use kh_core::logging::{log, LogCategory, LogLevel};
use kh_core::types::Frame;
use kh_core::{MountPointInfo, Player};
use serde::de::Error as _;
use serde_json::Value;
use thiserror::Error;

/// Mount point id for the `.cdg` track
pub const GRAPHICS_MOUNT: &str = "Graphics";

/// Display rate used by [`CdgPlayer::new`]
pub const DEFAULT_FPS: u32 = 30;

const STATE_FORMAT: &str = "cdg";
const STATE_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum CdgError {
    #[error("No graphics track loaded")]
    NoTrack,
    #[error("Invalid mount point: {0}")]
    InvalidMountPoint(String),
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

/// Plays a mounted CD+G track into a [`Canvas`].
///
/// The playback clock is advanced by the host, either one display frame at
/// a time or by seeking. Packets due by the new position are applied in
/// order; seeking backwards replays the track from the start because the
/// canvas cannot be un-applied.
pub struct CdgPlayer {
    canvas: Canvas,
    stream: Option<CdgStream>,
    /// Packets already applied to the canvas
    next_packet: usize,
    position_ms: u64,
    frame_index: u64,
    fps: u32,
    frame_changed: bool,
}

impl CdgPlayer {
    pub fn new() -> Self {
        Self::with_fps(DEFAULT_FPS)
    }

    /// Create a player stepping at `fps` display frames per second (at least 1).
    pub fn with_fps(fps: u32) -> Self {
        Self {
            canvas: Canvas::new(),
            stream: None,
            next_packet: 0,
            position_ms: 0,
            frame_index: 0,
            fps: fps.max(1),
            frame_changed: false,
        }
    }

    /// Replace the mounted track with an already loaded stream.
    pub fn load_stream(&mut self, stream: CdgStream) {
        log(LogCategory::Player, LogLevel::Info, || {
            format!(
                "mounted track: {} packets, {} ms",
                stream.len(),
                stream.duration_ms()
            )
        });
        self.stream = Some(stream);
        self.reset();
    }

    pub fn stream(&self) -> Option<&CdgStream> {
        self.stream.as_ref()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Number of packets applied so far
    pub fn packets_applied(&self) -> usize {
        self.next_packet
    }

    /// Whether the last step or seek changed pixels or palette.
    pub fn frame_changed(&self) -> bool {
        self.frame_changed
    }

    /// The visible image at the current position, still indexed.
    pub fn current_frame(&self) -> CdgFrame {
        self.canvas.current_frame()
    }

    fn advance_to(&mut self, ms: u64) -> Result<(), CdgError> {
        let stream = self.stream.as_ref().ok_or(CdgError::NoTrack)?;
        let target = stream.packet_index_at(ms);

        let mut changed = false;
        if target < self.next_packet {
            log(LogCategory::Player, LogLevel::Debug, || {
                format!("rewinding to {} ms, replaying {} packets", ms, target)
            });
            self.canvas.reset();
            self.next_packet = 0;
            changed = true;
        }
        for packet in &stream.packets()[self.next_packet..target] {
            changed |= self.canvas.apply(packet);
        }

        self.next_packet = target;
        self.position_ms = ms;
        self.frame_changed = changed;
        Ok(())
    }
}

impl Default for CdgPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Player for CdgPlayer {
    type Error = CdgError;

    fn reset(&mut self) {
        self.canvas.reset();
        self.next_packet = 0;
        self.position_ms = 0;
        self.frame_index = 0;
        self.frame_changed = false;
    }

    fn step_frame(&mut self) -> Result<Frame, Self::Error> {
        let next = self.frame_index + 1;
        self.advance_to(next * 1000 / self.fps as u64)?;
        self.frame_index = next;
        Ok(self.canvas.current_frame().to_argb())
    }

    fn seek(&mut self, ms: u64) -> Result<(), Self::Error> {
        self.advance_to(ms)?;
        self.frame_index = ms.saturating_mul(self.fps as u64) / 1000;
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.position_ms
    }

    fn duration_ms(&self) -> u64 {
        self.stream.as_ref().map_or(0, CdgStream::duration_ms)
    }

    fn save_state(&self) -> Value {
        serde_json::json!({
            "format": STATE_FORMAT,
            "version": STATE_VERSION,
            "position_ms": self.position_ms,
            "packets_applied": self.next_packet,
            "canvas": serde_json::to_value(&self.canvas)
                .expect("canvas state has string keys and plain fields"),
        })
    }

    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error> {
        match v.get("format").and_then(Value::as_str) {
            Some(STATE_FORMAT) => {}
            other => {
                return Err(serde_json::Error::custom(format!(
                    "not a CD+G save state (format {:?})",
                    other
                )))
            }
        }
        let version = v.get("version").and_then(Value::as_u64).unwrap_or(0);
        if version != STATE_VERSION {
            return Err(serde_json::Error::custom(format!(
                "unsupported CD+G save state version {}",
                version
            )));
        }

        let field = |name: &str| {
            v.get(name).and_then(Value::as_u64).ok_or_else(|| {
                serde_json::Error::custom(format!("CD+G save state is missing {}", name))
            })
        };
        let position_ms = field("position_ms")?;
        let packets_applied = field("packets_applied")?;
        let canvas: Canvas = serde_json::from_value(v.get("canvas").cloned().unwrap_or_default())?;

        // The canvas is the fold of exactly the packets due at position_ms
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| serde_json::Error::custom("no graphics track mounted"))?;
        let due = stream.packet_index_at(position_ms);
        if packets_applied != due as u64 {
            return Err(serde_json::Error::custom(format!(
                "save state has {} packets applied at {} ms, track has {} due",
                packets_applied, position_ms, due
            )));
        }
        let packets_applied = due;

        self.canvas = canvas;
        self.next_packet = packets_applied;
        self.position_ms = position_ms;
        self.frame_index = position_ms.saturating_mul(self.fps as u64) / 1000;
        self.frame_changed = true;
        Ok(())
    }

    fn supports_save_states(&self) -> bool {
        true
    }

    fn mount_points(&self) -> Vec<MountPointInfo> {
        vec![MountPointInfo {
            id: GRAPHICS_MOUNT.to_string(),
            name: "CD+G Graphics".to_string(),
            extensions: vec!["cdg".to_string()],
            required: true,
        }]
    }

    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
        if mount_point_id != GRAPHICS_MOUNT {
            return Err(CdgError::InvalidMountPoint(mount_point_id.to_string()));
        }
        self.load_stream(CdgStream::from_bytes(data)?);
        Ok(())
    }

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error> {
        if mount_point_id != GRAPHICS_MOUNT {
            return Err(CdgError::InvalidMountPoint(mount_point_id.to_string()));
        }
        self.stream = None;
        self.reset();
        Ok(())
    }

    fn is_mounted(&self, mount_point_id: &str) -> bool {
        mount_point_id == GRAPHICS_MOUNT && self.stream.is_some()
    }
}
