//! Core playback primitives and traits shared by the graphics formats.

pub mod graphics;
pub mod logging;
pub mod types {
    use crate::graphics::ColorOps;
    use serde::{Deserialize, Serialize};

    /// A true-color output frame, one ARGB8888 value per pixel.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0xFF000000; (width * height) as usize],
            }
        }

        /// Pack the frame as tightly laid out RGB8 bytes (alpha dropped).
        pub fn to_rgb8(&self) -> Vec<u8> {
            let mut out = Vec::with_capacity(self.pixels.len() * 3);
            for &p in &self.pixels {
                out.push(ColorOps::red(p));
                out.push(ColorOps::green(p));
                out.push(ColorOps::blue(p));
            }
            out
        }

        /// Nearest-neighbour upscale by an integer factor.
        ///
        /// A factor of 0 or 1 returns an unchanged copy.
        pub fn scaled(&self, factor: u32) -> Frame {
            if factor <= 1 {
                return self.clone();
            }
            let width = self.width * factor;
            let height = self.height * factor;
            let mut pixels = Vec::with_capacity((width * height) as usize);
            for y in 0..height {
                let src_row = (y / factor) * self.width;
                for x in 0..width {
                    pixels.push(self.pixels[(src_row + x / factor) as usize]);
                }
            }
            Frame {
                width,
                height,
                pixels,
            }
        }
    }
}

use serde_json::Value;

/// Description of a mount point (media slot) that a player supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPointInfo {
    /// Unique identifier for this mount point (e.g., "Graphics")
    pub id: String,
    /// User-friendly name for display
    pub name: String,
    /// File extensions accepted by this mount point (e.g., ["cdg"])
    pub extensions: Vec<String>,
    /// Whether this mount point is required for playback
    pub required: bool,
}

/// A graphics-track player driven by an external playback clock.
///
/// Implementations fold an ordered command stream into a video surface and
/// hand out a frame per display tick. They have no notion of audio; the
/// host decides the cadence by calling [`Player::step_frame`] or
/// [`Player::seek`].
pub trait Player {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Drop all decoded state and rewind to the start of the track
    fn reset(&mut self);

    /// Advance by one display frame and return the visible image.
    fn step_frame(&mut self) -> Result<types::Frame, Self::Error>;

    /// Move the playback position to `ms` milliseconds from the start.
    fn seek(&mut self, ms: u64) -> Result<(), Self::Error>;

    /// Current playback position in milliseconds
    fn position_ms(&self) -> u64;

    /// Total length of the mounted track in milliseconds (0 when empty)
    fn duration_ms(&self) -> u64;

    /// Return a JSON-serializable save state.
    /// Save states do not include the mounted track data itself.
    fn save_state(&self) -> Value;

    /// Load a JSON save state.
    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error>;

    /// Check if this player supports save/load state functionality
    fn supports_save_states(&self) -> bool {
        false
    }

    /// Get the list of mount points this player supports
    fn mount_points(&self) -> Vec<MountPointInfo>;

    /// Load media into a specific mount point
    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Unload media from a specific mount point
    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error>;

    /// Check if a mount point has media loaded
    fn is_mounted(&self, mount_point_id: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::Frame;

    #[test]
    fn frame_initialization() {
        let f = Frame::new(10, 10);
        assert_eq!(f.pixels.len(), 100);
        assert_eq!(f.width, 10);
        assert_eq!(f.height, 10);
        assert!(f.pixels.iter().all(|&p| p == 0xFF000000));
    }

    #[test]
    fn frame_to_rgb8_drops_alpha() {
        let mut f = Frame::new(2, 1);
        f.pixels[0] = 0xFF112233;
        f.pixels[1] = 0x80AABBCC;
        assert_eq!(f.to_rgb8(), vec![0x11, 0x22, 0x33, 0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn frame_scaled_nearest_neighbour() {
        let mut f = Frame::new(2, 1);
        f.pixels[1] = 0xFFFFFFFF;
        let s = f.scaled(2);
        assert_eq!(s.width, 4);
        assert_eq!(s.height, 2);
        assert_eq!(
            s.pixels,
            vec![
                0xFF000000, 0xFF000000, 0xFFFFFFFF, 0xFFFFFFFF, //
                0xFF000000, 0xFF000000, 0xFFFFFFFF, 0xFFFFFFFF,
            ]
        );
        assert_eq!(f.scaled(1), f);
    }

    struct MockPlayer {
        position: u64,
        mounted: bool,
    }

    impl Player for MockPlayer {
        type Error = std::convert::Infallible;

        fn reset(&mut self) {
            self.position = 0;
        }

        fn step_frame(&mut self) -> Result<Frame, Self::Error> {
            self.position += 33;
            Ok(Frame::new(2, 2))
        }

        fn seek(&mut self, ms: u64) -> Result<(), Self::Error> {
            self.position = ms;
            Ok(())
        }

        fn position_ms(&self) -> u64 {
            self.position
        }

        fn duration_ms(&self) -> u64 {
            1000
        }

        fn save_state(&self) -> Value {
            serde_json::json!({"mock": true, "position": self.position})
        }

        fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error> {
            if let Some(p) = v.get("position").and_then(|p| p.as_u64()) {
                self.position = p;
            }
            Ok(())
        }

        fn mount_points(&self) -> Vec<MountPointInfo> {
            vec![MountPointInfo {
                id: "test".to_string(),
                name: "Test Slot".to_string(),
                extensions: vec!["bin".to_string()],
                required: false,
            }]
        }

        fn mount(&mut self, _mount_point_id: &str, _data: &[u8]) -> Result<(), Self::Error> {
            self.mounted = true;
            Ok(())
        }

        fn unmount(&mut self, _mount_point_id: &str) -> Result<(), Self::Error> {
            self.mounted = false;
            Ok(())
        }

        fn is_mounted(&self, _mount_point_id: &str) -> bool {
            self.mounted
        }
    }

    #[test]
    fn mock_player_save_load_roundtrip() {
        let mut p = MockPlayer {
            position: 0,
            mounted: false,
        };
        p.seek(500).unwrap();
        let s = serde_json::to_string(&p.save_state()).expect("serialize");
        let v: Value = serde_json::from_str(&s).expect("deserialize");

        let mut p2 = MockPlayer {
            position: 0,
            mounted: false,
        };
        assert!(p2.load_state(&v).is_ok());
        assert_eq!(p2.position_ms(), 500);
        assert!(!p2.supports_save_states());
    }

    #[test]
    fn test_player_mount_operations() {
        let mut p = MockPlayer {
            position: 0,
            mounted: false,
        };
        assert!(!p.is_mounted("test"));
        assert!(p.mount("test", &[1, 2, 3]).is_ok());
        assert!(p.is_mounted("test"));
        assert!(p.unmount("test").is_ok());
        assert!(!p.is_mounted("test"));
        assert_eq!(p.mount_points()[0].extensions, vec!["bin".to_string()]);
    }
}
