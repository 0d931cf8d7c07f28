//! Socket configuration

/// Default outbound queue depth per peer
pub const DEFAULT_SEND_HWM: usize = 1000;

/// Default inbound queue depth per socket
pub const DEFAULT_RECV_HWM: usize = 1000;

/// Default maximum number of frames in one message
pub const DEFAULT_MAX_FRAMES: usize = 64;

/// Default maximum size of one frame
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024; // 16MB

/// Per-socket tuning knobs
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Messages queued per peer before further sends to it are dropped
    pub send_hwm: usize,

    /// Messages queued for `recv` before peers are back-pressured
    pub recv_hwm: usize,

    /// Maximum frames per message
    pub max_frames: usize,

    /// Maximum bytes per frame
    pub max_frame_size: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            send_hwm: DEFAULT_SEND_HWM,
            recv_hwm: DEFAULT_RECV_HWM,
            max_frames: DEFAULT_MAX_FRAMES,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl SocketConfig {
    /// Set the per-peer send high-water mark (minimum 1)
    pub fn send_hwm(mut self, hwm: usize) -> Self {
        self.send_hwm = hwm.max(1);
        self
    }

    /// Set the receive high-water mark (minimum 1)
    pub fn recv_hwm(mut self, hwm: usize) -> Self {
        self.recv_hwm = hwm.max(1);
        self
    }

    /// Set the maximum frames per message
    pub fn max_frames(mut self, max: usize) -> Self {
        self.max_frames = max.max(1);
        self
    }

    /// Set the maximum frame size
    pub fn max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }
}
