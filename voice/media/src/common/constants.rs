//! Common constants shared across media modules

/// Pipeline defaults
pub mod defaults {
    /// Sample rate expected by the remote conversational endpoint
    pub const SAMPLE_RATE: u32 = 24000;
    /// Mono capture and playback
    pub const CHANNEL_COUNT: u16 = 1;
    /// Frames per render tick
    pub const RENDER_PERIOD_FRAMES: u32 = 8192;
}

/// Memory policy for per-utterance buffers
pub mod memory {
    /// Capacity (in samples) kept after a reset; larger allocations are released.
    /// 30 s of mono audio at the default rate.
    pub const RETAINED_CAPACITY: usize = 24000 * 30;
}

/// Logging intervals for frame processing
pub mod logging {
    /// Log progress every N captured frames
    pub const CAPTURE_LOG_INTERVAL: u64 = 100;
    /// Log progress every N inbound playback chunks
    pub const PLAYBACK_LOG_INTERVAL: u64 = 100;
}
