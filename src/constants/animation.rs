//! Animation-related constants.

/// Delay between UI ticks (milliseconds)
pub const TICK_INTERVAL_MS: u64 = 10;
/// Minimum time a frame stays on screen before advancing (milliseconds)
pub const FRAME_INTERVAL_MS: u64 = 150;
/// Frames laid out left-to-right in each sprite sheet
pub const SHEET_FRAME_COUNT: u32 = 4;
/// Edge length of one frame in the source sheet (pixels)
pub const SHEET_FRAME_SIZE: u32 = 32;
/// Edge length of one frame on screen (pixels)
pub const DISPLAY_FRAME_SIZE: u32 = 160;
/// Largest frame edge accepted from settings (pixels)
pub const MAX_FRAME_EDGE: u32 = 4096;
