//! Drag, fall and walking constants.

/// Downward acceleration while falling (pixels per tick squared)
pub const GRAVITY: f32 = 0.5;
/// Horizontal walking speed (pixels per tick)
pub const MOVE_SPEED: f32 = 2.0;
/// Press-release pairs shorter than this are taps, not drags (seconds)
pub const TAP_THRESHOLD_SECS: f32 = 0.2;
/// Gap between the resting pet and the bottom of the screen (pixels)
pub const FLOOR_MARGIN: f32 = 50.0;
/// Fastest walk accepted from settings (pixels per tick)
pub const MAX_MOVE_SPEED: f32 = 100.0;
/// Longest tap threshold accepted from settings (seconds)
pub const MAX_TAP_THRESHOLD_SECS: f32 = 5.0;
