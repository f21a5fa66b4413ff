//! Overlay window and chat bubble constants.

/// Screen size assumed when no monitor can be queried
pub const FALLBACK_SCREEN_WIDTH: f32 = 1920.0;
pub const FALLBACK_SCREEN_HEIGHT: f32 = 1080.0;

/// Chat bubble width (pixels)
pub const BUBBLE_WIDTH: f32 = 220.0;
/// Rough characters per wrapped bubble line
pub const BUBBLE_CHARS_PER_LINE: usize = 24;
/// Height of one text line in the bubble (pixels)
pub const BUBBLE_LINE_HEIGHT: f32 = 20.0;
/// Padding inside the bubble frame (pixels)
pub const BUBBLE_PADDING: f32 = 10.0;
/// Gap between the bubble and the pet (pixels)
pub const BUBBLE_GAP: f32 = 6.0;
/// Bubbles keep at least this far from screen edges (pixels)
pub const SCREEN_EDGE_MARGIN: f32 = 8.0;
/// Bubble font size (pixels)
pub const BUBBLE_FONT_SIZE: f32 = 15.0;
