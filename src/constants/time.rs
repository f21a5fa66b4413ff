//! State duration constants (seconds).

/// Idle lasts a random time in this range before walking
pub const IDLE_DURATION_SECS: (f32, f32) = (3.0, 5.0);
/// A walk lasts a random time in this range before idling
pub const MOVE_DURATION_SECS: (f32, f32) = (4.0, 5.0);
/// How long a canned chat message stays up
pub const CHAT_CANNED_SECS: f32 = 6.0;
/// How long a news tip stays up
pub const CHAT_TIP_SECS: f32 = 10.0;
/// Longest idle or walk a settings file may ask for
pub const MAX_STATE_SECS: f32 = 3600.0;
