//! Pet behaviour states.
//!
//! Each state carries only the fields it needs. `transition` is the whole
//! rule table: given the current state and a trigger it names the next
//! state, or `None` when the trigger does not apply.

use crate::chat::ChatMessage;
use crate::constants::*;
use crate::sprite_sheet::{SheetLayout, SpriteError, SpriteSheet};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Horizontal heading. Sprites are drawn facing left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        if rng.gen_bool(0.5) {
            Direction::Left
        } else {
            Direction::Right
        }
    }
}

/// State names, used for logging, events and sprite lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateName {
    Sleep,
    Idle,
    Move,
    Dragged,
    Chat,
}

impl StateName {
    pub fn as_str(self) -> &'static str {
        match self {
            StateName::Sleep => "sleep",
            StateName::Idle => "idle",
            StateName::Move => "move",
            StateName::Dragged => "dragged",
            StateName::Chat => "chat",
        }
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pet is doing, with per-state data
#[derive(Debug, Clone, PartialEq)]
pub enum StateKind {
    Sleep,
    Idle,
    Move { direction: Direction },
    /// Released from a drag and falling to the floor
    Dragged,
    Chat { message: ChatMessage },
}

impl StateKind {
    pub fn name(&self) -> StateName {
        match self {
            StateKind::Sleep => StateName::Sleep,
            StateKind::Idle => StateName::Idle,
            StateKind::Move { .. } => StateName::Move,
            StateKind::Dragged => StateName::Dragged,
            StateKind::Chat { .. } => StateName::Chat,
        }
    }
}

/// Something that may cause a state change
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    DurationExpired,
    HitLeftBound,
    HitRightBound,
    /// Quick press and release on the pet, with the message to say
    Tap(ChatMessage),
    /// Held long enough to count as a drag, then let go
    DragReleased,
    Landed,
    TipArrived(ChatMessage),
}

/// The next state, before frames and timing are attached
#[derive(Debug, Clone, PartialEq)]
pub enum StateRequest {
    Idle,
    /// Walk; `None` picks a random direction
    Move(Option<Direction>),
    Dragged,
    Chat(ChatMessage),
}

/// The transition table
pub fn transition(current: &StateKind, trigger: Trigger) -> Option<StateRequest> {
    use StateKind as S;

    match trigger {
        Trigger::DurationExpired => match current {
            S::Idle => Some(StateRequest::Move(None)),
            S::Move { .. } | S::Chat { .. } => Some(StateRequest::Idle),
            S::Sleep | S::Dragged => None,
        },
        Trigger::HitLeftBound => match current {
            S::Move { .. } => Some(StateRequest::Move(Some(Direction::Right))),
            _ => None,
        },
        Trigger::HitRightBound => match current {
            S::Move { .. } => Some(StateRequest::Move(Some(Direction::Left))),
            _ => None,
        },
        Trigger::Tap(message) => match current {
            S::Sleep => Some(StateRequest::Idle),
            S::Dragged => None,
            _ => Some(StateRequest::Chat(message)),
        },
        Trigger::DragReleased => Some(StateRequest::Dragged),
        Trigger::Landed => match current {
            S::Dragged => Some(StateRequest::Idle),
            _ => None,
        },
        Trigger::TipArrived(message) => match current {
            S::Dragged => None,
            _ => Some(StateRequest::Chat(message)),
        },
    }
}

/// Inclusive range a state's duration is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationRange {
    pub min_secs: f32,
    pub max_secs: f32,
}

impl DurationRange {
    pub const fn new(min_secs: f32, max_secs: f32) -> Self {
        Self { min_secs, max_secs }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        let min = clamp_secs(self.min_secs);
        let max = clamp_secs(self.max_secs);
        let secs = if max > min { rng.gen_range(min..=max) } else { min };
        Duration::from_secs_f32(secs)
    }

    /// Describe what is wrong with the range, if anything
    pub fn check(&self, name: &str) -> Result<(), String> {
        let in_bounds = |secs: f32| secs.is_finite() && (0.0..=MAX_STATE_SECS).contains(&secs);
        if !in_bounds(self.min_secs) || !in_bounds(self.max_secs) {
            return Err(format!("{name} durations must be between 0 and {MAX_STATE_SECS} seconds"));
        }
        if self.min_secs > self.max_secs {
            return Err(format!("{name} min_secs is larger than max_secs"));
        }
        Ok(())
    }
}

fn clamp_secs(secs: f32) -> f32 {
    if secs.is_nan() {
        0.0
    } else {
        secs.clamp(0.0, MAX_STATE_SECS)
    }
}

/// Duration bounds for the timed states
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateTimings {
    pub idle: DurationRange,
    #[serde(rename = "move")]
    pub moving: DurationRange,
}

impl Default for StateTimings {
    fn default() -> Self {
        Self {
            idle: DurationRange::new(IDLE_DURATION_SECS.0, IDLE_DURATION_SECS.1),
            moving: DurationRange::new(MOVE_DURATION_SECS.0, MOVE_DURATION_SECS.1),
        }
    }
}

impl StateTimings {
    pub fn check(&self) -> Result<(), String> {
        self.idle.check("idle")?;
        self.moving.check("move")
    }
}

/// Frame sets for every state. States without their own art share a sheet.
#[derive(Debug, Clone)]
pub struct SpriteLibrary {
    pub sleep: Arc<SpriteSheet>,
    pub idle: Arc<SpriteSheet>,
    pub moving: Arc<SpriteSheet>,
    pub dragged: Arc<SpriteSheet>,
    pub chat: Arc<SpriteSheet>,
}

impl SpriteLibrary {
    /// Sleep gets its own sheet; every other state uses the awake sheet
    pub fn load(sleep_path: &Path, awake_path: &Path, layout: SheetLayout) -> Result<Self, SpriteError> {
        let sleep = Arc::new(SpriteSheet::load(sleep_path, layout)?);
        let awake = Arc::new(SpriteSheet::load(awake_path, layout)?);
        Ok(Self::from_sheets(sleep, awake))
    }

    pub fn from_sheets(sleep: Arc<SpriteSheet>, awake: Arc<SpriteSheet>) -> Self {
        Self {
            sleep,
            idle: awake.clone(),
            moving: awake.clone(),
            dragged: awake.clone(),
            chat: awake,
        }
    }

    pub fn sheet_for(&self, name: StateName) -> &Arc<SpriteSheet> {
        match name {
            StateName::Sleep => &self.sleep,
            StateName::Idle => &self.idle,
            StateName::Move => &self.moving,
            StateName::Dragged => &self.dragged,
            StateName::Chat => &self.chat,
        }
    }

    /// Every distinct sheet, for texture upload
    pub fn distinct_sheets(&self) -> Vec<Arc<SpriteSheet>> {
        let mut sheets: Vec<Arc<SpriteSheet>> = Vec::new();
        for sheet in [&self.sleep, &self.idle, &self.moving, &self.dragged, &self.chat] {
            if !sheets.iter().any(|s| Arc::ptr_eq(s, sheet)) {
                sheets.push(sheet.clone());
            }
        }
        sheets
    }
}

/// The current state with its frames and timing
#[derive(Debug, Clone)]
pub struct PetState {
    pub kind: StateKind,
    pub frames: Arc<SpriteSheet>,
    /// `None` for states that only end on an external event
    pub duration: Option<Duration>,
    pub started_at: Instant,
}

impl PetState {
    pub fn sleep(sprites: &SpriteLibrary, now: Instant) -> Self {
        Self::with_kind(StateKind::Sleep, None, sprites, now)
    }

    pub fn idle(sprites: &SpriteLibrary, timings: &StateTimings, now: Instant, rng: &mut impl Rng) -> Self {
        Self::build(StateRequest::Idle, sprites, timings, now, rng)
    }

    /// Attach frames and a freshly drawn duration to a requested state
    pub fn build(
        request: StateRequest,
        sprites: &SpriteLibrary,
        timings: &StateTimings,
        now: Instant,
        rng: &mut impl Rng,
    ) -> Self {
        match request {
            StateRequest::Idle => {
                let duration = timings.idle.sample(rng);
                Self::with_kind(StateKind::Idle, Some(duration), sprites, now)
            }
            StateRequest::Move(direction) => {
                let direction = direction.unwrap_or_else(|| Direction::random(rng));
                let duration = timings.moving.sample(rng);
                Self::with_kind(StateKind::Move { direction }, Some(duration), sprites, now)
            }
            StateRequest::Dragged => Self::with_kind(StateKind::Dragged, None, sprites, now),
            StateRequest::Chat(message) => {
                let duration = message.display_duration();
                Self::with_kind(StateKind::Chat { message }, Some(duration), sprites, now)
            }
        }
    }

    fn with_kind(kind: StateKind, duration: Option<Duration>, sprites: &SpriteLibrary, now: Instant) -> Self {
        let frames = sprites.sheet_for(kind.name()).clone();
        Self {
            kind,
            frames,
            duration,
            started_at: now,
        }
    }

    pub fn name(&self) -> StateName {
        self.kind.name()
    }

    #[cfg(test)]
    pub fn has_duration(&self) -> bool {
        self.duration.is_some()
    }

    pub fn num_frames(&self) -> usize {
        self.frames.frame_count()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.duration
            .map(|d| now.saturating_duration_since(self.started_at) >= d)
            .unwrap_or(false)
    }

    /// Heading, for states that have one
    pub fn direction(&self) -> Option<Direction> {
        match self.kind {
            StateKind::Move { direction } => Some(direction),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::RgbaImage;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    pub(crate) fn test_sprites() -> SpriteLibrary {
        let frames = |n| (0..n).map(|_| RgbaImage::new(1, 1)).collect::<Vec<_>>();
        let sleep = Arc::new(SpriteSheet::from_frames("sleep", frames(3)).unwrap());
        let awake = Arc::new(SpriteSheet::from_frames("awake", frames(4)).unwrap());
        SpriteLibrary::from_sheets(sleep, awake)
    }

    #[test]
    fn test_idle_expiry_moves() {
        assert_eq!(
            transition(&StateKind::Idle, Trigger::DurationExpired),
            Some(StateRequest::Move(None))
        );
    }

    #[test]
    fn test_move_and_chat_expire_to_idle() {
        let moving = StateKind::Move { direction: Direction::Left };
        let chatting = StateKind::Chat { message: ChatMessage::canned("hi") };
        assert_eq!(transition(&moving, Trigger::DurationExpired), Some(StateRequest::Idle));
        assert_eq!(transition(&chatting, Trigger::DurationExpired), Some(StateRequest::Idle));
    }

    #[test]
    fn test_sleep_and_dragged_ignore_expiry() {
        assert_eq!(transition(&StateKind::Sleep, Trigger::DurationExpired), None);
        assert_eq!(transition(&StateKind::Dragged, Trigger::DurationExpired), None);
    }

    #[test]
    fn test_bounds_turn_move_around() {
        let moving = StateKind::Move { direction: Direction::Left };
        assert_eq!(
            transition(&moving, Trigger::HitLeftBound),
            Some(StateRequest::Move(Some(Direction::Right)))
        );
        assert_eq!(
            transition(&moving, Trigger::HitRightBound),
            Some(StateRequest::Move(Some(Direction::Left)))
        );
        assert_eq!(transition(&StateKind::Idle, Trigger::HitLeftBound), None);
    }

    #[test]
    fn test_tap_wakes_sleep_and_opens_chat_elsewhere() {
        let msg = ChatMessage::canned("hi");
        assert_eq!(transition(&StateKind::Sleep, Trigger::Tap(msg.clone())), Some(StateRequest::Idle));
        assert_eq!(
            transition(&StateKind::Idle, Trigger::Tap(msg.clone())),
            Some(StateRequest::Chat(msg.clone()))
        );
        assert_eq!(transition(&StateKind::Dragged, Trigger::Tap(msg)), None);
    }

    #[test]
    fn test_release_and_landing() {
        assert_eq!(transition(&StateKind::Sleep, Trigger::DragReleased), Some(StateRequest::Dragged));
        assert_eq!(transition(&StateKind::Dragged, Trigger::Landed), Some(StateRequest::Idle));
        assert_eq!(transition(&StateKind::Idle, Trigger::Landed), None);
    }

    #[test]
    fn test_tip_skipped_while_falling() {
        let tip = ChatMessage::tip("Walk more", Some(8), None);
        assert_eq!(transition(&StateKind::Dragged, Trigger::TipArrived(tip.clone())), None);
        assert_eq!(
            transition(&StateKind::Move { direction: Direction::Right }, Trigger::TipArrived(tip.clone())),
            Some(StateRequest::Chat(tip))
        );
    }

    #[test]
    fn test_duration_sampled_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let range = DurationRange::new(3.0, 5.0);
        for _ in 0..100 {
            let d = range.sample(&mut rng).as_secs_f32();
            assert!((3.0..=5.0).contains(&d));
        }
    }

    #[test]
    fn test_out_of_range_durations_sample_without_panicking() {
        let mut rng = StdRng::seed_from_u64(2);
        let huge = DurationRange::new(1.0, f32::INFINITY);
        let d = huge.sample(&mut rng).as_secs_f32();
        assert!((1.0..=MAX_STATE_SECS).contains(&d));
        assert_eq!(DurationRange::new(f32::NAN, -4.0).sample(&mut rng), Duration::ZERO);
    }

    #[test]
    fn test_range_check() {
        assert!(StateTimings::default().check().is_ok());
        let err = DurationRange::new(f32::INFINITY, f32::INFINITY).check("idle").unwrap_err();
        assert!(err.starts_with("idle durations"));
        assert!(DurationRange::new(-1.0, 2.0).check("idle").is_err());
        let err = DurationRange::new(5.0, 2.0).check("move").unwrap_err();
        assert_eq!(err, "move min_secs is larger than max_secs");
    }

    #[test]
    fn test_build_attaches_frames_and_duration() {
        let sprites = test_sprites();
        let mut rng = StdRng::seed_from_u64(2);
        let now = Instant::now();

        let sleep = PetState::sleep(&sprites, now);
        assert!(!sleep.has_duration());
        assert_eq!(sleep.num_frames(), 3);

        let walk = PetState::build(
            StateRequest::Move(Some(Direction::Right)),
            &sprites,
            &StateTimings::default(),
            now,
            &mut rng,
        );
        assert_eq!(walk.direction(), Some(Direction::Right));
        assert_eq!(walk.num_frames(), 4);
        let secs = walk.duration.unwrap().as_secs_f32();
        assert!((4.0..=5.0).contains(&secs));

        let tip = PetState::build(
            StateRequest::Chat(ChatMessage::tip("t", None, None)),
            &sprites,
            &StateTimings::default(),
            now,
            &mut rng,
        );
        assert_eq!(tip.duration, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_distinct_sheets_deduplicates_shared_art() {
        assert_eq!(test_sprites().distinct_sheets().len(), 2);
    }
}
