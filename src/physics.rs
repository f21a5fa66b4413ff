//! Drag-and-drop and falling.
//!
//! Positions are screen pixels with the origin at the top-left and y
//! growing downward. The pet rests on a floor a fixed margin above the
//! bottom of the screen.

use crate::constants::*;
use crate::state::Direction;
use glam::Vec2;
use std::time::{Duration, Instant};

/// Pointer grab in progress. Exists only while the button is held.
#[derive(Debug, Clone, Copy)]
pub struct DragSession {
    pub started_at: Instant,
    /// Pointer position minus pet origin at the moment of the press
    pub offset: Vec2,
}

/// Free fall after a drag is released
#[derive(Debug, Clone, Copy)]
pub struct FallState {
    pub velocity_y: f32,
    pub gravity: f32,
    pub target_y: f32,
}

impl FallState {
    pub fn new(target_y: f32) -> Self {
        Self {
            velocity_y: 0.0,
            gravity: GRAVITY,
            target_y,
        }
    }

    /// Advance one tick. Returns true once `y` has reached the floor.
    pub fn step(&mut self, y: &mut f32) -> bool {
        self.velocity_y += self.gravity;
        *y += self.velocity_y;
        if *y >= self.target_y {
            *y = self.target_y;
            self.velocity_y = 0.0;
            return true;
        }
        false
    }
}

/// How a press-release pair is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Tap,
    Drop,
}

/// Result of one fall tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallStep {
    NotFalling,
    Falling,
    Landed,
}

/// Screen edge hit while walking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Left,
    Right,
}

/// Area the pet lives in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBounds {
    pub width: f32,
    pub height: f32,
}

/// Pet position plus any drag or fall in progress
#[derive(Debug, Clone)]
pub struct PetBody {
    pub position: Vec2,
    pub size: Vec2,
    screen: ScreenBounds,
    tap_threshold: Duration,
    drag: Option<DragSession>,
    fall: Option<FallState>,
}

impl PetBody {
    /// Start resting on the floor at the right edge of the screen
    pub fn new(size: Vec2, screen: ScreenBounds) -> Self {
        let mut body = Self {
            position: Vec2::ZERO,
            size,
            screen,
            tap_threshold: Duration::from_secs_f32(TAP_THRESHOLD_SECS),
            drag: None,
            fall: None,
        };
        body.position = Vec2::new(body.max_x(), body.floor_y());
        body
    }

    pub fn with_tap_threshold(mut self, threshold: Duration) -> Self {
        self.tap_threshold = threshold;
        self
    }

    pub fn screen(&self) -> ScreenBounds {
        self.screen
    }

    /// Adopt a new screen size and pull the pet back inside it
    pub fn set_screen(&mut self, screen: ScreenBounds) {
        self.screen = screen;
        if !self.is_dragging() && !self.is_falling() {
            self.clamp_to_screen();
        }
    }

    pub fn max_x(&self) -> f32 {
        (self.screen.width - self.size.x).max(0.0)
    }

    pub fn floor_y(&self) -> f32 {
        (self.screen.height - self.size.y - FLOOR_MARGIN).max(0.0)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_falling(&self) -> bool {
        self.fall.is_some()
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.position + self.size;
        point.x >= self.position.x && point.x < max.x && point.y >= self.position.y && point.y < max.y
    }

    /// Begin a drag if the press lands on the pet. Presses during a fall are ignored.
    pub fn press(&mut self, pointer: Vec2, now: Instant) -> bool {
        if self.is_falling() || !self.contains(pointer) {
            return false;
        }
        self.drag = Some(DragSession {
            started_at: now,
            offset: pointer - self.position,
        });
        true
    }

    /// Follow the pointer. Returns false when no drag is active.
    pub fn drag_to(&mut self, pointer: Vec2) -> bool {
        match self.drag {
            Some(session) => {
                self.position = pointer - session.offset;
                true
            }
            None => false,
        }
    }

    /// End the drag and classify it by how long the button was held
    pub fn release(&mut self, now: Instant) -> Option<Release> {
        let session = self.drag.take()?;
        let held = now.saturating_duration_since(session.started_at);
        if held < self.tap_threshold {
            Some(Release::Tap)
        } else {
            Some(Release::Drop)
        }
    }

    pub fn begin_fall(&mut self) {
        self.fall = Some(FallState::new(self.floor_y()));
    }

    /// Apply gravity for one tick
    pub fn step_fall(&mut self) -> FallStep {
        let Some(fall) = self.fall.as_mut() else {
            return FallStep::NotFalling;
        };
        if fall.step(&mut self.position.y) {
            self.fall = None;
            self.clamp_to_screen();
            FallStep::Landed
        } else {
            FallStep::Falling
        }
    }

    /// Walk one tick. Reports the edge if one was reached.
    pub fn walk(&mut self, direction: Direction, speed: f32) -> Option<Bound> {
        self.position.x += direction.sign() * speed;
        let max_x = self.max_x();
        if self.position.x <= 0.0 {
            self.position.x = 0.0;
            Some(Bound::Left)
        } else if self.position.x >= max_x {
            self.position.x = max_x;
            Some(Bound::Right)
        } else {
            None
        }
    }

    fn clamp_to_screen(&mut self) {
        self.position.x = self.position.x.clamp(0.0, self.max_x());
        self.position.y = self.position.y.clamp(0.0, self.floor_y());
    }
}
