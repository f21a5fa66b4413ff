//! Speech bubble placement and overlay window layout.
//!
//! All rectangles here are in physical pixels. Screen rectangles use the
//! monitor's origin; the final layout is relative to the overlay window.

use crate::chat::ChatMessage;
use crate::constants::*;
use crate::physics::ScreenBounds;
use egui::{pos2, vec2, Pos2, Rect, Vec2 as EguiVec2};
use glam::Vec2;

/// Where everything goes this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLayout {
    /// Top-left of the window on screen
    pub origin: Pos2,
    /// Window size, rounded up to whole pixels
    pub size: EguiVec2,
    /// Pet rectangle inside the window
    pub pet: Rect,
    /// Bubble rectangle inside the window
    pub bubble: Option<Rect>,
}

/// Text shown in the bubble, with the article caption for tips
pub fn bubble_lines(message: &ChatMessage) -> (String, Option<String>) {
    let caption = message.is_news().then(|| match (&message.article, message.rating) {
        (Some(article), Some(rating)) => format!("{article} ({rating}/{MAX_RATING})"),
        (Some(article), None) => article.clone(),
        (None, Some(rating)) => format!("news rating {rating}/{MAX_RATING}"),
        (None, None) => "environmental tip".to_string(),
    });
    (message.text.clone(), caption)
}

fn wrapped_lines(text: &str) -> usize {
    text.chars().count().div_ceil(BUBBLE_CHARS_PER_LINE).max(1)
}

/// Estimated bubble size for a message
pub fn bubble_size(message: &ChatMessage) -> EguiVec2 {
    let (text, caption) = bubble_lines(message);
    let lines = wrapped_lines(&text) + caption.as_deref().map_or(0, wrapped_lines);
    vec2(
        BUBBLE_WIDTH,
        lines as f32 * BUBBLE_LINE_HEIGHT + 2.0 * BUBBLE_PADDING,
    )
}

/// Centre the bubble above the pet, keeping it on screen. If there is no
/// room above, it goes below.
pub fn place_bubble(pet: Rect, size: EguiVec2, screen: ScreenBounds) -> Rect {
    let max_x = (screen.width - size.x - SCREEN_EDGE_MARGIN).max(SCREEN_EDGE_MARGIN);
    let x = (pet.center().x - size.x / 2.0).clamp(SCREEN_EDGE_MARGIN, max_x);

    let above = pet.top() - BUBBLE_GAP - size.y;
    let y = if above >= SCREEN_EDGE_MARGIN {
        above
    } else {
        pet.bottom() + BUBBLE_GAP
    };
    Rect::from_min_size(pos2(x, y), size)
}

pub fn overlay_layout(
    pet_position: Vec2,
    pet_size: Vec2,
    message: Option<&ChatMessage>,
    screen: ScreenBounds,
) -> OverlayLayout {
    let pet = Rect::from_min_size(pos2(pet_position.x, pet_position.y), vec2(pet_size.x, pet_size.y));
    let bubble = message.map(|m| place_bubble(pet, bubble_size(m), screen));
    let bounds = bubble.map_or(pet, |b| pet.union(b));

    let origin = pos2(bounds.min.x.floor(), bounds.min.y.floor());
    let size = vec2(
        (bounds.max.x - origin.x).ceil().max(1.0),
        (bounds.max.y - origin.y).ceil().max(1.0),
    );
    let to_local = |r: Rect| r.translate(-origin.to_vec2());
    OverlayLayout {
        origin,
        size,
        pet: to_local(pet),
        bubble: bubble.map(to_local),
    }
}
