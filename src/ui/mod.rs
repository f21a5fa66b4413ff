//! Overlay drawing: the pet sprite and its speech bubble.

pub mod bubble;
pub mod sprite;
pub mod style;

pub use bubble::{overlay_layout, OverlayLayout};
pub use sprite::SpriteTextures;

use crate::chat::ChatMessage;
use crate::constants::*;
use egui::{Rect, TextureId};

/// What to draw this frame, in physical pixels relative to the window
pub struct OverlayFrame<'a> {
    pub pet: Rect,
    pub texture: Option<TextureId>,
    pub mirrored: bool,
    pub bubble: Option<(Rect, &'a ChatMessage)>,
}

/// Physical pixels to egui points
fn to_points(rect: Rect, ppp: f32) -> Rect {
    Rect::from_min_max((rect.min.to_vec2() / ppp).to_pos2(), (rect.max.to_vec2() / ppp).to_pos2())
}

pub fn draw_overlay(ctx: &egui::Context, frame: &OverlayFrame<'_>) {
    puffin::profile_function!();
    let ppp = ctx.pixels_per_point();

    let pet_painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Background, egui::Id::new("pet")));
    if let Some(texture) = frame.texture {
        sprite::draw_sprite(&pet_painter, texture, to_points(frame.pet, ppp), frame.mirrored);
    }

    if let Some((rect, message)) = frame.bubble {
        let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Foreground, egui::Id::new("bubble")));
        draw_bubble(&painter, to_points(rect, ppp), message, ppp);
    }
}

fn draw_bubble(painter: &egui::Painter, rect: Rect, message: &ChatMessage, ppp: f32) {
    let theme = style::BubbleTheme::for_message(message.is_news());
    painter.rect(rect, theme.rounding, theme.fill, theme.stroke);

    let padding = BUBBLE_PADDING / ppp;
    let inner = rect.shrink(padding);
    let (text, caption) = bubble::bubble_lines(message);

    let galley = painter.layout(
        text,
        style::bubble_font(BUBBLE_FONT_SIZE / ppp),
        theme.text,
        inner.width(),
    );
    let text_height = galley.size().y;
    painter.with_clip_rect(rect).galley(inner.min, galley, theme.text);

    if let Some(caption) = caption {
        let pos = egui::pos2(inner.left(), inner.top() + text_height + 2.0 / ppp);
        let galley = painter.layout(
            caption,
            style::bubble_font((BUBBLE_FONT_SIZE - 3.0) / ppp),
            theme.caption,
            inner.width(),
        );
        painter.with_clip_rect(rect).galley(pos, galley, theme.caption);
    }
}
