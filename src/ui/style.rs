//! Overlay styling.
//!
//! The window background is fully transparent; only the pet and the bubble
//! are drawn. Bubbles are warm paper with a dark outline.

use egui::epaint::Shadow;
use egui::{Color32, FontId, Rounding, Stroke, Style, Visuals};

/// Bubble color palette
pub mod colors {
    use egui::Color32;

    pub const BUBBLE_BG: Color32 = Color32::from_rgb(250, 244, 230);
    pub const BUBBLE_BORDER: Color32 = Color32::from_rgb(60, 52, 45);
    /// Tips get a green border so they stand out from small talk
    pub const TIP_BORDER: Color32 = Color32::from_rgb(80, 140, 80);

    pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(40, 34, 30);
    pub const TEXT_MUTED: Color32 = Color32::from_rgb(120, 110, 95);
}

pub const BORDER_WIDTH: f32 = 2.0;
pub const BUBBLE_ROUNDING: f32 = 8.0;

/// How a bubble is painted
#[derive(Debug, Clone, Copy)]
pub struct BubbleTheme {
    pub fill: Color32,
    pub stroke: Stroke,
    pub rounding: Rounding,
    pub text: Color32,
    pub caption: Color32,
}

impl BubbleTheme {
    pub fn for_message(is_tip: bool) -> Self {
        let border = if is_tip {
            colors::TIP_BORDER
        } else {
            colors::BUBBLE_BORDER
        };
        Self {
            fill: colors::BUBBLE_BG,
            stroke: Stroke::new(BORDER_WIDTH, border),
            rounding: Rounding::same(BUBBLE_ROUNDING),
            text: colors::TEXT_PRIMARY,
            caption: colors::TEXT_MUTED,
        }
    }
}

pub fn bubble_font(size: f32) -> FontId {
    FontId::proportional(size)
}

/// Everything transparent except what we paint ourselves
pub fn overlay_visuals() -> Visuals {
    let mut visuals = Visuals::light();
    visuals.panel_fill = Color32::TRANSPARENT;
    visuals.window_fill = Color32::TRANSPARENT;
    visuals.extreme_bg_color = Color32::TRANSPARENT;
    visuals.window_shadow = Shadow::NONE;
    visuals.popup_shadow = Shadow::NONE;
    visuals.override_text_color = Some(colors::TEXT_PRIMARY);
    visuals
}

pub fn overlay_style() -> Style {
    Style {
        visuals: overlay_visuals(),
        ..Style::default()
    }
}
