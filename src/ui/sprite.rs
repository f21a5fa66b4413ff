//! Sprite frames as egui textures.

use crate::sprite_sheet::SpriteSheet;
use crate::state::SpriteLibrary;
use egui::{pos2, Color32, ColorImage, Context, Painter, Rect, TextureHandle, TextureId, TextureOptions};
use image::RgbaImage;
use std::sync::Arc;

/// One texture per frame of every distinct sheet
pub struct SpriteTextures {
    sheets: Vec<(Arc<SpriteSheet>, Vec<TextureHandle>)>,
}

impl SpriteTextures {
    /// Upload every frame. Nearest filtering keeps the pixel art sharp.
    pub fn upload(ctx: &Context, library: &SpriteLibrary) -> Self {
        let sheets = library
            .distinct_sheets()
            .into_iter()
            .map(|sheet| {
                let handles = sheet
                    .frames()
                    .iter()
                    .enumerate()
                    .map(|(i, frame)| {
                        ctx.load_texture(
                            format!("{}-{i}", sheet.name()),
                            to_color_image(frame),
                            TextureOptions::NEAREST,
                        )
                    })
                    .collect();
                (sheet, handles)
            })
            .collect::<Vec<_>>();
        tracing::debug!(sheets = sheets.len(), "uploaded sprite textures");
        Self { sheets }
    }

    /// Texture for a frame of `sheet`, if that sheet was uploaded
    pub fn frame(&self, sheet: &Arc<SpriteSheet>, index: usize) -> Option<TextureId> {
        self.sheets
            .iter()
            .find(|(s, _)| Arc::ptr_eq(s, sheet))
            .and_then(|(_, handles)| handles.get(index))
            .map(TextureHandle::id)
    }
}

fn to_color_image(frame: &RgbaImage) -> ColorImage {
    let size = [frame.width() as usize, frame.height() as usize];
    ColorImage::from_rgba_unmultiplied(size, frame.as_raw())
}

/// UVs for a frame, swapped horizontally to face right
pub fn frame_uv(mirrored: bool) -> Rect {
    if mirrored {
        Rect::from_min_max(pos2(1.0, 0.0), pos2(0.0, 1.0))
    } else {
        Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0))
    }
}

pub fn draw_sprite(painter: &Painter, texture: TextureId, rect: Rect, mirrored: bool) {
    painter.image(texture, rect, frame_uv(mirrored), Color32::WHITE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrored_uv_swaps_x_only() {
        let uv = frame_uv(true);
        assert_eq!(uv.min, pos2(1.0, 0.0));
        assert_eq!(uv.max, pos2(0.0, 1.0));
        assert_eq!(frame_uv(false), Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)));
    }

    #[test]
    fn test_color_image_keeps_pixels() {
        let mut frame = RgbaImage::new(2, 1);
        frame.put_pixel(1, 0, image::Rgba([10, 20, 30, 255]));
        let img = to_color_image(&frame);
        assert_eq!(img.size, [2, 1]);
        assert_eq!(img.pixels[1], Color32::from_rgb(10, 20, 30));
    }
}
