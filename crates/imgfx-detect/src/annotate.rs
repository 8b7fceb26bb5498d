// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Draws detection rectangles onto a colour copy of the source image.

use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use imgfx_core::{AnnotationSettings, FaceBox, PixelGrid};
use imgfx_imaging::codec::{from_rgb_image, to_rgb_image};
use tracing::{debug, instrument};

/// Return an RGB copy of `grid` with a hollow rectangle around every face.
///
/// Strokes are drawn inward from the box edge, so a box that fits the image
/// never paints outside it. Grayscale sources are promoted to RGB first so
/// the stroke colour survives.
#[instrument(skip_all, fields(faces = faces.len()))]
pub fn annotate(grid: &PixelGrid, faces: &[FaceBox], settings: &AnnotationSettings) -> PixelGrid {
    let mut canvas = to_rgb_image(grid);
    let color = Rgb(settings.color);

    for face in faces {
        for inset in 0..settings.stroke_width {
            let (Some(w), Some(h)) = (
                face.width.checked_sub(2 * inset).filter(|w| *w > 0),
                face.height.checked_sub(2 * inset).filter(|h| *h > 0),
            ) else {
                break;
            };
            let rect = Rect::at((face.x + inset) as i32, (face.y + inset) as i32).of_size(w, h);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }
    }

    debug!(stroke_width = settings.stroke_width, "Annotated detections");
    from_rgb_image(canvas)
}
