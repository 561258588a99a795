use crate::foundation::core::{Rect, Size, Viewport};

/// Largest rect with the image's aspect ratio that fits the viewport, centered, in device
/// pixels. Wider images are letterboxed, taller ones pillarboxed.
pub fn contain_rect(image: Size, viewport: Viewport) -> Rect {
    let display = viewport.css_size();
    if image.width <= 0.0 || image.height <= 0.0 {
        return Rect::ZERO;
    }
    let image_aspect = image.width / image.height;
    let display_aspect = display.width / display.height;

    let (w, h) = if image_aspect > display_aspect {
        (display.width, display.width / image_aspect)
    } else {
        (display.height * image_aspect, display.height)
    };
    let x = (display.width - w) / 2.0;
    let y = (display.height - h) / 2.0;

    Rect::new(x, y, x + w, y + h).scale_from_origin(viewport.dpr)
}

#[cfg(test)]
#[path = "../../tests/unit/render/fit.rs"]
mod tests;
