//! Inpainting extent: the crop rectangle fed to the fixed-size pipeline
//!
//! The tight mask box is padded, grown along its shorter side until it
//! matches the working aspect ratio, and kept inside the source image.
//! Growth is symmetric around the centre of the tight box; when that would
//! cross an image edge the box is shifted back inside instead of shrunk.
//! Only when the grown side exceeds the image itself is it capped.

use serde::Serialize;

use super::bbox::BoundingBox;

/// Rectangle in source-image pixel coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Compute the extent for a mask.
///
/// `None` means there is no inpainting region and the full image is used
/// unmodified. A zero working dimension disables aspect correction.
pub fn compute_extent(
    bbox: Option<BoundingBox>,
    source: (u32, u32),
    padding: u32,
    working: (u32, u32),
) -> Option<Rect> {
    let bbox = bbox?;
    let (ws, hs) = (i64::from(source.0), i64::from(source.1));
    if ws == 0 || hs == 0 {
        return None;
    }

    // Tight box, clamped in case the caller measured a different raster
    let bx1 = i64::from(bbox.x1).min(ws - 1);
    let by1 = i64::from(bbox.y1).min(hs - 1);
    let bx2 = i64::from(bbox.x2).clamp(bx1 + 1, ws);
    let by2 = i64::from(bbox.y2).clamp(by1 + 1, hs);

    let p = i64::from(padding);
    let x1 = (bx1 - p).max(0);
    let y1 = (by1 - p).max(0);
    let x2 = (bx2 + p).min(ws);
    let y2 = (by2 + p).min(hs);
    let (w, h) = (x2 - x1, y2 - y1);

    let padded = to_rect(x1, y1, w, h);

    let (ww, hw) = (i64::from(working.0), i64::from(working.1));
    if ww == 0 || hw == 0 {
        return Some(padded);
    }

    // Grow the shorter side, rounding to the nearest pixel
    let (mut new_w, mut new_h) = (w, h);
    if w * hw < h * ww {
        new_w = ((h * ww + hw / 2) / hw).max(w);
    } else if w * hw > h * ww {
        new_h = ((w * hw + ww / 2) / ww).max(h);
    }
    new_w = new_w.min(ws);
    new_h = new_h.min(hs);

    if new_w <= 0 || new_h <= 0 {
        return Some(padded);
    }

    let x = place(bx1 + bx2, new_w, ws);
    let y = place(by1 + by2, new_h, hs);

    Some(to_rect(x, y, new_w, new_h))
}

/// Centre a span of `size` on `centre2 / 2`, then shift it inside `[0, limit]`.
fn place(centre2: i64, size: i64, limit: i64) -> i64 {
    let start = (centre2 - size).div_euclid(2);
    start.clamp(0, limit - size)
}

fn to_rect(x: i64, y: i64, w: i64, h: i64) -> Rect {
    let conv = |v: i64| u32::try_from(v.max(0)).unwrap_or(u32::MAX);
    Rect::new(conv(x), conv(y), conv(w), conv(h))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: u32, y1: u32, x2: u32, y2: u32) -> Option<BoundingBox> {
        Some(BoundingBox { x1, y1, x2, y2 })
    }

    fn assert_inside(rect: Rect, source: (u32, u32)) {
        assert!(rect.width > 0 && rect.height > 0, "{:?}", rect);
        assert!(rect.right() <= source.0, "{:?} exceeds {:?}", rect, source);
        assert!(rect.bottom() <= source.1, "{:?} exceeds {:?}", rect, source);
    }

    #[test]
    fn test_no_region_is_empty() {
        assert_eq!(compute_extent(None, (512, 512), 32, (512, 512)), None);
        assert_eq!(compute_extent(None, (512, 512), 0, (0, 0)), None);
    }

    #[test]
    fn test_square_padding_only() {
        let rect = compute_extent(bbox(400, 300, 600, 500), (1000, 800), 20, (512, 512));
        assert_eq!(rect, Some(Rect::new(380, 280, 240, 240)));
    }

    #[test]
    fn test_grows_width_for_wide_target() {
        // 240x240 padded box, 3:2 target: width grows to 360 around x = 500
        let rect = compute_extent(bbox(400, 300, 600, 500), (1000, 800), 20, (768, 512));
        assert_eq!(rect, Some(Rect::new(320, 280, 360, 240)));
    }

    #[test]
    fn test_grows_height_for_tall_target() {
        let rect = compute_extent(bbox(400, 300, 600, 500), (1000, 800), 0, (512, 1024));
        assert_eq!(rect, Some(Rect::new(400, 200, 200, 400)));
    }

    #[test]
    fn test_shifts_instead_of_shrinking_at_edge() {
        let rect = compute_extent(bbox(900, 300, 1000, 400), (1000, 800), 0, (1024, 512));
        assert_eq!(rect, Some(Rect::new(800, 300, 200, 100)));
    }

    #[test]
    fn test_shifts_at_origin() {
        let rect = compute_extent(bbox(0, 0, 10, 10), (100, 100), 0, (512, 256));
        assert_eq!(rect, Some(Rect::new(0, 0, 20, 10)));
    }

    #[test]
    fn test_caps_at_image_size() {
        let rect = compute_extent(bbox(100, 100, 200, 200), (300, 1000), 0, (2048, 512));
        assert_eq!(rect, Some(Rect::new(0, 100, 300, 100)));
    }

    #[test]
    fn test_padding_larger_than_image() {
        let rect = compute_extent(bbox(10, 10, 20, 20), (64, 48), 1000, (512, 512));
        assert_eq!(rect, Some(Rect::new(0, 0, 64, 48)));
    }

    #[test]
    fn test_zero_working_size_skips_aspect() {
        let rect = compute_extent(bbox(10, 10, 20, 30), (100, 100), 5, (0, 512));
        assert_eq!(rect, Some(Rect::new(5, 5, 20, 30)));
    }

    #[test]
    fn test_zero_source_is_empty() {
        assert_eq!(compute_extent(bbox(0, 0, 1, 1), (0, 0), 0, (512, 512)), None);
    }

    #[test]
    fn test_always_inside_image() {
        let sources = [(1, 1), (7, 300), (640, 480), (1000, 800)];
        let workings = [(512, 512), (1024, 512), (512, 1024), (3, 1)];
        for &source in &sources {
            for &working in &workings {
                for padding in [0, 8, 64, 5000] {
                    let b = bbox(source.0 / 3, source.1 / 2, source.0 / 3 + 1, source.1 / 2 + 1);
                    let rect = compute_extent(b, source, padding, working).unwrap();
                    assert_inside(rect, source);
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let a = compute_extent(bbox(13, 27, 90, 41), (320, 200), 9, (768, 512));
        let b = compute_extent(bbox(13, 27, 90, 41), (320, 200), 9, (768, 512));
        assert_eq!(a, b);
    }
}
