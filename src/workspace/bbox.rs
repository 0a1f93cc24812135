//! Tight bounding box of the painted region of a mask

use image::RgbaImage;

/// Axis-aligned box in pixel coordinates. `x2`/`y2` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    /// Find the smallest box enclosing every pixel with non-zero alpha.
    ///
    /// Returns `None` when the image is zero-sized or fully transparent.
    pub fn find(image: &RgbaImage) -> Option<Self> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return None;
        }

        let mut min_x = w;
        let mut min_y = h;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut found = false;

        for (x, y, pixel) in image.enumerate_pixels() {
            if pixel[3] == 0 {
                continue;
            }
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        found.then_some(Self {
            x1: min_x,
            y1: min_y,
            x2: max_x + 1,
            y2: max_y + 1,
        })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0]))
    }

    #[test]
    fn test_empty_mask_has_no_box() {
        assert_eq!(BoundingBox::find(&blank(512, 512)), None);
    }

    #[test]
    fn test_zero_sized_image_has_no_box() {
        assert_eq!(BoundingBox::find(&RgbaImage::new(0, 0)), None);
    }

    #[test]
    fn test_single_pixel() {
        let mut img = blank(10, 10);
        img.put_pixel(3, 7, Rgba([255, 255, 255, 255]));

        let bbox = BoundingBox::find(&img).unwrap();
        assert_eq!(bbox, BoundingBox { x1: 3, y1: 7, x2: 4, y2: 8 });
        assert_eq!(bbox.width(), 1);
        assert_eq!(bbox.height(), 1);
    }

    #[test]
    fn test_region_bounds_are_exclusive() {
        let mut img = blank(1000, 800);
        for y in 300..500 {
            for x in 400..600 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 128]));
            }
        }

        let bbox = BoundingBox::find(&img).unwrap();
        assert_eq!(bbox, BoundingBox { x1: 400, y1: 300, x2: 600, y2: 500 });
    }

    #[test]
    fn test_opaque_black_counts_as_painted() {
        // Colour is irrelevant, only alpha marks the region
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let bbox = BoundingBox::find(&img).unwrap();
        assert_eq!(bbox, BoundingBox { x1: 0, y1: 0, x2: 4, y2: 4 });
    }
}
