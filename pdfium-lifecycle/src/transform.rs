//! Page ↔ device coordinate transforms.
//!
//! Mirrors the display matrix PDFium builds for `FPDF_RenderPageBitmap`,
//! `FPDF_PageToDevice` and `FPDF_DeviceToPage`. Device space has its origin
//! at the top-left of the bitmap with y growing down; page space is in PDF
//! points with y growing up.

use crate::geometry::PageRect;

/// Clockwise page rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    /// From a quarter-turn count; any integer is reduced modulo 4.
    pub fn from_quarter_turns(turns: i32) -> Self {
        match turns.rem_euclid(4) {
            0 => Rotation::None,
            1 => Rotation::Clockwise90,
            2 => Rotation::Clockwise180,
            _ => Rotation::Clockwise270,
        }
    }

    pub fn quarter_turns(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 1,
            Rotation::Clockwise180 => 2,
            Rotation::Clockwise270 => 3,
        }
    }
}

/// Device-space rectangle a page is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// 2D affine matrix `[a b c d e f]` in PDF order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// `self` followed by `next`.
    pub fn then(&self, next: &Matrix) -> Matrix {
        Matrix {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    pub fn inverse(&self) -> Option<Matrix> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Matrix {
            a,
            b,
            c,
            d,
            e: -(a * self.e + c * self.f),
            f: -(b * self.e + d * self.f),
        })
    }
}

/// The part of the page that is laid out: the crop box clipped to the media
/// box, or the whole media box when there is no crop box or they do not
/// overlap.
pub fn visible_box(media: PageRect, crop: Option<PageRect>) -> PageRect {
    let Some(crop) = crop else {
        return media;
    };
    let clipped = PageRect::new(
        crop.left.max(media.left),
        crop.bottom.max(media.bottom),
        crop.right.min(media.right),
        crop.top.min(media.top),
    );
    if clipped.width() > 0.0 && clipped.height() > 0.0 {
        clipped
    } else {
        media
    }
}

/// Transform for one page, viewport and rotation.
///
/// Callers must build it with the same viewport and rotation they render
/// with, or device and page coordinates will not agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    matrix: Matrix,
}

impl PageTransform {
    /// Page of the given size with its origin at (0, 0) and no `/Rotate`.
    pub fn new(page_width: f64, page_height: f64, viewport: Viewport, rotation: Rotation) -> Self {
        Self {
            matrix: display_matrix(page_width, page_height, viewport, rotation),
        }
    }

    /// Page whose visible box is `bbox` and whose own `/Rotate` is
    /// `page_rotation`.
    ///
    /// User space is first moved so the visible box starts at the origin and
    /// turned by the page rotation, then mapped onto the viewport.
    pub fn for_page(
        bbox: PageRect,
        page_rotation: Rotation,
        viewport: Viewport,
        rotation: Rotation,
    ) -> Self {
        let (left, bottom) = (f64::from(bbox.left), f64::from(bbox.bottom));
        let (right, top) = (f64::from(bbox.right), f64::from(bbox.top));
        let (width, height) = (right - left, top - bottom);
        if width <= 0.0 || height <= 0.0 {
            return Self {
                matrix: Matrix::IDENTITY,
            };
        }

        let (page, shown_width, shown_height) = match page_rotation {
            Rotation::None => (matrix(1.0, 0.0, 0.0, 1.0, -left, -bottom), width, height),
            Rotation::Clockwise90 => (matrix(0.0, -1.0, 1.0, 0.0, -bottom, right), height, width),
            Rotation::Clockwise180 => (matrix(-1.0, 0.0, 0.0, -1.0, right, top), width, height),
            Rotation::Clockwise270 => (matrix(0.0, 1.0, -1.0, 0.0, top, -left), height, width),
        };
        let display = display_matrix(shown_width, shown_height, viewport, rotation);
        Self {
            matrix: page.then(&display),
        }
    }

    pub fn matrix(&self) -> Matrix {
        self.matrix
    }

    /// Page point to device pixel, rounded to the nearest integer.
    pub fn page_to_device(&self, page_x: f64, page_y: f64) -> (i32, i32) {
        let (x, y) = self.matrix.apply(page_x, page_y);
        (x.round() as i32, y.round() as i32)
    }

    /// Device pixel to page point. A degenerate viewport maps through identity.
    pub fn device_to_page(&self, device_x: i32, device_y: i32) -> (f64, f64) {
        let inverse = self.matrix.inverse().unwrap_or(Matrix::IDENTITY);
        inverse.apply(f64::from(device_x), f64::from(device_y))
    }
}

fn matrix(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Matrix {
    Matrix { a, b, c, d, e, f }
}

fn display_matrix(width: f64, height: f64, viewport: Viewport, rotation: Rotation) -> Matrix {
    if width == 0.0 || height == 0.0 {
        return Matrix::IDENTITY;
    }
    let left = f64::from(viewport.x);
    let top = f64::from(viewport.y);
    let right = left + f64::from(viewport.width);
    let bottom = top + f64::from(viewport.height);

    // Images of the page origin, the top-left corner and the bottom-right corner.
    let ((x0, y0), (x1, y1), (x2, y2)) = match rotation {
        Rotation::None => ((left, bottom), (left, top), (right, bottom)),
        Rotation::Clockwise90 => ((left, top), (right, top), (left, bottom)),
        Rotation::Clockwise180 => ((right, top), (right, bottom), (left, top)),
        Rotation::Clockwise270 => ((right, bottom), (left, bottom), (right, top)),
    };

    Matrix {
        a: (x2 - x0) / width,
        b: (y2 - y0) / width,
        c: (x1 - x0) / height,
        d: (y1 - y0) / height,
        e: x0,
        f: y0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LETTER: (f64, f64) = (612.0, 792.0);

    #[test]
    fn test_unrotated_corners() {
        let t = PageTransform::new(LETTER.0, LETTER.1, Viewport::new(0, 0, 612, 792), Rotation::None);
        assert_eq!(t.page_to_device(0.0, 0.0), (0, 792));
        assert_eq!(t.page_to_device(612.0, 792.0), (612, 0));
        assert_eq!(t.device_to_page(0, 0), (0.0, 792.0));
    }

    #[test]
    fn test_quarter_turn_moves_origin_to_top_left() {
        let t = PageTransform::new(
            LETTER.0,
            LETTER.1,
            Viewport::new(10, 20, 792, 612),
            Rotation::Clockwise90,
        );
        assert_eq!(t.page_to_device(0.0, 0.0), (10, 20));
        assert_eq!(t.page_to_device(0.0, 792.0), (802, 20));
    }

    #[test]
    fn test_page_rotation_is_applied_before_the_viewport() {
        // 100x200 page turned a quarter, shown 200 wide.
        let bbox = PageRect::new(0.0, 0.0, 100.0, 200.0);
        let view = Viewport::new(0, 0, 200, 100);
        let t = PageTransform::for_page(bbox, Rotation::Clockwise90, view, Rotation::None);
        assert_eq!(t.page_to_device(0.0, 0.0), (0, 0));
        assert_eq!(t.page_to_device(0.0, 200.0), (200, 0));
        assert_eq!(t.page_to_device(100.0, 0.0), (0, 100));
        assert_eq!(t.page_to_device(50.0, 150.0), (150, 50));
        assert_eq!(t.device_to_page(150, 50), (50.0, 150.0));
    }

    #[test]
    fn test_media_box_origin_is_removed() {
        let bbox = PageRect::new(100.0, 100.0, 300.0, 400.0);
        let view = Viewport::new(0, 0, 200, 300);
        let t = PageTransform::for_page(bbox, Rotation::None, view, Rotation::None);
        assert_eq!(t.page_to_device(100.0, 100.0), (0, 300));
        assert_eq!(t.page_to_device(300.0, 400.0), (200, 0));

        let t = PageTransform::for_page(bbox, Rotation::Clockwise180, view, Rotation::None);
        assert_eq!(t.page_to_device(100.0, 100.0), (200, 0));
    }

    #[test]
    fn test_unrotated_page_matches_plain_transform() {
        let bbox = PageRect::new(0.0, 0.0, 612.0, 792.0);
        let view = Viewport::new(5, 7, 300, 400);
        for turns in 0..4 {
            let rotation = Rotation::from_quarter_turns(turns);
            assert_eq!(
                PageTransform::for_page(bbox, Rotation::None, view, rotation),
                PageTransform::new(612.0, 792.0, view, rotation)
            );
        }
    }

    #[test]
    fn test_visible_box() {
        let media = PageRect::new(0.0, 0.0, 600.0, 800.0);
        assert_eq!(visible_box(media, None), media);
        assert_eq!(
            visible_box(media, Some(PageRect::new(-10.0, 50.0, 500.0, 900.0))),
            PageRect::new(0.0, 50.0, 500.0, 800.0)
        );
        assert_eq!(
            visible_box(media, Some(PageRect::new(700.0, 0.0, 900.0, 100.0))),
            media
        );
    }

    #[test]
    fn test_rotation_from_turns() {
        assert_eq!(Rotation::from_quarter_turns(5), Rotation::Clockwise90);
        assert_eq!(Rotation::from_quarter_turns(-1), Rotation::Clockwise270);
        for turns in 0..4 {
            assert_eq!(Rotation::from_quarter_turns(turns).quarter_turns(), turns);
        }
    }

    #[test]
    fn test_degenerate_viewport_uses_identity() {
        let t = PageTransform::new(LETTER.0, LETTER.1, Viewport::new(0, 0, 0, 0), Rotation::None);
        assert_eq!(t.device_to_page(5, 7), (5.0, 7.0));
        let t = PageTransform::new(0.0, LETTER.1, Viewport::new(0, 0, 100, 100), Rotation::None);
        assert_eq!(t.matrix(), Matrix::IDENTITY);
    }

    proptest! {
        #[test]
        fn prop_device_to_page_inverts_page_to_device(
            page_w in 50.0f64..2000.0,
            page_h in 50.0f64..2000.0,
            fx in 0.0f64..=1.0,
            fy in 0.0f64..=1.0,
            x in -500i32..500,
            y in -500i32..500,
            width in 20i32..3000,
            height in 20i32..3000,
            turns in 0i32..4,
        ) {
            let t = PageTransform::new(
                page_w,
                page_h,
                Viewport::new(x, y, width, height),
                Rotation::from_quarter_turns(turns),
            );
            let (px, py) = (fx * page_w, fy * page_h);
            let (dx, dy) = t.page_to_device(px, py);
            let (rx, ry) = t.device_to_page(dx, dy);

            // Rounding to whole pixels loses at most half a pixel per axis.
            let tolerance = page_w.max(page_h) / f64::from(width.min(height)) + 1e-9;
            prop_assert!((rx - px).abs() <= tolerance, "x {} vs {}", rx, px);
            prop_assert!((ry - py).abs() <= tolerance, "y {} vs {}", ry, py);
        }
    }
}
