//! Plain geometry and colour values exchanged with the library.

use serde::{Deserialize, Serialize};

/// Rectangle in page space, PDF corner order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageRect {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl PageRect {
    pub fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.bottom && y <= self.top
    }
}

/// Bounding box of one character, as left/top/right/bottom.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CharBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Four corners of a highlighted region (`FS_QUADPOINTSF`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuadPoints {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub x3: f32,
    pub y3: f32,
    pub x4: f32,
    pub y4: f32,
}

impl QuadPoints {
    pub fn from_slice(values: &[f32; 8]) -> Self {
        Self {
            x1: values[0],
            y1: values[1],
            x2: values[2],
            y2: values[3],
            x3: values[4],
            y3: values[5],
            x4: values[6],
            y4: values[7],
        }
    }

    pub fn to_array(self) -> [f32; 8] {
        [
            self.x1, self.y1, self.x2, self.y2, self.x3, self.y3, self.x4, self.y4,
        ]
    }
}

/// RGBA colour with 0-255 channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Packed `0xAARRGGBB`, the layout `FPDFBitmap_FillRect` takes.
    pub fn to_argb(self) -> u32 {
        u32::from(self.a) << 24 | u32::from(self.r) << 16 | u32::from(self.g) << 8 | u32::from(self.b)
    }

    pub fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }
}

/// Page boundary boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageBox {
    Media,
    Crop,
    Bleed,
    Trim,
    Art,
}
