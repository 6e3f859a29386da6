//! Caller-owned pixel memory the renderer draws into.

use crate::error::{PdfiumError, Result};
use std::path::Path;

/// Pixel layout of a [`PixelSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Red first, 4 bytes per pixel. Needs the byte-order reversal flag.
    Rgba8888,
    /// Blue first, 4 bytes per pixel. The library's native layout.
    Bgra8888,
    /// 16-bit packed colour. Rejected by the renderer.
    Rgb565,
    /// 8-bit alpha mask. Rejected by the renderer.
    Alpha8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8888 | PixelFormat::Bgra8888 => 4,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Alpha8 => 1,
        }
    }

    /// Whether the library can rasterize into this layout without conversion.
    pub fn is_renderable(self) -> bool {
        self.bytes_per_pixel() == 4
    }

    /// Whether the caller's channel order differs from the library's.
    pub fn needs_byte_swap(self) -> bool {
        self == PixelFormat::Rgba8888
    }
}

/// A block of pixel memory plus its geometry.
///
/// The surface owns its pixels. Rendering borrows it for one call;
/// progressive rendering takes it by value and gives it back on close, so
/// the memory cannot move or be touched while the library holds a pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl PixelSurface {
    /// Allocate a zeroed surface with a tightly packed stride.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let stride = width as usize * format.bytes_per_pixel();
        Self::from_pixels(
            width,
            height,
            stride,
            format,
            vec![0; stride * height as usize],
        )
    }

    /// Wrap existing pixel memory.
    pub fn from_pixels(
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PdfiumError::InvalidSurface {
                reason: format!("empty surface {}x{}", width, height),
            });
        }
        let row = width as usize * format.bytes_per_pixel();
        if stride < row {
            return Err(PdfiumError::InvalidSurface {
                reason: format!("stride {} shorter than row of {} bytes", stride, row),
            });
        }
        let needed = stride * height as usize;
        if pixels.len() < needed {
            return Err(PdfiumError::InvalidSurface {
                reason: format!("{} bytes for a surface needing {}", pixels.len(), needed),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            format,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Pixel at (x, y) as bytes in the surface's own channel order.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height || !self.format.is_renderable() {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * 4;
        let px = self.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Pointer handed to the library's external-memory bitmap.
    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.pixels.as_mut_ptr()
    }

    pub(crate) fn ensure_renderable(&self) -> Result<()> {
        if self.format.is_renderable() {
            Ok(())
        } else {
            Err(PdfiumError::UnsupportedPixelFormat(self.format))
        }
    }

    /// Convert a 4-byte surface to tightly packed RGBA.
    pub fn to_rgba(&self) -> Result<Vec<u8>> {
        self.ensure_renderable()?;
        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                let offset = y * self.stride + x * 4;
                let px = &self.pixels[offset..offset + 4];
                match self.format {
                    PixelFormat::Bgra8888 => rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]),
                    _ => rgba.extend_from_slice(px),
                }
            }
        }
        Ok(rgba)
    }

    /// Save as an RGBA PNG.
    pub fn save_as_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use png::{BitDepth, ColorType, Encoder};
        use std::fs::File;
        use std::io::BufWriter;

        let data = self.to_rgba()?;
        let file = File::create(path)?;
        let writer = BufWriter::new(file);

        let mut encoder = Encoder::new(writer, self.width, self.height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);

        let mut png_writer = encoder.write_header()?;
        png_writer.write_image_data(&data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_formats() {
        assert!(PixelFormat::Rgba8888.is_renderable());
        assert!(PixelFormat::Bgra8888.is_renderable());
        assert!(!PixelFormat::Rgb565.is_renderable());
        assert!(!PixelFormat::Alpha8.is_renderable());
        assert!(PixelFormat::Rgba8888.needs_byte_swap());
        assert!(!PixelFormat::Bgra8888.needs_byte_swap());
    }

    #[test]
    fn test_new_surface_geometry() {
        let surface = PixelSurface::new(10, 4, PixelFormat::Rgba8888).unwrap();
        assert_eq!(surface.stride(), 40);
        assert_eq!(surface.pixels().len(), 160);
        assert_eq!(surface.pixel(9, 3), Some([0, 0, 0, 0]));
        assert_eq!(surface.pixel(10, 0), None);
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(PixelSurface::new(0, 4, PixelFormat::Rgba8888).is_err());
        assert!(PixelSurface::from_pixels(4, 4, 8, PixelFormat::Rgba8888, vec![0; 64]).is_err());
        assert!(PixelSurface::from_pixels(4, 4, 16, PixelFormat::Rgba8888, vec![0; 60]).is_err());
        // Padded stride is fine.
        assert!(PixelSurface::from_pixels(4, 4, 20, PixelFormat::Bgra8888, vec![0; 80]).is_ok());
    }

    #[test]
    fn test_to_rgba_swaps_bgra() {
        let pixels = vec![1, 2, 3, 4];
        let surface = PixelSurface::from_pixels(1, 1, 4, PixelFormat::Bgra8888, pixels).unwrap();
        assert_eq!(surface.to_rgba().unwrap(), vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_save_as_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("surface.png");
        let surface = PixelSurface::new(3, 2, PixelFormat::Rgba8888).unwrap();
        surface.save_as_png(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_narrow_format_cannot_be_saved() {
        let surface = PixelSurface::new(3, 2, PixelFormat::Rgb565).unwrap();
        assert!(matches!(
            surface.to_rgba(),
            Err(PdfiumError::UnsupportedPixelFormat(PixelFormat::Rgb565))
        ));
    }
}
