//! 1-bit frame buffer with rotation and region signatures
//!
//! Drawing happens in logical (rotated) coordinates; pixels are stored in
//! the panel's native scan order, packed MSB-first, `1` meaning black.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Size},
    pixelcolor::BinaryColor,
    primitives::Rectangle,
    Pixel,
};
use inkwake_hal::Region;

use crate::cache::record::crc32_update;
use crate::config::Orientation;

/// Frame buffer for one panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    orientation: Orientation,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Create an all-white buffer
    ///
    /// # Arguments
    /// * `width`, `height` - Native panel size
    /// * `orientation` - Rotation applied to drawing
    pub fn new(width: u16, height: u16, orientation: Orientation) -> Self {
        let stride = (width as usize).div_ceil(8);
        Self {
            width,
            height,
            orientation,
            data: vec![0u8; stride * height as usize],
        }
    }

    /// Native panel size (width, height)
    pub fn native_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Packed buffer in native order
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Whole panel in native coordinates
    pub fn full_region(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    /// Native region covered by a logical rectangle
    ///
    /// Rectangles reaching past the screen map to an empty region.
    pub fn native_bounds(&self, area: Rectangle) -> Region {
        let Some(bottom_right) = area.bottom_right() else {
            return Region::default();
        };
        let corners = (
            self.to_native(area.top_left.x, area.top_left.y),
            self.to_native(bottom_right.x, bottom_right.y),
        );
        match corners {
            (Some((ax, ay)), Some((bx, by))) => {
                Region::new(ax.min(bx), ay.min(by), ax.abs_diff(bx) + 1, ay.abs_diff(by) + 1)
            }
            _ => Region::default(),
        }
    }

    /// CRC-32 over a native region's position and pixels
    pub fn signature(&self, region: Region) -> u32 {
        let mut crc = 0xFFFF_FFFF;
        for v in [region.x, region.y, region.width, region.height] {
            crc = crc32_update(crc, &v.to_le_bytes());
        }

        for y in region.y..region.y.saturating_add(region.height) {
            let mut byte = 0u8;
            let mut bits = 0;
            for x in region.x..region.x.saturating_add(region.width) {
                byte = (byte << 1) | self.native_pixel(x, y) as u8;
                bits += 1;
                if bits == 8 {
                    crc = crc32_update(crc, &[byte]);
                    byte = 0;
                    bits = 0;
                }
            }
            if bits > 0 {
                crc = crc32_update(crc, &[byte]);
            }
        }

        !crc
    }

    /// Read a pixel in native coordinates
    pub fn native_pixel(&self, x: u16, y: u16) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let (index, mask) = self.locate(x, y);
        self.data[index] & mask != 0
    }

    /// Number of pixels that differ from `other`
    pub fn diff_count(&self, other: &FrameBuffer) -> usize {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a ^ b).count_ones() as usize)
            .sum()
    }

    /// Set a pixel in logical coordinates; out-of-bounds writes are dropped
    pub fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        let Some((nx, ny)) = self.to_native(x, y) else {
            return;
        };
        let (index, mask) = self.locate(nx, ny);
        if on {
            self.data[index] |= mask;
        } else {
            self.data[index] &= !mask;
        }
    }

    fn locate(&self, x: u16, y: u16) -> (usize, u8) {
        let stride = (self.width as usize).div_ceil(8);
        let index = y as usize * stride + x as usize / 8;
        (index, 0x80 >> (x % 8))
    }

    fn to_native(&self, x: i32, y: i32) -> Option<(u16, u16)> {
        let size = self.size();
        if x < 0 || y < 0 || x >= size.width as i32 || y >= size.height as i32 {
            return None;
        }
        let (w, h) = (self.width as i32, self.height as i32);
        let (nx, ny) = match self.orientation {
            Orientation::Landscape => (x, y),
            Orientation::Portrait => (w - 1 - y, x),
            Orientation::LandscapeFlipped => (w - 1 - x, h - 1 - y),
            Orientation::PortraitFlipped => (y, h - 1 - x),
        };
        Some((nx as u16, ny as u16))
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color.is_on());
        }

        Ok(())
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        if self.orientation.is_rotated() {
            Size::new(self.height as u32, self.width as u32)
        } else {
            Size::new(self.width as u32, self.height as u32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing_is_msb_first() {
        let mut fb = FrameBuffer::new(16, 2, Orientation::Landscape);
        fb.set_pixel(0, 0, true);
        fb.set_pixel(9, 1, true);
        assert_eq!(fb.as_bytes(), &[0x80, 0x00, 0x00, 0x40]);
    }

    #[test]
    fn test_partial_byte_rows() {
        let fb = FrameBuffer::new(10, 3, Orientation::Landscape);
        assert_eq!(fb.as_bytes().len(), 6);
    }

    #[test]
    fn test_portrait_rotation() {
        let mut fb = FrameBuffer::new(8, 4, Orientation::Portrait);
        assert_eq!(fb.size(), Size::new(4, 8));
        fb.set_pixel(0, 0, true);
        // Logical origin lands in the native top-right corner
        assert!(fb.native_pixel(7, 0));
        fb.set_pixel(3, 7, true);
        assert!(fb.native_pixel(0, 3));
    }

    #[test]
    fn test_flipped_rotation() {
        let mut fb = FrameBuffer::new(8, 4, Orientation::LandscapeFlipped);
        fb.set_pixel(0, 0, true);
        assert!(fb.native_pixel(7, 3));

        let mut fb = FrameBuffer::new(8, 4, Orientation::PortraitFlipped);
        fb.set_pixel(0, 0, true);
        assert!(fb.native_pixel(0, 3));
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut fb = FrameBuffer::new(8, 4, Orientation::Landscape);
        fb.set_pixel(-1, 0, true);
        fb.set_pixel(8, 0, true);
        fb.set_pixel(0, 4, true);
        assert!(fb.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_native_bounds_follow_rotation() {
        let area = Rectangle::new(embedded_graphics::geometry::Point::new(1, 2), Size::new(3, 4));

        let fb = FrameBuffer::new(16, 8, Orientation::Landscape);
        assert_eq!(fb.native_bounds(area), Region::new(1, 2, 3, 4));

        // Logical (1..=3, 2..=5) lands on native x = 15 - y, y = x
        let fb = FrameBuffer::new(16, 8, Orientation::Portrait);
        assert_eq!(fb.native_bounds(area), Region::new(10, 1, 4, 3));

        let outside = Rectangle::new(embedded_graphics::geometry::Point::new(10, 0), Size::new(10, 2));
        let fb = FrameBuffer::new(16, 8, Orientation::Landscape);
        assert!(fb.native_bounds(outside).is_empty());
    }

    #[test]
    fn test_signature_sees_only_its_region() {
        let mut fb = FrameBuffer::new(32, 16, Orientation::Landscape);
        let left = Region::new(0, 0, 16, 16);
        let right = Region::new(16, 0, 16, 16);
        let (left_before, right_before) = (fb.signature(left), fb.signature(right));

        fb.set_pixel(20, 3, true);
        assert_eq!(fb.signature(left), left_before);
        assert_ne!(fb.signature(right), right_before);

        // Same pixels at a different position still differ
        assert_ne!(left_before, right_before);
    }
}
