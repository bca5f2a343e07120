//! E-paper panel abstractions

/// Rectangular panel region in native (unrotated) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Region {
    /// Create a new region
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if the region covers no pixels
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Smallest region containing both `self` and `other`
    pub fn union(&self, other: &Region) -> Region {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = (self.x + self.width).max(other.x + other.width);
        let y1 = (self.y + self.height).max(other.y + other.height);
        Region::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// Errors from panel operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelError {
    /// Bus transfer failed
    Bus,
    /// Panel stayed busy past its refresh window
    Busy,
    /// Buffer does not match the panel geometry
    Geometry,
}

/// 1-bit e-paper panel
///
/// Buffers are packed MSB-first, one bit per pixel, rows padded to whole
/// bytes, `1` meaning black.
pub trait PanelDevice {
    /// Native panel size in pixels (width, height)
    fn size(&self) -> (u16, u16);

    /// Upload the whole buffer and run a full (flashing) refresh
    fn write_full(&mut self, buffer: &[u8]) -> impl core::future::Future<Output = Result<(), PanelError>>;

    /// Upload the whole buffer and refresh only `region`
    ///
    /// # Arguments
    /// * `buffer` - Complete frame buffer
    /// * `region` - Area the panel should update
    fn write_partial(
        &mut self,
        buffer: &[u8],
        region: Region,
    ) -> impl core::future::Future<Output = Result<(), PanelError>>;

    /// Put the panel controller into its lowest power state
    fn sleep(&mut self) -> impl core::future::Future<Output = Result<(), PanelError>>;
}
