//! Fixed screen layout
//!
//! ```text
//! ┌───────────────────────────────┬───────┐
//! │ header (title, update time)   │ batt  │
//! ├───────────────────────┬───────┴───────┤
//! │ primary value         │ forecast      │
//! ├───────────────────────┤               │
//! │ secondary values      │               │
//! ├───────────────────────┴───────────────┤
//! │ freshness marker, room temperature    │
//! └───────────────────────────────────────┘
//! ```

use embedded_graphics::{
    geometry::{Point, Size},
    primitives::Rectangle,
};

/// Header and footer strip height
pub const STRIP_HEIGHT: u32 = 24;

/// Battery icon area width
pub const BATTERY_WIDTH: u32 = 44;

/// Number of regions in a [`Layout`]
pub const REGION_COUNT: usize = 6;

/// Screen regions in logical coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub header: Rectangle,
    pub battery: Rectangle,
    pub primary: Rectangle,
    pub secondary: Rectangle,
    pub forecast: Rectangle,
    pub marker: Rectangle,
}

impl Layout {
    /// Compute regions for a logical screen size
    pub fn for_size(size: Size) -> Self {
        let width = size.width;
        let height = size.height.max(STRIP_HEIGHT * 2);
        let body = height - STRIP_HEIGHT * 2;
        let primary_height = body * 2 / 5;
        let column = width * 3 / 5;

        let header_width = width.saturating_sub(BATTERY_WIDTH);
        Self {
            header: Rectangle::new(Point::zero(), Size::new(header_width, STRIP_HEIGHT)),
            battery: Rectangle::new(
                Point::new(header_width as i32, 0),
                Size::new(width - header_width, STRIP_HEIGHT),
            ),
            primary: Rectangle::new(
                Point::new(0, STRIP_HEIGHT as i32),
                Size::new(column, primary_height),
            ),
            secondary: Rectangle::new(
                Point::new(0, (STRIP_HEIGHT + primary_height) as i32),
                Size::new(column, body - primary_height),
            ),
            forecast: Rectangle::new(
                Point::new(column as i32, STRIP_HEIGHT as i32),
                Size::new(width - column, body),
            ),
            marker: Rectangle::new(
                Point::new(0, (height - STRIP_HEIGHT) as i32),
                Size::new(width, STRIP_HEIGHT),
            ),
        }
    }

    /// All regions, in drawing order
    pub fn regions(&self) -> [Rectangle; REGION_COUNT] {
        [
            self.header,
            self.battery,
            self.primary,
            self.secondary,
            self.forecast,
            self.marker,
        ]
    }
}
