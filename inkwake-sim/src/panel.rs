//! PBM image panel
//!
//! Every commit rewrites a binary PBM (P4) file. The frame buffer layout
//! already matches P4: rows padded to whole bytes, MSB first, 1 = black.

use std::fs;
use std::path::{Path, PathBuf};

use inkwake_hal::{PanelDevice, PanelError, Region};
use log::{debug, info, warn};

/// Panel that renders to an image file
pub struct PbmPanel {
    path: PathBuf,
    width: u16,
    height: u16,
    full_refreshes: u32,
    partial_refreshes: u32,
}

impl PbmPanel {
    pub fn new(path: impl Into<PathBuf>, width: u16, height: u16) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            full_refreshes: 0,
            partial_refreshes: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full and partial refreshes so far
    pub fn refresh_counts(&self) -> (u32, u32) {
        (self.full_refreshes, self.partial_refreshes)
    }

    fn store(&self, buffer: &[u8]) -> Result<(), PanelError> {
        let expected = (self.width as usize).div_ceil(8) * self.height as usize;
        if buffer.len() != expected {
            warn!("frame is {} bytes, panel expects {}", buffer.len(), expected);
            return Err(PanelError::Geometry);
        }

        let mut image = format!("P4\n{} {}\n", self.width, self.height).into_bytes();
        image.extend_from_slice(buffer);
        fs::write(&self.path, image).map_err(|err| {
            warn!("writing {} failed: {}", self.path.display(), err);
            PanelError::Bus
        })
    }
}

impl PanelDevice for PbmPanel {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    async fn write_full(&mut self, buffer: &[u8]) -> Result<(), PanelError> {
        self.store(buffer)?;
        self.full_refreshes += 1;
        info!("full refresh -> {}", self.path.display());
        Ok(())
    }

    async fn write_partial(&mut self, buffer: &[u8], region: Region) -> Result<(), PanelError> {
        self.store(buffer)?;
        self.partial_refreshes += 1;
        info!(
            "partial refresh of {}x{} at ({}, {}) -> {}",
            region.width,
            region.height,
            region.x,
            region.y,
            self.path.display()
        );
        Ok(())
    }

    async fn sleep(&mut self) -> Result<(), PanelError> {
        debug!("panel asleep");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_writes_p4_image() {
        let path = std::env::temp_dir().join(format!("inkwake-panel-{}.pbm", std::process::id()));
        let mut panel = PbmPanel::new(&path, 10, 2);

        block_on(panel.write_full(&[0xFF, 0xC0, 0x00, 0x00])).unwrap();
        let image = fs::read(&path).unwrap();
        assert_eq!(&image[..8], b"P4\n10 2\n");
        assert_eq!(&image[8..], &[0xFF, 0xC0, 0x00, 0x00]);
        assert_eq!(panel.refresh_counts(), (1, 0));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_rejects_wrong_geometry() {
        let mut panel = PbmPanel::new(std::env::temp_dir().join("inkwake-never.pbm"), 10, 2);
        assert_eq!(block_on(panel.write_full(&[0u8; 3])), Err(PanelError::Geometry));
    }
}
