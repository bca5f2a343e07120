//! Directory-backed storage medium

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use inkwake_hal::{MediumError, StorageMedium};
use log::{debug, warn};

/// Flat-file medium rooted at a host directory
pub struct DirMedium {
    root: PathBuf,
    mounted: bool,
}

impl DirMedium {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mounted: false,
        }
    }

    fn path(&self, name: &str) -> Result<PathBuf, MediumError> {
        if !self.mounted {
            return Err(MediumError::NotMounted);
        }
        Ok(self.root.join(name))
    }
}

fn to_medium(err: io::Error) -> MediumError {
    match err.kind() {
        io::ErrorKind::NotFound => MediumError::NotFound,
        io::ErrorKind::StorageFull => MediumError::Full,
        _ => {
            warn!("storage I/O failed: {}", err);
            MediumError::Io
        }
    }
}

impl StorageMedium for DirMedium {
    async fn mount(&mut self) -> Result<(), MediumError> {
        fs::create_dir_all(&self.root).map_err(|err| {
            warn!("cannot mount {}: {}", self.root.display(), err);
            MediumError::NotMounted
        })?;
        self.mounted = true;
        debug!("mounted {}", self.root.display());
        Ok(())
    }

    async fn read(&mut self, name: &str, buffer: &mut [u8]) -> Result<usize, MediumError> {
        let data = fs::read(self.path(name)?).map_err(to_medium)?;
        if data.len() > buffer.len() {
            return Err(MediumError::BufferTooSmall);
        }
        buffer[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    async fn write(&mut self, name: &str, data: &[u8]) -> Result<(), MediumError> {
        let mut file = File::create(self.path(name)?).map_err(to_medium)?;
        file.write_all(data).map_err(to_medium)?;
        file.sync_all().map_err(to_medium)
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), MediumError> {
        fs::rename(self.path(from)?, self.path(to)?).map_err(to_medium)
    }

    async fn remove(&mut self, name: &str) -> Result<(), MediumError> {
        match fs::remove_file(self.path(name)?) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(to_medium(err)),
            _ => Ok(()),
        }
    }

    async fn unmount(&mut self) {
        self.mounted = false;
    }
}
