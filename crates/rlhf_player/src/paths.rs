//! Cross-platform application paths

use std::path::PathBuf;

use crate::error::{PlayerError, Result};

#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    /// Resolve the OS data directory. Nothing is created on disk; the player
    /// only reads from here.
    pub fn new() -> Result<Self> {
        let base = dirs::data_dir().ok_or(PlayerError::NoDataDir)?;
        Ok(Self::with_base(base))
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self {
            data_dir: base.join("rlhf_viz"),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }
}
