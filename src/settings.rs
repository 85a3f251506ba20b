use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::model::error::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether the host rewrites media URLs to point at the bucket.
    #[serde(default)]
    pub rewrite_enabled: bool,
}

/// Settings persisted as JSON at a fixed path. A missing file reads as the
/// defaults.
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Settings> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
            Err(err) => return Err(Error::io(&self.path, err)),
        };

        serde_json::from_str(&raw).map_err(|err| {
            Error::io(&self.path, std::io::Error::new(ErrorKind::InvalidData, err))
        })
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let raw = serde_json::to_string_pretty(settings).map_err(|err| {
            Error::io(&self.path, std::io::Error::new(ErrorKind::InvalidData, err))
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }

        fs::write(&self.path, raw).map_err(|err| Error::io(&self.path, err))
    }

    pub fn set_rewrite_enabled(&self, enabled: bool) -> Result<()> {
        let mut settings = self.load()?;
        settings.rewrite_enabled = enabled;
        self.save(&settings)
    }
}
