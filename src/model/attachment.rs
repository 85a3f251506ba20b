use std::collections::BTreeMap;

use serde::Deserialize;

/// Media metadata the host records for one attachment.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AttachmentMeta {
    /// Main file, relative to the uploads directory.
    pub file: String,
    #[serde(default)]
    pub sizes: BTreeMap<String, SizeInfo>,
    #[serde(default)]
    pub original_image: Option<String>,
    #[serde(default)]
    pub backup_sizes: BTreeMap<String, SizeInfo>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SizeInfo {
    pub file: String,
}

impl AttachmentMeta {
    /// All files of the attachment relative to the uploads directory, main file
    /// first. Derived files live next to the main file.
    pub fn files(&self) -> Vec<String> {
        let dir = match self.file.rfind('/') {
            Some(pos) => &self.file[..=pos],
            None => "",
        };

        let derived = self
            .sizes
            .values()
            .map(|s| s.file.as_str())
            .chain(self.original_image.as_deref())
            .chain(self.backup_sizes.values().map(|s| s.file.as_str()));

        let mut files = vec![self.file.clone()];
        for name in derived {
            let path = format!("{}{}", dir, name);
            if !files.contains(&path) {
                files.push(path);
            }
        }

        files
    }
}
