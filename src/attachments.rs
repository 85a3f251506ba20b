use std::{collections::HashMap, fs, path::PathBuf};

use tracing::error;

use crate::{
    model::{
        attachment::AttachmentMeta,
        error::{Error, Result},
        object::ObjectAcl,
    },
    uploads::Uploads,
};

/// The host's record of which files belong to an attachment.
pub trait MediaLibrary {
    fn attachment(&self, id: u64) -> Result<AttachmentMeta>;
}

/// Attachment metadata exported by the host as a JSON object keyed by id.
pub struct ManifestLibrary {
    path: PathBuf,
}

impl ManifestLibrary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MediaLibrary for ManifestLibrary {
    fn attachment(&self, id: u64) -> Result<AttachmentMeta> {
        let raw = fs::read_to_string(&self.path).map_err(|err| Error::io(&self.path, err))?;
        let mut entries: HashMap<u64, AttachmentMeta> =
            serde_json::from_str(&raw).map_err(|err| Error::Manifest {
                message: format!("{}: {}", self.path.display(), err),
            })?;

        entries.remove(&id).ok_or(Error::UnknownAttachment(id))
    }
}

/// Per-key outcome of an ACL update.
#[derive(Debug, Default)]
pub struct AclReport {
    pub updated: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

/// Object keys of every file belonging to attachment `id`.
pub fn attachment_files(library: &dyn MediaLibrary, uploads: &Uploads, id: u64) -> Result<Vec<String>> {
    let root = uploads.upload_root();
    Ok(library
        .attachment(id)?
        .files()
        .into_iter()
        .map(|file| format!("{}{}", root, file.trim_start_matches('/')))
        .collect())
}

/// Applies `acl` to every object of attachment `id`. Keys are attempted
/// independently; failures are collected in the report.
pub fn set_attachment_acl(
    library: &dyn MediaLibrary,
    uploads: &Uploads,
    id: u64,
    acl: ObjectAcl,
) -> Result<AclReport> {
    let mut report = AclReport::default();

    for key in attachment_files(library, uploads, id)? {
        match uploads.client.put_object_acl(&uploads.bucket.name, &key, acl) {
            Ok(()) => report.updated.push(key),
            Err(err) => {
                error!(error_message=%err, error_group="put_object_acl", key=%key);
                report.failed.push((key, err));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{adapters::mock::MockClient, util::object::parse_bucket_spec};

    struct StaticLibrary(BTreeMap<u64, AttachmentMeta>);

    impl MediaLibrary for StaticLibrary {
        fn attachment(&self, id: u64) -> Result<AttachmentMeta> {
            self.0.get(&id).cloned().ok_or(Error::UnknownAttachment(id))
        }
    }

    fn library() -> StaticLibrary {
        let meta: AttachmentMeta = serde_json::from_str(
            r#"{
                "file": "2024/01/photo.jpg",
                "sizes": { "thumbnail": { "file": "photo-150x150.jpg" } }
            }"#,
        )
        .unwrap();
        StaticLibrary(BTreeMap::from([(42, meta)]))
    }

    fn uploads(client: MockClient) -> Uploads {
        Uploads::new(
            Box::new(client),
            parse_bucket_spec("media/site-1"),
            ObjectAcl::PublicRead,
        )
    }

    #[test]
    fn test_attachment_files() {
        let files = attachment_files(&library(), &uploads(MockClient::default()), 42).unwrap();

        assert_eq!(
            files,
            vec![
                "site-1/uploads/2024/01/photo.jpg",
                "site-1/uploads/2024/01/photo-150x150.jpg",
            ]
        );
    }

    #[test]
    fn test_unknown_attachment() {
        let res = attachment_files(&library(), &uploads(MockClient::default()), 7);

        assert!(matches!(res, Err(Error::UnknownAttachment(7))));
    }

    #[test]
    fn test_set_attachment_acl() {
        let client = MockClient::with_objects(
            "media",
            &["site-1/uploads/2024/01/photo.jpg", "site-1/uploads/2024/01/photo-150x150.jpg"],
        );
        let uploads = uploads(client);

        let report = set_attachment_acl(&library(), &uploads, 42, ObjectAcl::PublicRead).unwrap();

        assert_eq!(report.updated.len(), 2);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_set_attachment_acl_partial_failure() {
        let client = MockClient::with_objects("media", &["site-1/uploads/2024/01/photo.jpg"]);
        let uploads = uploads(client);

        let report = set_attachment_acl(&library(), &uploads, 42, ObjectAcl::Private).unwrap();

        assert_eq!(report.updated, vec!["site-1/uploads/2024/01/photo.jpg"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "site-1/uploads/2024/01/photo-150x150.jpg");
    }

    #[test]
    fn test_manifest_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attachments.json");
        fs::write(&path, r#"{ "12": { "file": "2023/doc.pdf" } }"#).unwrap();
        let library = ManifestLibrary::new(&path);

        assert_eq!(library.attachment(12).unwrap().file, "2023/doc.pdf");
        assert!(matches!(library.attachment(13), Err(Error::UnknownAttachment(13))));

        fs::write(&path, "[]").unwrap();
        assert!(matches!(library.attachment(12), Err(Error::Manifest { .. })));
    }
}
