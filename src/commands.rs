use std::{
    fs,
    io::Write,
    path::Path,
    sync::Mutex,
};

use regex::Regex;
use tracing::{error, info, span, warn, Level};
use walkdir::WalkDir;

use crate::{
    attachments::{self, MediaLibrary},
    model::{
        error::{Error, Result},
        object::ObjectAcl,
    },
    settings::SettingsFile,
    transfer::{TransferManager, TransferOptions},
    uploads::Uploads,
    util::object::{parse_location, relative_key, Location},
};

/// Body of the object `verify` writes and removes again.
pub const PROBE_CONTENT: &[u8] = b"This file was written by r2-uploads to verify bucket access.\n";

const WRITE_FAILED: &str = "Failed to copy / write to R2 - check your policy?";

fn line(out: &mut dyn Write, message: &str) -> Result<()> {
    writeln!(out, "{}", message).map_err(|err| Error::io("<stdout>", err))
}

fn success(out: &mut dyn Write, message: &str) -> Result<()> {
    line(out, &format!("Success: {}", message))
}

impl Uploads {
    /// Round-trips a probe object through the bucket.
    pub fn verify(&self, out: &mut dyn Write) -> Result<()> {
        let span = span!(Level::INFO, "verify", context = "verify");
        let _e = span.enter();
        info!("called");

        let bucket = &self.bucket.name;
        let key = self.probe_key();
        let path = Location::Remote {
            bucket: bucket.clone(),
            key: key.clone(),
        };

        line(out, &format!("Attempting to upload file {}", path))?;

        let written = self
            .client
            .put_object(bucket, &key, PROBE_CONTENT.to_vec(), self.acl)
            .and_then(|_| self.client.head_object(bucket, &key));

        match written {
            Ok(Some(_)) => {}
            Ok(None) => {
                error!(error_message = "probe missing after write", error_group = "verify_write", key = %key);
                return Err(Error::Failed(WRITE_FAILED.to_string()));
            }
            Err(err) => {
                error!(error_message=%err, error_group="verify_write", key=%key);
                return Err(Error::Failed(format!("{} ({})", WRITE_FAILED, err)));
            }
        }

        line(out, "File uploaded to R2 successfully.")?;
        line(out, &format!("Attempting to delete file. {}", path))?;

        let deleted = self
            .client
            .delete_object(bucket, &key)
            .and_then(|_| self.client.head_object(bucket, &key));

        match deleted {
            Ok(None) => {}
            Ok(Some(_)) => {
                error!(error_message = "probe present after delete", error_group = "verify_delete", key = %key);
                return Err(Error::Failed(format!("Failed to delete {}", path)));
            }
            Err(err) => {
                error!(error_message=%err, error_group="verify_delete", key=%key);
                return Err(Error::Failed(format!("Failed to delete {} ({})", path, err)));
            }
        }

        line(out, "File deleted from R2 successfully.")?;
        success(out, "Looks like your configuration is correct.")
    }

    /// Prints every key under the root (and `path`), relative to that prefix.
    pub fn ls(&self, path: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let span = span!(Level::INFO, "ls", context = "ls");
        let _e = span.enter();

        let prefix = self.list_prefix(path);
        info!(prefix = %prefix, "called");

        let objects = self
            .client
            .list_objects(&self.bucket.name, &prefix)
            .inspect_err(|err| error!(error_message=%err, error_group="list_objects"))?;

        for object in objects {
            line(out, object.key.strip_prefix(&prefix).unwrap_or(&object.key))?;
        }

        Ok(())
    }

    /// Copies a file or tree between local paths and `s3://` locations.
    ///
    /// Per-file failures are printed as they happen. Unless `best_effort` is
    /// set, any failure fails the command once the walk is finished.
    pub fn cp(&self, from: &str, to: &str, best_effort: bool, out: &mut dyn Write) -> Result<()> {
        let span = span!(Level::INFO, "cp", context = "cp");
        let _e = span.enter();

        let src = parse_location(from);
        let dst = parse_location(to);
        info!(from = %src, to = %dst, remote_source = src.is_remote(), "called");

        let (pairs, recursive) = self.copy_plan(&src, &dst)?;
        let total = pairs.len();
        let mut failed = 0;

        for (from_item, to_item) in pairs {
            if recursive {
                line(out, &format!("Copying from {} to {}", from_item, to_item))?;
            }

            if let Err(err) = self.copy_one(&from_item, &to_item) {
                warn!(error_message=%err, error_group="copy", from=%from_item, to=%to_item);
                line(out, &format!("Warning: Failed to copy {}: {}", from_item, err))?;
                failed += 1;
            }
        }

        if failed > 0 && !best_effort {
            return Err(Error::Failed(format!(
                "{} of {} files failed to copy from {} to {}",
                failed, total, from, to
            )));
        }

        success(out, &format!("Completed copy from {} to {}", from, to))
    }

    /// Expands a copy into single-file pairs. A local directory or a remote
    /// prefix (empty key or trailing `/`) copies recursively.
    fn copy_plan(&self, src: &Location, dst: &Location) -> Result<(Vec<(Location, Location)>, bool)> {
        match src {
            Location::Local(root) if root.is_dir() => {
                if let Location::Local(dir) = dst {
                    fs::create_dir_all(dir).map_err(|err| Error::io(dir, err))?;
                }

                let mut pairs = Vec::new();
                for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
                    let entry = entry.map_err(|err| {
                        let path = err.path().unwrap_or(root.as_path()).to_path_buf();
                        let source = err
                            .into_io_error()
                            .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                        Error::io(path, source)
                    })?;

                    let relative = relative_key(root, entry.path());
                    if entry.file_type().is_dir() {
                        if let Location::Local(dir) = dst.join(&relative) {
                            fs::create_dir_all(&dir).map_err(|err| Error::io(&dir, err))?;
                        }
                        continue;
                    }

                    pairs.push((src.join(&relative), dst.join(&relative)));
                }
                Ok((pairs, true))
            }
            Location::Remote { bucket, key } if key.is_empty() || key.ends_with('/') => {
                let pairs = self
                    .client
                    .list_objects(bucket, key)?
                    .into_iter()
                    .filter(|o| !o.key.ends_with('/'))
                    .map(|o| {
                        let relative = o.key.strip_prefix(key.as_str()).unwrap_or(&o.key).to_string();
                        (
                            Location::Remote {
                                bucket: bucket.clone(),
                                key: o.key,
                            },
                            dst.join(&relative),
                        )
                    })
                    .collect();
                Ok((pairs, true))
            }
            _ => Ok((vec![(src.clone(), dst.clone())], false)),
        }
    }

    fn copy_one(&self, from: &Location, to: &Location) -> Result<()> {
        if let Location::Local(path) = to {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
            }
        }

        if let (Location::Local(src), Location::Local(dst)) = (from, to) {
            fs::copy(src, dst).map_err(|err| Error::io(src, err))?;
            return Ok(());
        }

        let body = match from {
            Location::Local(path) => fs::read(path).map_err(|err| Error::io(path, err))?,
            Location::Remote { bucket, key } => self.client.get_object(bucket, key)?,
        };

        match to {
            Location::Local(path) => fs::write(path, body).map_err(|err| Error::io(path, err)),
            Location::Remote { bucket, key } => self.client.put_object(bucket, key, body, self.acl),
        }
    }

    /// Uploads a local directory under the bucket root (and `to`).
    pub fn upload_directory(
        &self,
        from: &Path,
        to: &str,
        options: &TransferOptions,
        out: &mut (dyn Write + Send),
    ) -> Result<()> {
        let span = span!(Level::INFO, "upload_directory", context = "upload_directory");
        let _e = span.enter();

        let prefix = self.destination_prefix(to);
        info!(from = %from.display(), prefix = %prefix, concurrency = options.concurrency, "called");

        let manager = TransferManager::new(self.client.as_ref(), &self.bucket.name, self.acl);
        let out = Mutex::new(out);

        let count = manager
            .upload_directory(from, &prefix, options, |job| {
                if !options.verbose {
                    return;
                }
                if let Ok(mut out) = out.lock() {
                    let _ = writeln!(
                        out,
                        "Uploading {} to {}",
                        job.path.display(),
                        Location::Remote {
                            bucket: self.bucket.name.clone(),
                            key: job.key.clone(),
                        }
                    );
                }
            })
            .inspect_err(|err| error!(error_message=%err, error_group="upload_directory"))?;

        let out = out
            .into_inner()
            .map_err(|_| Error::Failed("output lock poisoned".to_string()))?;

        success(
            out,
            &format!(
                "Uploaded {} files from {} to {}",
                count,
                from.display(),
                Location::Remote {
                    bucket: self.bucket.name.clone(),
                    key: prefix,
                }
            ),
        )
    }

    /// Deletes everything under the computed prefix, optionally filtered by
    /// `regex`.
    pub fn rm(&self, path: &str, regex: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let span = span!(Level::INFO, "rm", context = "rm");
        let _e = span.enter();

        let prefix = self.delete_prefix(path);
        info!(prefix = %prefix, regex = regex, "called");

        let regex = regex.filter(|r| !r.is_empty()).map(Regex::new).transpose()?;

        let mut write_err = None;
        self.delete_matching_objects(&prefix, regex.as_ref(), |object| {
            if write_err.is_none() {
                write_err = line(out, &format!("Deleting file {}", object.key)).err();
            }
        })
        .inspect_err(|err| error!(error_message=%err, error_group="delete_matching_objects"))?;

        if let Some(err) = write_err {
            return Err(err);
        }

        success(out, &format!("Successfully deleted {}", prefix))
    }

    pub fn get_attachment_files(
        &self,
        library: &dyn MediaLibrary,
        id: u64,
        out: &mut dyn Write,
    ) -> Result<()> {
        let span = span!(Level::INFO, "get_attachment_files", context = "get_attachment_files");
        let _e = span.enter();
        info!(attachment_id = id, "called");

        for key in attachments::attachment_files(library, self, id)? {
            line(out, &key)?;
        }

        Ok(())
    }

    pub fn set_attachment_acl(
        &self,
        library: &dyn MediaLibrary,
        id: u64,
        acl: &str,
        out: &mut dyn Write,
    ) -> Result<()> {
        let span = span!(Level::INFO, "set_attachment_acl", context = "set_attachment_acl");
        let _e = span.enter();
        info!(attachment_id = id, acl = acl, "called");

        let acl: ObjectAcl = acl.parse()?;
        let report = attachments::set_attachment_acl(library, self, id, acl)?;

        for key in &report.updated {
            line(out, &format!("Set {} on {}", acl, key))?;
        }
        for (key, err) in &report.failed {
            line(out, &format!("Failed to set {} on {}: {}", acl, key, err))?;
        }

        if !report.failed.is_empty() {
            return Err(Error::Failed(format!(
                "{} of {} files of attachment {} were not updated",
                report.failed.len(),
                report.failed.len() + report.updated.len(),
                id
            )));
        }

        success(out, &format!("Set {} on attachment {}", acl, id))
    }
}

pub fn enable(settings: &SettingsFile, out: &mut dyn Write) -> Result<()> {
    let span = span!(Level::INFO, "enable", context = "enable");
    let _e = span.enter();
    info!(path = %settings.path().display(), "called");

    settings.set_rewrite_enabled(true)?;
    success(out, "Media URL rewriting enabled.")
}

pub fn disable(settings: &SettingsFile, out: &mut dyn Write) -> Result<()> {
    let span = span!(Level::INFO, "disable", context = "disable");
    let _e = span.enter();
    info!(path = %settings.path().display(), "called");

    settings.set_rewrite_enabled(false)?;
    success(out, "Media URL rewriting disabled.")
}
