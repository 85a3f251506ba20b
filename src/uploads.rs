use regex::Regex;
use tracing::debug;

use crate::{
    adapters::adapter::ObjectAdapter,
    model::{
        error::Result,
        object::{BucketObject, ObjectAcl},
    },
    util::object::{join_key, trailing_slash, BucketSpec},
};

/// Directory under the bucket root that holds media uploads.
pub const UPLOADS_DIR: &str = "uploads";

/// Keys per DeleteObjects request.
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Everything a bucket command needs: the client, where in the bucket to work,
/// and the ACL for new objects.
pub struct Uploads {
    pub client: Box<dyn ObjectAdapter>,
    pub bucket: BucketSpec,
    pub acl: ObjectAcl,
}

impl Uploads {
    pub fn new(client: Box<dyn ObjectAdapter>, bucket: BucketSpec, acl: ObjectAcl) -> Self {
        Self {
            client,
            bucket,
            acl,
        }
    }

    pub fn upload_root(&self) -> String {
        format!("{}{}/", self.bucket.root, UPLOADS_DIR)
    }

    /// Prefix listed by `ls`: the bucket root plus `path` as a directory.
    pub fn list_prefix(&self, path: Option<&str>) -> String {
        let mut prefix = self.bucket.root.clone();

        if let Some(path) = path.map(|p| p.trim_start_matches('/')) {
            if !path.is_empty() {
                prefix.push_str(&trailing_slash(path));
            }
        }

        prefix
    }

    /// Prefix removed by `rm`. A path without a `.` names a directory, so
    /// an empty path with no bucket root becomes `/` and matches nothing.
    pub fn delete_prefix(&self, path: &str) -> String {
        let mut prefix = self.bucket.root.clone();
        prefix.push_str(path.trim_start_matches('/'));

        if !path.contains('.') {
            prefix = trailing_slash(&prefix);
        }

        prefix
    }

    /// Key prefix a directory upload lands under, without a trailing slash.
    pub fn destination_prefix(&self, to: &str) -> String {
        join_key(&[self.bucket.root.as_str(), to])
    }

    pub fn probe_key(&self) -> String {
        format!("{}{}.txt", self.upload_root(), rand::random::<u32>())
    }

    /// Deletes every object under `prefix` whose key matches `regex`.
    /// `before_delete` runs once per object ahead of the batch that removes it.
    /// Returns the number of objects deleted.
    pub fn delete_matching_objects<F>(
        &self,
        prefix: &str,
        regex: Option<&Regex>,
        mut before_delete: F,
    ) -> Result<usize>
    where
        F: FnMut(&BucketObject),
    {
        let objects: Vec<BucketObject> = self
            .client
            .list_objects(&self.bucket.name, prefix)?
            .into_iter()
            .filter(|o| regex.map_or(true, |re| re.is_match(&o.key)))
            .collect();

        for batch in objects.chunks(DELETE_BATCH_SIZE) {
            for object in batch {
                before_delete(object);
            }

            let keys: Vec<String> = batch.iter().map(|o| o.key.clone()).collect();
            self.client.delete_objects(&self.bucket.name, &keys)?;
            debug!(prefix = prefix, count = keys.len(), "deleted batch");
        }

        Ok(objects.len())
    }
}
