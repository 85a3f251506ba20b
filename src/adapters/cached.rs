use tracing::debug;

use crate::{
    adapters::adapter::ObjectAdapter,
    cache::{MetadataCache, TransientStore},
    model::{
        error::Result,
        object::{BucketObject, ObjectAcl, ObjectMeta, UploadedPart},
    },
};

/// Fronts HEAD lookups of the wrapped adapter with a `MetadataCache`.
/// Writes and deletes drop the cached entry for the keys they touch.
pub struct CachedClient<A, S> {
    inner: A,
    cache: MetadataCache<S>,
}

impl<A: ObjectAdapter, S: TransientStore> CachedClient<A, S> {
    pub fn new(inner: A, cache: MetadataCache<S>) -> Self {
        Self { inner, cache }
    }

    fn invalidate(&self, bucket: &str, key: &str) {
        self.cache.remove(&cache_key(bucket, key));
    }
}

fn cache_key(bucket: &str, key: &str) -> String {
    format!("head/{}/{}", bucket, key)
}

impl<A: ObjectAdapter, S: TransientStore> ObjectAdapter for CachedClient<A, S> {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, acl: ObjectAcl) -> Result<()> {
        let res = self.inner.put_object(bucket, key, body, acl);
        self.invalidate(bucket, key);
        res
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.inner.get_object(bucket, key)
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
        let cache_key = cache_key(bucket, key);
        if let Some(meta) = self.cache.get::<ObjectMeta>(&cache_key) {
            debug!(bucket = bucket, key = key, "head cache hit");
            return Ok(Some(meta));
        }

        let meta = self.inner.head_object(bucket, key)?;
        if let Some(meta) = &meta {
            self.cache.set(&cache_key, meta);
        }

        Ok(meta)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let res = self.inner.delete_object(bucket, key);
        self.invalidate(bucket, key);
        res
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        let res = self.inner.delete_objects(bucket, keys);
        for key in keys {
            self.invalidate(bucket, key);
        }
        res
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<BucketObject>> {
        self.inner.list_objects(bucket, prefix)
    }

    fn put_object_acl(&self, bucket: &str, key: &str, acl: ObjectAcl) -> Result<()> {
        let res = self.inner.put_object_acl(bucket, key, acl);
        self.invalidate(bucket, key);
        res
    }

    fn create_multipart_upload(&self, bucket: &str, key: &str, acl: ObjectAcl) -> Result<String> {
        self.inner.create_multipart_upload(bucket, key, acl)
    }

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<UploadedPart> {
        self.inner
            .upload_part(bucket, key, upload_id, part_number, body)
    }

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<()> {
        let res = self
            .inner
            .complete_multipart_upload(bucket, key, upload_id, parts);
        self.invalidate(bucket, key);
        res
    }

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        self.inner.abort_multipart_upload(bucket, key, upload_id)
    }
}
