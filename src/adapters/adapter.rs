use std::sync::Arc;

use crate::model::{
    error::Result,
    object::{BucketObject, ObjectAcl, ObjectMeta, UploadedPart},
};

/// Blocking view of the object-store operations the commands consume.
///
/// Every call that creates an object takes the ACL explicitly; there is no
/// request-mutation hook.
pub trait ObjectAdapter: Send + Sync {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, acl: ObjectAcl) -> Result<()>;

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// `None` when the object does not exist.
    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>>;

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Deletes up to 1000 keys in one request. Fails if any key was not deleted.
    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()>;

    /// Lists every object under `prefix`, following continuation tokens.
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<BucketObject>>;

    fn put_object_acl(&self, bucket: &str, key: &str, acl: ObjectAcl) -> Result<()>;

    /// Returns the upload id.
    fn create_multipart_upload(&self, bucket: &str, key: &str, acl: ObjectAcl) -> Result<String>;

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<UploadedPart>;

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<()>;

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()>;
}

impl<A: ObjectAdapter + ?Sized> ObjectAdapter for Arc<A> {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, acl: ObjectAcl) -> Result<()> {
        (**self).put_object(bucket, key, body, acl)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        (**self).get_object(bucket, key)
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
        (**self).head_object(bucket, key)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        (**self).delete_object(bucket, key)
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        (**self).delete_objects(bucket, keys)
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<BucketObject>> {
        (**self).list_objects(bucket, prefix)
    }

    fn put_object_acl(&self, bucket: &str, key: &str, acl: ObjectAcl) -> Result<()> {
        (**self).put_object_acl(bucket, key, acl)
    }

    fn create_multipart_upload(&self, bucket: &str, key: &str, acl: ObjectAcl) -> Result<String> {
        (**self).create_multipart_upload(bucket, key, acl)
    }

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<UploadedPart> {
        (**self).upload_part(bucket, key, upload_id, part_number, body)
    }

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<()> {
        (**self).complete_multipart_upload(bucket, key, upload_id, parts)
    }

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        (**self).abort_multipart_upload(bucket, key, upload_id)
    }
}
