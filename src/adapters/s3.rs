use aws_sdk_s3::{
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectCannedAcl, ObjectIdentifier},
};

use crate::{
    adapters::adapter::ObjectAdapter,
    model::{
        error::{Error, Result},
        object::{BucketObject, ObjectAcl, ObjectMeta, UploadedPart},
    },
    util,
};

fn canned(acl: ObjectAcl) -> ObjectCannedAcl {
    ObjectCannedAcl::from(acl.as_str())
}

impl ObjectAdapter for aws_sdk_s3::Client {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, acl: ObjectAcl) -> Result<()> {
        let req = self
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(canned(acl))
            .body(ByteStream::from(body));

        util::poll::poll_until_ready(req.send()).map_err(|err| {
            Error::remote(format!(
                "failed to put_object at: {}, {}",
                key,
                DisplayErrorContext(&err)
            ))
        })?;

        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let req = self.get_object().bucket(bucket).key(key);

        let o = util::poll::poll_until_ready(req.send()).map_err(|err| {
            Error::remote(format!(
                "failed to get_object: {}, {}",
                key,
                DisplayErrorContext(&err)
            ))
        })?;

        let bytes = util::poll::poll_until_ready(o.body.collect()).map_err(|err| {
            Error::remote(format!("failed to collect body: {}, {}", key, err))
        })?;

        Ok(bytes.into_bytes().to_vec())
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
        let req = self.head_object().bucket(bucket).key(key);

        let ho = match util::poll::poll_until_ready(req.send()) {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_not_found() {
                        return Ok(None);
                    }
                }

                return Err(Error::remote(format!(
                    "failed to head_object: {}, {}",
                    key,
                    DisplayErrorContext(&err)
                )));
            }
            Ok(ho) => ho,
        };

        Ok(Some(ObjectMeta {
            key: key.to_string(),
            size: ho.content_length().unwrap_or(0),
            e_tag: ho.e_tag().map(|tag| tag.to_string()),
        }))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let req = self.delete_object().bucket(bucket).key(key);

        util::poll::poll_until_ready(req.send()).map_err(|err| {
            Error::remote(format!(
                "failed to delete_object: {}, {}",
                key,
                DisplayErrorContext(&err)
            ))
        })?;

        Ok(())
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| Error::remote(format!("failed to build delete request, {}", err)))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|err| Error::remote(format!("failed to build delete request, {}", err)))?;

        let req = self.delete_objects().bucket(bucket).delete(delete);

        let out = util::poll::poll_until_ready(req.send()).map_err(|err| {
            Error::remote(format!(
                "failed to delete_objects in: {}, {}",
                bucket,
                DisplayErrorContext(&err)
            ))
        })?;

        let failed: Vec<String> = out
            .errors()
            .iter()
            .map(|e| {
                format!(
                    "{} ({})",
                    e.key().unwrap_or_default(),
                    e.message().unwrap_or("unknown error")
                )
            })
            .collect();

        if !failed.is_empty() {
            return Err(Error::remote(format!(
                "failed to delete objects: {}",
                failed.join(", ")
            )));
        }

        Ok(())
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<BucketObject>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self.list_objects_v2().bucket(bucket).prefix(prefix);

            if let Some(tok) = continuation_token {
                req = req.continuation_token(tok);
            }

            let lo = util::poll::poll_until_ready(req.send()).map_err(|err| {
                Error::remote(format!(
                    "failed to list_objects at: {}, {}",
                    prefix,
                    DisplayErrorContext(&err)
                ))
            })?;

            for o in lo.contents() {
                objects.push(BucketObject {
                    key: o.key().unwrap_or("").to_string(),
                    size: o.size().unwrap_or(0),
                });
            }

            continuation_token = lo.next_continuation_token().map(|tok| tok.to_string());
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(objects)
    }

    fn put_object_acl(&self, bucket: &str, key: &str, acl: ObjectAcl) -> Result<()> {
        let req = self
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(canned(acl));

        util::poll::poll_until_ready(req.send()).map_err(|err| {
            Error::remote(format!(
                "failed to put_object_acl: {}, {}",
                key,
                DisplayErrorContext(&err)
            ))
        })?;

        Ok(())
    }

    fn create_multipart_upload(&self, bucket: &str, key: &str, acl: ObjectAcl) -> Result<String> {
        let req = self
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .acl(canned(acl));

        let out = util::poll::poll_until_ready(req.send()).map_err(|err| {
            Error::remote(format!(
                "failed to create_multipart_upload: {}, {}",
                key,
                DisplayErrorContext(&err)
            ))
        })?;

        out.upload_id()
            .map(|id| id.to_string())
            .ok_or_else(|| Error::remote(format!("no upload id returned for: {}", key)))
    }

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<UploadedPart> {
        let req = self
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body));

        let out = util::poll::poll_until_ready(req.send()).map_err(|err| {
            Error::remote(format!(
                "failed to upload_part {} of: {}, {}",
                part_number,
                key,
                DisplayErrorContext(&err)
            ))
        })?;

        Ok(UploadedPart {
            part_number,
            e_tag: out.e_tag().unwrap_or_default().to_string(),
        })
    }

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<()> {
        let parts = parts
            .into_iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(p.e_tag)
                    .build()
            })
            .collect();

        let req = self
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            );

        util::poll::poll_until_ready(req.send()).map_err(|err| {
            Error::remote(format!(
                "failed to complete_multipart_upload: {}, {}",
                key,
                DisplayErrorContext(&err)
            ))
        })?;

        Ok(())
    }

    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        let req = self
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id);

        util::poll::poll_until_ready(req.send()).map_err(|err| {
            Error::remote(format!(
                "failed to abort_multipart_upload: {}, {}",
                key,
                DisplayErrorContext(&err)
            ))
        })?;

        Ok(())
    }
}
