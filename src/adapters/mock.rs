use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use crate::{
    adapters::adapter::ObjectAdapter,
    model::{
        error::{Error, Result},
        object::{BucketObject, ObjectAcl, ObjectMeta, UploadedPart},
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockObject {
    pub body: Vec<u8>,
    pub acl: ObjectAcl,
}

pub struct PendingUpload {
    key: String,
    acl: ObjectAcl,
    parts: BTreeMap<i32, Vec<u8>>,
}

/// In-memory bucket. Objects are keyed by `(bucket, key)`.
#[derive(Default)]
pub struct MockClient {
    pub objects: Mutex<BTreeMap<(String, String), MockObject>>,
    pub uploads: Mutex<HashMap<String, PendingUpload>>,
    pub calls: AtomicUsize,
    pub heads: AtomicUsize,
    pub fail_put: bool,
    pub fail_part: bool,
    pub fail_delete: bool,
    pub fail_list: bool,
}

impl MockClient {
    pub fn with_objects(bucket: &str, keys: &[&str]) -> Self {
        let client = MockClient::default();
        {
            let mut objects = client.objects.lock().unwrap();
            for key in keys {
                objects.insert(
                    (bucket.to_string(), key.to_string()),
                    MockObject {
                        body: key.as_bytes().to_vec(),
                        acl: ObjectAcl::Private,
                    },
                );
            }
        }
        client
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<MockObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn called(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn id(bucket: &str, key: &str) -> (String, String) {
        (bucket.to_string(), key.to_string())
    }
}

impl ObjectAdapter for MockClient {
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, acl: ObjectAcl) -> Result<()> {
        self.called();
        if self.fail_put {
            return Err(Error::remote(format!("failed to put_object at: {}, AccessDenied", key)));
        }

        self.objects
            .lock()
            .unwrap()
            .insert(Self::id(bucket, key), MockObject { body, acl });
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.called();
        self.object(bucket, key)
            .map(|o| o.body)
            .ok_or_else(|| Error::remote(format!("failed to get_object: {}, NoSuchKey", key)))
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
        self.called();
        self.heads.fetch_add(1, Ordering::SeqCst);
        Ok(self.object(bucket, key).map(|o| ObjectMeta {
            key: key.to_string(),
            size: o.body.len() as i64,
            e_tag: None,
        }))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.called();
        if self.fail_delete {
            return Err(Error::remote(format!("failed to delete_object: {}, AccessDenied", key)));
        }

        self.objects.lock().unwrap().remove(&Self::id(bucket, key));
        Ok(())
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        self.called();
        if self.fail_delete {
            return Err(Error::remote("failed to delete objects: AccessDenied"));
        }
        assert!(keys.len() <= 1000, "batch too large: {}", keys.len());

        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(&Self::id(bucket, key));
        }
        Ok(())
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<BucketObject>> {
        self.called();
        if self.fail_list {
            return Err(Error::remote(format!("failed to list_objects at: {}, NoSuchBucket", prefix)));
        }

        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), o)| BucketObject {
                key: k.clone(),
                size: o.body.len() as i64,
            })
            .collect())
    }

    fn put_object_acl(&self, bucket: &str, key: &str, acl: ObjectAcl) -> Result<()> {
        self.called();
        match self.objects.lock().unwrap().get_mut(&Self::id(bucket, key)) {
            Some(o) => {
                o.acl = acl;
                Ok(())
            }
            None => Err(Error::remote(format!("failed to put_object_acl: {}, NoSuchKey", key))),
        }
    }

    fn create_multipart_upload(&self, _bucket: &str, key: &str, acl: ObjectAcl) -> Result<String> {
        self.called();
        if self.fail_put {
            return Err(Error::remote(format!(
                "failed to create_multipart_upload: {}, AccessDenied",
                key
            )));
        }

        let mut uploads = self.uploads.lock().unwrap();
        let upload_id = format!("upload-{}", uploads.len() + 1);
        uploads.insert(
            upload_id.clone(),
            PendingUpload {
                key: key.to_string(),
                acl,
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<UploadedPart> {
        self.called();
        if self.fail_part {
            return Err(Error::remote(format!(
                "failed to upload_part {} of {}, InternalError",
                part_number, upload_id
            )));
        }

        let mut uploads = self.uploads.lock().unwrap();
        let upload = uploads
            .get_mut(upload_id)
            .ok_or_else(|| Error::remote(format!("NoSuchUpload: {}", upload_id)))?;
        upload.parts.insert(part_number, body);
        Ok(UploadedPart {
            part_number,
            e_tag: format!("etag-{}", part_number),
        })
    }

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<()> {
        self.called();
        let upload = self
            .uploads
            .lock()
            .unwrap()
            .remove(upload_id)
            .ok_or_else(|| Error::remote(format!("NoSuchUpload: {}", upload_id)))?;
        assert_eq!(upload.key, key);
        assert_eq!(parts.len(), upload.parts.len());

        let body = upload.parts.into_values().flatten().collect();
        self.objects.lock().unwrap().insert(
            Self::id(bucket, key),
            MockObject {
                body,
                acl: upload.acl,
            },
        );
        Ok(())
    }

    fn abort_multipart_upload(&self, _bucket: &str, _key: &str, upload_id: &str) -> Result<()> {
        self.called();
        self.uploads.lock().unwrap().remove(upload_id);
        Ok(())
    }
}
