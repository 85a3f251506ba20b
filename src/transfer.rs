use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    thread,
};

use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::{
    adapters::adapter::ObjectAdapter,
    model::{
        error::{Error, Result},
        object::ObjectAcl,
    },
    util::object::{join_key, relative_key},
};

/// Files at or above this size go through a multipart upload.
pub const MULTIPART_THRESHOLD: u64 = 16 * 1024 * 1024;

pub const PART_SIZE: usize = 5 * 1024 * 1024;

pub const DEFAULT_CONCURRENCY: usize = 5;

#[derive(Clone, Debug)]
pub struct TransferOptions {
    pub concurrency: usize,
    pub verbose: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            verbose: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferJob {
    pub path: PathBuf,
    pub key: String,
}

/// Uploads local directory trees to a bucket, stamping every created object
/// with one ACL.
pub struct TransferManager<'a> {
    client: &'a dyn ObjectAdapter,
    bucket: &'a str,
    acl: ObjectAcl,
    multipart_threshold: u64,
    part_size: usize,
}

impl<'a> TransferManager<'a> {
    pub fn new(client: &'a dyn ObjectAdapter, bucket: &'a str, acl: ObjectAcl) -> Self {
        Self {
            client,
            bucket,
            acl,
            multipart_threshold: MULTIPART_THRESHOLD,
            part_size: PART_SIZE,
        }
    }

    #[cfg(test)]
    pub fn with_part_sizes(mut self, multipart_threshold: u64, part_size: usize) -> Self {
        self.multipart_threshold = multipart_threshold;
        self.part_size = part_size.max(1);
        self
    }

    /// One job per regular file under `from`, keyed under `prefix` by its
    /// relative path.
    pub fn plan(&self, from: &Path, prefix: &str) -> Result<Vec<TransferJob>> {
        let meta = from.metadata().map_err(|err| Error::io(from, err))?;
        if !meta.is_dir() {
            return Err(Error::Failed(format!(
                "{} is not a directory",
                from.display()
            )));
        }

        let mut jobs = Vec::new();

        for entry in WalkDir::new(from).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| from.to_path_buf());
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                Error::io(path, source)
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = relative_key(from, entry.path());

            jobs.push(TransferJob {
                path: entry.path().to_path_buf(),
                key: join_key(&[prefix, relative.as_str()]),
            });
        }

        Ok(jobs)
    }

    /// Uploads every file under `from` with up to `options.concurrency`
    /// workers. `on_start` runs as each file begins. Stops handing out work
    /// after the first failure and returns it.
    pub fn upload_directory<F>(
        &self,
        from: &Path,
        prefix: &str,
        options: &TransferOptions,
        on_start: F,
    ) -> Result<usize>
    where
        F: Fn(&TransferJob) + Sync,
    {
        let jobs = self.plan(from, prefix)?;
        let total = jobs.len();
        let workers = options.concurrency.clamp(1, total.max(1));
        debug!(files = total, workers = workers, "planned transfer");

        let queue = Mutex::new(jobs.into_iter());
        let failed = AtomicBool::new(false);
        let first_error: Mutex<Option<Error>> = Mutex::new(None);
        let done = AtomicUsize::new(0);
        let handle = tokio::runtime::Handle::try_current().ok();

        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    let _guard = handle.as_ref().map(|h| h.enter());

                    while !failed.load(Ordering::SeqCst) {
                        let job = match queue.lock() {
                            Ok(mut queue) => queue.next(),
                            Err(_) => None,
                        };
                        let Some(job) = job else {
                            break;
                        };

                        on_start(&job);

                        match self.upload_file(&job) {
                            Ok(()) => {
                                done.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(err) => {
                                error!(error_message=%err, error_group="upload_file", key=%job.key);
                                failed.store(true, Ordering::SeqCst);
                                if let Ok(mut slot) = first_error.lock() {
                                    slot.get_or_insert(err);
                                }
                            }
                        }
                    }
                });
            }
        });

        if let Some(err) = first_error.into_inner().ok().flatten() {
            return Err(err);
        }

        Ok(done.into_inner())
    }

    pub fn upload_file(&self, job: &TransferJob) -> Result<()> {
        let size = job
            .path
            .metadata()
            .map_err(|err| Error::io(&job.path, err))?
            .len();

        if size >= self.multipart_threshold {
            return self.upload_multipart(job);
        }

        let body = std::fs::read(&job.path).map_err(|err| Error::io(&job.path, err))?;
        self.client.put_object(self.bucket, &job.key, body, self.acl)
    }

    fn upload_multipart(&self, job: &TransferJob) -> Result<()> {
        let upload_id = self
            .client
            .create_multipart_upload(self.bucket, &job.key, self.acl)?;

        match self.upload_parts(job, &upload_id) {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload(self.bucket, &job.key, &upload_id, parts)
            }
            Err(err) => {
                if let Err(abort_err) =
                    self.client
                        .abort_multipart_upload(self.bucket, &job.key, &upload_id)
                {
                    warn!(error_message=%abort_err, error_group="abort_multipart_upload", key=%job.key);
                }
                Err(err)
            }
        }
    }

    fn upload_parts(
        &self,
        job: &TransferJob,
        upload_id: &str,
    ) -> Result<Vec<crate::model::object::UploadedPart>> {
        let mut file = File::open(&job.path).map_err(|err| Error::io(&job.path, err))?;
        let mut parts = Vec::new();
        let mut part_number = 1;

        loop {
            let mut chunk = Vec::with_capacity(self.part_size);
            file.by_ref()
                .take(self.part_size as u64)
                .read_to_end(&mut chunk)
                .map_err(|err| Error::io(&job.path, err))?;

            if chunk.is_empty() && part_number > 1 {
                break;
            }

            let last = chunk.len() < self.part_size;
            parts.push(self.client.upload_part(
                self.bucket,
                &job.key,
                upload_id,
                part_number,
                chunk,
            )?);
            part_number += 1;

            if last {
                break;
            }
        }

        Ok(parts)
    }
}
