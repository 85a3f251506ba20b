use std::path::{Path, PathBuf};

const S3_SCHEME: &str = "s3://";

/// Either side of a `cp`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote { bucket: String, key: String },
}

impl Location {
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote { .. })
    }

    /// Appends a `/`-separated relative path.
    pub fn join(&self, relative: &str) -> Location {
        match self {
            Location::Local(path) => Location::Local(
                relative
                    .split('/')
                    .filter(|c| !c.is_empty())
                    .fold(path.clone(), |acc, c| acc.join(c)),
            ),
            Location::Remote { bucket, key } => Location::Remote {
                bucket: bucket.clone(),
                key: join_key(&[key.as_str(), relative]),
            },
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote { bucket, key } => write!(f, "{}{}/{}", S3_SCHEME, bucket, key),
        }
    }
}

pub fn parse_location(uri: &str) -> Location {
    match uri.strip_prefix(S3_SCHEME) {
        Some(rest) => {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            Location::Remote {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
        }
        None => Location::Local(PathBuf::from(uri)),
    }
}

/// The configured bucket identifier, `name[/sub/path]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketSpec {
    pub name: String,
    /// Sub-path with a trailing slash, or empty.
    pub root: String,
}

pub fn parse_bucket_spec(spec: &str) -> BucketSpec {
    match spec.split_once('/') {
        Some((name, rest)) if !name.is_empty() => {
            let rest = rest.trim_matches('/');
            BucketSpec {
                name: name.to_string(),
                root: if rest.is_empty() {
                    String::new()
                } else {
                    trailing_slash(rest)
                },
            }
        }
        _ => BucketSpec {
            name: spec.trim_matches('/').to_string(),
            root: String::new(),
        },
    }
}

/// Ensures exactly one trailing `/`.
pub fn trailing_slash(path: &str) -> String {
    format!("{}/", path.trim_end_matches(['/', '\\']))
}

/// Joins key segments with `/`, skipping empty ones.
pub fn join_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// `path` relative to `root`, with `/` separators.
pub fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
