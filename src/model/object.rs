use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::model::error::Error;

/// Canned access-control designation applied to created objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectAcl {
    #[default]
    #[serde(rename = "public-read")]
    PublicRead,
    #[serde(rename = "private")]
    Private,
}

impl ObjectAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectAcl::PublicRead => "public-read",
            ObjectAcl::Private => "private",
        }
    }
}

impl FromStr for ObjectAcl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public-read" => Ok(ObjectAcl::PublicRead),
            "private" => Ok(ObjectAcl::Private),
            other => Err(Error::InvalidAcl(other.to_string())),
        }
    }
}

impl fmt::Display for ObjectAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of a bucket listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketObject {
    pub key: String,
    pub size: i64,
}

/// Result of a HEAD lookup, cached by `adapters::cached::CachedClient`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub key: String,
    pub size: i64,
    pub e_tag: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i32,
    pub e_tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_acl() {
        assert_eq!("public-read".parse::<ObjectAcl>().unwrap(), ObjectAcl::PublicRead);
        assert_eq!("private".parse::<ObjectAcl>().unwrap(), ObjectAcl::Private);
        assert!(matches!(
            "authenticated-read".parse::<ObjectAcl>(),
            Err(Error::InvalidAcl(_))
        ));
        assert_eq!(ObjectAcl::default().to_string(), "public-read");
    }
}
