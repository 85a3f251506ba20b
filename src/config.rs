use crate::{
    model::{
        error::{Error, Result},
        object::ObjectAcl,
    },
    util::object::{parse_bucket_spec, BucketSpec},
};

pub const BUCKET: &str = "R2_UPLOADS_BUCKET";
pub const KEY: &str = "R2_UPLOADS_KEY";
pub const SECRET: &str = "R2_UPLOADS_SECRET";
pub const OBJECT_ACL: &str = "R2_UPLOADS_OBJECT_ACL";
pub const ENDPOINT: &str = "R2_UPLOADS_ENDPOINT";
pub const REGION: &str = "R2_UPLOADS_REGION";

const DEFAULT_REGION: &str = "auto";

/// Connection settings for the bucket commands.
#[derive(Clone, Debug)]
pub struct Config {
    pub bucket: BucketSpec,
    pub access_key: String,
    pub secret_key: String,
    pub object_acl: ObjectAcl,
    pub endpoint: Option<String>,
    pub region: String,
}

/// Process environment lookup for [`Config::from_lookup`].
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl Config {
    /// Reads settings through `lookup`; empty values count as undefined.
    /// Every missing required item is collected before failing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut require = |name: &'static str| {
            let value = get(name);
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        };

        let bucket = require(BUCKET);
        let access_key = require(KEY);
        let secret_key = require(SECRET);

        if !missing.is_empty() {
            return Err(Error::MissingConfig(missing));
        }

        let object_acl = match get(OBJECT_ACL) {
            Some(acl) => acl.parse()?,
            None => ObjectAcl::default(),
        };

        Ok(Config {
            bucket: parse_bucket_spec(&bucket),
            access_key,
            secret_key,
            object_acl,
            endpoint: get(ENDPOINT),
            region: get(REGION).unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_complete_config() {
        let config = Config::from_lookup(lookup(&[
            (BUCKET, "media/site-1"),
            (KEY, "key"),
            (SECRET, "secret"),
            (ENDPOINT, "https://account.r2.cloudflarestorage.com"),
        ]))
        .unwrap();

        assert_eq!(config.bucket.name, "media");
        assert_eq!(config.bucket.root, "site-1/");
        assert_eq!(config.object_acl, ObjectAcl::PublicRead);
        assert_eq!(config.region, "auto");
        assert_eq!(
            config.endpoint.as_deref(),
            Some("https://account.r2.cloudflarestorage.com")
        );
    }

    #[test]
    fn test_missing_items_reported_individually() {
        let cases = vec![
            (vec![], vec![BUCKET, KEY, SECRET]),
            (vec![(BUCKET, "media")], vec![KEY, SECRET]),
            (vec![(BUCKET, "media"), (KEY, "k"), (SECRET, " ")], vec![SECRET]),
        ];

        for (vars, expected) in cases {
            match Config::from_lookup(lookup(&vars)) {
                Err(Error::MissingConfig(missing)) => {
                    assert_eq!(missing, expected, "failed for case: {:?}", vars)
                }
                other => panic!("expected missing config for case {:?}, got {:?}", vars, other),
            }
        }
    }

    #[test]
    fn test_object_acl_override() {
        let base = [(BUCKET, "media"), (KEY, "k"), (SECRET, "s")];

        let mut vars = base.to_vec();
        vars.push((OBJECT_ACL, "private"));
        assert_eq!(
            Config::from_lookup(lookup(&vars)).unwrap().object_acl,
            ObjectAcl::Private
        );

        let mut vars = base.to_vec();
        vars.push((OBJECT_ACL, "world-writable"));
        assert!(matches!(
            Config::from_lookup(lookup(&vars)),
            Err(Error::InvalidAcl(_))
        ));
    }
}
