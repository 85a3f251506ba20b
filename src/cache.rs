use std::time::{Duration, Instant};

use moka::{sync::Cache, Expiry};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;

/// Namespace carried by every physical key written through `MetadataCache`.
pub const PREFIX: &str = "offload_s3/";

pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// An expiring key/value store. Reads of expired entries return `None`.
pub trait TransientStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value, ttl: Duration);

    fn delete(&self, key: &str);
}

#[derive(Clone)]
struct Entry {
    value: Value,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process store backed by moka with per-entry expiry.
pub struct MokaStore {
    entries: Cache<String, Entry>,
}

impl MokaStore {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }
}

impl Default for MokaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransientStore for MokaStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value)
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.entries.insert(key.to_string(), Entry { value, ttl });
    }

    fn delete(&self, key: &str) {
        self.entries.invalidate(key);
    }
}

/// Namespaced pass-through to a `TransientStore`.
pub struct MetadataCache<S> {
    store: S,
}

impl<S: TransientStore> MetadataCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Absent, expired and undecodable entries all read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.store.get(&physical_key(key))?;
        serde_json::from_value(value).ok()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, DEFAULT_TTL);
    }

    pub fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(value) => self.store.set(&physical_key(key), value, ttl),
            Err(err) => {
                warn!(error_message=%err, error_group="cache_serialize", key=key);
            }
        }
    }

    pub fn remove(&self, key: &str) {
        self.store.delete(&physical_key(key));
    }
}

pub fn physical_key(key: &str) -> String {
    format!("{}{}", PREFIX, sanitize(key))
}

/// Reduces a logical key to lowercase `[a-z0-9_-]`, with separators turned
/// into single dashes.
pub fn sanitize(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars().flat_map(char::to_lowercase) {
        let c = match c {
            '.' | '/' | ':' => '-',
            c if c.is_whitespace() => '-',
            c => c,
        };

        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') {
            continue;
        }
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex, thread};

    use serde::Deserialize;

    use super::*;

    #[derive(Default)]
    struct RecordingStore {
        entries: Mutex<HashMap<String, (Value, Duration)>>,
    }

    impl TransientStore for RecordingStore {
        fn get(&self, key: &str) -> Option<Value> {
            self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone())
        }

        fn set(&self, key: &str, value: Value, ttl: Duration) {
            self.entries.lock().unwrap().insert(key.to_string(), (value, ttl));
        }

        fn delete(&self, key: &str) {
            self.entries.lock().unwrap().remove(key);
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Endpoint {
        host: String,
        port: u16,
    }

    #[test]
    fn test_sanitize() {
        let cases = vec![
            ("aws_cached_endpoint", "aws_cached_endpoint"),
            ("Bucket Region", "bucket-region"),
            ("head/media/2024/a.JPG", "head-media-2024-a-jpg"),
            ("--a//b--", "a-b"),
            ("ümlaut?&key", "mlautkey"),
            ("", ""),
        ];

        for (input, expected) in cases {
            assert_eq!(sanitize(input), expected, "failed for case: {}", input);
        }
    }

    #[test]
    fn test_set_then_get() {
        let cache = MetadataCache::new(MokaStore::new());
        let endpoint = Endpoint {
            host: "example.r2.cloudflarestorage.com".to_string(),
            port: 443,
        };

        cache.set("endpoint", &endpoint);
        assert_eq!(cache.get::<Endpoint>("endpoint"), Some(endpoint));

        cache.set("endpoint", &Endpoint { host: "other".to_string(), port: 80 });
        assert_eq!(cache.get::<Endpoint>("endpoint").unwrap().port, 80);
    }

    #[test]
    fn test_remove() {
        let cache = MetadataCache::new(MokaStore::new());

        cache.set("region", &"auto");
        cache.remove("region");
        assert_eq!(cache.get::<String>("region"), None);

        cache.remove("never-set");
        assert_eq!(cache.get::<String>("never-set"), None);
    }

    #[test]
    fn test_missing_and_mismatched() {
        let cache = MetadataCache::new(MokaStore::new());

        assert_eq!(cache.get::<String>("missing"), None);

        cache.set("count", &3);
        assert_eq!(cache.get::<Endpoint>("count"), None);
    }

    #[test]
    fn test_keys_are_namespaced() {
        let cache = MetadataCache::new(RecordingStore::default());

        cache.set("Bucket Region", &"auto");

        let entries = cache.store.entries.lock().unwrap();
        let (value, ttl) = entries.get("offload_s3/bucket-region").unwrap();
        assert_eq!(value, &Value::String("auto".to_string()));
        assert_eq!(*ttl, DEFAULT_TTL);
        assert!(entries.keys().all(|k| k.starts_with(PREFIX)));
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let cache = MetadataCache::new(MokaStore::new());

        cache.set_with_ttl("short", &"lived", Duration::from_millis(50));
        cache.set("long", &"lived");
        thread::sleep(Duration::from_millis(200));

        assert_eq!(cache.get::<String>("short"), None);
        assert_eq!(cache.get::<String>("long"), Some("lived".to_string()));
    }
}
