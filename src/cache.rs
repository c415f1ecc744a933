use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CachedPage {
    body: String,
    stored_at: Instant,
}

/// Rendered-page cache for the index route, keyed by page number. Entries
/// expire after the configured TTL; writes do NOT invalidate — a freshly
/// created post may be missing from `/` until the window passes or
/// `clear` is called.
pub struct PageCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedPage>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> PageCache {
        PageCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(cached) if cached.stored_at.elapsed() < self.ttl => {
                Some(cached.body.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, body: String) {
        self.lock().insert(
            key.to_string(),
            CachedPage {
                body,
                stored_at: Instant::now(),
            },
        );
    }

    /// The only invalidation path.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedPage>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
