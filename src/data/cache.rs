use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Memoized indicator columns keyed by name, e.g. `ema_21`
pub struct IndicatorCache {
    data: Mutex<HashMap<String, Arc<Vec<f64>>>>,
    capacity: usize,
}

impl IndicatorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Mutex::new(HashMap::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<f64>>> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.get(key).cloned()
    }

    pub fn set(&self, key: String, value: Arc<Vec<f64>>) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        if data.len() >= self.capacity && !data.contains_key(&key) {
            // A simple eviction strategy: clear the cache when full.
            data.clear();
        }
        data.insert(key, value);
    }

    /// Cached value for `key`, computing and storing it on a miss.
    ///
    /// The lock is not held while `compute` runs, so two threads may both
    /// compute the same column; the results are identical.
    pub fn get_or_try_insert<E, F>(&self, key: &str, compute: F) -> Result<Arc<Vec<f64>>, E>
    where
        F: FnOnce() -> Result<Vec<f64>, E>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let value = Arc::new(compute()?);
        self.set(key.to_string(), Arc::clone(&value));
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for IndicatorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorCache")
            .field("entries", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
