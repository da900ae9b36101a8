use parking_lot::Mutex;
use std::sync::Arc;

/// Single-slot holder for the most recently fetched template.
///
/// The poller overwrites the slot on every successful fetch; readers get the
/// latest completed store. A failed fetch never touches the slot, so the cache
/// is either empty or holds the most recent template the node actually
/// returned.
pub struct TemplateCache<T> {
    slot: Arc<Mutex<Option<Arc<T>>>>,
}

impl<T> TemplateCache<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Unconditional overwrite, last writer wins.
    pub fn store(&self, template: Arc<T>) {
        *self.slot.lock() = Some(template);
    }

    pub fn load(&self) -> Option<Arc<T>> {
        self.slot.lock().clone()
    }
}

impl<T> Clone for TemplateCache<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Default for TemplateCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_returns_last_store() {
        let cache = TemplateCache::new();
        assert!(cache.load().is_none());

        cache.store(Arc::new(1u64));
        assert_eq!(cache.load().as_deref(), Some(&1));

        cache.store(Arc::new(2u64));
        assert_eq!(cache.load().as_deref(), Some(&2));
    }

    #[test]
    fn clones_share_the_slot() {
        let writer = TemplateCache::new();
        let reader = writer.clone();

        writer.store(Arc::new("template".to_string()));
        assert_eq!(reader.load().as_deref().map(String::as_str), Some("template"));
    }

    #[test]
    fn concurrent_stores_leave_one_of_the_stored_values() {
        let cache = TemplateCache::new();
        let handles: Vec<_> = (0..8u64)
            .map(|value| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        cache.store(Arc::new(value));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let last = cache.load().expect("cache must hold a value after stores");
        assert!(*last < 8);
    }
}
