use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Callback<T>)>,
}

/// Ordered list of callbacks. Notification runs on the caller's thread, in
/// subscription order, against a snapshot taken before the first call, so a
/// callback may subscribe or unsubscribe without deadlocking.
pub struct Observers<T> {
    registry: Mutex<Registry<T>>,
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.entries.push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let before = registry.entries.len();
        registry.entries.retain(|(entry_id, _)| *entry_id != id);
        registry.entries.len() != before
    }

    pub fn notify(&self, value: &T) -> usize {
        let snapshot: Vec<Callback<T>> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in &snapshot {
            callback(value);
        }

        snapshot.len()
    }
}
