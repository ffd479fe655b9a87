use std::collections::VecDeque;
use std::sync::Mutex;

use rand::Rng;

use crate::services::selection::fisher_yates_shuffle;

/// Bounded, shared history of recently selected question identifiers used
/// by formal selection. The buffer is only reachable through
/// [`RecencyBuffer::select`], which performs "read pool minus buffer,
/// select, append" as one critical section; identifiers are deduplicated by
/// recency and the oldest entries are evicted once the capacity is
/// exceeded.
pub struct RecencyBuffer {
    capacity: usize,
    inner: Mutex<VecDeque<String>>,
}

impl RecencyBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, inner: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    /// Select up to `count` items from `pool`, preferring ones not present
    /// in the buffer. When fewer than `count` fresh items exist the whole
    /// pool is considered instead. The selection is shuffled before
    /// truncation and the chosen identifiers are appended to the buffer.
    pub fn select<T, R, F>(&self, pool: Vec<T>, count: usize, rng: &mut R, id_of: F) -> Vec<T>
    where
        R: Rng + ?Sized,
        F: Fn(&T) -> &str,
    {
        let mut recent = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let (mut fresh, seen): (Vec<T>, Vec<T>) =
            pool.into_iter().partition(|item| !recent.iter().any(|id| id == id_of(item)));

        let chosen = if fresh.len() >= count {
            fisher_yates_shuffle(&mut fresh, rng);
            fresh.truncate(count);
            fresh
        } else {
            // Cooldown would starve the pool; fall back to everything.
            fresh.extend(seen);
            fisher_yates_shuffle(&mut fresh, rng);
            fresh.truncate(count);
            fresh
        };

        for item in &chosen {
            let id = id_of(item);
            if let Some(position) = recent.iter().position(|existing| existing == id) {
                recent.remove(position);
            }
            recent.push_back(id.to_string());
        }
        while recent.len() > self.capacity {
            recent.pop_front();
        }

        chosen
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the buffered identifiers, oldest first.
    pub fn recent_ids(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}
