//! Bounded, thread-safe FIFO retention of timestamped samples.

use std::collections::VecDeque;

use parking_lot::Mutex;
use vitals_types::{Sample, SampleError, SampleResult, UtcTime};

type Validator<T> = Box<dyn Fn(&T, UtcTime) -> SampleResult<()> + Send + Sync>;

/// Fixed-capacity FIFO buffer of `Sample<T>` with validated inserts.
///
/// A single mutex guards the underlying deque; critical sections are O(1)
/// and no caller-supplied code (the validator included) runs while the
/// lock is held.
pub struct BoundedHistory<T> {
    capacity: usize,
    validator: Option<Validator<T>>,
    entries: Mutex<VecDeque<Sample<T>>>,
}

impl<T: Clone> BoundedHistory<T> {
    /// Create a history retaining the most recent `capacity` samples.
    ///
    /// A capacity of zero is rejected.
    pub fn new(capacity: usize) -> SampleResult<Self> {
        if capacity == 0 {
            return Err(SampleError::Validation(
                "history capacity must be >= 1".into(),
            ));
        }
        Ok(Self {
            capacity,
            validator: None,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        })
    }

    /// Like [`BoundedHistory::new`], with a validator applied to every
    /// insert. The validator must not depend on buffer state; it runs
    /// before the lock is taken.
    pub fn with_validator(
        capacity: usize,
        validator: impl Fn(&T, UtcTime) -> SampleResult<()> + Send + Sync + 'static,
    ) -> SampleResult<Self> {
        let mut history = Self::new(capacity)?;
        history.validator = Some(Box::new(validator));
        Ok(history)
    }

    /// Append a sample, evicting the oldest entry when full.
    ///
    /// A rejected value leaves the buffer untouched.
    pub fn push(&self, value: T, captured_at: UtcTime) -> SampleResult<()> {
        if let Some(validator) = &self.validator {
            validator(&value, captured_at)?;
        }
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(Sample::new(value, captured_at));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The most recently inserted sample, if any.
    pub fn latest(&self) -> Option<Sample<T>> {
        self.entries.lock().back().cloned()
    }

    /// Copy of the retained samples, oldest first.
    pub fn snapshot(&self) -> Vec<Sample<T>> {
        self.entries.lock().iter().cloned().collect()
    }
}

impl<T> std::fmt::Debug for BoundedHistory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedHistory")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            BoundedHistory::<u64>::new(0),
            Err(SampleError::Validation(_))
        ));
    }

    #[test]
    fn test_len_tracks_min_of_inserts_and_capacity() {
        let history = BoundedHistory::new(3).unwrap();
        assert!(history.is_empty());
        for i in 0..10u64 {
            history.push(i, UtcTime::now()).unwrap();
            assert_eq!(history.len(), std::cmp::min(i as usize + 1, 3));
        }
        assert_eq!(history.capacity(), 3);
    }

    #[test]
    fn test_fifo_eviction() {
        let history = BoundedHistory::new(4).unwrap();
        for i in 0..5u64 {
            history.push(i, UtcTime::now()).unwrap();
        }
        // Inserting capacity+1 values evicts exactly the first one.
        let values: Vec<u64> = history.snapshot().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1, 2, 3, 4]);
        assert_eq!(history.latest().unwrap().value, 4);
    }

    #[test]
    fn test_snapshot_keeps_last_capacity_in_order() {
        let history = BoundedHistory::new(5).unwrap();
        for i in 0..20u64 {
            history.push(i, UtcTime::now()).unwrap();
        }
        let values: Vec<u64> = history.snapshot().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![15, 16, 17, 18, 19]);
    }

    #[test]
    fn test_invalid_insert_leaves_state_unchanged() {
        let history = BoundedHistory::with_validator(3, |load: &f64, at| {
            if *load < 0.0 {
                return Err(SampleError::Validation("negative load average".into()));
            }
            if at.is_future() {
                return Err(SampleError::Validation("timestamp in the future".into()));
            }
            Ok(())
        })
        .unwrap();

        history.push(0.5, UtcTime::now()).unwrap();
        assert_eq!(history.len(), 1);

        let err = history.push(-1.0, UtcTime::now()).unwrap_err();
        assert!(matches!(err, SampleError::Validation(_)));
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().value, 0.5);

        let future = UtcTime::from_chrono(
            *UtcTime::now().as_chrono() + chrono::Duration::seconds(60),
        );
        assert!(history.push(0.7, future).is_err());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_concurrent_pushes_respect_capacity() {
        let history = Arc::new(BoundedHistory::new(16).unwrap());
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let history = history.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100u64 {
                    history.push(t * 1000 + i, UtcTime::now()).unwrap();
                    // Readers may interleave with writers at any point.
                    let _ = history.snapshot();
                    let _ = history.len();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(history.len(), 16);
    }
}
