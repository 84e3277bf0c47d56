use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// A lockless single-value slot for handing a result from one thread to
/// another, e.g. from a driver callback to the caller blocked on completion.
///
/// Only the latest value is retained; sending overwrites any previous value.
#[derive(Debug)]
pub struct Slot<T> {
    value: ArcSwapOption<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self {
            value: ArcSwapOption::empty(),
        }
    }

    /// Stores a value, replacing any existing value.
    pub fn send(&self, val: T) {
        self.value.store(Some(Arc::new(val)));
    }

    /// Takes the value if present, leaving the slot empty.
    pub fn take(&self) -> Option<Arc<T>> {
        self.value.swap(None)
    }

    /// Takes the value by ownership, cloning only if another holder remains.
    pub fn take_owned(&self) -> Option<T>
    where
        T: Clone,
    {
        self.take()
            .map(|arc| Arc::try_unwrap(arc).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Returns true if there is a value present.
    pub fn has_value(&self) -> bool {
        self.value.load().is_some()
    }
}
