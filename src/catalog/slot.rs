//! Two-state cache slot for whole-map snapshots.

use std::sync::{Arc, PoisonError, RwLock};

use crate::Result;

#[derive(Debug)]
enum SlotState<T> {
    Unset,
    Populated(Arc<T>),
}

/// A snapshot that is either Unset or Populated.
///
/// Populated only by the first [`get_or_fetch`](Self::get_or_fetch) after
/// creation or [`clear`](Self::clear); never refreshed otherwise. The lock
/// is never held across `fetch`, so racing first readers may each fetch;
/// the first to store its result wins and the others adopt it.
#[derive(Debug)]
pub(crate) struct CacheSlot<T> {
    state: RwLock<SlotState<T>>,
}

impl<T> CacheSlot<T> {
    pub(crate) const fn new() -> Self {
        Self {
            state: RwLock::new(SlotState::Unset),
        }
    }

    pub(crate) fn get(&self) -> Option<Arc<T>> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            SlotState::Unset => None,
            SlotState::Populated(value) => Some(Arc::clone(value)),
        }
    }

    pub(crate) fn get_or_fetch(&self, fetch: impl FnOnce() -> Result<T>) -> Result<Arc<T>> {
        if let Some(value) = self.get() {
            return Ok(value);
        }
        let fetched = Arc::new(fetch()?);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            SlotState::Populated(existing) => Ok(Arc::clone(existing)),
            SlotState::Unset => {
                *state = SlotState::Populated(Arc::clone(&fetched));
                Ok(fetched)
            }
        }
    }

    pub(crate) fn clear(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = SlotState::Unset;
    }

    pub(crate) fn is_populated(&self) -> bool {
        self.get().is_some()
    }
}

impl<T> Default for CacheSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::cell::Cell;

    #[test]
    fn test_fetches_once_until_cleared() {
        let slot = CacheSlot::new();
        let fetches = Cell::new(0);
        let fetch = || {
            fetches.set(fetches.get() + 1);
            Ok(fetches.get())
        };

        assert!(!slot.is_populated());
        assert_eq!(*slot.get_or_fetch(fetch).unwrap(), 1);
        assert_eq!(*slot.get_or_fetch(fetch).unwrap(), 1);
        assert_eq!(fetches.get(), 1);

        slot.clear();
        assert!(!slot.is_populated());
        assert_eq!(*slot.get_or_fetch(fetch).unwrap(), 2);
    }

    #[test]
    fn test_late_fetch_keeps_populated_value() {
        let slot = CacheSlot::new();

        // the slot fills while this fetch is still talking to the store
        let value = slot
            .get_or_fetch(|| {
                slot.get_or_fetch(|| Ok("newer")).unwrap();
                Ok("older")
            })
            .unwrap();

        assert_eq!(*value, "newer");
        assert_eq!(*slot.get().unwrap(), "newer");
    }

    #[test]
    fn test_failed_fetch_leaves_slot_unset() {
        let slot: CacheSlot<u32> = CacheSlot::new();

        let err = slot
            .get_or_fetch(|| Err(Error::Store("down".to_string())))
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(slot.get().is_none());

        assert_eq!(*slot.get_or_fetch(|| Ok(7)).unwrap(), 7);
    }
}
