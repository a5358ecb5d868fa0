//! Snapshot/restore support for optimistic cache mutations.
//!
//! A mutation captures the item's exact prior value and position before
//! touching the cache; if the backend rejects the mutation the snapshot is
//! restored verbatim. Restoring the captured value (rather than negating the
//! change again) keeps rapid double-toggles correct.

/// Captured prior state of one cached item
#[derive(Debug, Clone)]
pub struct ItemSnapshot<T> {
    pub index: usize,
    pub value: T,
}

/// Captures the first item matching `pred` together with its position.
pub fn capture<T: Clone>(items: &[T], pred: impl Fn(&T) -> bool) -> Option<ItemSnapshot<T>> {
    items
        .iter()
        .position(pred)
        .map(|index| ItemSnapshot {
            index,
            value: items[index].clone(),
        })
}

/// Puts a snapshot back into the cache.
///
/// If an item matching `same` is still present it is overwritten in place;
/// otherwise the snapshot is re-inserted at its original position (clamped
/// to the current length, since neighbors may have been removed meanwhile).
pub fn restore<T>(items: &mut Vec<T>, snapshot: ItemSnapshot<T>, same: impl Fn(&T) -> bool) {
    if let Some(index) = items.iter().position(same) {
        items[index] = snapshot.value;
    } else {
        let index = snapshot.index.min(items.len());
        items.insert(index, snapshot.value);
    }
}
