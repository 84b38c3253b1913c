//! Snapshot diffing
//!
//! Pure function from (previous state, current snapshot) to (events, next state).
//! No I/O and no hidden state: the caller owns the state and replaces it with the
//! returned one.

use crate::event::{ChangeEvent, Item, WatcherState};
use std::collections::HashSet;

/// Compare a snapshot against the previously observed state.
///
/// Events come out as every `Created`/`Updated` in snapshot order, then every
/// `Removed` in ascending id order. The returned state maps each id of `current` to
/// its status in `current`.
///
/// If an id appears more than once in `current`, only its first occurrence counts.
pub fn diff(previous: &WatcherState, current: &[Item]) -> (Vec<ChangeEvent>, WatcherState) {
    let mut events = Vec::new();
    let mut next = WatcherState::new();
    let mut seen: HashSet<&str> = HashSet::with_capacity(current.len());

    for item in current {
        if !seen.insert(item.id.as_str()) {
            continue;
        }

        match previous.get(&item.id) {
            None => events.push(ChangeEvent::Created { item: item.clone() }),
            Some(old) if old != item.status => events.push(ChangeEvent::Updated {
                item: item.clone(),
                old_status: old.to_string(),
                new_status: item.status.clone(),
            }),
            Some(_) => {}
        }

        next.insert(item.id.clone(), item.status.clone());
    }

    // `ids()` is sorted, which keeps removal order deterministic.
    events.extend(
        previous
            .ids()
            .filter(|id| !seen.contains(*id))
            .map(|id| ChangeEvent::Removed { id: id.to_string() }),
    );

    (events, next)
}
