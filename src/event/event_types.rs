//! Tracked items, change events and the watcher's last-known state

use std::collections::BTreeMap;

/// One externally tracked unit (a conversation/task). Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub label: String,
    pub status: String,
}

impl Item {
    pub fn new(id: impl Into<String>, label: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            status: status.into(),
        }
    }
}

/// A change detected between two observations.
///
/// Produced once per diff cycle and consumed immediately by the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created {
        item: Item,
    },
    Updated {
        item: Item,
        old_status: String,
        new_status: String,
    },
    Removed {
        id: String,
    },
}

impl ChangeEvent {
    /// Id of the item this event refers to
    pub fn item_id(&self) -> &str {
        match self {
            ChangeEvent::Created { item } | ChangeEvent::Updated { item, .. } => &item.id,
            ChangeEvent::Removed { id } => id,
        }
    }

    /// Short kind name, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Created { .. } => "created",
            ChangeEvent::Updated { .. } => "updated",
            ChangeEvent::Removed { .. } => "removed",
        }
    }
}

/// Last-known status per item id.
///
/// Owned by a single watcher and replaced wholesale after every diff, so after each
/// cycle it holds exactly the ids of the latest snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherState {
    statuses: BTreeMap<String, String>,
}

impl WatcherState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.statuses.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.statuses.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.statuses.keys().map(String::as_str)
    }

    pub(crate) fn insert(&mut self, id: String, status: String) {
        self.statuses.insert(id, status);
    }
}

impl<K, V> FromIterator<(K, V)> for WatcherState
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            statuses: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
