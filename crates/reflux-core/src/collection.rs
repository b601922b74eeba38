//! ObservableList<T> - an ordered list that reports its own mutations
//!
//! Each mutation emits exactly one [`CollectionChange`] describing the items
//! it removed and added. Mutations that change nothing emit nothing.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::PropertyError;
use crate::observable::subject::EventSubject;
use crate::observable::Observable;

/// Kind of mutation a [`CollectionChange`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionAction {
    Add,
    Remove,
    Replace,
    Reset,
}

/// One mutation of an [`ObservableList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChange<T> {
    pub action: CollectionAction,
    /// Position of the first affected item, when the mutation has one
    pub index: Option<usize>,
    pub removed: Vec<T>,
    pub added: Vec<T>,
}

impl<T> CollectionChange<T> {
    fn added(index: usize, added: Vec<T>) -> Self {
        Self {
            action: CollectionAction::Add,
            index: Some(index),
            removed: Vec::new(),
            added,
        }
    }

    fn removed(index: usize, item: T) -> Self {
        Self {
            action: CollectionAction::Remove,
            index: Some(index),
            removed: vec![item],
            added: Vec::new(),
        }
    }
}

struct ListInner<T> {
    items: RwLock<Vec<T>>,
    changes: EventSubject<CollectionChange<T>>,
}

/// Ordered, shared, observable list. Clones share state.
pub struct ObservableList<T> {
    inner: Arc<ListInner<T>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ObservableList<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(ListInner {
                items: RwLock::new(items),
                changes: EventSubject::new(),
            }),
        }
    }

    /// Apply `mutate` and emit its change, holding the delivery gate so that
    /// changes are observed in mutation order.
    fn mutate<R>(
        &self,
        mutate: impl FnOnce(&mut Vec<T>) -> Result<(Option<CollectionChange<T>>, R), PropertyError>,
    ) -> Result<R, PropertyError> {
        let _gate = self.inner.changes.gate();
        let (change, result) = {
            let mut items = self.inner.items.write();
            mutate(&mut items)?
        };
        if let Some(change) = change {
            self.inner.changes.emit(&change);
        }
        Ok(result)
    }

    pub fn push(&self, item: T) {
        let _ = self.mutate(|items| {
            let index = items.len();
            items.push(item.clone());
            Ok((Some(CollectionChange::added(index, vec![item])), ()))
        });
    }

    pub fn insert(&self, index: usize, item: T) -> Result<(), PropertyError> {
        self.mutate(|items| {
            if index > items.len() {
                return Err(out_of_range("insert", index, items.len()));
            }
            items.insert(index, item.clone());
            Ok((Some(CollectionChange::added(index, vec![item])), ()))
        })
    }

    /// Append every item as one change. An empty batch emits nothing.
    pub fn extend(&self, new_items: impl IntoIterator<Item = T>) {
        let new_items: Vec<T> = new_items.into_iter().collect();
        let _ = self.mutate(|items| {
            if new_items.is_empty() {
                return Ok((None, ()));
            }
            let index = items.len();
            items.extend(new_items.iter().cloned());
            Ok((Some(CollectionChange::added(index, new_items)), ()))
        });
    }

    pub fn remove_at(&self, index: usize) -> Result<T, PropertyError> {
        self.mutate(|items| {
            if index >= items.len() {
                return Err(out_of_range("remove_at", index, items.len()));
            }
            let item = items.remove(index);
            Ok((Some(CollectionChange::removed(index, item.clone())), item))
        })
    }

    /// Remove the first item equal to `item`. Returns whether one was found.
    pub fn remove(&self, item: &T) -> bool {
        self.mutate(|items| match items.iter().position(|candidate| candidate == item) {
            Some(index) => {
                let removed = items.remove(index);
                Ok((Some(CollectionChange::removed(index, removed)), true))
            }
            None => Ok((None, false)),
        })
        .unwrap_or(false)
    }

    /// Replace the item at `index`, returning the previous one. Replacing an
    /// item with an equal one emits nothing.
    pub fn replace(&self, index: usize, item: T) -> Result<T, PropertyError> {
        self.mutate(|items| {
            let Some(slot) = items.get_mut(index) else {
                return Err(out_of_range("replace", index, items.len()));
            };
            if *slot == item {
                return Ok((None, item));
            }
            let previous = std::mem::replace(slot, item.clone());
            let change = CollectionChange {
                action: CollectionAction::Replace,
                index: Some(index),
                removed: vec![previous.clone()],
                added: vec![item],
            };
            Ok((Some(change), previous))
        })
    }

    /// Remove everything. Clearing an empty list emits nothing.
    pub fn clear(&self) {
        let _ = self.mutate(|items| {
            if items.is_empty() {
                return Ok((None, ()));
            }
            let removed = std::mem::take(items);
            let change = CollectionChange {
                action: CollectionAction::Reset,
                index: None,
                removed,
                added: Vec::new(),
            };
            Ok((Some(change), ()))
        });
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.read().is_empty()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.inner.items.read().clone()
    }

    /// Mutations from now on. There is no replay.
    pub fn on_collection_changed(&self) -> Observable<CollectionChange<T>> {
        self.inner.changes.observe()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.read().iter()).finish()
    }
}

fn out_of_range(operation: &str, index: usize, len: usize) -> PropertyError {
    PropertyError::invalid_operation(format!(
        "{operation}: index {index} out of range for length {len}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn watch(list: &ObservableList<&'static str>) -> (Arc<Mutex<Vec<CollectionChange<&'static str>>>>, crate::Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = list
            .on_collection_changed()
            .subscribe(move |change| sink.lock().push(change.clone()));
        (seen, sub)
    }

    #[test]
    fn test_each_mutation_emits_one_change() {
        let list = ObservableList::new();
        let (seen, _sub) = watch(&list);

        list.push("a");
        list.insert(0, "b").unwrap();
        list.replace(1, "c").unwrap();
        assert_eq!(list.remove_at(0).unwrap(), "b");

        let seen = seen.lock();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], CollectionChange::added(0, vec!["a"]));
        assert_eq!(seen[1].index, Some(0));
        assert_eq!(seen[2].removed, vec!["a"]);
        assert_eq!(seen[2].added, vec!["c"]);
        assert_eq!(seen[3], CollectionChange::removed(0, "b"));
        assert_eq!(list.snapshot(), vec!["c"]);
    }

    #[test]
    fn test_no_ops_do_not_emit() {
        let list = ObservableList::from_vec(vec!["x"]);
        let (seen, _sub) = watch(&list);

        list.extend(Vec::new());
        assert!(!list.remove(&"missing"));
        list.replace(0, "x").unwrap();
        list.clear();
        list.clear();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].action, CollectionAction::Reset);
        assert_eq!(seen[0].removed, vec!["x"]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_out_of_range_is_a_contract_violation() {
        let list: ObservableList<&'static str> = ObservableList::new();
        let (seen, _sub) = watch(&list);
        assert!(matches!(list.insert(1, "a"), Err(PropertyError::InvalidOperation { .. })));
        assert!(list.remove_at(0).is_err());
        assert!(list.replace(0, "a").is_err());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_extend_is_a_single_change() {
        let list = ObservableList::from_vec(vec!["a"]);
        let (seen, _sub) = watch(&list);
        list.extend(["b", "c"]);
        assert_eq!(*seen.lock(), vec![CollectionChange::added(1, vec!["b", "c"])]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(2), Some("c"));
    }
}
