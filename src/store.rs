//! Flat id-keyed collections with a narrow mutation contract.
//!
//! Every per-user collection is an [`EntityStore`]. Call sites go through
//! `create`, `update(id, patch)`, `soft_delete`, `restore` and `purge` instead
//! of rewriting whole collections. Operations on an unknown id are no-ops that
//! report `false`/`None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub trait Entity {
    fn id(&self) -> &str;
}

/// Records that move to the trash instead of being removed
pub trait SoftDelete: Entity {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>);

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityStore<T> {
    records: Vec<T>,
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T> From<Vec<T>> for EntityStore<T> {
    fn from(records: Vec<T>) -> Self {
        Self { records }
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Insert a new record and return its id
    pub fn create(&mut self, record: T) -> String {
        let id = record.id().to_string();
        log::debug!("store: create {}", id);
        self.records.push(record);
        id
    }

    /// Insert several records created together, in order
    pub fn create_many(&mut self, records: impl IntoIterator<Item = T>) -> Vec<String> {
        records.into_iter().map(|r| self.create(r)).collect()
    }

    /// Apply `patch` to the record with `id`; false if no such record
    pub fn update<F>(&mut self, id: &str, patch: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        match self.records.iter_mut().find(|r| r.id() == id) {
            Some(record) => {
                patch(record);
                log::debug!("store: update {}", id);
                true
            }
            None => false,
        }
    }

    /// Remove the record irrecoverably
    pub fn purge(&mut self, id: &str) -> Option<T> {
        let index = self.records.iter().position(|r| r.id() == id)?;
        log::debug!("store: purge {}", id);
        Some(self.records.remove(index))
    }

    /// Drop every record for which `keep` is false; returns how many were removed
    pub fn retain<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.records.len();
        self.records.retain(keep);
        before - self.records.len()
    }
}

impl<T: SoftDelete> EntityStore<T> {
    /// Stamp `deleted_at`; the record stays in the collection. A record already
    /// in the trash keeps its original stamp and false is returned.
    pub fn soft_delete(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        match self.records.iter_mut().find(|r| r.id() == id) {
            Some(record) if !record.is_deleted() => {
                log::debug!("store: soft delete {}", id);
                record.set_deleted_at(Some(now));
                true
            }
            _ => false,
        }
    }

    pub fn restore(&mut self, id: &str) -> bool {
        self.update(id, |r| r.set_deleted_at(None))
    }

    /// Records visible in normal views
    pub fn active(&self) -> impl Iterator<Item = &T> {
        self.records.iter().filter(|r| !r.is_deleted())
    }

    /// Records sitting in the trash
    pub fn deleted(&self) -> impl Iterator<Item = &T> {
        self.records.iter().filter(|r| r.is_deleted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, QuickNote, Task};
    use chrono::TimeZone;

    fn sample_task(title: &str) -> Task {
        Task::new("work", title, Priority::High, "2024-03-10")
    }

    #[test]
    fn update_patches_only_the_matching_record() {
        let mut store = EntityStore::new();
        let a = store.create(sample_task("A"));
        let b = store.create(sample_task("B"));

        assert!(store.update(&a, |t| t.completed = true));
        assert!(store.get(&a).unwrap().completed);
        assert!(!store.get(&b).unwrap().completed);
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut store: EntityStore<Task> = EntityStore::new();
        store.create(sample_task("A"));
        let before = store.clone();

        assert!(!store.update("missing", |t| t.title.clear()));
        assert!(!store.soft_delete("missing", Utc::now()));
        assert!(!store.restore("missing"));
        assert!(store.purge("missing").is_none());
        assert_eq!(store, before);
    }

    #[test]
    fn soft_delete_then_restore_round_trips() {
        let mut store = EntityStore::new();
        let id = store.create(sample_task("Report"));
        let original = store.get(&id).unwrap().clone();
        let now = Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap();

        assert!(store.soft_delete(&id, now));
        assert_eq!(store.get(&id).unwrap().deleted_at, Some(now));
        assert_eq!(store.active().count(), 0);
        assert_eq!(store.deleted().count(), 1);

        assert!(store.restore(&id));
        assert_eq!(store.get(&id).unwrap(), &original);
        assert_eq!(store.active().count(), 1);
    }

    #[test]
    fn deleting_twice_keeps_the_first_stamp() {
        let mut store = EntityStore::new();
        let id = store.create(sample_task("Report"));
        let first = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 9, 9, 0, 0).unwrap();

        assert!(store.soft_delete(&id, first));
        assert!(!store.soft_delete(&id, later));
        assert_eq!(store.get(&id).unwrap().deleted_at, Some(first));
    }

    #[test]
    fn purge_removes_irrecoverably() {
        let mut store = EntityStore::new();
        let id = store.create(QuickNote::new("call mom", "yellow"));
        assert_eq!(store.purge(&id).map(|n| n.content), Some("call mom".to_string()));
        assert!(store.is_empty());
        assert!(!store.contains(&id));
    }

    #[test]
    fn serializes_as_a_plain_array() {
        let mut store = EntityStore::new();
        store.create(QuickNote {
            id: "q1".to_string(),
            content: "hi".to_string(),
            color: "blue".to_string(),
        });
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"[{"id":"q1","content":"hi","color":"blue"}]"#);
    }
}
