//! Annotation store for the image being edited.
//!
//! Every mutation appends a full snapshot of the annotation set to a bounded
//! linear history; undo and redo only move the cursor. The live set is
//! always the snapshot under the cursor.

use std::collections::HashMap;

use boxmark_canvas::{Annotation, AnnotationId, AnnotationPatch, CategoryId, NewAnnotation};

use crate::undo::{HistoryConfig, LinearHistory};

/// Authoritative in-memory annotation set with undo/redo.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    history: LinearHistory<Vec<Annotation>>,
    selected_category: Option<CategoryId>,
    /// Next provisional id. Never reset, so provisional ids stay unique for
    /// the whole session.
    next_provisional: u64,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl AnnotationStore {
    pub fn new(config: HistoryConfig) -> Self {
        let mut history = LinearHistory::with_config(config);
        history.reset(Vec::new());
        Self {
            history,
            selected_category: None,
            next_provisional: 1,
        }
    }

    /// The live annotation set.
    pub fn annotations(&self) -> &[Annotation] {
        self.history.current().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations().iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.annotations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations().is_empty()
    }

    pub fn selected_category(&self) -> Option<CategoryId> {
        self.selected_category
    }

    pub fn set_selected_category(&mut self, category_id: Option<CategoryId>) {
        if self.selected_category != category_id {
            log::debug!("Selected category: {:?}", category_id);
            self.selected_category = category_id;
        }
    }

    /// Replace the annotation set and reset history to that single snapshot.
    pub fn load(&mut self, annotations: Vec<Annotation>) {
        log::debug!("Store: loaded {} annotations", annotations.len());
        self.history.reset(annotations);
    }

    /// Add an annotation under a fresh provisional id.
    pub fn add(&mut self, annotation: NewAnnotation) -> AnnotationId {
        let id = AnnotationId::Provisional(self.next_provisional);
        self.next_provisional += 1;

        let mut snapshot = self.annotations().to_vec();
        snapshot.push(annotation.with_id(id));
        self.history.push(snapshot);
        log::debug!("Store: added {} ({} total)", id, self.len());
        id
    }

    /// Apply a patch to an annotation. Returns `false` (and records nothing)
    /// when the id is unknown or the patch is empty.
    pub fn update(&mut self, id: AnnotationId, patch: AnnotationPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        let mut snapshot = self.annotations().to_vec();
        let Some(annotation) = snapshot.iter_mut().find(|a| a.id == id) else {
            log::debug!("Store: update of unknown annotation {}", id);
            return false;
        };
        annotation.apply(&patch);
        self.history.push(snapshot);
        log::debug!("Store: updated {}", id);
        true
    }

    /// Remove an annotation. Returns `false` when the id is unknown.
    pub fn remove(&mut self, id: AnnotationId) -> bool {
        let current = self.annotations();
        if !current.iter().any(|a| a.id == id) {
            log::debug!("Store: remove of unknown annotation {}", id);
            return false;
        }
        let snapshot: Vec<Annotation> = current.iter().filter(|a| a.id != id).cloned().collect();
        self.history.push(snapshot);
        log::debug!("Store: removed {} ({} left)", id, self.len());
        true
    }

    /// Step back one snapshot. No-op at the start of history.
    pub fn undo(&mut self) -> bool {
        let moved = self.history.undo().is_some();
        if moved {
            log::debug!(
                "Undo: now at {}/{}",
                self.history.index() + 1,
                self.history.len()
            );
        }
        moved
    }

    /// Step forward one snapshot. No-op at the head of history.
    pub fn redo(&mut self) -> bool {
        let moved = self.history.redo().is_some();
        if moved {
            log::debug!(
                "Redo: now at {}/{}",
                self.history.index() + 1,
                self.history.len()
            );
        }
        moved
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of retained snapshots.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Rewrite ids across every snapshot, e.g. provisional ids replaced by
    /// the ids the server assigned on save. Returns how many annotations were
    /// rewritten in the live set.
    pub fn reconcile_ids(&mut self, mapping: &HashMap<AnnotationId, AnnotationId>) -> usize {
        if mapping.is_empty() {
            return 0;
        }
        for snapshot in self.history.iter_mut() {
            for annotation in snapshot.iter_mut() {
                if let Some(new_id) = mapping.get(&annotation.id) {
                    annotation.id = *new_id;
                }
            }
        }
        let rewritten = self
            .annotations()
            .iter()
            .filter(|a| mapping.values().any(|id| *id == a.id))
            .count();
        log::debug!("Store: reconciled {} ids", rewritten);
        rewritten
    }

    /// The live set in save-request form, in stored order.
    pub fn to_save_request(&self) -> Vec<NewAnnotation> {
        self.annotations().iter().map(Annotation::to_new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn new_annotation(category_id: CategoryId, x: f64) -> NewAnnotation {
        NewAnnotation {
            category_id,
            x_center: x,
            y_center: 0.5,
            width: 0.1,
            height: 0.1,
        }
    }

    #[test]
    fn test_add_update_remove() {
        let mut store = AnnotationStore::default();
        let a = store.add(new_annotation(1, 0.2));
        let b = store.add(new_annotation(2, 0.4));
        assert!(a.is_provisional());
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);

        assert!(store.update(a, AnnotationPatch::category(3)));
        assert_eq!(store.get(a).map(|x| x.category_id), Some(3));

        assert!(store.remove(b));
        assert_eq!(store.len(), 1);
        assert_eq!(store.history_len(), 5);
    }

    #[test]
    fn test_unknown_ids_and_empty_patch_record_nothing() {
        let mut store = AnnotationStore::default();
        let a = store.add(new_annotation(1, 0.2));
        let before = store.history_len();

        assert!(!store.update(AnnotationId::Persisted(99), AnnotationPatch::category(2)));
        assert!(!store.update(a, AnnotationPatch::default()));
        assert!(!store.remove(AnnotationId::Persisted(99)));
        assert_eq!(store.history_len(), before);
    }

    #[test]
    fn test_undo_redo_boundaries_are_noops() {
        let mut store = AnnotationStore::default();
        assert!(!store.undo());
        assert!(!store.redo());

        store.add(new_annotation(1, 0.2));
        assert!(store.undo());
        assert!(store.is_empty());
        assert!(!store.undo());
        assert!(store.redo());
        assert!(!store.redo());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_after_undo_truncates() {
        let mut store = AnnotationStore::default();
        store.add(new_annotation(1, 0.1));
        store.add(new_annotation(1, 0.2));
        store.undo();
        store.add(new_annotation(2, 0.3));

        assert!(!store.can_redo());
        let cats: Vec<_> = store.annotations().iter().map(|a| a.category_id).collect();
        assert_eq!(cats, vec![1, 2]);
    }

    #[test]
    fn test_load_resets_history() {
        let mut store = AnnotationStore::default();
        store.add(new_annotation(1, 0.1));
        store.load(vec![new_annotation(4, 0.5).with_id(AnnotationId::Persisted(7))]);

        assert!(!store.can_undo());
        assert!(!store.can_redo());
        assert_eq!(store.annotations()[0].id, AnnotationId::Persisted(7));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut store = AnnotationStore::new(HistoryConfig { max_history: 3 });
        for i in 0..10 {
            store.add(new_annotation(1, i as f64 / 10.0));
        }
        assert_eq!(store.history_len(), 3);
        assert_eq!(store.len(), 10);
        assert!(store.undo());
        assert!(store.undo());
        assert!(!store.undo());
        assert_eq!(store.len(), 8);
    }

    #[test]
    fn test_reconcile_ids_rewrites_every_snapshot() {
        let mut store = AnnotationStore::default();
        let a = store.add(new_annotation(1, 0.1));
        let b = store.add(new_annotation(1, 0.2));

        let mapping = HashMap::from([
            (a, AnnotationId::Persisted(100)),
            (b, AnnotationId::Persisted(101)),
        ]);
        assert_eq!(store.reconcile_ids(&mapping), 2);
        assert!(store.get(AnnotationId::Persisted(101)).is_some());

        store.undo();
        assert_eq!(store.annotations()[0].id, AnnotationId::Persisted(100));
        assert!(store.get(a).is_none());
    }

    #[test]
    fn test_provisional_ids_unique_across_loads() {
        let mut store = AnnotationStore::default();
        let a = store.add(new_annotation(1, 0.1));
        store.load(Vec::new());
        let b = store.add(new_annotation(1, 0.1));
        assert_ne!(a, b);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u64),
        Recategorize(usize, u64),
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u64..5).prop_map(Op::Add),
            (0usize..8, 1u64..5).prop_map(|(i, c)| Op::Recategorize(i, c)),
            (0usize..8).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_undo_all_then_redo_all_restores(ops in prop::collection::vec(op(), 1..30)) {
            let mut store = AnnotationStore::default();
            let initial = store.annotations().to_vec();
            let mut mutations = 0;

            for op in ops {
                let ids: Vec<_> = store.annotations().iter().map(|a| a.id).collect();
                let applied = match op {
                    Op::Add(c) => {
                        store.add(new_annotation(c, 0.5));
                        true
                    }
                    Op::Recategorize(i, c) => match ids.get(i) {
                        Some(id) => store.update(*id, AnnotationPatch::category(c)),
                        None => false,
                    },
                    Op::Remove(i) => match ids.get(i) {
                        Some(id) => store.remove(*id),
                        None => false,
                    },
                };
                if applied {
                    mutations += 1;
                }
            }
            let final_state = store.annotations().to_vec();

            for _ in 0..mutations {
                prop_assert!(store.undo());
            }
            prop_assert!(!store.undo());
            prop_assert_eq!(store.annotations(), initial.as_slice());

            for _ in 0..mutations {
                prop_assert!(store.redo());
            }
            prop_assert!(!store.redo());
            prop_assert_eq!(store.annotations(), final_state.as_slice());
        }
    }
}
