//! Multi-select state for bulk actions.
//!
//! A [`SelectionSet`] is an explicit value owned by one view. It holds
//! allocation ids (or, in a bed-grid view, bed numbers) and implements the
//! tri-state group checkbox, range selection, and the clearing rules bulk
//! actions rely on.

use std::collections::BTreeSet;

/// How a group checkbox renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// No member is selected.
    None,
    /// Some but not all members are selected.
    Partial,
    /// Every member is selected.
    All,
}

/// What a group toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    /// Every member is now selected.
    Selected,
    /// Every member is now deselected.
    Deselected,
}

/// An event that may dismiss the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismiss {
    /// The Escape key.
    Escape,
    /// A click outside the container that owns the selection.
    OutsideClick {
        /// Whether the clicked element is marked to keep the selection, such
        /// as a toolbar button that acts on it.
        preserves_selection: bool,
    },
}

/// A set of selected ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSet<K = crate::domain::AllocationId> {
    selected: BTreeSet<K>,
}

impl<K> Default for SelectionSet<K> {
    fn default() -> Self {
        Self {
            selected: BTreeSet::new(),
        }
    }
}

impl<K: Ord + Clone> SelectionSet<K> {
    /// An empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn contains(&self, id: &K) -> bool {
        self.selected.contains(id)
    }

    /// Number of selected ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in order.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.selected.iter()
    }

    /// Flips the membership of `id`. Returns whether it is now selected.
    pub fn toggle(&mut self, id: K) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    /// Selects every id in `ids`.
    pub fn select_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a K>)
    where
        K: 'a,
    {
        self.selected.extend(ids.into_iter().cloned());
    }

    /// Deselects every id in `ids`.
    pub fn deselect_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a K>)
    where
        K: 'a,
    {
        for id in ids {
            self.selected.remove(id);
        }
    }

    /// How a checkbox for the group `ids` should render.
    ///
    /// An empty group renders as [`GroupState::None`].
    #[must_use]
    pub fn group_state<'a>(&self, ids: impl IntoIterator<Item = &'a K>) -> GroupState
    where
        K: 'a,
    {
        let (mut members, mut selected) = (0usize, 0usize);
        for id in ids {
            members += 1;
            if self.selected.contains(id) {
                selected += 1;
            }
        }

        match selected {
            0 => GroupState::None,
            n if n == members => GroupState::All,
            _ => GroupState::Partial,
        }
    }

    /// Clicks the group checkbox for `ids`.
    ///
    /// A group that is already fully selected is cleared. Any other group,
    /// including a partially selected one, becomes fully selected. An empty
    /// group counts as fully selected, so the click changes nothing.
    pub fn toggle_group<'a>(&mut self, ids: impl IntoIterator<Item = &'a K> + Clone) -> GroupAction
    where
        K: 'a,
    {
        let all_selected = ids.clone().into_iter().all(|id| self.selected.contains(id));
        if all_selected {
            self.deselect_all(ids);
            GroupAction::Deselected
        } else {
            self.select_all(ids);
            GroupAction::Selected
        }
    }

    /// Empties the selection.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Applies a dismissal event. Returns whether the selection was cleared.
    pub fn dismiss(&mut self, event: Dismiss) -> bool {
        match event {
            Dismiss::Escape
            | Dismiss::OutsideClick {
                preserves_selection: false,
            } => {
                self.clear();
                true
            }
            Dismiss::OutsideClick {
                preserves_selection: true,
            } => false,
        }
    }

    /// Drops selected ids that are no longer rendered or reservable.
    ///
    /// Returns how many ids were removed.
    pub fn retain_rendered(&mut self, is_rendered: impl Fn(&K) -> bool) -> usize {
        let before = self.selected.len();
        self.selected.retain(|id| is_rendered(id));
        before - self.selected.len()
    }

    /// Removes every id a bulk action attempted, whether or not the action
    /// succeeded for it.
    pub fn finish<'a>(&mut self, attempted: impl IntoIterator<Item = &'a K>)
    where
        K: 'a,
    {
        self.deselect_all(attempted);
    }
}

impl SelectionSet<u32> {
    /// Selects every bed number from `anchor` to `target` inclusive, in
    /// either direction, skipping beds `is_selectable` rejects.
    ///
    /// Only meaningful within one block or location view, where bed numbers
    /// form a single numeric range. Returns how many beds were newly
    /// selected.
    pub fn range_select(
        &mut self,
        anchor: u32,
        target: u32,
        is_selectable: impl Fn(u32) -> bool,
    ) -> usize {
        let (low, high) = if anchor <= target {
            (anchor, target)
        } else {
            (target, anchor)
        };

        (low..=high)
            .filter(|bed| is_selectable(*bed))
            .filter(|bed| self.selected.insert(*bed))
            .count()
    }
}
