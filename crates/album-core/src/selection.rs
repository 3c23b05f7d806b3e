use std::collections::HashSet;
use std::hash::Hash;

use crate::model::{MediaId, MediaItem};

/// Set that remembers insertion order, so batch calls run in the order the
/// user picked things.
#[derive(Clone, Debug)]
pub struct OrderedSet<T> {
    order: Vec<T>,
    members: HashSet<T>,
}

impl<T> Default for OrderedSet<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            members: HashSet::new(),
        }
    }
}

impl<T: Eq + Hash + Clone> OrderedSet<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.members.contains(value)
    }

    pub fn insert(&mut self, value: T) -> bool {
        if self.members.insert(value.clone()) {
            self.order.push(value);
            true
        } else {
            false
        }
    }

    pub fn remove(&mut self, value: &T) -> bool {
        if self.members.remove(value) {
            self.order.retain(|v| v != value);
            true
        } else {
            false
        }
    }

    pub fn toggle(&mut self, value: T) -> bool {
        if self.remove(&value) {
            false
        } else {
            self.insert(value)
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.order.clone()
    }
}

pub type SelectionSet = OrderedSet<MediaId>;
pub type ActiveTagSet = OrderedSet<String>;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ClickModifiers {
    pub shift: bool,
    pub view: bool,
    pub quick_tag: bool,
}

impl ClickModifiers {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::default()
        }
    }

    pub fn view() -> Self {
        Self {
            view: true,
            ..Self::default()
        }
    }

    pub fn quick_tag() -> Self {
        Self {
            quick_tag: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClickMode {
    Toggle,
    View,
    QuickTag,
    Range { anchor: usize },
}

impl ClickMode {
    /// Resolves the action for one click. Shift only means a range when the
    /// anchor still points into the current page.
    pub fn resolve(modifiers: ClickModifiers, anchor: Option<usize>, page_len: usize) -> Self {
        match anchor {
            Some(anchor) if modifiers.shift && anchor < page_len => ClickMode::Range { anchor },
            _ if modifiers.quick_tag => ClickMode::QuickTag,
            _ if modifiers.view => ClickMode::View,
            _ => ClickMode::Toggle,
        }
    }

    pub fn moves_anchor(self) -> bool {
        !matches!(self, ClickMode::Range { .. })
    }
}

/// Adds every item between `anchor` and `index` (inclusive, either
/// direction) to the selection. Nothing is removed.
pub fn select_range(
    selection: &mut SelectionSet,
    items: &[MediaItem],
    anchor: usize,
    index: usize,
) -> usize {
    let start = anchor.min(index);
    let end = anchor.max(index);
    let mut added = 0;
    for item in items.iter().skip(start).take(end - start + 1) {
        if selection.insert(item.id) {
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::{select_range, ClickMode, ClickModifiers, OrderedSet, SelectionSet};
    use crate::model::MediaItem;

    fn items(n: i64) -> Vec<MediaItem> {
        (1..=n)
            .map(|id| MediaItem::new(id, format!("{id}.jpg"), Vec::new()))
            .collect()
    }

    #[test]
    fn ordered_set_keeps_insertion_order_across_toggles() {
        let mut set = OrderedSet::default();
        assert!(set.toggle("b".to_string()));
        assert!(set.toggle("a".to_string()));
        assert!(set.toggle("c".to_string()));
        assert!(!set.toggle("a".to_string()));
        assert_eq!(set.to_vec(), vec!["b", "c"]);
        assert!(!set.insert("b".to_string()));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn range_selects_both_directions_inclusive() {
        let items = items(8);
        let mut forward = SelectionSet::default();
        select_range(&mut forward, &items, 2, 5);
        assert_eq!(forward.to_vec(), vec![3, 4, 5, 6]);

        let mut backward = SelectionSet::default();
        select_range(&mut backward, &items, 5, 2);
        assert_eq!(backward.len(), 4);
        for id in 3..=6 {
            assert!(backward.contains(&id));
        }
    }

    #[test]
    fn range_never_deselects_outside_or_inside() {
        let items = items(8);
        let mut selection = SelectionSet::default();
        selection.insert(1);
        selection.insert(8);
        selection.insert(4);
        let added = select_range(&mut selection, &items, 2, 4);
        assert_eq!(added, 2);
        for id in [1, 3, 4, 5, 8] {
            assert!(selection.contains(&id));
        }
    }

    #[test]
    fn range_clamps_to_page_end() {
        let items = items(3);
        let mut selection = SelectionSet::default();
        select_range(&mut selection, &items, 1, 9);
        assert_eq!(selection.to_vec(), vec![2, 3]);
    }

    #[test]
    fn mode_resolution_prefers_range_then_quick_tag_then_view() {
        let all = ClickModifiers {
            shift: true,
            view: true,
            quick_tag: true,
        };
        assert_eq!(
            ClickMode::resolve(all, Some(1), 5),
            ClickMode::Range { anchor: 1 }
        );
        assert_eq!(ClickMode::resolve(all, None, 5), ClickMode::QuickTag);
        assert_eq!(
            ClickMode::resolve(ClickModifiers::view(), Some(0), 5),
            ClickMode::View
        );
        assert_eq!(
            ClickMode::resolve(ClickModifiers::plain(), Some(0), 5),
            ClickMode::Toggle
        );
    }

    #[test]
    fn shift_with_stale_anchor_is_plain_toggle() {
        assert_eq!(
            ClickMode::resolve(ClickModifiers::shift(), Some(7), 5),
            ClickMode::Toggle
        );
        assert!(ClickMode::Toggle.moves_anchor());
        assert!(!ClickMode::Range { anchor: 0 }.moves_anchor());
    }
}
