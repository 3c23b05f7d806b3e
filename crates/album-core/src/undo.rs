use std::collections::HashMap;

use crate::model::MediaId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaggingKind {
    SingleApply,
    BatchApply,
}

/// The last reversible tagging action. Only one exists at a time.
#[derive(Clone, Debug, PartialEq)]
pub struct TaggingAction {
    pub kind: TaggingKind,
    pub media_ids: Vec<MediaId>,
    pub tag_names: Vec<String>,
    pub prior_tags: HashMap<MediaId, Vec<String>>,
}

impl TaggingAction {
    pub fn single(media_id: MediaId, tag_names: Vec<String>, prior: Vec<String>) -> Self {
        Self {
            kind: TaggingKind::SingleApply,
            media_ids: vec![media_id],
            tag_names,
            prior_tags: HashMap::from([(media_id, prior)]),
        }
    }

    pub fn batch(
        media_ids: Vec<MediaId>,
        tag_names: Vec<String>,
        prior_tags: HashMap<MediaId, Vec<String>>,
    ) -> Self {
        Self {
            kind: TaggingKind::BatchApply,
            media_ids,
            tag_names,
            prior_tags,
        }
    }

    /// Items to restore, in the order they were tagged, with the tag list
    /// each one had before.
    pub fn restore_plan(&self) -> Vec<(MediaId, Vec<String>)> {
        self.media_ids
            .iter()
            .filter_map(|id| self.prior_tags.get(id).map(|tags| (*id, tags.clone())))
            .collect()
    }

    pub fn describe(&self) -> String {
        let target = match (self.kind, self.media_ids.first()) {
            (TaggingKind::SingleApply, Some(id)) => format!("media {id}"),
            _ => format!("{} items", self.media_ids.len()),
        };
        format!("[{}] on {target}", self.tag_names.join(", "))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UndoOutcome {
    NothingToUndo,
    Reverted { items: usize },
    PartiallyFailed { failed: usize, reverted: usize },
    Failed,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{TaggingAction, TaggingKind};

    #[test]
    fn restore_plan_follows_tagging_order_and_skips_unknown() {
        let action = TaggingAction::batch(
            vec![3, 1, 2],
            vec!["trip".to_string()],
            HashMap::from([(1, vec!["a".to_string()]), (3, Vec::new())]),
        );
        assert_eq!(action.kind, TaggingKind::BatchApply);
        assert_eq!(
            action.restore_plan(),
            vec![(3, Vec::new()), (1, vec!["a".to_string()])]
        );
    }

    #[test]
    fn describe_names_tags_and_target() {
        let action = TaggingAction::single(9, vec!["x".to_string(), "y".to_string()], Vec::new());
        assert_eq!(action.describe(), "[x, y] on media 9");
    }
}
