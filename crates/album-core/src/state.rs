use std::collections::VecDeque;

use tracing::debug;

use crate::config::AlbumConfig;
use crate::layout::Viewport;
use crate::lightbox::Lightbox;
use crate::model::{MediaId, MediaItem, SortBy, SortOrder, TagInfo};
use crate::selection::{ActiveTagSet, SelectionSet};
use crate::undo::TaggingAction;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub items_per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            items_per_page: 0,
        }
    }
}

/// Everything the client knows between requests. Only the controller
/// mutates it.
#[derive(Debug)]
pub struct AppState {
    items: Vec<MediaItem>,
    pagination: Pagination,
    columns: u32,
    viewport: Viewport,
    sort_by: SortBy,
    sort_order: SortOrder,
    selection: SelectionSet,
    active_tags: ActiveTagSet,
    anchor: Option<usize>,
    undo: Option<TaggingAction>,
    tags: Vec<TagInfo>,
    tags_error: bool,
    org_paths: Vec<String>,
    load_error: Option<String>,
    pending_removal: Option<(MediaId, String)>,
    filter_text: String,
    filter_status: Option<Notice>,
    lightbox: Lightbox,
    notices: VecDeque<Notice>,
}

impl AppState {
    pub fn new(config: &AlbumConfig) -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::default(),
            columns: config.columns.max(1),
            viewport: Viewport::default(),
            sort_by: config.sort_by,
            sort_order: config.sort_order,
            selection: SelectionSet::default(),
            active_tags: ActiveTagSet::default(),
            anchor: None,
            undo: None,
            tags: Vec::new(),
            tags_error: false,
            org_paths: Vec::new(),
            load_error: None,
            pending_removal: None,
            filter_text: String::new(),
            filter_status: None,
            lightbox: Lightbox::default(),
            notices: VecDeque::new(),
        }
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn item(&self, id: MediaId) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_index(&self, id: MediaId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn active_tags(&self) -> &ActiveTagSet {
        &self.active_tags
    }

    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    pub fn pending_undo(&self) -> Option<&TaggingAction> {
        self.undo.as_ref()
    }

    pub fn tags(&self) -> &[TagInfo] {
        &self.tags
    }

    pub fn tags_error(&self) -> bool {
        self.tags_error
    }

    pub fn org_paths(&self) -> &[String] {
        &self.org_paths
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn pending_removal(&self) -> Option<(MediaId, &str)> {
        self.pending_removal
            .as_ref()
            .map(|(id, name)| (*id, name.as_str()))
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn filter_status(&self) -> Option<&Notice> {
        self.filter_status.as_ref()
    }

    pub fn lightbox(&self) -> &Lightbox {
        &self.lightbox
    }

    pub fn has_notices(&self) -> bool {
        !self.notices.is_empty()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        debug!("notice {:?}: {}", notice.level, notice.text);
        self.notices.push_back(notice);
    }

    pub(crate) fn replace_page(
        &mut self,
        items: Vec<MediaItem>,
        current_page: u32,
        total_pages: u32,
        items_per_page: u32,
    ) {
        self.items = items;
        self.pagination = Pagination {
            current_page,
            total_pages,
            items_per_page,
        };
        self.load_error = None;
        if let Some(anchor) = self.anchor {
            if anchor >= self.items.len() {
                self.anchor = None;
            }
        }
        if let Some(cursor) = self.lightbox.cursor() {
            if cursor >= self.items.len() {
                self.lightbox.close();
            }
        }
    }

    pub(crate) fn fail_page(&mut self, message: String) {
        self.items.clear();
        self.anchor = None;
        self.lightbox.close();
        self.load_error = Some(message);
    }

    /// Replaces an item's cached tags with the server's list. A late
    /// response for an item no longer on the page is dropped.
    pub(crate) fn patch_tags(&mut self, id: MediaId, tags: Vec<String>) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.tags = tags;
                true
            }
            None => {
                debug!("dropping tag patch for media {id}: not on current page");
                false
            }
        }
    }

    pub(crate) fn reset_context(&mut self) {
        self.selection.clear();
        self.active_tags.clear();
        self.anchor = None;
        self.undo = None;
        self.lightbox.close();
        debug!("context reset: cleared selection, active tags and undo record");
    }

    pub(crate) fn set_columns(&mut self, columns: u32) {
        self.columns = columns;
    }

    pub(crate) fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub(crate) fn set_sort(&mut self, sort_by: SortBy, sort_order: SortOrder) {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
    }

    pub(crate) fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    pub(crate) fn active_tags_mut(&mut self) -> &mut ActiveTagSet {
        &mut self.active_tags
    }

    pub(crate) fn set_anchor(&mut self, anchor: Option<usize>) {
        self.anchor = anchor;
    }

    pub(crate) fn set_undo(&mut self, action: Option<TaggingAction>) {
        self.undo = action;
    }

    pub(crate) fn set_tags(&mut self, tags: Vec<TagInfo>) {
        self.tags = tags;
        self.tags_error = false;
    }

    pub(crate) fn fail_tags(&mut self) {
        self.tags.clear();
        self.tags_error = true;
    }

    pub(crate) fn set_org_paths(&mut self, paths: Vec<String>) {
        self.org_paths = paths;
    }

    pub(crate) fn set_pending_removal(&mut self, pending: Option<(MediaId, String)>) {
        self.pending_removal = pending;
    }

    pub(crate) fn set_filter_text(&mut self, text: String) {
        self.filter_text = text;
    }

    pub(crate) fn set_filter_status(&mut self, status: Option<Notice>) {
        self.filter_status = status;
    }

    pub(crate) fn lightbox_mut(&mut self) -> (&mut Lightbox, &[MediaItem]) {
        (&mut self.lightbox, &self.items)
    }

    pub(crate) fn split_selection(&mut self) -> (&mut SelectionSet, &[MediaItem]) {
        (&mut self.selection, &self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::AppState;
    use crate::config::AlbumConfig;
    use crate::model::MediaItem;
    use crate::undo::TaggingAction;

    fn loaded_state() -> AppState {
        let mut state = AppState::new(&AlbumConfig::default());
        state.replace_page(
            vec![
                MediaItem::new(1, "a.jpg", vec!["x".to_string()]),
                MediaItem::new(2, "b.jpg", Vec::new()),
            ],
            1,
            3,
            2,
        );
        state
    }

    #[test]
    fn patch_for_missing_item_is_dropped() {
        let mut state = loaded_state();
        assert!(state.patch_tags(2, vec!["y".to_string()]));
        assert!(!state.patch_tags(42, vec!["z".to_string()]));
        assert_eq!(state.item(2).unwrap().tags, vec!["y"]);
    }

    #[test]
    fn reset_context_clears_client_only_state() {
        let mut state = loaded_state();
        state.selection_mut().insert(1);
        state.active_tags_mut().insert("x".to_string());
        state.set_anchor(Some(1));
        state.set_undo(Some(TaggingAction::single(1, vec!["x".to_string()], Vec::new())));

        state.reset_context();

        assert!(state.selection().is_empty());
        assert!(state.active_tags().is_empty());
        assert_eq!(state.anchor(), None);
        assert!(state.pending_undo().is_none());
        assert_eq!(state.items().len(), 2);
    }

    #[test]
    fn failed_load_empties_grid_but_keeps_pagination() {
        let mut state = loaded_state();
        state.fail_page("500: boom".to_string());
        assert!(state.items().is_empty());
        assert_eq!(state.load_error(), Some("500: boom"));
        assert_eq!(state.pagination().total_pages, 3);
    }
}
