//! Declarative descriptions of what the UI shows. Pure functions of state;
//! frontends decide how to draw them.

use crate::api::thumbnail_path;
use crate::model::{MediaId, MediaItem, TagInfo};
use crate::selection::{ActiveTagSet, SelectionSet};
use crate::state::Pagination;
use crate::undo::TaggingAction;

pub const OVERLAY_TAG_LIMIT: usize = 3;
pub const EMPTY_GRID_MESSAGE: &str = "No media found matching your criteria.";
const FAVORITE_LABEL_MAX: usize = 60;
const FAVORITE_LABEL_KEEP: usize = 57;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagChip {
    pub name: String,
    pub dimmed: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TileView {
    pub id: MediaId,
    pub index: usize,
    pub caption: String,
    pub thumbnail_path: String,
    pub selected: bool,
    pub tags: Vec<TagChip>,
    pub more_tags: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GridView {
    pub tiles: Vec<TileView>,
    /// Replaces the grid when set: empty result or load error.
    pub message: Option<String>,
}

pub fn grid_view(
    items: &[MediaItem],
    selection: &SelectionSet,
    pending_removal: Option<(MediaId, &str)>,
    load_error: Option<&str>,
) -> GridView {
    if let Some(err) = load_error {
        return GridView {
            tiles: Vec::new(),
            message: Some(format!("Error: {err}")),
        };
    }
    if items.is_empty() {
        return GridView {
            tiles: Vec::new(),
            message: Some(EMPTY_GRID_MESSAGE.to_string()),
        };
    }

    let tiles = items
        .iter()
        .enumerate()
        .map(|(index, item)| TileView {
            id: item.id,
            index,
            caption: item.filename.clone(),
            thumbnail_path: thumbnail_path(item.id),
            selected: selection.contains(&item.id),
            tags: item
                .tags
                .iter()
                .take(OVERLAY_TAG_LIMIT)
                .map(|name| TagChip {
                    name: name.clone(),
                    dimmed: pending_removal == Some((item.id, name.as_str())),
                })
                .collect(),
            more_tags: item.tags.len() > OVERLAY_TAG_LIMIT,
        })
        .collect();
    GridView {
        tiles,
        message: None,
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PaginationView {
    pub label: String,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

pub fn pagination_view(pagination: Pagination) -> PaginationView {
    PaginationView {
        label: format!(
            "Page {} of {}",
            pagination.current_page, pagination.total_pages
        ),
        prev_enabled: pagination.current_page > 1,
        next_enabled: pagination.current_page < pagination.total_pages,
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagPanelEntry {
    pub id: i64,
    pub name: String,
    pub active: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TagPanelView {
    pub entries: Vec<TagPanelEntry>,
    pub message: Option<String>,
}

pub fn tag_panel_view(tags: &[TagInfo], active: &ActiveTagSet, failed: bool) -> TagPanelView {
    if failed {
        return TagPanelView {
            entries: Vec::new(),
            message: Some("Error loading tags.".to_string()),
        };
    }
    if tags.is_empty() {
        return TagPanelView {
            entries: Vec::new(),
            message: Some("No tags.".to_string()),
        };
    }
    TagPanelView {
        entries: tags
            .iter()
            .map(|tag| TagPanelEntry {
                id: tag.id,
                name: tag.name.clone(),
                active: active.contains(&tag.name),
            })
            .collect(),
        message: None,
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UndoView {
    pub enabled: bool,
    pub tooltip: String,
}

pub fn undo_view(pending: Option<&TaggingAction>) -> UndoView {
    match pending {
        Some(action) => UndoView {
            enabled: true,
            tooltip: format!("Undo last tagging action {}", action.describe()),
        },
        None => UndoView {
            enabled: false,
            tooltip: "Nothing to undo".to_string(),
        },
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FavoriteEntry {
    pub index: usize,
    pub label: String,
    pub snippet: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FavoritesView {
    pub entries: Vec<FavoriteEntry>,
    pub message: Option<String>,
}

pub fn favorites_view(favorites: &[String]) -> FavoritesView {
    if favorites.is_empty() {
        return FavoritesView {
            entries: Vec::new(),
            message: Some("No favorite filters saved yet.".to_string()),
        };
    }
    FavoritesView {
        entries: favorites
            .iter()
            .enumerate()
            .map(|(index, snippet)| FavoriteEntry {
                index,
                label: favorite_label(snippet),
                snippet: snippet.clone(),
            })
            .collect(),
        message: None,
    }
}

pub fn favorite_label(snippet: &str) -> String {
    if snippet.chars().count() > FAVORITE_LABEL_MAX {
        let kept: String = snippet.chars().take(FAVORITE_LABEL_KEEP).collect();
        format!("{kept}...")
    } else {
        snippet.to_string()
    }
}
