pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod favorites;
pub mod layout;
pub mod lightbox;
pub mod model;
pub mod selection;
pub mod state;
pub mod undo;
pub mod view;

pub use api::{file_path, media_listing_path, thumbnail_path, AlbumApi, HttpApi};
pub use config::{default_favorites_path, expand_tilde, AlbumConfig, DEFAULT_COLUMNS, DEFAULT_SERVER};
pub use controller::{AppView, BatchTagReport, Controller, DeleteOutcome};
pub use error::AlbumError;
pub use favorites::{FavoriteStore, FilterFavorites, JsonFileStore, MemoryStore, FAVORITES_KEY};
pub use layout::{items_per_page, rows_for, Viewport, GRID_GAP};
pub use lightbox::{Lightbox, LightboxView};
pub use model::{
    DeleteFailure, DeleteResponse, DeleteSummary, MediaId, MediaItem, MediaPage, MediaQuery,
    SortBy, SortOrder, TagInfo,
};
pub use selection::{
    select_range, ActiveTagSet, ClickMode, ClickModifiers, OrderedSet, SelectionSet,
};
pub use state::{AppState, Notice, NoticeLevel, Pagination};
pub use undo::{TaggingAction, TaggingKind, UndoOutcome};
pub use view::{
    favorite_label, FavoriteEntry, FavoritesView, GridView, PaginationView, TagChip,
    TagPanelEntry, TagPanelView, TileView, UndoView, EMPTY_GRID_MESSAGE, OVERLAY_TAG_LIMIT,
};
