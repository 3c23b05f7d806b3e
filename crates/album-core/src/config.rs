use std::path::{Path, PathBuf};

use crate::model::{SortBy, SortOrder};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";
pub const DEFAULT_COLUMNS: u32 = 5;
const FAVORITES_DIR: &str = "photo-album";
const FAVORITES_FILE: &str = "favorites.json";

#[derive(Clone, Debug)]
pub struct AlbumConfig {
    pub server: String,
    pub columns: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub favorites_path: PathBuf,
}

impl Default for AlbumConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            columns: DEFAULT_COLUMNS,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            favorites_path: default_favorites_path(),
        }
    }
}

impl AlbumConfig {
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        let server = server.into();
        self.server = server.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_columns(mut self, columns: u32) -> Self {
        if columns > 0 {
            self.columns = columns;
        }
        self
    }

    pub fn with_sort(mut self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    pub fn with_favorites_path(mut self, path: &Path) -> Self {
        self.favorites_path = expand_tilde(path);
        self
    }
}

pub fn default_favorites_path() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        return data.join(FAVORITES_DIR).join(FAVORITES_FILE);
    }
    PathBuf::from("./photo-album-favorites.json")
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if path_str == "~" || path_str.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let suffix = path_str.trim_start_matches('~');
            return home.join(suffix.trim_start_matches('/'));
        }
    }
    path.to_path_buf()
}
