use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::AlbumError;

pub const FAVORITES_KEY: &str = "photoAlbumManagerFilterFavorites";

/// Durable local key-value storage holding string arrays.
pub trait FavoriteStore {
    fn get_list(&self, key: &str) -> Result<Vec<String>, AlbumError>;
    fn set_list(&mut self, key: &str, values: &[String]) -> Result<(), AlbumError>;
}

#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_object(&self) -> Result<Map<String, Value>, AlbumError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(AlbumError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Object(obj)) => Ok(obj),
            Ok(_) => {
                warn!("{}: root is not an object, ignoring", self.path.display());
                Ok(Map::new())
            }
            Err(err) => {
                warn!("{}: {err}, ignoring", self.path.display());
                Ok(Map::new())
            }
        }
    }
}

impl FavoriteStore for JsonFileStore {
    fn get_list(&self, key: &str) -> Result<Vec<String>, AlbumError> {
        let obj = self.read_object()?;
        Ok(string_array(obj.get(key)))
    }

    fn set_list(&mut self, key: &str, values: &[String]) -> Result<(), AlbumError> {
        let mut obj = self.read_object()?;
        obj.insert(
            key.to_string(),
            Value::Array(values.iter().cloned().map(Value::String).collect()),
        );
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| AlbumError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let data =
            serde_json::to_vec_pretty(&Value::Object(obj)).map_err(|source| AlbumError::Json {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, data).map_err(|source| AlbumError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<String>>,
}

impl FavoriteStore for MemoryStore {
    fn get_list(&self, key: &str) -> Result<Vec<String>, AlbumError> {
        Ok(self.entries.get(key).cloned().unwrap_or_default())
    }

    fn set_list(&mut self, key: &str, values: &[String]) -> Result<(), AlbumError> {
        self.entries.insert(key.to_string(), values.to_vec());
        Ok(())
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(ToString::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Saved filter snippets. Never checked against the server until applied.
pub struct FilterFavorites {
    store: Box<dyn FavoriteStore>,
}

impl FilterFavorites {
    pub fn new(store: Box<dyn FavoriteStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::default()))
    }

    pub fn list(&self) -> Result<Vec<String>, AlbumError> {
        self.store.get_list(FAVORITES_KEY)
    }

    pub fn get(&self, index: usize) -> Result<Option<String>, AlbumError> {
        Ok(self.list()?.get(index).cloned())
    }

    /// Appends a snippet. Blank snippets are refused; duplicates are kept.
    pub fn add(&mut self, snippet: &str) -> Result<bool, AlbumError> {
        if snippet.trim().is_empty() {
            return Ok(false);
        }
        let mut favorites = self.list()?;
        favorites.push(snippet.to_string());
        self.store.set_list(FAVORITES_KEY, &favorites)?;
        Ok(true)
    }

    pub fn delete(&mut self, index: usize) -> Result<Option<String>, AlbumError> {
        let mut favorites = self.list()?;
        if index >= favorites.len() {
            return Ok(None);
        }
        let removed = favorites.remove(index);
        self.store.set_list(FAVORITES_KEY, &favorites)?;
        Ok(Some(removed))
    }
}
