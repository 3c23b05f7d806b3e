use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type MediaId = i64;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    pub filename: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub org_path: Option<String>,
    #[serde(default)]
    pub capture_time: Option<String>,
    #[serde(default)]
    pub modification_time: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub media_type: Option<String>,
}

impl MediaItem {
    pub fn new(id: MediaId, filename: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            id,
            filename: filename.into(),
            tags,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MediaPage {
    #[serde(default)]
    pub media: Vec<MediaItem>,
    pub current_page: u32,
    pub total_pages: u32,
    #[serde(default)]
    pub total_items: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeleteFailure {
    pub id: Value,
    pub reason: String,
}

impl DeleteFailure {
    pub fn id_label(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            Value::Null => "?".to_string(),
            other => other.to_string(),
        }
    }
}

/// Body of `POST /api/media/delete_selected`. The server sends this shape
/// for partial and total failures too, so every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeleteSummary {
    pub message: Option<String>,
    pub error: Option<String>,
    pub success_count: u64,
    pub failures: Vec<DeleteFailure>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeleteResponse {
    pub ok: bool,
    pub summary: DeleteSummary,
}

/// Sort keys the server's listing accepts. The server silently sorts by
/// capture time for any other key, `date` included, so unknown keys are
/// rejected here instead of being sent.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum SortBy {
    #[default]
    CaptureTime,
    ModificationTime,
    Filepath,
    Filename,
    Filesize,
}

impl SortBy {
    pub const ALL: [SortBy; 5] = [
        SortBy::CaptureTime,
        SortBy::ModificationTime,
        SortBy::Filepath,
        SortBy::Filename,
        SortBy::Filesize,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::CaptureTime => "capture_time",
            SortBy::ModificationTime => "modification_time",
            SortBy::Filepath => "filepath",
            SortBy::Filename => "filename",
            SortBy::Filesize => "filesize",
        }
    }

    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s.trim())
            .ok_or_else(|| format!("unknown sort key: {s}"))
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaQuery {
    pub page: u32,
    pub per_page: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{DeleteSummary, MediaPage, SortBy, SortOrder};

    #[test]
    fn media_page_decodes_listing_with_extra_fields() {
        let page: MediaPage = serde_json::from_value(json!({
            "media": [{
                "id": 7,
                "filename": "beach.jpg",
                "filepath": "/photos/beach.jpg",
                "org_path": "/photos",
                "capture_time": "2023-06-01T10:00:00",
                "modification_time": null,
                "filesize": 1024,
                "media_type": "image",
                "tags": ["summer", "sea"]
            }],
            "current_page": 2,
            "total_pages": 5,
            "total_items": 90
        }))
        .expect("should decode");
        assert_eq!(page.current_page, 2);
        assert_eq!(page.media[0].tags, vec!["summer", "sea"]);
        assert_eq!(page.media[0].filesize, Some(1024));
        assert_eq!(page.total_items, Some(90));
    }

    #[test]
    fn media_item_without_tags_decodes_empty() {
        let page: MediaPage = serde_json::from_value(json!({
            "media": [{"id": 1, "filename": "a.png"}],
            "current_page": 1,
            "total_pages": 1
        }))
        .expect("should decode");
        assert!(page.media[0].tags.is_empty());
    }

    #[test]
    fn delete_summary_tolerates_error_only_body() {
        let summary: DeleteSummary =
            serde_json::from_value(json!({"error": "Archive path not configured correctly."}))
                .expect("should decode");
        assert_eq!(summary.success_count, 0);
        assert!(summary.failures.is_empty());
        assert!(summary.error.is_some());
    }

    #[test]
    fn delete_failure_id_label_handles_raw_ids() {
        let summary: DeleteSummary = serde_json::from_value(json!({
            "message": "done",
            "success_count": 1,
            "failures": [{"id": 4, "reason": "Not found in DB"}, {"id": "x1", "reason": "Invalid ID format"}]
        }))
        .expect("should decode");
        assert_eq!(summary.failures[0].id_label(), "4");
        assert_eq!(summary.failures[1].id_label(), "x1");
    }

    #[test]
    fn sort_keys_parse_wire_names() {
        assert_eq!("filesize".parse::<SortBy>(), Ok(SortBy::Filesize));
        assert_eq!("ASC".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert!("size".parse::<SortBy>().is_err());
        assert!("date".parse::<SortBy>().is_err());
        assert_eq!(SortBy::Filesize.next(), SortBy::CaptureTime);
    }
}
