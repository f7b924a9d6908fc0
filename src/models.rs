use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Text,
    Pdf,
    Image,
    Doc,
    Url,
}

impl DocumentKind {
    /// Classifies an uploaded payload. PDF wins over image, image over Word,
    /// and anything unrecognised is treated as text.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();

        if mime.contains("pdf") {
            DocumentKind::Pdf
        } else if mime.starts_with("image/") {
            DocumentKind::Image
        } else if mime.contains("word") || mime.contains("msword") {
            DocumentKind::Doc
        } else {
            DocumentKind::Text
        }
    }
}

/// Where a document's content lives. File-backed and link documents never
/// share fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    File {
        #[serde(rename = "filePath")]
        file_path: String,
        #[serde(rename = "fileSize")]
        file_size: u64,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Link {
        url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(flatten)]
    pub location: Location,
    pub owner: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending_delete: bool,
}

impl Document {
    pub fn new_file(
        owner: String,
        name: String,
        file_path: String,
        file_size: u64,
        mime_type: String,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            kind: DocumentKind::from_mime(&mime_type),
            location: Location::File {
                file_path,
                file_size,
                mime_type,
            },
            owner,
            tags: normalize_tags(tags),
            processed: false,
            created_at: Utc::now(),
            pending_delete: false,
        }
    }

    pub fn new_link(owner: String, name: String, url: String, tags: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            kind: DocumentKind::Url,
            location: Location::Link { url },
            owner,
            tags: normalize_tags(tags),
            processed: true,
            created_at: Utc::now(),
            pending_delete: false,
        }
    }

    pub fn file_path(&self) -> Option<&str> {
        match &self.location {
            Location::File { file_path, .. } => Some(file_path),
            Location::Link { .. } => None,
        }
    }
}

/// Trims tags, drops blanks and collapses duplicates (first one wins).
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Reads a multipart `tags` field: a JSON array or a comma-separated list.
pub fn parse_tag_field(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        if let Ok(tags) = serde_json::from_str::<Vec<String>>(raw) {
            return normalize_tags(tags);
        }
    }
    normalize_tags(raw.split(',').map(str::to_string).collect())
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateUrlDocumentRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateDocumentRequest {
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteDocumentResponse {
    pub message: String,
    pub id: String,
}
