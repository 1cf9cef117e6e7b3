use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Level {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub level_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Module {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub group_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Section {
    pub id: Uuid,
    pub module_id: Uuid,
    pub name: String,
    pub order_index: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FileEntry {
    pub id: Uuid,
    pub section_id: Uuid,
    pub title: String,
    pub file_url: String,
    pub file_type: FileKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Announcement {
    pub id: Uuid,
    pub level_id: Uuid,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Media category of an uploaded file, derived from its extension only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Video,
    Pdf,
    #[serde(other)]
    File,
}

impl FileKind {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" => FileKind::Image,
            "mp4" | "webm" => FileKind::Video,
            "pdf" => FileKind::Pdf,
            _ => FileKind::File,
        }
    }

    pub fn from_file_name(name: &str) -> Self {
        extension_of(name)
            .map(|ext| Self::from_extension(&ext))
            .unwrap_or(FileKind::File)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Video => "video",
            FileKind::Pdf => "pdf",
            FileKind::File => "file",
        }
    }

    pub fn label_fr(&self) -> &'static str {
        match self {
            FileKind::Image => "Image",
            FileKind::Video => "Vidéo",
            FileKind::Pdf => "PDF",
            FileKind::File => "Fichier",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            FileKind::Image => "🖼",
            FileKind::Video => "🎬",
            FileKind::Pdf => "📕",
            FileKind::File => "📄",
        }
    }
}

/// Lowercased extension of a file name, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}
