//! Shared message and source-kind types.

use serde::{Deserialize, Serialize};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message, serialized in the OpenAI wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Recognized origin kinds for ingested content.
///
/// Loaders live outside this workspace; the boundary only accepts content
/// whose origin maps to one of these kinds. Unrecognized extensions resolve
/// to `None` instead of an error so callers can report "unsupported" without
/// catching anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Docx,
    Txt,
    Json,
    Xlsx,
    Csv,
    Pptx,
    Image,
    Audio,
    Site,
    Youtube,
}

impl SourceKind {
    /// Map a file extension (with or without leading dot) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            "json" => Some(Self::Json),
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            "pptx" => Some(Self::Pptx),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            "mp3" | "mp4" | "mpeg" | "mpga" | "m4a" | "wav" | "webm" | "ogg" => Some(Self::Audio),
            _ => None,
        }
    }

    /// Map a stored tag back to a kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            "json" => Some(Self::Json),
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            "pptx" => Some(Self::Pptx),
            "imagem" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            "site" => Some(Self::Site),
            "youtube" => Some(Self::Youtube),
            _ => None,
        }
    }

    /// The tag stored on chunk records. Kept identical to what earlier
    /// deployments wrote so existing stores keep loading.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Json => "json",
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Pptx => "pptx",
            Self::Image => "imagem",
            Self::Audio => "audio",
            Self::Site => "site",
            Self::Youtube => "youtube",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
