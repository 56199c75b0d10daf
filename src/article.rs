use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An extracted article, ready for chunking and playback. Immutable after
/// extraction, except that `content` may be replaced by a summarized
/// version before chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub content: String,
    pub url: String,
    pub language: Language,
}

/// An article persisted with one synthesized audio file per chunk, in
/// chunk order, for offline replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedArticle {
    pub id: String,
    pub url: String,
    pub title: String,
    pub content: String,
    pub language: Language,
    pub audio_files: Vec<PathBuf>,
    pub voice_id: String,
    /// Unix timestamp (milliseconds) of the save.
    pub saved_at: i64,
}

impl SavedArticle {
    pub fn article(&self) -> Article {
        Article {
            title: self.title.clone(),
            author: None,
            content: self.content.clone(),
            url: self.url.clone(),
            language: self.language,
        }
    }
}
