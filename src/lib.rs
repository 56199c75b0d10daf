pub mod article;
pub mod audio;
pub mod backends;
pub mod chunker;
pub mod config_loader;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod keystore;
pub mod language;
pub mod player;
pub mod storage;
pub mod summarizer;

pub use article::{Article, SavedArticle};
pub use error::{ReaderError, Result};
pub use language::Language;
pub use player::{ArticlePlayer, PlaybackSpeed, PlaybackState};
