use crate::article::{Article, SavedArticle};
use crate::error::{ReaderError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

const INDEX_KEY: &str = "saved_articles";

/// Progress of a long-running save: chunk `current` of `total` being
/// synthesized.
#[derive(Debug, Clone, Copy)]
pub struct SaveProgress {
    pub current: usize,
    pub total: usize,
}

/// Synthesizes one chunk into an audio buffer. The cloud backend is the
/// production implementation; tests substitute their own.
#[async_trait]
pub trait ChunkSynthesizer: Send + Sync {
    async fn synthesize_chunk(&self, text: &str, voice_id: &str) -> Result<Vec<u8>>;
}

/// Persists articles with one audio file per chunk for offline replay.
/// The index lives in sled as a single most-recent-first list; the audio
/// artifacts live under `audio_dir/<article id>/`.
pub struct ArticleStore {
    db: sled::Db,
    audio_dir: PathBuf,
}

impl ArticleStore {
    pub fn open(db_path: &Path, audio_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(audio_dir)?;
        Ok(Self {
            db: sled::open(db_path)?,
            audio_dir: audio_dir.to_path_buf(),
        })
    }

    /// All saved articles, most recent first.
    pub fn list(&self) -> Result<Vec<SavedArticle>> {
        match self.db.get(INDEX_KEY)? {
            Some(raw) => Ok(serde_json::from_slice(&raw).unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    pub fn load(&self, id: &str) -> Result<Option<SavedArticle>> {
        Ok(self.list()?.into_iter().find(|a| a.id == id))
    }

    pub fn is_saved(&self, url: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|a| a.url == url))
    }

    /// Synthesizes and persists every chunk in order, then indexes the
    /// article. All-or-nothing: any failure deletes the partial audio
    /// directory and leaves the index untouched.
    pub async fn save(
        &self,
        article: &Article,
        chunks: &[String],
        voice_id: &str,
        synth: &dyn ChunkSynthesizer,
        mut on_progress: Option<&mut (dyn FnMut(SaveProgress) + Send)>,
    ) -> Result<SavedArticle> {
        let id = generate_id();
        let article_dir = self.audio_dir.join(&id);
        std::fs::create_dir_all(&article_dir)?;

        let mut audio_files = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if let Some(progress) = on_progress.as_deref_mut() {
                progress(SaveProgress {
                    current: i + 1,
                    total: chunks.len(),
                });
            }

            let audio = match synth.synthesize_chunk(chunk, voice_id).await {
                Ok(audio) => audio,
                Err(e) => {
                    let _ = std::fs::remove_dir_all(&article_dir);
                    return Err(ReaderError::Persistence(format!(
                        "synthesis failed on chunk {} of {}: {}",
                        i + 1,
                        chunks.len(),
                        e
                    )));
                }
            };

            let file_path = article_dir.join(format!("chunk_{}.mp3", i));
            if let Err(e) = std::fs::write(&file_path, &audio) {
                let _ = std::fs::remove_dir_all(&article_dir);
                return Err(ReaderError::Persistence(format!(
                    "could not write audio file: {}",
                    e
                )));
            }
            audio_files.push(file_path);
        }

        let saved = SavedArticle {
            id,
            url: article.url.clone(),
            title: article.title.clone(),
            content: article.content.clone(),
            language: article.language,
            audio_files,
            voice_id: voice_id.to_string(),
            saved_at: chrono::Utc::now().timestamp_millis(),
        };

        let mut index = self.list()?;
        index.insert(0, saved.clone());
        if let Err(e) = self.write_index(&index) {
            let _ = std::fs::remove_dir_all(self.audio_dir.join(&saved.id));
            return Err(e);
        }

        Ok(saved)
    }

    /// Removes the audio files and the index entry together. When file
    /// removal fails the entry stays indexed so nothing is orphaned.
    pub fn delete(&self, id: &str) -> Result<()> {
        let index = self.list()?;
        if !index.iter().any(|a| a.id == id) {
            return Ok(());
        }

        let article_dir = self.audio_dir.join(id);
        if article_dir.exists() {
            std::fs::remove_dir_all(&article_dir).map_err(|e| {
                ReaderError::Persistence(format!("could not delete audio files: {}", e))
            })?;
        }

        let remaining: Vec<SavedArticle> = index.into_iter().filter(|a| a.id != id).collect();
        self.write_index(&remaining)
    }

    fn write_index(&self, index: &[SavedArticle]) -> Result<()> {
        let raw = serde_json::to_vec(index)
            .map_err(|e| ReaderError::Persistence(format!("could not encode index: {}", e)))?;
        self.db.insert(INDEX_KEY, raw)?;
        self.db.flush()?;
        Ok(())
    }
}

/// Opaque article id from the save timestamp; collisions would need two
/// saves in the same nanosecond.
fn generate_id() -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
    format!("{:x}", nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct FakeSynth {
        fail_on: Option<usize>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChunkSynthesizer for FakeSynth {
        async fn synthesize_chunk(&self, _text: &str, _voice_id: &str) -> Result<Vec<u8>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(call) {
                return Err(ReaderError::Synthesis("simulated failure".to_string()));
            }
            Ok(vec![0u8; 16])
        }
    }

    fn sample_article() -> Article {
        Article {
            title: "Title".to_string(),
            author: None,
            content: "Content goes here.".to_string(),
            url: "https://example.com/a".to_string(),
            language: Language::En,
        }
    }

    fn chunks(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Chunk number {}.", i)).collect()
    }

    #[tokio::test]
    async fn test_save_persists_one_file_per_chunk_in_order() {
        let dir = tempdir().unwrap();
        let store = ArticleStore::open(&dir.path().join("db"), &dir.path().join("audio")).unwrap();
        let synth = FakeSynth { fail_on: None, calls: AtomicUsize::new(0) };

        let saved = store
            .save(&sample_article(), &chunks(3), "en-US-Wavenet-A", &synth, None)
            .await
            .unwrap();

        assert_eq!(saved.audio_files.len(), 3);
        for (i, path) in saved.audio_files.iter().enumerate() {
            assert!(path.ends_with(format!("chunk_{}.mp3", i)));
            assert!(path.exists());
        }
        assert!(store.is_saved("https://example.com/a").unwrap());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_no_artifacts_and_no_index_entry() {
        let dir = tempdir().unwrap();
        let store = ArticleStore::open(&dir.path().join("db"), &dir.path().join("audio")).unwrap();
        let synth = FakeSynth { fail_on: Some(3), calls: AtomicUsize::new(0) };

        let err = store
            .save(&sample_article(), &chunks(5), "en-US-Wavenet-A", &synth, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ReaderError::Persistence(_)));
        assert!(store.list().unwrap().is_empty());
        // No partial per-article directory may survive.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("audio"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_index_is_most_recent_first() {
        let dir = tempdir().unwrap();
        let store = ArticleStore::open(&dir.path().join("db"), &dir.path().join("audio")).unwrap();
        let synth = FakeSynth { fail_on: None, calls: AtomicUsize::new(0) };

        let mut first = sample_article();
        first.url = "https://example.com/first".to_string();
        let mut second = sample_article();
        second.url = "https://example.com/second".to_string();

        store.save(&first, &chunks(1), "v", &synth, None).await.unwrap();
        store.save(&second, &chunks(1), "v", &synth, None).await.unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].url, "https://example.com/second");
        assert_eq!(listed[1].url, "https://example.com/first");
    }

    #[tokio::test]
    async fn test_delete_removes_files_and_entry_together() {
        let dir = tempdir().unwrap();
        let store = ArticleStore::open(&dir.path().join("db"), &dir.path().join("audio")).unwrap();
        let synth = FakeSynth { fail_on: None, calls: AtomicUsize::new(0) };

        let saved = store
            .save(&sample_article(), &chunks(2), "v", &synth, None)
            .await
            .unwrap();
        let article_dir = dir.path().join("audio").join(&saved.id);
        assert!(article_dir.exists());

        store.delete(&saved.id).unwrap();
        assert!(!article_dir.exists());
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_progress_counts_every_chunk() {
        let dir = tempdir().unwrap();
        let store = ArticleStore::open(&dir.path().join("db"), &dir.path().join("audio")).unwrap();
        let synth = FakeSynth { fail_on: None, calls: AtomicUsize::new(0) };

        let mut seen = Vec::new();
        let mut callback = |p: SaveProgress| seen.push((p.current, p.total));
        store
            .save(&sample_article(), &chunks(3), "v", &synth, Some(&mut callback))
            .await
            .unwrap();

        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }
}
