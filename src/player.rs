use crate::article::Article;
use crate::backends::{BackendSelector, SpeechBackend, Voice};
use crate::chunker;
use crate::config_loader;
use crate::error::Result;
use crate::fetcher;
use crate::summarizer;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The discrete playback speeds the player offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackSpeed {
    Half,
    ThreeQuarters,
    Normal,
    OneAndAQuarter,
    OneAndAHalf,
    Double,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 6] = [
        PlaybackSpeed::Half,
        PlaybackSpeed::ThreeQuarters,
        PlaybackSpeed::Normal,
        PlaybackSpeed::OneAndAQuarter,
        PlaybackSpeed::OneAndAHalf,
        PlaybackSpeed::Double,
    ];

    pub fn factor(self) -> f32 {
        match self {
            PlaybackSpeed::Half => 0.5,
            PlaybackSpeed::ThreeQuarters => 0.75,
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::OneAndAQuarter => 1.25,
            PlaybackSpeed::OneAndAHalf => 1.5,
            PlaybackSpeed::Double => 2.0,
        }
    }

    pub fn from_factor(factor: f32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| (s.factor() - factor).abs() < 0.01)
    }

    /// The next faster speed, clamped at the top of the range.
    pub fn faster(self) -> Self {
        let i = Self::ALL.iter().position(|s| *s == self).unwrap_or(2);
        Self::ALL[(i + 1).min(Self::ALL.len() - 1)]
    }

    /// The next slower speed, clamped at the bottom of the range.
    pub fn slower(self) -> Self {
        let i = Self::ALL.iter().position(|s| *s == self).unwrap_or(2);
        Self::ALL[i.saturating_sub(1)]
    }
}

impl std::fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

/// Snapshot of the player's state. Mutated only by `ArticlePlayer`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_paused: bool,
    pub speed: PlaybackSpeed,
    pub current_chunk_index: usize,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_paused: false,
            speed: PlaybackSpeed::Normal,
            current_chunk_index: 0,
        }
    }
}

#[derive(Clone)]
struct Session {
    backend: Arc<dyn SpeechBackend>,
    voice: Voice,
}

struct Shared {
    state: Mutex<PlaybackState>,
    article: Mutex<Option<Article>>,
    chunks: Mutex<Vec<String>>,
    cancelled: AtomicBool,
    session: Mutex<Option<Session>>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    notify: watch::Sender<PlaybackState>,
}

impl Shared {
    fn publish(&self) {
        let snapshot = self.state.lock().unwrap().clone();
        let _ = self.notify.send(snapshot);
    }
}

/// Drives sequential playback of an article's chunks through the selected
/// speech backend, one chunk at a time, never two loops at once.
///
/// Every operation that changes which chunk is playing first signals
/// cancellation, then waits for the backend and the loop task to stop,
/// and only then restarts. Cancellation is checked before each chunk, so
/// its latency is bounded by one chunk's synthesis + playback.
pub struct ArticlePlayer {
    shared: Arc<Shared>,
    selector: Arc<dyn BackendSelector>,
    client: reqwest::Client,
}

impl ArticlePlayer {
    pub fn new(selector: Arc<dyn BackendSelector>, client: reqwest::Client) -> Self {
        let (notify, _) = watch::channel(PlaybackState::default());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PlaybackState::default()),
                article: Mutex::new(None),
                chunks: Mutex::new(Vec::new()),
                cancelled: AtomicBool::new(false),
                session: Mutex::new(None),
                task: tokio::sync::Mutex::new(None),
                notify,
            }),
            selector,
            client,
        }
    }

    /// Observers get a state snapshot after every transition and after
    /// every completed chunk.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.shared.notify.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.state.lock().unwrap().clone()
    }

    pub fn article(&self) -> Option<Article> {
        self.shared.article.lock().unwrap().clone()
    }

    pub fn chunks(&self) -> Vec<String> {
        self.shared.chunks.lock().unwrap().clone()
    }

    pub fn total_chunks(&self) -> usize {
        self.shared.chunks.lock().unwrap().len()
    }

    /// Fetches and extracts an article, replacing whatever was loaded.
    pub async fn load_url(&self, url: &str) -> Result<()> {
        let article = fetcher::extract_from_url(&self.client, url).await?;
        self.load_article(article).await;
        Ok(())
    }

    /// Loads an already-extracted article: stops any running playback,
    /// re-chunks, and rewinds to the start.
    pub async fn load_article(&self, article: Article) {
        self.stop().await;

        let max_chars = config_loader::SETTINGS.read().unwrap().chunk_max_chars;
        let chunks = chunker::split_into_chunks(&article.content, max_chars);

        *self.shared.article.lock().unwrap() = Some(article);
        *self.shared.chunks.lock().unwrap() = chunks;
        {
            let mut state = self.shared.state.lock().unwrap();
            state.current_chunk_index = 0;
            state.is_playing = false;
            state.is_paused = false;
        }
        self.shared.publish();
    }

    /// Replaces the loaded article's content with a summary and
    /// re-chunks. Must happen before playback of the summary starts.
    pub async fn summarize_content(&self, api_key: &str) -> Result<()> {
        let article = match self.article() {
            Some(a) => a,
            None => return Ok(()),
        };

        let summary =
            summarizer::summarize(&self.client, &article.content, article.language, api_key)
                .await?;

        let mut updated = article;
        updated.content = summary;
        self.load_article(updated).await;
        Ok(())
    }

    /// Begins sequential playback from the current chunk index. A no-op
    /// when already playing (including paused) or when nothing is loaded.
    pub async fn play(&self) -> Result<()> {
        if self.state().is_playing {
            return Ok(());
        }
        let language = match self.article() {
            Some(a) => a.language,
            None => return Ok(()),
        };
        if self.total_chunks() == 0 {
            return Ok(());
        }

        let selection = self.selector.select(language).await?;
        *self.shared.session.lock().unwrap() = Some(Session {
            backend: selection.backend,
            voice: selection.voice,
        });
        self.start_loop().await;
        Ok(())
    }

    /// Pauses the backend mid-chunk. Valid only while playing.
    pub async fn pause(&self) {
        let session = {
            let state = self.shared.state.lock().unwrap();
            if !state.is_playing || state.is_paused {
                return;
            }
            self.shared.session.lock().unwrap().clone()
        };
        if let Some(session) = session {
            session.backend.pause().await;
        }
        self.shared.state.lock().unwrap().is_paused = true;
        self.shared.publish();
    }

    /// Resumes a paused backend. Valid only while paused.
    pub async fn resume(&self) {
        let session = {
            let state = self.shared.state.lock().unwrap();
            if !state.is_playing || !state.is_paused {
                return;
            }
            self.shared.session.lock().unwrap().clone()
        };
        if let Some(session) = session {
            session.backend.resume().await;
        }
        self.shared.state.lock().unwrap().is_paused = false;
        self.shared.publish();
    }

    /// Stops playback. The chunk index stays where it was, unlike
    /// natural end-of-sequence completion, which rewinds to 0.
    pub async fn stop(&self) {
        self.halt().await;
        {
            let mut state = self.shared.state.lock().unwrap();
            state.is_playing = false;
            state.is_paused = false;
        }
        self.shared.publish();
    }

    /// Changes the rate used for subsequent chunks. When actively playing
    /// the current chunk is restarted at the new speed, which is audible
    /// and accepted for the sake of immediate effect.
    pub async fn set_speed(&self, speed: PlaybackSpeed) {
        let restart = {
            let mut state = self.shared.state.lock().unwrap();
            state.speed = speed;
            state.is_playing && !state.is_paused
        };
        self.shared.publish();

        if restart {
            self.halt().await;
            self.start_loop().await;
        }
    }

    pub async fn skip_forward(&self) {
        let total = self.total_chunks();
        if total == 0 {
            return;
        }
        let target = {
            let state = self.shared.state.lock().unwrap();
            (state.current_chunk_index + 1).min(total - 1)
        };
        self.skip_to(target).await;
    }

    pub async fn skip_back(&self) {
        if self.total_chunks() == 0 {
            return;
        }
        let target = {
            let state = self.shared.state.lock().unwrap();
            state.current_chunk_index.saturating_sub(1)
        };
        self.skip_to(target).await;
    }

    /// Moves to a clamped chunk index. Restarts playback there when a
    /// session is active, otherwise just repositions for the next play.
    async fn skip_to(&self, target: usize) {
        let playing = self.state().is_playing;
        if playing {
            self.halt().await;
        }
        self.shared.state.lock().unwrap().current_chunk_index = target;
        self.shared.publish();
        if playing {
            self.start_loop().await;
        }
    }

    /// Cancels the chunk loop and waits for both the backend and the loop
    /// task to come to rest. The one teardown path every exit uses.
    async fn halt(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        let session = { self.shared.session.lock().unwrap().clone() };
        if let Some(session) = session {
            session.backend.stop().await;
        }
        let handle = self.shared.task.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Spawns the chunk loop for the current session. Callers must have
    /// halted any previous loop first.
    async fn start_loop(&self) {
        let session = match { self.shared.session.lock().unwrap().clone() } {
            Some(s) => s,
            None => return,
        };

        self.shared.cancelled.store(false, Ordering::SeqCst);
        {
            let mut state = self.shared.state.lock().unwrap();
            state.is_playing = true;
            state.is_paused = false;
        }
        self.shared.publish();

        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            run_loop(shared, session).await;
        });
        *self.shared.task.lock().await = Some(handle);
    }
}

async fn run_loop(shared: Arc<Shared>, session: Session) {
    let total = shared.chunks.lock().unwrap().len();
    let start = shared.state.lock().unwrap().current_chunk_index;

    for i in start..total {
        if shared.cancelled.load(Ordering::SeqCst) {
            return;
        }

        let (chunk, speed) = {
            let chunks = shared.chunks.lock().unwrap();
            let mut state = shared.state.lock().unwrap();
            state.current_chunk_index = i;
            (chunks[i].clone(), state.speed)
        };
        shared.publish();

        if let Err(e) = session
            .backend
            .speak_chunk(&chunk, &session.voice, speed)
            .await
        {
            // A failed chunk aborts the loop back to idle; the index
            // stays at the chunk that failed.
            eprintln!("Playback aborted at chunk {}/{}: {}", i + 1, total, e);
            let mut state = shared.state.lock().unwrap();
            state.is_playing = false;
            state.is_paused = false;
            drop(state);
            shared.publish();
            return;
        }
    }

    if !shared.cancelled.load(Ordering::SeqCst) {
        // Natural completion rewinds to the start.
        let mut state = shared.state.lock().unwrap();
        state.is_playing = false;
        state.is_paused = false;
        state.current_chunk_index = 0;
        drop(state);
        shared.publish();
    }
}
