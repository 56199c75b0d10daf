use clap::{Parser, Subcommand};
use lyssna::audio::AudioSink;
use lyssna::backends::{BackendSelector, StoredSelector, VoiceSource};
use lyssna::config_loader;
use lyssna::error::Result;
use lyssna::keystore::KeyStore;
use lyssna::language::Language;
use lyssna::player::{ArticlePlayer, PlaybackSpeed};
use lyssna::storage::{ArticleStore, ChunkSynthesizer, SaveProgress};
use lyssna::{backends, fetcher};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "lyssna", version, about = "Fetch a web article and listen to it")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch an article and read it aloud
    Read {
        url: String,
        /// Summarize the article before reading (needs a summary API key)
        #[arg(long)]
        summarize: bool,
        /// Playback speed factor (0.5, 0.75, 1, 1.25, 1.5, 2)
        #[arg(long)]
        speed: Option<f32>,
        /// Voice id to use for this article's language
        #[arg(long)]
        voice: Option<String>,
    },
    /// List the voices available for a language
    Voices {
        #[arg(long, default_value = "en")]
        language: Language,
    },
    /// Synthesize an article with the cloud voice and keep the audio
    Save { url: String },
    /// Saved articles: list, replay offline, or delete
    Saved {
        #[command(subcommand)]
        command: SavedCommand,
    },
    /// Manage the cloud TTS API key
    Key {
        #[command(subcommand)]
        command: KeyCommand,
    },
    /// Manage the summarization API key
    SummaryKey {
        #[command(subcommand)]
        command: SummaryKeyCommand,
    },
    /// Set the preferred voice for a language
    Voice { language: Language, voice_id: String },
}

#[derive(Subcommand)]
enum SavedCommand {
    List,
    Play { id: String },
    Delete { id: String },
}

#[derive(Subcommand)]
enum KeyCommand {
    Set { key: String },
    Clear,
    Validate,
}

#[derive(Subcommand)]
enum SummaryKeyCommand {
    Set { key: String },
    Clear,
}

fn data_path(file: &str) -> PathBuf {
    let dir = PathBuf::from(config_loader::SETTINGS.read().unwrap().data_dir.clone());
    dir.join(file)
}

fn open_keystore() -> Result<KeyStore> {
    let path = data_path("keys");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    KeyStore::open(&path)
}

fn open_article_store() -> Result<ArticleStore> {
    ArticleStore::open(&data_path("articles"), &data_path("saved_audio"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Read {
            url,
            summarize,
            speed,
            voice,
        } => read(&url, summarize, speed, voice).await,
        Command::Voices { language } => list_voices(language).await,
        Command::Save { url } => save(&url).await,
        Command::Saved { command } => match command {
            SavedCommand::List => saved_list(),
            SavedCommand::Play { id } => saved_play(&id).await,
            SavedCommand::Delete { id } => saved_delete(&id),
        },
        Command::Key { command } => match command {
            KeyCommand::Set { key } => {
                open_keystore()?.set_cloud_api_key(&key)?;
                println!("Cloud API key saved");
                Ok(())
            }
            KeyCommand::Clear => {
                open_keystore()?.clear_cloud_api_key()?;
                println!("Cloud API key cleared");
                Ok(())
            }
            KeyCommand::Validate => validate_key().await,
        },
        Command::SummaryKey { command } => match command {
            SummaryKeyCommand::Set { key } => {
                open_keystore()?.set_summary_api_key(&key)?;
                println!("Summary API key saved");
                Ok(())
            }
            SummaryKeyCommand::Clear => {
                open_keystore()?.clear_summary_api_key()?;
                println!("Summary API key cleared");
                Ok(())
            }
        },
        Command::Voice { language, voice_id } => {
            open_keystore()?.set_voice_for(language, &voice_id)?;
            println!("Preferred {} voice set to {}", language.name_english(), voice_id);
            Ok(())
        }
    }
}

async fn read(url: &str, summarize: bool, speed: Option<f32>, voice: Option<String>) -> Result<()> {
    let store = Arc::new(open_keystore()?);
    let audio = Arc::new(AudioSink::new()?);
    let client = fetcher::http_client();
    let selector = Arc::new(StoredSelector::new(store.clone(), audio, client.clone()));
    let player = ArticlePlayer::new(selector, client);

    println!("Fetching {}", url);
    player.load_url(url).await?;

    let article = player.article().ok_or(lyssna::ReaderError::Extraction)?;
    println!("\"{}\" [{}]", article.title, article.language.name_english());

    if let Some(voice_id) = voice {
        store.set_voice_for(article.language, &voice_id)?;
    }

    if summarize {
        match store.summary_api_key()? {
            Some(key) => {
                println!("Summarizing...");
                player.summarize_content(&key).await?;
            }
            None => {
                eprintln!("No summary API key set (lyssna summary-key set <key>); reading full text");
            }
        }
    }

    if let Some(factor) = speed {
        match PlaybackSpeed::from_factor(factor) {
            Some(s) => player.set_speed(s).await,
            None => eprintln!("Unsupported speed {}; using 1x", factor),
        }
    }

    println!("{} chunks. Controls: p=pause r=resume n=next b=back +=faster -=slower s=stop", player.total_chunks());
    player.play().await?;

    control_loop(&player).await;
    Ok(())
}

/// Reads single-letter commands from stdin until playback ends or the
/// user stops it.
async fn control_loop(player: &ArticlePlayer) {
    let mut state_rx = player.subscribe();
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdin_open = true;

    loop {
        if !player.state().is_playing {
            break;
        }
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow().clone();
                if state.is_playing {
                    println!("Chunk {}/{} ({})", state.current_chunk_index + 1, player.total_chunks(), state.speed);
                } else {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    _ => {
                        stdin_open = false;
                        continue;
                    }
                };
                match line.trim() {
                    "p" => player.pause().await,
                    "r" => player.resume().await,
                    "n" => player.skip_forward().await,
                    "b" => player.skip_back().await,
                    "+" => {
                        let speed = player.state().speed.faster();
                        player.set_speed(speed).await;
                    }
                    "-" => {
                        let speed = player.state().speed.slower();
                        player.set_speed(speed).await;
                    }
                    "s" | "q" => {
                        player.stop().await;
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
    println!("Done.");
}

async fn list_voices(language: Language) -> Result<()> {
    let store = Arc::new(open_keystore()?);
    let audio = Arc::new(AudioSink::new()?);
    let client = fetcher::http_client();
    let selector = StoredSelector::new(store.clone(), audio, client);

    let selection = selector.select(language).await?;
    let voices = selection.backend.list_voices(language).await?;
    println!(
        "{} voices ({} backend):",
        language.name_english(),
        selection.backend.id()
    );
    for voice in voices {
        let marker = if voice.id == selection.voice.id { "*" } else { " " };
        let source = match voice.source {
            VoiceSource::Device => "device",
            VoiceSource::Cloud => "cloud",
        };
        println!(" {} {:<18} {} [{}]", marker, voice.id, voice.name, source);
    }
    Ok(())
}

async fn save(url: &str) -> Result<()> {
    let store = open_keystore()?;
    let api_key = store.cloud_api_key()?.ok_or_else(|| {
        lyssna::ReaderError::CredentialInvalid(
            "saving requires a cloud API key (lyssna key set <key>)".to_string(),
        )
    })?;

    let client = fetcher::http_client();
    let article = fetcher::extract_from_url(&client, url).await?;
    let articles = open_article_store()?;
    if articles.is_saved(url)? {
        println!("Already saved: {}", url);
        return Ok(());
    }

    let max_chars = config_loader::SETTINGS.read().unwrap().chunk_max_chars;
    let chunks = lyssna::chunker::split_into_chunks(&article.content, max_chars);
    let voice = backends::cloud::resolve_voice(
        store.voice_for(article.language)?.as_deref(),
        article.language,
    );

    // Synthesis-only use of the cloud backend; no audio sink needed.
    let synth = CloudSynth {
        client,
        api_key,
        endpoint: config_loader::SETTINGS.read().unwrap().tts_endpoint.clone(),
    };

    println!("Saving \"{}\" ({} chunks, voice {})", article.title, chunks.len(), voice.id);
    let mut progress = |p: SaveProgress| {
        println!("Synthesizing chunk {}/{}", p.current, p.total);
    };
    let saved = articles
        .save(&article, &chunks, &voice.id, &synth, Some(&mut progress))
        .await?;
    println!("Saved as {}", saved.id);
    Ok(())
}

struct CloudSynth {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[async_trait::async_trait]
impl ChunkSynthesizer for CloudSynth {
    async fn synthesize_chunk(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        backends::cloud::synthesize(&self.client, &self.endpoint, &self.api_key, text, voice_id)
            .await
    }
}

fn saved_list() -> Result<()> {
    let articles = open_article_store()?.list()?;
    if articles.is_empty() {
        println!("No saved articles");
        return Ok(());
    }
    for a in articles {
        println!(
            "{}  \"{}\" [{}] {} chunks  {}",
            a.id,
            a.title,
            a.language,
            a.audio_files.len(),
            a.url
        );
    }
    Ok(())
}

async fn saved_play(id: &str) -> Result<()> {
    let store = open_article_store()?;
    let saved = store.load(id)?.ok_or_else(|| {
        lyssna::ReaderError::Persistence(format!("no saved article with id {}", id))
    })?;

    let audio = AudioSink::new()?;
    println!("Replaying \"{}\" ({} chunks)", saved.title, saved.audio_files.len());
    for (i, path) in saved.audio_files.iter().enumerate() {
        println!("Chunk {}/{}", i + 1, saved.audio_files.len());
        let data = std::fs::read(path)?;
        audio.play(data).await?;
    }
    println!("Done.");
    Ok(())
}

fn saved_delete(id: &str) -> Result<()> {
    open_article_store()?.delete(id)?;
    println!("Deleted {}", id);
    Ok(())
}

async fn validate_key() -> Result<()> {
    let store = open_keystore()?;
    let key = store.cloud_api_key()?.ok_or_else(|| {
        lyssna::ReaderError::CredentialInvalid("no cloud API key set".to_string())
    })?;
    let client = fetcher::http_client();
    let endpoint = config_loader::SETTINGS.read().unwrap().tts_endpoint.clone();
    backends::cloud::validate_api_key(&client, &endpoint, &key).await?;
    println!("Cloud API key is valid");
    Ok(())
}
