pub mod cloud;
pub mod device;

use crate::audio::AudioSink;
use crate::error::Result;
use crate::keystore::KeyStore;
use crate::language::Language;
use crate::player::PlaybackSpeed;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which engine a voice belongs to. Voice ids are unique per backend,
/// not globally: a device id means nothing to the cloud catalog and
/// vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceSource {
    Device,
    Cloud,
}

/// Represents a text-to-speech voice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language: String,
    pub source: VoiceSource,
}

/// Trait both speech backends implement. The capability set is not fully
/// symmetric: the device engine honors the playback rate, the cloud
/// engine speaks at its fixed natural rate; and a cloud synthesis call in
/// flight cannot be cancelled, only the playback that follows it.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Short backend id ("device" or "cloud").
    fn id(&self) -> &'static str;

    /// Whether `speak_chunk` honors the rate argument.
    fn supports_rate(&self) -> bool;

    /// Returns the voices available for a language.
    async fn list_voices(&self, language: Language) -> Result<Vec<Voice>>;

    /// Speaks one chunk to completion. Resolves when the chunk has
    /// finished playing or was stopped; the two resolve identically.
    async fn speak_chunk(&self, text: &str, voice: &Voice, speed: PlaybackSpeed) -> Result<()>;

    async fn pause(&self);

    async fn resume(&self);

    /// Stops playback and waits until the halt is observable.
    async fn stop(&self);
}

/// A resolved backend plus the voice the session will speak with.
pub struct BackendSelection {
    pub backend: Arc<dyn SpeechBackend>,
    pub voice: Voice,
}

/// Chooses which backend a playback session uses.
#[async_trait]
pub trait BackendSelector: Send + Sync {
    async fn select(&self, language: Language) -> Result<BackendSelection>;
}

/// Selection backed by the key store: the cloud backend whenever a cloud
/// credential is present, the device backend otherwise. A stored voice id
/// that does not exist under the chosen backend is re-resolved to that
/// backend's default and written back, so switching backends never leaves
/// a stale selection behind.
pub struct StoredSelector {
    store: Arc<KeyStore>,
    audio: Arc<AudioSink>,
    client: reqwest::Client,
}

impl StoredSelector {
    pub fn new(store: Arc<KeyStore>, audio: Arc<AudioSink>, client: reqwest::Client) -> Self {
        Self {
            store,
            audio,
            client,
        }
    }
}

#[async_trait]
impl BackendSelector for StoredSelector {
    async fn select(&self, language: Language) -> Result<BackendSelection> {
        let stored_id = self.store.voice_for(language)?;

        if let Some(api_key) = self.store.cloud_api_key()? {
            let backend = Arc::new(cloud::CloudBackend::new(
                self.client.clone(),
                api_key,
                self.audio.clone(),
            ));
            let voice = cloud::resolve_voice(stored_id.as_deref(), language);
            if stored_id.as_deref() != Some(voice.id.as_str()) {
                self.store.set_voice_for(language, &voice.id)?;
            }
            return Ok(BackendSelection { backend, voice });
        }

        let backend = Arc::new(device::DeviceBackend::new(self.audio.clone()));
        let voices = backend.list_voices(language).await?;
        let voice = voices
            .iter()
            .find(|v| Some(v.id.as_str()) == stored_id.as_deref())
            .or_else(|| voices.first())
            .cloned()
            .ok_or_else(|| {
                crate::error::ReaderError::Synthesis(format!(
                    "no device voice available for language {}",
                    language
                ))
            })?;
        if stored_id.as_deref() != Some(voice.id.as_str()) {
            self.store.set_voice_for(language, &voice.id)?;
        }
        Ok(BackendSelection { backend, voice })
    }
}
