use super::{SpeechBackend, Voice, VoiceSource};
use crate::audio::AudioSink;
use crate::config_loader;
use crate::error::{ReaderError, Result};
use crate::language::Language;
use crate::player::PlaybackSpeed;
use crate::storage::ChunkSynthesizer;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use std::sync::Arc;

struct CatalogVoice {
    id: &'static str,
    name: &'static str,
    locale: &'static str,
}

// The cloud voice catalog is fixed: these are the Wavenet voices the
// service exposes for the two supported locales.
const SWEDISH_VOICES: [CatalogVoice; 5] = [
    CatalogVoice { id: "sv-SE-Wavenet-A", name: "Swedish Female 1", locale: "sv-SE" },
    CatalogVoice { id: "sv-SE-Wavenet-B", name: "Swedish Female 2", locale: "sv-SE" },
    CatalogVoice { id: "sv-SE-Wavenet-C", name: "Swedish Female 3", locale: "sv-SE" },
    CatalogVoice { id: "sv-SE-Wavenet-D", name: "Swedish Male 1", locale: "sv-SE" },
    CatalogVoice { id: "sv-SE-Wavenet-E", name: "Swedish Male 2", locale: "sv-SE" },
];

const ENGLISH_VOICES: [CatalogVoice; 6] = [
    CatalogVoice { id: "en-US-Wavenet-A", name: "English Male 1", locale: "en-US" },
    CatalogVoice { id: "en-US-Wavenet-B", name: "English Male 2", locale: "en-US" },
    CatalogVoice { id: "en-US-Wavenet-C", name: "English Female 1", locale: "en-US" },
    CatalogVoice { id: "en-US-Wavenet-D", name: "English Male 3", locale: "en-US" },
    CatalogVoice { id: "en-US-Wavenet-E", name: "English Female 2", locale: "en-US" },
    CatalogVoice { id: "en-US-Wavenet-F", name: "English Female 3", locale: "en-US" },
];

fn catalog_for(language: Language) -> &'static [CatalogVoice] {
    match language {
        Language::Sv => &SWEDISH_VOICES,
        Language::En => &ENGLISH_VOICES,
    }
}

/// The full cloud voice list for a language.
pub fn catalog(language: Language) -> Vec<Voice> {
    catalog_for(language)
        .iter()
        .map(|v| Voice {
            id: v.id.to_string(),
            name: v.name.to_string(),
            language: language.code().to_string(),
            source: VoiceSource::Cloud,
        })
        .collect()
}

/// Resolves a (possibly stale) stored voice id against the cloud catalog.
/// Ids from the other backend, or unknown ids, fall back to the first
/// catalog voice for the language.
pub fn resolve_voice(stored_id: Option<&str>, language: Language) -> Voice {
    let voices = catalog(language);
    voices
        .iter()
        .find(|v| Some(v.id.as_str()) == stored_id)
        .cloned()
        .unwrap_or_else(|| voices[0].clone())
}

fn locale_for_voice(voice_id: &str) -> Result<&'static str> {
    SWEDISH_VOICES
        .iter()
        .chain(ENGLISH_VOICES.iter())
        .find(|v| v.id == voice_id)
        .map(|v| v.locale)
        .ok_or_else(|| ReaderError::Synthesis(format!("voice not found: {}", voice_id)))
}

/// Synthesizes one chunk into a complete MP3 buffer. One call per chunk;
/// there is no way to cancel a request already in flight.
pub async fn synthesize(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    text: &str,
    voice_id: &str,
) -> Result<Vec<u8>> {
    let locale = locale_for_voice(voice_id)?;

    let url = format!("{}/text:synthesize?key={}", endpoint, api_key);
    let response = client
        .post(&url)
        .json(&json!({
            "input": { "text": text },
            "voice": { "languageCode": locale, "name": voice_id },
            "audioConfig": { "audioEncoding": "MP3", "speakingRate": 1.0 }
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("failed to synthesize speech")
            .to_string();
        return Err(ReaderError::Synthesis(message));
    }

    let body: serde_json::Value = response.json().await?;
    let audio_b64 = body["audioContent"]
        .as_str()
        .ok_or_else(|| ReaderError::Synthesis("response had no audio content".to_string()))?;

    BASE64
        .decode(audio_b64)
        .map_err(|e| ReaderError::Synthesis(format!("invalid audio payload: {}", e)))
}

/// Lightweight credential check against the voice-listing endpoint.
pub async fn validate_api_key(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
) -> Result<()> {
    let url = format!("{}/voices?key={}", endpoint, api_key);
    let response = client.get(&url).send().await?;

    if response.status().is_success() {
        return Ok(());
    }

    let status = response.status().as_u16();
    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let message = body["error"]["message"]
        .as_str()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("Error {}", status));
    Err(ReaderError::CredentialInvalid(message))
}

/// Cloud synthesis + local playback. Pause/resume/stop act on the audio
/// sink only; rate control is not supported (the cloud voice speaks at
/// its fixed natural rate).
pub struct CloudBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    audio: Arc<AudioSink>,
}

impl CloudBackend {
    pub fn new(client: reqwest::Client, api_key: String, audio: Arc<AudioSink>) -> Self {
        let endpoint = config_loader::SETTINGS.read().unwrap().tts_endpoint.clone();
        Self {
            client,
            api_key,
            endpoint,
            audio,
        }
    }
}

#[async_trait]
impl SpeechBackend for CloudBackend {
    fn id(&self) -> &'static str {
        "cloud"
    }

    fn supports_rate(&self) -> bool {
        false
    }

    async fn list_voices(&self, language: Language) -> Result<Vec<Voice>> {
        Ok(catalog(language))
    }

    /// A pause requested while synthesis is in flight takes effect only
    /// once the synthesized audio reaches the (then paused) sink.
    async fn speak_chunk(&self, text: &str, voice: &Voice, _speed: PlaybackSpeed) -> Result<()> {
        let data = synthesize(&self.client, &self.endpoint, &self.api_key, text, &voice.id).await?;
        self.audio.play(data).await
    }

    async fn pause(&self) {
        self.audio.pause();
    }

    async fn resume(&self) {
        self.audio.resume();
    }

    async fn stop(&self) {
        self.audio.stop().await;
    }
}

#[async_trait]
impl ChunkSynthesizer for CloudBackend {
    async fn synthesize_chunk(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        synthesize(&self.client, &self.endpoint, &self.api_key, text, voice_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sizes_and_tagging() {
        assert_eq!(catalog(Language::Sv).len(), 5);
        assert_eq!(catalog(Language::En).len(), 6);
        assert!(catalog(Language::En)
            .iter()
            .all(|v| v.source == VoiceSource::Cloud));
    }

    #[test]
    fn test_known_voice_id_is_kept() {
        let voice = resolve_voice(Some("en-US-Wavenet-C"), Language::En);
        assert_eq!(voice.id, "en-US-Wavenet-C");
    }

    #[test]
    fn test_stale_device_id_resolves_to_cloud_default() {
        // A device voice id selected before the credential was added must
        // not survive the backend switch.
        let voice = resolve_voice(Some("en-gb"), Language::En);
        assert_eq!(voice.id, "en-US-Wavenet-A");
        assert_eq!(voice.source, VoiceSource::Cloud);
    }

    #[test]
    fn test_missing_id_resolves_to_default_per_language() {
        assert_eq!(resolve_voice(None, Language::Sv).id, "sv-SE-Wavenet-A");
        assert_eq!(resolve_voice(None, Language::En).id, "en-US-Wavenet-A");
    }

    #[test]
    fn test_unknown_voice_has_no_locale() {
        assert!(locale_for_voice("nope").is_err());
        assert_eq!(locale_for_voice("sv-SE-Wavenet-D").unwrap(), "sv-SE");
    }
}
