use super::{SpeechBackend, Voice, VoiceSource};
use crate::audio::AudioSink;
use crate::config_loader;
use crate::error::{ReaderError, Result};
use crate::language::Language;
use crate::player::PlaybackSpeed;
use async_trait::async_trait;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use wait_timeout::ChildExt;

/// On-device synthesis through espeak-ng. Synthesis is local and fast;
/// rate control is applied at synthesis time as words-per-minute.
pub struct DeviceBackend {
    audio: Arc<AudioSink>,
    binary: String,
    base_wpm: u32,
    timeout: Duration,
}

impl DeviceBackend {
    pub fn new(audio: Arc<AudioSink>) -> Self {
        let (binary, base_wpm, timeout_secs) = {
            let settings = config_loader::SETTINGS.read().unwrap();
            (
                settings.espeak_binary.clone(),
                settings.espeak_base_wpm,
                settings.synthesis_timeout_secs,
            )
        };
        Self {
            audio,
            binary,
            base_wpm,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn synthesize_blocking(
        binary: &str,
        text: &str,
        voice_id: &str,
        wpm: u32,
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        let mut child = Command::new(binary)
            .arg("--stdout")
            .arg("-v")
            .arg(voice_id)
            .arg("-s")
            .arg(wpm.to_string())
            .arg(text)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        match child.wait_timeout(timeout)? {
            Some(status) => {
                let output = child.wait_with_output()?;
                if status.success() {
                    Ok(output.stdout)
                } else {
                    let err_msg = String::from_utf8_lossy(&output.stderr);
                    Err(ReaderError::Synthesis(format!("espeak error: {}", err_msg)))
                }
            }
            None => {
                // Timeout occurred, kill the process
                let _ = child.kill();
                let _ = child.wait();
                Err(ReaderError::Synthesis(format!(
                    "espeak timed out after {:?}",
                    timeout
                )))
            }
        }
    }

    fn list_voices_blocking(binary: &str, language: Language) -> Result<Vec<Voice>> {
        let output = Command::new(binary)
            .arg(format!("--voices={}", language.code()))
            .output()?;

        if !output.status.success() {
            let err_msg = String::from_utf8_lossy(&output.stderr);
            return Err(ReaderError::Synthesis(format!(
                "espeak voice listing failed: {}",
                err_msg
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut voices = Vec::new();
        // Columns: Pty Language Age/Gender VoiceName File Other
        for line in stdout.lines().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                continue;
            }
            let lang = fields[1];
            if !lang.starts_with(language.code()) {
                continue;
            }
            voices.push(Voice {
                id: lang.to_string(),
                name: fields[3].replace('_', " "),
                language: language.code().to_string(),
                source: VoiceSource::Device,
            });
        }
        Ok(voices)
    }
}

#[async_trait]
impl SpeechBackend for DeviceBackend {
    fn id(&self) -> &'static str {
        "device"
    }

    fn supports_rate(&self) -> bool {
        true
    }

    async fn list_voices(&self, language: Language) -> Result<Vec<Voice>> {
        let binary = self.binary.clone();
        tokio::task::spawn_blocking(move || Self::list_voices_blocking(&binary, language))
            .await
            .map_err(|e| ReaderError::Synthesis(format!("voice listing task failed: {}", e)))?
    }

    async fn speak_chunk(&self, text: &str, voice: &Voice, speed: PlaybackSpeed) -> Result<()> {
        let binary = self.binary.clone();
        let text = text.to_string();
        let voice_id = voice.id.clone();
        let wpm = (self.base_wpm as f32 * speed.factor()).round() as u32;
        let timeout = self.timeout;

        let wav = tokio::task::spawn_blocking(move || {
            Self::synthesize_blocking(&binary, &text, &voice_id, wpm, timeout)
        })
        .await
        .map_err(|e| ReaderError::Synthesis(format!("synthesis task failed: {}", e)))??;

        self.audio.play(wav).await
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
