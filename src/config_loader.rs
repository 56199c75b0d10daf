use config::{Config, File};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::sync::RwLock;

#[derive(Debug, Deserialize)]
pub struct Settings {
    // Fetching
    pub user_agent: String,
    pub fetch_timeout_secs: u64,
    // Extraction / chunking
    pub min_content_chars: usize,
    pub chunk_max_chars: usize,
    // Device synthesis (espeak-ng)
    pub espeak_binary: String,
    pub espeak_base_wpm: u32,
    pub synthesis_timeout_secs: u64,
    // Cloud synthesis
    pub tts_endpoint: String,
    // Summarization
    pub summary_endpoint: String,
    pub summary_model: String,
    // Storage
    pub data_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; Lyssna/0.3)".to_string(),
            fetch_timeout_secs: 20,
            min_content_chars: 100,
            chunk_max_chars: 500,
            espeak_binary: "espeak-ng".to_string(),
            espeak_base_wpm: 175,
            synthesis_timeout_secs: 30,
            tts_endpoint: "https://texttospeech.googleapis.com/v1".to_string(),
            summary_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            summary_model: "gemini-1.5-flash".to_string(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("lyssna")
        .to_string_lossy()
        .into_owned()
}

lazy_static! {
    pub static ref SETTINGS: RwLock<Settings> =
        RwLock::new(Settings::new().expect("Failed to load settings"));
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = Config::builder()
            // Connect to defaults
            .set_default("user_agent", "Mozilla/5.0 (compatible; Lyssna/0.3)")?
            .set_default("fetch_timeout_secs", 20)?
            .set_default("min_content_chars", 100)?
            .set_default("chunk_max_chars", 500)?
            .set_default("espeak_binary", "espeak-ng")?
            .set_default("espeak_base_wpm", 175)?
            .set_default("synthesis_timeout_secs", 30)?
            .set_default("tts_endpoint", "https://texttospeech.googleapis.com/v1")?
            .set_default(
                "summary_endpoint",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("summary_model", "gemini-1.5-flash")?
            .set_default("data_dir", default_data_dir())?
            // Merge with local config file (if exists)
            .add_source(File::with_name("Lyssna").required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.config/lyssna/Lyssna",
                    std::env::var("HOME").unwrap_or_default()
                ))
                .required(false),
            )
            // Merge with environment variables (e.g. LYSSNA_TTS_ENDPOINT)
            .add_source(config::Environment::with_prefix("LYSSNA"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.chunk_max_chars == 0 {
            return Err(config::ConfigError::Message(
                "chunk_max_chars must be greater than 0".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "fetch_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.espeak_base_wpm < 80 || self.espeak_base_wpm > 450 {
            return Err(config::ConfigError::Message(format!(
                "Invalid espeak_base_wpm: {}. Must be between 80 and 450",
                self.espeak_base_wpm
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load() {
        let settings = Settings::new().expect("Failed to load settings");
        assert!(settings.chunk_max_chars > 0);
        assert!(settings.min_content_chars > 0);
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let settings = Settings {
            chunk_max_chars: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
