use crate::error::Result;
use crate::language::Language;
use std::path::Path;

/// Storage keys for credentials and preferences.
const CLOUD_API_KEY: &str = "cloud_api_key";
const SUMMARY_API_KEY: &str = "summary_api_key";

/// Sled-backed string key/value store for API keys and the preferred
/// voice id per language. No schema beyond string values.
pub struct KeyStore {
    db: sled::Db,
}

impl KeyStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .db
            .get(key)?
            .map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db.insert(key, value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.db.remove(key)?;
        self.db.flush()?;
        Ok(())
    }

    pub fn cloud_api_key(&self) -> Result<Option<String>> {
        self.get(CLOUD_API_KEY)
    }

    pub fn set_cloud_api_key(&self, key: &str) -> Result<()> {
        self.set(CLOUD_API_KEY, key)
    }

    pub fn clear_cloud_api_key(&self) -> Result<()> {
        self.delete(CLOUD_API_KEY)
    }

    pub fn summary_api_key(&self) -> Result<Option<String>> {
        self.get(SUMMARY_API_KEY)
    }

    pub fn set_summary_api_key(&self, key: &str) -> Result<()> {
        self.set(SUMMARY_API_KEY, key)
    }

    pub fn clear_summary_api_key(&self) -> Result<()> {
        self.delete(SUMMARY_API_KEY)
    }

    pub fn voice_for(&self, language: Language) -> Result<Option<String>> {
        self.get(&voice_key(language))
    }

    pub fn set_voice_for(&self, language: Language, voice_id: &str) -> Result<()> {
        self.set(&voice_key(language), voice_id)
    }
}

fn voice_key(language: Language) -> String {
    format!("voice_{}", language.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_get_set_delete_round_trip() {
        let dir = tempdir().unwrap();
        let store = KeyStore::open(&dir.path().join("keys")).unwrap();

        assert_eq!(store.get("missing").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_voice_preference_is_per_language() {
        let dir = tempdir().unwrap();
        let store = KeyStore::open(&dir.path().join("keys")).unwrap();

        store.set_voice_for(Language::En, "en-US-Wavenet-C").unwrap();
        store.set_voice_for(Language::Sv, "sv-SE-Wavenet-A").unwrap();
        assert_eq!(
            store.voice_for(Language::En).unwrap().as_deref(),
            Some("en-US-Wavenet-C")
        );
        assert_eq!(
            store.voice_for(Language::Sv).unwrap().as_deref(),
            Some("sv-SE-Wavenet-A")
        );
    }

    #[test]
    fn test_credential_getters_distinguish_absent_from_failed() {
        let dir = tempdir().unwrap();
        let store = KeyStore::open(&dir.path().join("keys")).unwrap();

        // Absent keys are Ok(None), not an error.
        assert_eq!(store.cloud_api_key().unwrap(), None);
        assert_eq!(store.summary_api_key().unwrap(), None);

        store.set_cloud_api_key("k").unwrap();
        assert_eq!(store.cloud_api_key().unwrap().as_deref(), Some("k"));
        store.clear_cloud_api_key().unwrap();
        assert_eq!(store.cloud_api_key().unwrap(), None);
    }
}
