use crate::config_loader;
use crate::error::{ReaderError, Result};
use crate::language::Language;
use serde_json::json;

/// Summary length guidance, tiered by the article's word count.
fn length_guidance(word_count: usize) -> &'static str {
    if word_count < 500 {
        "a few short bullet points"
    } else if word_count <= 1500 {
        "one concise paragraph"
    } else {
        "a multi-paragraph summary covering the key points"
    }
}

/// Summarizes article text through a generateContent-style endpoint.
/// The prompt asks for a length proportional to the input and for the
/// response to stay in the article's language.
pub async fn summarize(
    client: &reqwest::Client,
    text: &str,
    language: Language,
    api_key: &str,
) -> Result<String> {
    let (endpoint, model) = {
        let settings = config_loader::SETTINGS.read().unwrap();
        (settings.summary_endpoint.clone(), settings.summary_model.clone())
    };

    let word_count = text.split_whitespace().count();
    let prompt = format!(
        "Summarize the following article as {}. Respond in {}. \
         Output plain text suitable for reading aloud, without markdown.\n\n{}",
        length_guidance(word_count),
        language.name_english(),
        text
    );

    let url = format!("{}/models/{}:generateContent?key={}", endpoint, model, api_key);
    let response = client
        .post(&url)
        .json(&json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("summarization request failed")
            .to_string();
        return Err(ReaderError::Summarization(message));
    }

    let body: serde_json::Value = response.json().await?;
    body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ReaderError::Summarization("empty response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_guidance_tiers() {
        assert!(length_guidance(100).contains("bullet"));
        assert!(length_guidance(1000).contains("paragraph"));
        assert!(length_guidance(5000).contains("multi-paragraph"));
    }
}
