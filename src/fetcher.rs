use crate::article::Article;
use crate::config_loader;
use crate::error::{ReaderError, Result};
use crate::extractor;
use std::time::Duration;

/// Builds the HTTP client used for page fetches and cloud calls.
pub fn http_client() -> reqwest::Client {
    let (user_agent, timeout) = {
        let settings = config_loader::SETTINGS.read().unwrap();
        (settings.user_agent.clone(), settings.fetch_timeout_secs)
    };

    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout))
        .build()
        .unwrap_or_default()
}

/// Fetches the raw HTML of a page. Non-2xx responses are an error; the
/// body is never partially consumed.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ReaderError::Fetch {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.text().await?)
}

/// Fetch + extract + language detection in one step.
pub async fn extract_from_url(client: &reqwest::Client, url: &str) -> Result<Article> {
    let html = fetch_page(client, url).await?;
    extractor::extract_article(&html, url)
}
