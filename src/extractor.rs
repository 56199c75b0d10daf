use crate::article::Article;
use crate::config_loader;
use crate::error::{ReaderError, Result};
use crate::language;
use lazy_static::lazy_static;
use regex::Regex;

/// Fragments shorter than this are presumed navigation labels and dropped
/// by the boilerplate filter.
const MIN_FRAGMENT_CHARS: usize = 50;

/// Plain-text result of stripping a raw HTML document.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub title: String,
    pub content: String,
}

lazy_static! {
    static ref TITLE: Regex = Regex::new(r"(?is)<title[^>]*>([^<]*)</title>").unwrap();
    // Non-content containers removed whole, contents included. Must run
    // before the generic tag strip or their text would leak through.
    static ref SCRIPT: Regex = Regex::new(r"(?is)<script\b.*?</script>").unwrap();
    static ref STYLE: Regex = Regex::new(r"(?is)<style\b.*?</style>").unwrap();
    static ref NOSCRIPT: Regex = Regex::new(r"(?is)<noscript\b.*?</noscript>").unwrap();
    static ref NAV: Regex = Regex::new(r"(?is)<nav\b.*?</nav>").unwrap();
    static ref HEADER: Regex = Regex::new(r"(?is)<header\b.*?</header>").unwrap();
    static ref FOOTER: Regex = Regex::new(r"(?is)<footer\b.*?</footer>").unwrap();
    static ref ASIDE: Regex = Regex::new(r"(?is)<aside\b.*?</aside>").unwrap();
    static ref ARTICLE_TAG: Regex = Regex::new(r"(?is)<article[^>]*>(.*?)</article>").unwrap();
    static ref MAIN_TAG: Regex = Regex::new(r"(?is)<main[^>]*>(.*?)</main>").unwrap();
    static ref ANY_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref FRAGMENT_BOUNDARY: Regex = Regex::new(r"\.\s+").unwrap();
}

/// The fixed entity table. Anything outside it is left as-is.
const ENTITIES: [(&str, &str); 12] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&rsquo;", "'"),
    ("&lsquo;", "'"),
    ("&rdquo;", "\""),
    ("&ldquo;", "\""),
    ("&mdash;", "\u{2014}"),
    ("&ndash;", "\u{2013}"),
];

/// Turns raw HTML into a `(title, content)` pair of plain text.
///
/// This is a tag-stripping heuristic, not a parser: removal is textual and
/// best-effort, and malformed markup degrades to a low-content result
/// rather than an error.
pub fn extract(html: &str) -> Extracted {
    let title = TITLE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let mut cleaned = html.to_string();
    for re in [&*SCRIPT, &*STYLE, &*NOSCRIPT, &*NAV, &*HEADER, &*FOOTER, &*ASIDE] {
        cleaned = re.replace_all(&cleaned, " ").into_owned();
    }

    // Prefer the first <article>, then the first <main>, else everything.
    let content_html = ARTICLE_TAG
        .captures(&cleaned)
        .or_else(|| MAIN_TAG.captures(&cleaned))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or(cleaned);

    let mut content = ANY_TAG.replace_all(&content_html, " ").into_owned();
    for (entity, replacement) in ENTITIES {
        content = content.replace(entity, replacement);
    }
    let content = WHITESPACE.replace_all(&content, " ").trim().to_string();

    Extracted {
        title,
        content: filter_boilerplate(&content),
    }
}

/// Drops period-separated fragments shorter than `MIN_FRAGMENT_CHARS`
/// (navigation labels, bylines, cookie banners). Falls back to the
/// unfiltered text when the filter would empty the result.
fn filter_boilerplate(content: &str) -> String {
    let kept: Vec<&str> = FRAGMENT_BOUNDARY
        .split(content)
        .filter(|fragment| fragment.chars().count() > MIN_FRAGMENT_CHARS)
        .collect();

    if kept.is_empty() {
        content.to_string()
    } else {
        kept.join(". ")
    }
}

/// Extraction plus the content floor and language detection. Fails with
/// `ReaderError::Extraction` when the cleaned content is shorter than the
/// configured `min_content_chars`.
pub fn extract_article(html: &str, url: &str) -> Result<Article> {
    let extracted = extract(html);
    let min_chars = config_loader::SETTINGS.read().unwrap().min_content_chars;
    if extracted.content.chars().count() < min_chars {
        return Err(ReaderError::Extraction);
    }

    let language = language::detect(&extracted.content);
    Ok(Article {
        title: extracted.title,
        author: None,
        content: extracted.content,
        url: url.to_string(),
        language,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_SENTENCE: &str =
        "This sentence is deliberately longer than fifty characters so the boilerplate filter keeps it";

    #[test]
    fn test_title_extraction() {
        let html = format!("<html><title> Hello World </title><body><p>{}.</p></body></html>", LONG_SENTENCE);
        let out = extract(&html);
        assert_eq!(out.title, "Hello World");
    }

    #[test]
    fn test_missing_title_defaults() {
        let out = extract("<html><body><p>No title here.</p></body></html>");
        assert_eq!(out.title, "Untitled");
    }

    #[test]
    fn test_script_and_style_removed() {
        let html = format!(
            "<body><script>var x = 'secret';</script><style>.a{{color:red}}</style><p>{}.</p></body>",
            LONG_SENTENCE
        );
        let out = extract(&html);
        assert!(!out.content.contains("secret"));
        assert!(!out.content.contains("color"));
        assert!(out.content.contains("deliberately longer"));
    }

    #[test]
    fn test_nav_header_footer_aside_removed() {
        let html = format!(
            "<nav>Home About Contact navigation links galore</nav><header>Site Header</header>\
             <p>{}.</p><footer>Copyright 2024</footer><aside>Related reading</aside>",
            LONG_SENTENCE
        );
        let out = extract(&html);
        assert!(!out.content.contains("Copyright"));
        assert!(!out.content.contains("Site Header"));
        assert!(!out.content.contains("Related reading"));
    }

    #[test]
    fn test_article_preferred_over_surroundings() {
        let html = format!(
            "<body><div>{} outside the article element.</div>\
             <article><p>{} inside the article element.</p></article></body>",
            LONG_SENTENCE, LONG_SENTENCE
        );
        let out = extract(&html);
        assert!(out.content.contains("inside the article element"));
        assert!(!out.content.contains("outside the article element"));
    }

    #[test]
    fn test_main_used_when_no_article() {
        let html = format!(
            "<body><div>{} outside main.</div><main><p>{} inside main.</p></main></body>",
            LONG_SENTENCE, LONG_SENTENCE
        );
        let out = extract(&html);
        assert!(out.content.contains("inside main"));
        assert!(!out.content.contains("outside main"));
    }

    #[test]
    fn test_entities_decoded() {
        let html = format!(
            "<p>{} &amp; more &mdash; it&#39;s &quot;quoted&quot;.</p>",
            LONG_SENTENCE
        );
        let out = extract(&html);
        assert!(out.content.contains("& more \u{2014} it's \"quoted\""));
    }

    #[test]
    fn test_entities_outside_the_table_are_left_as_is() {
        let html = format!("<p>{} continues&hellip; and &copy; too.</p>", LONG_SENTENCE);
        let out = extract(&html);
        assert!(out.content.contains("&hellip;"));
        assert!(out.content.contains("&copy;"));
    }

    #[test]
    fn test_whitespace_collapsed() {
        let html = format!("<p>{}   with\n\n  gaps.</p>", LONG_SENTENCE);
        let out = extract(&html);
        assert!(!out.content.contains("  "));
    }

    #[test]
    fn test_boilerplate_filter_drops_short_fragments() {
        let html = format!("<p>Menu. Login. {}. Also short.</p>", LONG_SENTENCE);
        let out = extract(&html);
        assert!(!out.content.contains("Menu"));
        assert!(!out.content.contains("Login"));
        assert!(out.content.contains("deliberately longer"));
    }

    #[test]
    fn test_boilerplate_filter_falls_back_when_everything_is_short() {
        let out = extract("<p>Short. Bits. Only.</p>");
        assert_eq!(out.content, "Short. Bits. Only.");
    }

    #[test]
    fn test_malformed_markup_does_not_panic() {
        let out = extract("<p>Broken <div <span>markup everywhere");
        assert!(!out.content.is_empty());
    }

    #[test]
    fn test_content_floor_follows_settings() {
        let html =
            "<html><body><p>Sixty characters of content is enough for a lowered floor.</p></body></html>";
        assert!(extract_article(html, "https://x.test").is_err());

        config_loader::SETTINGS.write().unwrap().min_content_chars = 55;
        let result = extract_article(html, "https://x.test");
        config_loader::SETTINGS.write().unwrap().min_content_chars = 100;

        assert!(result.is_ok());
    }

    #[test]
    fn test_content_floor_enforced() {
        let err = extract_article("<html><body><p>Tiny.</p></body></html>", "https://x.test")
            .unwrap_err();
        assert!(matches!(err, ReaderError::Extraction));
    }

    #[test]
    fn test_extract_article_detects_language() {
        let body = "Det är en lång svensk text och den har många ord som är vanliga på svenska, \
                    för att detektorn ska kunna se att det inte är engelska. Den fortsätter med \
                    fler ord så att innehållet blir tillräckligt långt."
            .to_string();
        let html = format!("<html><title>Svensk artikel</title><body><p>{}</p></body></html>", body);
        let article = extract_article(&html, "https://exempel.se/artikel").unwrap();
        assert_eq!(article.language, crate::language::Language::Sv);
        assert_eq!(article.url, "https://exempel.se/artikel");
    }
}
