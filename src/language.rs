use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The two languages the reader supports. Attached to an article at
/// extraction time; drives voice filtering and the speech locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Sv,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Sv => "sv",
        }
    }

    pub fn locale(&self) -> &'static str {
        match self {
            Language::En => "en-US",
            Language::Sv => "sv-SE",
        }
    }

    pub fn name_english(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Sv => "Swedish",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::En),
            "sv" => Some(Language::Sv),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unsupported language: {} (use en or sv)", s))
    }
}

lazy_static! {
    // Scandinavian letters plus common short Swedish function words,
    // matched as whole words.
    static ref SWEDISH_MARKERS: Regex = Regex::new(
        r"(?i)[åäö]|\b(och|att|det|är|på|för|med|som|av|till|den|har|inte|om|en|kan|var|vid|jag|från|men)\b"
    )
    .expect("invalid Swedish marker regex");
}

/// Coarse lexical classifier over the first 1000 characters. Not a
/// statistical model: short or mixed-language text will misclassify,
/// which is accepted. Always returns a value; the default is English.
pub fn detect(text: &str) -> Language {
    let sample: String = text.chars().take(1000).collect();
    let matches = SWEDISH_MARKERS.find_iter(&sample).count();
    if matches > 5 {
        Language::Sv
    } else {
        Language::En
    }
}
