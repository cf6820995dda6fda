//! Word tokenization with stopword and alphabetic filtering.
//!
//! Splits an utterance into word tokens, drops stopwords for the configured
//! language and drops every token that is not purely alphabetic. Surviving
//! tokens keep their original casing and order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Stopwords for English language
const STOPWORDS_EN: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "whose", "this", "that",
    "that'll", "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have",
    "has", "had", "having", "do", "does", "did", "doing", "will", "would", "shall", "should",
    "should've", "can", "could", "may", "might", "must", "a", "an", "the", "and", "but", "if",
    "or", "nor", "yet", "because", "as", "until", "while", "although", "though", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "next", "here", "there", "when", "where", "why", "how",
    "all", "any", "both", "each", "every", "few", "more", "most", "other", "some", "such", "no",
    "not", "only", "own", "same", "so", "than", "too", "very", "just", "also", "now", "always",
    "never", "don", "don't", "ain", "aren", "aren't", "couldn", "couldn't", "didn", "didn't",
    "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn", "isn't",
    "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn", "wouldn't", "s", "t", "d",
    "ll", "m", "o", "re", "ve", "y",
];

/// Stopwords for French language
const STOPWORDS_FR: &[&str] = &[
    "le", "la", "les", "un", "une", "des", "du", "de", "d", "l", "et", "ou", "où", "mais",
    "donc", "or", "ni", "car", "je", "tu", "il", "elle", "on", "nous", "vous", "ils", "elles",
    "me", "te", "se", "lui", "leur", "leurs", "y", "en", "mon", "ton", "son", "ma", "ta", "sa",
    "mes", "tes", "ses", "notre", "votre", "nos", "vos", "ce", "cet", "cette", "ces", "ça",
    "ceci", "cela", "qui", "que", "quoi", "dont", "lequel", "laquelle", "ne", "pas", "plus",
    "moins", "très", "trop", "peu", "être", "est", "sont", "était", "étaient", "sera", "seront",
    "avoir", "ai", "as", "a", "avons", "avez", "ont", "avait", "avaient", "suis", "es", "sommes",
    "êtes", "dans", "sur", "sous", "avec", "sans", "pour", "par", "entre", "avant", "après",
    "pendant", "depuis", "jusqu", "jusque", "ici", "là", "quand", "si", "alors", "ainsi", "comme",
    "parce", "puisque", "lorsque", "aussi", "encore", "déjà", "toujours", "jamais", "au", "aux",
    "c", "n", "s", "t", "qu", "j", "m",
];

// Words (with inner apostrophes or hyphens kept attached) or runs of punctuation.
static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+(?:[-'’]\w+)*|[^\w\s]+").expect("Invalid regex: word segmentation pattern")
});

/// Language whose stopword table is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    French,
}

impl Language {
    /// Returns the language code
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
        }
    }

    fn stopwords(&self) -> &'static [&'static str] {
        match self {
            Language::English => STOPWORDS_EN,
            Language::French => STOPWORDS_FR,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "fr" | "french" => Ok(Language::French),
            other => Err(format!("unsupported language '{}'", other)),
        }
    }
}

/// Tokens of one utterance left after filtering, in original order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedUtterance {
    tokens: Vec<String>,
}

impl TokenizedUtterance {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Space-joined form, as stored on the record.
    pub fn joined(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Stopword-aware word tokenizer
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stopwords: HashSet<String>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(Language::English)
    }
}

impl Tokenizer {
    pub fn new(language: Language) -> Self {
        let stopwords = language.stopwords().iter().map(|s| s.to_lowercase()).collect();
        Self { stopwords }
    }

    /// Check if a word is a stopword, ignoring case
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(&word.to_lowercase())
    }

    /// Split text into tokens, dropping stopwords and anything not purely alphabetic.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        WORD_PATTERN
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|token| !self.is_stopword(token))
            .filter(|token| token.chars().all(char::is_alphabetic))
            .map(str::to_string)
            .collect()
    }

    pub fn tokenize_utterance(&self, text: &str) -> TokenizedUtterance {
        TokenizedUtterance {
            tokens: self.tokenize(text),
        }
    }
}
