use crate::config::VocabConfig;
use crate::index::TermCategory;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}_]+").expect("valid regex");
    static ref CODE_KEYWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "func", "function", "class", "method", "var", "let", "const", "if", "else", "for",
            "while", "return", "import", "export", "async", "await", "try", "catch",
        ];
        words.iter().copied().collect()
    };
}

/// A normalized term together with its offset among accepted tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub term: String,
    pub position: usize,
    pub category: TermCategory,
}

/// Splits text into normalized terms using the length and stop-word rules of a config.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    min_len: usize,
    max_len: usize,
    stop_words: HashSet<String>,
}

impl Tokenizer {
    pub fn new(config: &VocabConfig) -> Self {
        Self {
            min_len: config.min_term_length,
            max_len: config.max_term_length,
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    /// Tokenize with NFKC normalization and lowercasing. Positions count accepted tokens only.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let normalized = text.nfkc().collect::<String>();
        let mut tokens = Vec::new();
        for mat in RE.find_iter(&normalized) {
            let raw = mat.as_str();
            let term = raw.to_lowercase();
            if !self.is_valid_term(&term) {
                continue;
            }
            let category = categorize(raw, &term);
            tokens.push(Token { term, position: tokens.len(), category });
        }
        tokens
    }

    /// Term strings only, in order. Used for queries.
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.tokenize(text).into_iter().map(|t| t.term).collect()
    }

    pub fn is_valid_term(&self, term: &str) -> bool {
        let len = term.chars().count();
        if len < self.min_len || len > self.max_len {
            return false;
        }
        if self.stop_words.contains(term) {
            return false;
        }
        !term.chars().any(char::is_numeric)
    }
}

/// Classify a token. `raw` keeps the source casing so mixed-case identifiers are detected.
pub fn categorize(raw: &str, term: &str) -> TermCategory {
    if CODE_KEYWORDS.contains(term) {
        return TermCategory::Keyword;
    }
    if term.contains('_') || (term.chars().count() > 3 && is_mixed_case(raw)) {
        return TermCategory::Identifier;
    }
    if term.chars().count() > 8 {
        return TermCategory::Concept;
    }
    TermCategory::General
}

fn is_mixed_case(raw: &str) -> bool {
    raw.chars().any(char::is_uppercase) && raw.chars().any(char::is_lowercase)
}
