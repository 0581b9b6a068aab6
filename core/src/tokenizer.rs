use crate::shingle::ShingleSet;
use std::ops::Range;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// One sliding-window position: `n` consecutive characters of the source text.
///
/// `start`/`end` are character indices (half-open). The matching byte offsets are
/// kept alongside so the string view can be sliced without rescanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    start: usize,
    end: usize,
    byte_start: usize,
    byte_end: usize,
}

impl Token {
    pub fn start(&self) -> usize { self.start }
    pub fn end(&self) -> usize { self.end }
    pub fn byte_range(&self) -> Range<usize> { self.byte_start..self.byte_end }

    /// Slice of `text` covered by this token. `text` must be the text it was cut from.
    pub fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.byte_start..self.byte_end]
    }
}

/// Character n-gram tokenizer over a single text.
///
/// Tokens are computed on first access and memoized; later calls return the same
/// slice without scanning the text again.
#[derive(Debug)]
pub struct Tokenizer {
    n: usize,
    text: String,
    tokens: OnceLock<Vec<Token>>,
}

impl Tokenizer {
    pub fn new(n: usize, text: impl Into<String>) -> Self {
        Self { n, text: text.into(), tokens: OnceLock::new() }
    }

    pub fn n(&self) -> usize { self.n }
    pub fn text(&self) -> &str { &self.text }

    pub fn tokens(&self) -> &[Token] {
        self.tokens.get_or_init(|| tokenize(self.n, &self.text))
    }

    pub fn len(&self) -> usize { self.tokens().len() }
    pub fn is_empty(&self) -> bool { self.tokens().is_empty() }

    pub fn token_str(&self, token: &Token) -> &str {
        token.as_str(&self.text)
    }

    /// Token strings in order of appearance, duplicates included.
    pub fn iter_str(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens().iter().map(move |t| t.as_str(&self.text))
    }

    pub fn shingles(&self) -> ShingleSet {
        ShingleSet::from_tokens(self.iter_str())
    }
}

/// Cut `text` into `n`-character windows. Degenerate input (`n == 0`, or fewer
/// than `n` characters) yields no tokens.
pub fn tokenize(n: usize, text: &str) -> Vec<Token> {
    if n == 0 {
        return Vec::new();
    }
    // Byte offset of every character start, plus the end-of-text boundary.
    let mut bounds: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    let chars = bounds.len();
    bounds.push(text.len());
    if chars < n {
        return Vec::new();
    }

    (0..=chars - n)
        .map(|i| Token {
            start: i,
            end: i + n,
            byte_start: bounds[i],
            byte_end: bounds[i + n],
        })
        .collect()
}

/// NFKC + lowercase, applied before windowing when an index is configured to normalize.
pub fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}
