use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenizeError {
    #[error("text is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
}

lazy_static! {
    static ref RE_SPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref RE_WORD: Regex = Regex::new(
        r"(?x)
        \d+(?:[.,:/]\d+)+                   # 3.14  1,000  12:30  1/2
        | \p{L}+(?i:n['’]t)\b                # don't, split below
        | ['’](?i:s|re|ve|ll|d|m)\b          # 's 're 've 'll 'd 'm
        | [\p{L}\p{N}_]+(?:-[\p{L}\p{N}_]+)*  # words, state-of-the-art
        | \S                                 # any other single character
        "
    )
    .unwrap();
    static ref SHARED: RuleTokenizer = RuleTokenizer;
}

/// Word segmentation collaborator.
pub trait Tokenizer: Send + Sync {
    /// Split already-normalized text into tokens.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Decode raw artifact bytes, collapse whitespace runs to single spaces,
    /// and tokenize. Undecodable input is reported, not guessed at.
    fn tokenize_bytes(&self, data: &[u8]) -> Result<Vec<String>, TokenizeError> {
        let text = std::str::from_utf8(data)?;
        Ok(self.tokenize(&normalize_whitespace(text)))
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    RE_SPACE.replace_all(text, " ").into_owned()
}

/// The process-wide tokenizer, built on first use and shared read-only.
pub fn shared() -> &'static RuleTokenizer {
    &SHARED
}

/// Rule-based English word segmenter: numbers with separators, hyphenated
/// words, clitics split off (`It's` → `It` `'s`, `don't` → `do` `n't`), and
/// every other non-space character as its own token.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleTokenizer;

impl Tokenizer for RuleTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for m in RE_WORD.find_iter(text) {
            match split_negation(m.as_str()) {
                Some((stem, negation)) => {
                    tokens.push(stem.to_string());
                    tokens.push(negation.to_string());
                }
                None => tokens.push(m.as_str().to_string()),
            }
        }
        tokens
    }
}

fn split_negation(word: &str) -> Option<(&str, &str)> {
    let lower = word.to_ascii_lowercase();
    ["n't", "n’t"].iter().find_map(|suffix| {
        let split = word.len().checked_sub(suffix.len())?;
        (split > 0 && lower.ends_with(suffix) && word.is_char_boundary(split))
            .then(|| word.split_at(split))
    })
}
