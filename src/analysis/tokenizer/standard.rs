//! Standard tokenizer: words with internal apostrophes, acronyms, numbers,
//! e-mail addresses, URLs and host names.

use std::sync::LazyLock;

use regex::Regex;

use crate::analysis::token::{Token, TokenIter};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

fn pattern(letter: &str, digit: &str) -> String {
    let alnum = format!("[{letter}{digit}]");
    [
        // e-mail address
        format!(r"{alnum}[{letter}{digit}_.+\-]*@{alnum}+(?:[\-.]{alnum}+)*\.{alnum}+"),
        // URL
        r#"[A-Za-z][A-Za-z0-9+.\-]*://[^\s<>"']+"#.to_string(),
        // acronym: I.B.M.
        format!(r"(?:[{letter}]\.){{2,}}"),
        // number with separators: 1,000.5 or 192.168.0.1
        format!(r"[{digit}]+(?:[.,][{digit}]+)+"),
        // host name
        format!(r"{alnum}+(?:-{alnum}+)*(?:\.{alnum}+(?:-{alnum}+)*)+"),
        // word, possibly with apostrophes, hyphens or ampersands inside
        format!(r"{alnum}+(?:['’]{alnum}+)*(?:[\-&]{alnum}+(?:['’]{alnum}+)*)*"),
    ]
    .join("|")
}

static UNICODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&pattern(r"\p{L}\p{M}", r"\p{N}")).expect("standard tokenizer pattern compiles")
});

static ASCII_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&pattern("A-Za-z", "0-9")).expect("ascii standard tokenizer pattern compiles")
});

/// The general-purpose tokenizer behind the standard analyzer.
///
/// Besides plain words it keeps e-mail addresses, URLs, host names and
/// dotted or comma-grouped numbers whole. Acronyms lose their dots
/// (`I.B.M.` becomes `IBM`) and possessive `'s` endings are dropped.
#[derive(Clone, Debug, Default)]
pub struct StandardTokenizer {
    ascii: bool,
}

impl StandardTokenizer {
    /// Create a Unicode-aware standard tokenizer.
    pub fn new() -> Self {
        StandardTokenizer { ascii: false }
    }

    /// Create a standard tokenizer that only treats ASCII letters and digits
    /// as word characters.
    pub fn ascii() -> Self {
        StandardTokenizer { ascii: true }
    }

    fn normalize(raw: &str) -> String {
        if raw.len() > 2 && raw.ends_with('.') && raw.chars().filter(|&c| c == '.').count() >= 2 {
            let stripped: String = raw.chars().filter(|&c| c != '.').collect();
            if stripped.chars().all(char::is_alphabetic) {
                return stripped;
            }
        }
        for suffix in ["'s", "'S", "’s", "’S"] {
            if let Some(stem) = raw.strip_suffix(suffix) {
                if !stem.is_empty() {
                    return stem.to_string();
                }
            }
        }
        raw.to_string()
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenIter> {
        let regex: &Regex = if self.ascii {
            &ASCII_PATTERN
        } else {
            &UNICODE_PATTERN
        };
        let tokens: Vec<Token> = regex
            .find_iter(text)
            .map(|m| Token::new(Self::normalize(m.as_str()), m.start(), m.end()))
            .collect();
        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        if self.ascii { "ascii_standard" } else { "standard" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokenizer: &StandardTokenizer, text: &str) -> Vec<String> {
        tokenizer.tokenize(text).unwrap().map(|t| t.text).collect()
    }

    #[test]
    fn test_plain_words() {
        let tokenizer = StandardTokenizer::new();
        assert_eq!(
            texts(&tokenizer, "the quick brown fox"),
            vec!["the", "quick", "brown", "fox"]
        );
    }

    #[test]
    fn test_special_tokens() {
        let tokenizer = StandardTokenizer::new();
        assert_eq!(
            texts(&tokenizer, "mail dave@example.com about I.B.M. at www.example.org"),
            vec!["mail", "dave@example.com", "about", "IBM", "at", "www.example.org"]
        );
        assert_eq!(
            texts(&tokenizer, "see http://example.com/a?b=1 now"),
            vec!["see", "http://example.com/a?b=1", "now"]
        );
        assert_eq!(texts(&tokenizer, "costs 1,000.50!"), vec!["costs", "1,000.50"]);
    }

    #[test]
    fn test_apostrophes_and_hyphens() {
        let tokenizer = StandardTokenizer::new();
        assert_eq!(
            texts(&tokenizer, "Dave's don't e-mail"),
            vec!["Dave", "don't", "e-mail"]
        );
    }

    #[test]
    fn test_offsets_cover_source() {
        let tokenizer = StandardTokenizer::new();
        let text = "The fox's den";
        let tokens: Vec<_> = tokenizer.tokenize(text).unwrap().collect();
        assert_eq!(tokens[1].text, "fox");
        assert_eq!(&text[tokens[1].start_offset..tokens[1].end_offset], "fox's");
    }

    #[test]
    fn test_ascii_flavor() {
        assert_eq!(
            texts(&StandardTokenizer::ascii(), "café au lait"),
            vec!["caf", "au", "lait"]
        );
        assert_eq!(
            texts(&StandardTokenizer::new(), "café au lait"),
            vec!["café", "au", "lait"]
        );
    }
}
