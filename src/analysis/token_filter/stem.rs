//! Snowball stemming filter.

use std::sync::Arc;

use rust_stemmers::{Algorithm, Stemmer};

use crate::analysis::token::TokenIter;
use crate::analysis::token_filter::Filter;
use crate::error::{GlaiveError, Result};

/// A filter that reduces each token to its Snowball stem.
pub struct StemFilter {
    stemmer: Arc<Stemmer>,
    algorithm: &'static str,
}

impl StemFilter {
    /// Create an English stemmer.
    pub fn new() -> Self {
        StemFilter {
            stemmer: Arc::new(Stemmer::create(Algorithm::English)),
            algorithm: "english",
        }
    }

    /// Create a stemmer for the named algorithm (`"english"`, `"porter"`,
    /// `"french"`, ...). The optional character encoding must be UTF-8;
    /// token text is always UTF-8.
    pub fn with_algorithm(algorithm: &str, encoding: Option<&str>) -> Result<Self> {
        if let Some(encoding) = encoding {
            let normalized = encoding.to_ascii_lowercase().replace(['-', '_'], "");
            if normalized != "utf8" {
                return Err(GlaiveError::configuration(format!(
                    "stemmer encoding {encoding} is not supported, only UTF-8"
                )));
            }
        }
        let (algo, name) = match algorithm.to_ascii_lowercase().as_str() {
            "arabic" => (Algorithm::Arabic, "arabic"),
            "danish" => (Algorithm::Danish, "danish"),
            "dutch" => (Algorithm::Dutch, "dutch"),
            "english" | "porter" => (Algorithm::English, "english"),
            "finnish" => (Algorithm::Finnish, "finnish"),
            "french" => (Algorithm::French, "french"),
            "german" => (Algorithm::German, "german"),
            "greek" => (Algorithm::Greek, "greek"),
            "hungarian" => (Algorithm::Hungarian, "hungarian"),
            "italian" => (Algorithm::Italian, "italian"),
            "norwegian" => (Algorithm::Norwegian, "norwegian"),
            "portuguese" => (Algorithm::Portuguese, "portuguese"),
            "romanian" => (Algorithm::Romanian, "romanian"),
            "russian" => (Algorithm::Russian, "russian"),
            "spanish" => (Algorithm::Spanish, "spanish"),
            "swedish" => (Algorithm::Swedish, "swedish"),
            "tamil" => (Algorithm::Tamil, "tamil"),
            "turkish" => (Algorithm::Turkish, "turkish"),
            other => {
                return Err(GlaiveError::configuration(format!(
                    "unknown stemming algorithm {other}"
                )));
            }
        };
        Ok(StemFilter {
            stemmer: Arc::new(Stemmer::create(algo)),
            algorithm: name,
        })
    }

    /// Name of the Snowball algorithm in use.
    pub fn algorithm(&self) -> &str {
        self.algorithm
    }
}

impl Default for StemFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StemFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StemFilter")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl Filter for StemFilter {
    fn filter(&self, tokens: TokenIter) -> Result<TokenIter> {
        let stemmer = Arc::clone(&self.stemmer);
        Ok(Box::new(tokens.map(move |mut token| {
            let stemmed = stemmer.stem(&token.text);
            if stemmed != token.text {
                token.text = stemmed.into_owned();
            }
            token
        })))
    }

    fn name(&self) -> &'static str {
        "stem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;
    use crate::error::ErrorKind;

    #[test]
    fn test_english_stemming() {
        let filter = StemFilter::new();
        let tokens = vec![Token::new("running", 0, 7), Token::new("cats", 8, 12)];
        let result: Vec<_> = filter
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .map(|t| t.text)
            .collect();
        assert_eq!(result, vec!["run", "cat"]);
    }

    #[test]
    fn test_algorithm_and_encoding() {
        let filter = StemFilter::with_algorithm("Porter", Some("UTF-8")).unwrap();
        assert_eq!(filter.algorithm(), "english");

        let err = StemFilter::with_algorithm("english", Some("ISO-8859-1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(StemFilter::with_algorithm("klingon", None).is_err());
    }
}
