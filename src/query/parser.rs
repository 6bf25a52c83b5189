//! Query parser for converting string queries to structured query objects.
//!
//! Supported syntax:
//! - Terms: `fox`, analyzed per field. A term analyzed into several tokens
//!   becomes a phrase.
//! - Field scoping: `title:fox`, `title|body:fox`, `*:fox`, `title:(a b)`
//! - Phrases: `"quick fox"`, `"quick|fast fox"`, `"quick <> fox"`, `"a b"~2`
//! - Boolean: `+required -prohibited !prohibited`, `a AND b`, `a && b`,
//!   `a OR b`, `a || b`, `NOT a`, `REQ a`, parentheses
//! - Ranges: `[a b]`, `{a b}`, `[a TO b}`, `<b`, `<=b`, `>a`, `>=a`
//! - Wildcards: `qu?ck`, `qu*` (prefix), `*` (every document)
//! - Fuzzy: `fox~`, `fox~0.7`
//! - Boosts: `fox^2`, `(a b)^0.5`
//!
//! ```
//! use glaive::query::{BooleanQuery, Query, QueryParser, QueryParserConfig};
//!
//! let config = QueryParserConfig {
//!     default_fields: Some(vec!["body".to_string()]),
//!     or_default: false,
//!     ..Default::default()
//! };
//! let parser = QueryParser::new(config).unwrap();
//! let query = parser.parse("cat dog").unwrap();
//! let expected = BooleanQuery::new()
//!     .must(Query::term("body", "cat"))
//!     .must(Query::term("body", "dog"));
//! assert_eq!(query, Query::from(expected));
//! ```

use std::collections::BTreeSet;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::query::{
    BooleanClause, BooleanQuery, FuzzyQuery, MatchAllQuery, MultiTermQuery, Occur, PhraseQuery, PrefixQuery,
    Query, RangeQuery, TypedRangeQuery, WildcardQuery,
};

/// Query parser settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParserConfig {
    /// Fields `*:` expands to.
    pub all_fields: Vec<String>,
    /// Fields whose terms go through the analyzer. `None` means all fields.
    pub tokenized_fields: Option<Vec<String>>,
    /// Fields searched by unqualified terms. `None` means all fields.
    pub default_fields: Option<Vec<String>>,
    /// Reject field names outside `all_fields`.
    pub validate_fields: bool,
    /// Join adjacent clauses with OR instead of AND.
    pub or_default: bool,
    /// Slop of phrases written without `~n`.
    pub default_slop: u32,
    /// Lowercase wildcard and prefix patterns.
    pub wild_card_downcase: bool,
    /// Balance quotes and parentheses before parsing.
    pub clean_string: bool,
    /// Most clauses one parsed boolean query may hold.
    pub max_clauses: usize,
    /// Recover from syntax errors with a plain term query instead of
    /// failing. The error message is still available.
    pub handle_parse_errors: bool,
    /// Treat `AND`, `OR`, `NOT` and `REQ` as operators.
    pub use_keywords: bool,
    /// Build numeric ranges instead of text ranges.
    pub use_typed_range_query: bool,
}

impl Default for QueryParserConfig {
    fn default() -> Self {
        QueryParserConfig {
            all_fields: Vec::new(),
            tokenized_fields: None,
            default_fields: None,
            validate_fields: false,
            or_default: true,
            default_slop: 0,
            wild_card_downcase: true,
            clean_string: true,
            max_clauses: 512,
            handle_parse_errors: false,
            use_keywords: true,
            use_typed_range_query: false,
        }
    }
}

impl QueryParserConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Parses query strings into [`Query`] trees.
///
/// The field sets keep two invariants: default and tokenized fields are
/// always part of all fields, and a set that was never given explicitly
/// follows all fields as they change.
#[derive(Debug)]
pub struct QueryParser {
    analyzer: Arc<dyn Analyzer>,
    config: QueryParserConfig,
    all_fields: BTreeSet<String>,
    tokenized_fields: Option<BTreeSet<String>>,
    default_fields: Option<BTreeSet<String>>,
    last_error: Mutex<Option<String>>,
}

impl QueryParser {
    /// A parser analyzing terms with the standard analyzer.
    pub fn new(config: QueryParserConfig) -> Result<Self> {
        Self::with_analyzer(config, Arc::new(StandardAnalyzer::default()))
    }

    pub fn with_analyzer(config: QueryParserConfig, analyzer: Arc<dyn Analyzer>) -> Result<Self> {
        if config.max_clauses == 0 {
            return Err(GlaiveError::configuration("max_clauses must be positive"));
        }
        let mut parser = QueryParser {
            analyzer,
            all_fields: config.all_fields.iter().cloned().collect(),
            tokenized_fields: None,
            default_fields: None,
            last_error: Mutex::new(None),
            config,
        };
        if let Some(fields) = parser.config.tokenized_fields.clone() {
            parser.set_tokenized_fields(fields);
        }
        if let Some(fields) = parser.config.default_fields.clone() {
            parser.set_default_fields(fields);
        }
        Ok(parser)
    }

    /// A parser over the fields of `reader`, tokenizing the fields the
    /// index tokenizes.
    pub fn for_reader(
        reader: &IndexReader,
        analyzer: Arc<dyn Analyzer>,
        mut config: QueryParserConfig,
    ) -> Result<Self> {
        let infos = reader.field_infos();
        config.all_fields.extend(infos.field_names().into_iter().map(str::to_string));
        if config.tokenized_fields.is_none() {
            config.tokenized_fields = Some(infos.tokenized_fields().into_iter().map(str::to_string).collect());
        }
        Self::with_analyzer(config, analyzer)
    }

    pub fn config(&self) -> &QueryParserConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }

    pub fn fields(&self) -> Vec<String> {
        self.all_fields.iter().cloned().collect()
    }

    /// Replace all fields. Explicit default and tokenized fields are kept
    /// and stay part of the set.
    pub fn set_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.all_fields = fields.into_iter().map(Into::into).collect();
        for set in [&self.tokenized_fields, &self.default_fields].into_iter().flatten() {
            self.all_fields.extend(set.iter().cloned());
        }
    }

    pub fn add_field<S: Into<String>>(&mut self, field: S) {
        self.all_fields.insert(field.into());
    }

    pub fn tokenized_fields(&self) -> Vec<String> {
        self.tokenized_fields.as_ref().unwrap_or(&self.all_fields).iter().cloned().collect()
    }

    pub fn set_tokenized_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: BTreeSet<String> = fields.into_iter().map(Into::into).collect();
        self.all_fields.extend(fields.iter().cloned());
        self.tokenized_fields = Some(fields);
    }

    pub fn default_fields(&self) -> Vec<String> {
        self.default_fields.as_ref().unwrap_or(&self.all_fields).iter().cloned().collect()
    }

    pub fn set_default_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: BTreeSet<String> = fields.into_iter().map(Into::into).collect();
        self.all_fields.extend(fields.iter().cloned());
        self.default_fields = Some(fields);
    }

    fn is_tokenized(&self, field: &str) -> bool {
        self.tokenized_fields.as_ref().unwrap_or(&self.all_fields).contains(field)
    }

    /// Message of the last failed parse, cleared by every parse.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Parse `text`. With `handle_parse_errors` set, malformed input yields
    /// a best-effort query and the message goes to
    /// [`last_error`](Self::last_error).
    pub fn parse(&self, text: &str) -> Result<Query> {
        self.parse_with_error(text).map(|(query, _)| query)
    }

    /// Parse `text`, returning the recovery message alongside the query
    /// when an error was handled.
    pub fn parse_with_error(&self, text: &str) -> Result<(Query, Option<String>)> {
        *self.last_error.lock() = None;
        match self.try_parse(text) {
            Ok(query) => Ok((query, None)),
            Err(e) => {
                let message = e.to_string();
                *self.last_error.lock() = Some(message.clone());
                if !self.config.handle_parse_errors {
                    return Err(e);
                }
                log::debug!("recovering from query parse error: {message}");
                Ok((self.fallback_query(text)?, Some(message)))
            }
        }
    }

    fn try_parse(&self, text: &str) -> Result<Query> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Query::Boolean(BooleanQuery::new()));
        }
        let cleaned;
        let input = if self.config.clean_string {
            cleaned = clean_query_string(trimmed);
            cleaned.as_str()
        } else {
            trimmed
        };
        let mut parser = QueryStringParser::new(self, input);
        let query = parser.parse()?;
        Ok(query.unwrap_or_else(|| Query::Boolean(BooleanQuery::new())))
    }

    /// Every word of `text` as an optional term over the default fields.
    fn fallback_query(&self, text: &str) -> Result<Query> {
        let plain: String = text.chars().map(|c| if c.is_alphanumeric() { c } else { ' ' }).collect();
        let mut clauses = Vec::new();
        for field in self.default_fields() {
            if self.is_tokenized(&field) {
                for token in self.analyzer.analyze(&field, &plain)? {
                    clauses.push(BooleanClause::should(Query::term(field.clone(), token.text)));
                }
            } else {
                for word in plain.split_whitespace() {
                    clauses.push(BooleanClause::should(Query::term(field.clone(), word)));
                }
            }
        }
        clauses.truncate(self.config.max_clauses);
        Ok(match clauses.len() {
            1 => clauses.remove(0).query,
            _ => Query::Boolean(BooleanQuery {
                clauses,
                ..BooleanQuery::new()
            }),
        })
    }
}

/// Balance quotes and parentheses and drop control characters.
fn clean_query_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '"' => {
                in_quote = !in_quote;
                out.push(c);
            }
            '(' if !in_quote => {
                depth += 1;
                out.push(c);
            }
            ')' if !in_quote => {
                if depth > 0 {
                    depth -= 1;
                    out.push(c);
                }
            }
            c if c.is_control() && !c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    if in_quote {
        out.push('"');
    }
    out.extend(std::iter::repeat_n(')', depth));
    out
}

/// Deepest nesting of groups and field scopes one query may use.
const MAX_NESTING_DEPTH: usize = 100;

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | ':' | '^' | '~' | '<' | '>')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    None,
    And,
    Or,
}

enum PhraseItem {
    Gap,
    Word(String),
    Alternatives(Vec<String>),
}

/// Internal recursive descent parser over one query string.
struct QueryStringParser<'a> {
    parser: &'a QueryParser,
    chars: Peekable<Chars<'a>>,
    field_stack: Vec<Vec<String>>,
    depth: usize,
}

impl<'a> QueryStringParser<'a> {
    fn new(parser: &'a QueryParser, input: &'a str) -> Self {
        QueryStringParser {
            parser,
            chars: input.chars().peekable(),
            field_stack: Vec::new(),
            depth: 0,
        }
    }

    fn parse(&mut self) -> Result<Option<Query>> {
        let query = self.parse_boolean()?;
        self.skip_whitespace();
        if let Some(c) = self.chars.peek() {
            return Err(GlaiveError::parse(format!("unexpected '{c}'")));
        }
        Ok(query)
    }

    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn at_group_end(&mut self) -> bool {
        matches!(self.chars.peek(), None | Some(')'))
    }

    /// The word at the cursor, without consuming it.
    fn peek_word(&self) -> String {
        self.chars.clone().take_while(|&c| is_word_char(c)).collect()
    }

    fn consume(&mut self, n: usize) {
        for _ in 0..n {
            self.chars.next();
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.chars.next() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(GlaiveError::parse(format!("expected '{expected}', found '{c}'"))),
            None => Err(GlaiveError::parse(format!("expected '{expected}' at end of query"))),
        }
    }

    fn read_operator(&mut self) -> Operator {
        let word = self.peek_word();
        let operator = match word.as_str() {
            "&&" => Operator::And,
            "||" => Operator::Or,
            "AND" if self.parser.config.use_keywords => Operator::And,
            "OR" if self.parser.config.use_keywords => Operator::Or,
            _ => return Operator::None,
        };
        self.consume(word.chars().count());
        operator
    }

    fn parse_boolean(&mut self) -> Result<Option<Query>> {
        let max_clauses = self.parser.config.max_clauses;
        let mut clauses: Vec<BooleanClause> = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_group_end() {
                break;
            }
            let operator = self.read_operator();
            self.skip_whitespace();
            if self.at_group_end() {
                if operator != Operator::None {
                    return Err(GlaiveError::parse("operator without a right-hand clause"));
                }
                break;
            }
            let Some(mut clause) = self.parse_clause()? else {
                continue;
            };
            let operator = match operator {
                Operator::None if self.parser.config.or_default => Operator::Or,
                Operator::None => Operator::And,
                op => op,
            };
            if operator == Operator::And && !clauses.is_empty() {
                if let [first] = clauses.as_mut_slice()
                    && !first.is_prohibited()
                {
                    first.set_occur(Occur::Must);
                }
                if !clause.is_prohibited() {
                    clause.set_occur(Occur::Must);
                }
            }
            clauses.push(clause);
            if clauses.len() > max_clauses {
                return Err(GlaiveError::too_many_clauses(
                    max_clauses,
                    format!("query has more than {max_clauses} clauses"),
                ));
            }
        }
        Ok(match clauses.len() {
            0 => None,
            1 if !clauses[0].is_prohibited() => clauses.pop().map(|c| c.query),
            _ => Some(Query::Boolean(BooleanQuery {
                clauses,
                ..BooleanQuery::new()
            })),
        })
    }

    fn parse_clause(&mut self) -> Result<Option<BooleanClause>> {
        let occur = match self.chars.peek() {
            Some('+') => {
                self.chars.next();
                Occur::Must
            }
            Some('-') | Some('!') => {
                self.chars.next();
                Occur::MustNot
            }
            _ => {
                let word = self.peek_word();
                match word.as_str() {
                    "REQ" if self.parser.config.use_keywords => {
                        self.consume(3);
                        Occur::Must
                    }
                    "NOT" if self.parser.config.use_keywords => {
                        self.consume(3);
                        Occur::MustNot
                    }
                    _ => Occur::Should,
                }
            }
        };
        Ok(self.parse_query()?.map(|query| BooleanClause::new(query, occur)))
    }

    fn parse_query(&mut self) -> Result<Option<Query>> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(GlaiveError::parse(format!(
                "query nests deeper than {MAX_NESTING_DEPTH} levels"
            )));
        }
        self.depth += 1;
        let query = self.parse_nested();
        self.depth -= 1;
        query
    }

    fn parse_nested(&mut self) -> Result<Option<Query>> {
        self.skip_whitespace();
        let query = match self.chars.peek().copied() {
            None => return Err(GlaiveError::parse("unexpected end of query")),
            Some('(') => {
                self.chars.next();
                let query = self.parse_boolean()?;
                self.skip_whitespace();
                self.expect(')')?;
                query
            }
            Some('"') => self.parse_phrase()?,
            Some('[') | Some('{') => self.parse_range()?,
            Some('<') | Some('>') => self.parse_open_range()?,
            Some(c) => {
                let (word, wildcard) = self.read_word();
                if word.is_empty() {
                    return Err(GlaiveError::parse(format!("unexpected '{c}'")));
                }
                if self.chars.peek() == Some(&':') {
                    self.chars.next();
                    let fields = self.resolve_fields(&word)?;
                    self.field_stack.push(fields);
                    let query = self.parse_query();
                    self.field_stack.pop();
                    return query;
                }
                if self.chars.peek() == Some(&'~') {
                    self.chars.next();
                    self.fuzzy_query(&word)?
                } else if wildcard {
                    self.wildcard_query(&word)?
                } else {
                    self.for_each_field(|parser, field| parser.word_query(field, &word))?
                }
            }
        };
        self.parse_boost(query)
    }

    /// Read a word, resolving escapes. Also reports whether it holds an
    /// unescaped wildcard.
    fn read_word(&mut self) -> (String, bool) {
        let mut word = String::new();
        let mut wildcard = false;
        while let Some(&c) = self.chars.peek() {
            if c == '\\' {
                self.chars.next();
                if let Some(escaped) = self.chars.next() {
                    word.push(escaped);
                }
                continue;
            }
            if !is_word_char(c) {
                break;
            }
            wildcard |= c == '*' || c == '?';
            word.push(c);
            self.chars.next();
        }
        (word, wildcard)
    }

    fn read_number(&mut self) -> String {
        let mut number = String::new();
        while let Some(&c) = self.chars.peek() {
            if !(c.is_ascii_digit() || c == '.') {
                break;
            }
            number.push(c);
            self.chars.next();
        }
        number
    }

    fn parse_boost(&mut self, query: Option<Query>) -> Result<Option<Query>> {
        if self.chars.peek() != Some(&'^') {
            return Ok(query);
        }
        self.chars.next();
        let number = self.read_number();
        let boost: f32 = number
            .parse()
            .map_err(|_| GlaiveError::parse(format!("invalid boost '{number}'")))?;
        Ok(query.map(|q| q.with_boost(boost)))
    }

    fn resolve_fields(&self, spec: &str) -> Result<Vec<String>> {
        if spec == "*" {
            return Ok(self.parser.fields());
        }
        let mut fields = Vec::new();
        for field in spec.split('|').filter(|f| !f.is_empty()) {
            if self.parser.config.validate_fields && !self.parser.all_fields.contains(field) {
                return Err(GlaiveError::not_found(format!("unknown field '{field}'")));
            }
            fields.push(field.to_string());
        }
        if fields.is_empty() {
            return Err(GlaiveError::parse(format!("no field in '{spec}:'")));
        }
        Ok(fields)
    }

    fn current_fields(&self) -> Result<Vec<String>> {
        let fields = match self.field_stack.last() {
            Some(fields) => fields.clone(),
            None => self.parser.default_fields(),
        };
        if fields.is_empty() {
            return Err(GlaiveError::parse("no field to search; set default fields"));
        }
        Ok(fields)
    }

    /// Build a query per current field; several fields are joined as
    /// optional clauses.
    fn for_each_field<F>(&self, mut build: F) -> Result<Option<Query>>
    where
        F: FnMut(&Self, &str) -> Result<Option<Query>>,
    {
        let mut queries = Vec::new();
        for field in self.current_fields()? {
            if let Some(query) = build(self, &field)? {
                queries.push(query);
            }
        }
        Ok(match queries.len() {
            0 => None,
            1 => queries.pop(),
            _ => Some(Query::Boolean(BooleanQuery {
                clauses: queries.into_iter().map(BooleanClause::should).collect(),
                ..BooleanQuery::new()
            })),
        })
    }

    fn tokens(&self, field: &str, text: &str) -> Result<Vec<(String, u32)>> {
        if !self.parser.is_tokenized(field) {
            return Ok(vec![(text.to_string(), 1)]);
        }
        Ok(self
            .parser
            .analyzer
            .analyze(field, text)?
            .map(|token| (token.text, token.position_increment))
            .collect())
    }

    fn word_query(&self, field: &str, word: &str) -> Result<Option<Query>> {
        let mut tokens = self.tokens(field, word)?;
        Ok(match tokens.len() {
            0 => None,
            1 => tokens.pop().map(|(text, _)| Query::term(field, text)),
            _ => {
                let mut phrase = PhraseQuery::new(field).with_slop(self.parser.config.default_slop);
                for (text, increment) in tokens {
                    phrase.add_term(text, increment);
                }
                Some(Query::Phrase(phrase))
            }
        })
    }

    fn single_token(&self, field: &str, word: &str) -> Result<Option<String>> {
        Ok(self.tokens(field, word)?.into_iter().next().map(|(text, _)| text))
    }

    fn fuzzy_query(&mut self, word: &str) -> Result<Option<Query>> {
        let number = self.read_number();
        let min_similarity = if number.is_empty() {
            None
        } else {
            Some(
                number
                    .parse::<f32>()
                    .map_err(|_| GlaiveError::parse(format!("invalid fuzzy similarity '{number}'")))?,
            )
        };
        self.for_each_field(|parser, field| {
            let Some(text) = parser.single_token(field, word)? else {
                return Ok(None);
            };
            let mut query = FuzzyQuery::new(field, text);
            if let Some(min_similarity) = min_similarity {
                query = query.with_min_similarity(min_similarity)?;
            }
            Ok(Some(Query::Fuzzy(query)))
        })
    }

    fn wildcard_query(&self, word: &str) -> Result<Option<Query>> {
        let pattern = if self.parser.config.wild_card_downcase {
            word.to_lowercase()
        } else {
            word.to_string()
        };
        if pattern.chars().all(|c| c == '*') {
            return Ok(Some(Query::MatchAll(MatchAllQuery::new())));
        }
        let body = pattern.strip_suffix('*');
        self.for_each_field(|_, field| {
            Ok(Some(match body {
                Some(prefix) if !prefix.contains(['*', '?']) => Query::Prefix(PrefixQuery::new(field, prefix)),
                _ => Query::Wildcard(WildcardQuery::new(field, pattern.as_str())),
            }))
        })
    }

    fn parse_phrase(&mut self) -> Result<Option<Query>> {
        self.expect('"')?;
        let mut content = String::new();
        loop {
            match self.chars.next() {
                Some('"') => break,
                Some('\\') => {
                    if let Some(escaped) = self.chars.next() {
                        content.push(escaped);
                    }
                }
                Some(c) => content.push(c),
                None => return Err(GlaiveError::parse("unterminated phrase")),
            }
        }
        let slop = if self.chars.peek() == Some(&'~') {
            self.chars.next();
            let number = self.read_number();
            number
                .parse::<u32>()
                .map_err(|_| GlaiveError::parse(format!("invalid phrase slop '{number}'")))?
        } else {
            self.parser.config.default_slop
        };

        let items: Vec<PhraseItem> = content
            .split_whitespace()
            .map(|item| {
                if item == "<>" {
                    PhraseItem::Gap
                } else if item.contains('|') {
                    PhraseItem::Alternatives(item.split('|').filter(|w| !w.is_empty()).map(str::to_string).collect())
                } else {
                    PhraseItem::Word(item.to_string())
                }
            })
            .collect();
        self.for_each_field(|parser, field| parser.phrase_query(field, &items, slop))
    }

    fn phrase_query(&self, field: &str, items: &[PhraseItem], slop: u32) -> Result<Option<Query>> {
        let mut phrase = PhraseQuery::new(field).with_slop(slop);
        let mut gap = 0;
        for item in items {
            match item {
                PhraseItem::Gap => gap += 1,
                PhraseItem::Alternatives(words) => {
                    let mut texts = Vec::new();
                    for word in words {
                        if let Some(text) = self.single_token(field, word)? {
                            texts.push(text);
                        }
                    }
                    let mut texts = texts.into_iter();
                    let Some(first) = texts.next() else {
                        gap += 1;
                        continue;
                    };
                    phrase.add_term(first, 1 + gap);
                    for text in texts {
                        phrase.append_term(text);
                    }
                    gap = 0;
                }
                PhraseItem::Word(word) => {
                    let tokens = self.tokens(field, word)?;
                    if tokens.is_empty() {
                        gap += 1;
                        continue;
                    }
                    for (text, increment) in tokens {
                        phrase.add_term(text, increment + gap);
                        gap = 0;
                    }
                }
            }
        }
        Ok(match phrase.positions.as_slice() {
            [] => None,
            [single] if single.terms.len() == 1 => Some(Query::term(field, single.terms[0].clone())),
            [single] => {
                let mut terms = MultiTermQuery::new(field);
                for text in &single.terms {
                    terms.add_term(text.clone())?;
                }
                Some(Query::MultiTerm(terms))
            }
            _ => Some(Query::Phrase(phrase)),
        })
    }

    fn range_query(
        &self,
        field: &str,
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Option<Query>> {
        Ok(Some(if self.parser.config.use_typed_range_query {
            Query::TypedRange(TypedRangeQuery::new(field, lower, upper, include_lower, include_upper)?)
        } else {
            Query::Range(RangeQuery::new(field, lower, upper, include_lower, include_upper)?)
        }))
    }

    fn parse_range(&mut self) -> Result<Option<Query>> {
        let include_lower = self.chars.next() == Some('[');
        self.skip_whitespace();
        let (lower, _) = self.read_word();
        self.skip_whitespace();
        if self.peek_word() == "TO" {
            self.consume(2);
            self.skip_whitespace();
        }
        let (upper, _) = self.read_word();
        self.skip_whitespace();
        let include_upper = match self.chars.next() {
            Some(']') => true,
            Some('}') => false,
            Some(c) => return Err(GlaiveError::parse(format!("expected ']' or '}}' to close range, found '{c}'"))),
            None => return Err(GlaiveError::parse("unterminated range")),
        };
        let lower = (!lower.is_empty()).then_some(lower);
        let upper = (!upper.is_empty()).then_some(upper);
        self.for_each_field(|parser, field| {
            parser.range_query(
                field,
                lower.as_deref(),
                upper.as_deref(),
                include_lower && lower.is_some(),
                include_upper && upper.is_some(),
            )
        })
    }

    fn parse_open_range(&mut self) -> Result<Option<Query>> {
        let upper_side = self.chars.next() == Some('<');
        let inclusive = self.chars.peek() == Some(&'=');
        if inclusive {
            self.chars.next();
        }
        self.skip_whitespace();
        let (bound, _) = self.read_word();
        if bound.is_empty() {
            return Err(GlaiveError::parse("open range without a bound"));
        }
        self.for_each_field(|parser, field| {
            if upper_side {
                parser.range_query(field, None, Some(&bound), false, inclusive)
            } else {
                parser.range_query(field, Some(&bound), None, inclusive, false)
            }
        })
    }
}
