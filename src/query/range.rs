//! Range queries over term text, and over numeric term values.

use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::query::multi_term::MultiTermQuery;
use crate::query::{DEFAULT_MAX_TERMS, Query, Visit, boost_suffix, expand_terms, field_prefix};

/// Matches terms of `field` that sort between the bounds. A missing bound
/// leaves that side open.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub field: String,
    pub lower: Option<String>,
    pub upper: Option<String>,
    pub include_lower: bool,
    pub include_upper: bool,
    pub max_terms: usize,
    pub truncate_expansion: bool,
    pub boost: f32,
}

impl RangeQuery {
    /// At least one bound is required, and an inclusive side needs its
    /// bound.
    pub fn new<S: Into<String>>(
        field: S,
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        let field = field.into();
        if lower.is_none() && upper.is_none() {
            return Err(GlaiveError::query(format!("range on {field} has no bounds")));
        }
        if include_lower && lower.is_none() {
            return Err(GlaiveError::query(format!("range on {field} includes a missing lower bound")));
        }
        if include_upper && upper.is_none() {
            return Err(GlaiveError::query(format!("range on {field} includes a missing upper bound")));
        }
        if let (Some(l), Some(u)) = (lower, upper)
            && l > u
        {
            return Err(GlaiveError::query(format!("range on {field} has lower bound {l} above {u}")));
        }
        Ok(RangeQuery {
            field,
            lower: lower.map(str::to_string),
            upper: upper.map(str::to_string),
            include_lower,
            include_upper,
            max_terms: DEFAULT_MAX_TERMS,
            truncate_expansion: false,
            boost: 1.0,
        })
    }

    pub fn with_max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = max_terms;
        self
    }

    pub fn with_truncate_expansion(mut self, truncate: bool) -> Self {
        self.truncate_expansion = truncate;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    fn above_lower(&self, text: &str) -> bool {
        match &self.lower {
            Some(lower) if self.include_lower => text >= lower.as_str(),
            Some(lower) => text > lower.as_str(),
            None => true,
        }
    }

    fn below_upper(&self, text: &str) -> bool {
        match &self.upper {
            Some(upper) if self.include_upper => text <= upper.as_str(),
            Some(upper) => text < upper.as_str(),
            None => true,
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        self.above_lower(text) && self.below_upper(text)
    }

    pub(crate) fn rewrite(&self, reader: &IndexReader) -> Result<Query> {
        let start = self.lower.as_deref().unwrap_or("");
        let describe = || format!("range query {}", self.to_query_string(""));
        let terms = expand_terms(
            reader,
            &self.field,
            start,
            self.max_terms,
            self.truncate_expansion,
            &describe,
            |text| {
                if !self.below_upper(text) {
                    Visit::Stop
                } else if self.above_lower(text) {
                    Visit::Take(1.0)
                } else {
                    Visit::Skip
                }
            },
        )?;
        Ok(Query::MultiTerm(MultiTermQuery::from_terms(
            self.field.clone(),
            terms,
            self.max_terms,
            self.truncate_expansion,
            self.boost,
        )))
    }

    pub fn to_query_string(&self, default_field: &str) -> String {
        let body = match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) => format!(
                "{}{lower} {upper}{}",
                if self.include_lower { '[' } else { '{' },
                if self.include_upper { ']' } else { '}' }
            ),
            (None, Some(upper)) => format!("<{}{upper}", if self.include_upper { "=" } else { "" }),
            (Some(lower), None) => format!(">{}{lower}", if self.include_lower { "=" } else { "" }),
            (None, None) => String::new(),
        };
        format!("{}{body}{}", field_prefix(&self.field, default_field), boost_suffix(self.boost))
    }
}

/// A range whose bounds and terms are compared as numbers. Terms that do
/// not parse as numbers never match.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRangeQuery {
    pub range: RangeQuery,
    lower_value: Option<f64>,
    upper_value: Option<f64>,
}

fn parse_bound(field: &str, bound: Option<&str>) -> Result<Option<f64>> {
    bound
        .map(|b| {
            b.trim()
                .parse::<f64>()
                .map_err(|_| GlaiveError::query(format!("typed range on {field} has non-numeric bound {b}")))
        })
        .transpose()
}

impl TypedRangeQuery {
    pub fn new<S: Into<String>>(
        field: S,
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        let field = field.into();
        let lower_value = parse_bound(&field, lower)?;
        let upper_value = parse_bound(&field, upper)?;
        if let (Some(l), Some(u)) = (lower_value, upper_value)
            && l > u
        {
            return Err(GlaiveError::query(format!("typed range on {field} has lower bound {l} above {u}")));
        }
        // Text order of the bounds is irrelevant here, so build the range
        // without its text check.
        let range = RangeQuery {
            field,
            lower: lower.map(str::to_string),
            upper: upper.map(str::to_string),
            include_lower,
            include_upper,
            max_terms: DEFAULT_MAX_TERMS,
            truncate_expansion: false,
            boost: 1.0,
        };
        if range.lower.is_none() && range.upper.is_none() {
            return Err(GlaiveError::query(format!("range on {} has no bounds", range.field)));
        }
        Ok(TypedRangeQuery {
            range,
            lower_value,
            upper_value,
        })
    }

    pub fn with_max_terms(mut self, max_terms: usize) -> Self {
        self.range.max_terms = max_terms;
        self
    }

    pub fn with_truncate_expansion(mut self, truncate: bool) -> Self {
        self.range.truncate_expansion = truncate;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.range.boost = boost;
        self
    }

    pub fn contains(&self, text: &str) -> bool {
        let Ok(value) = text.trim().parse::<f64>() else {
            return false;
        };
        let above = match self.lower_value {
            Some(l) if self.range.include_lower => value >= l,
            Some(l) => value > l,
            None => true,
        };
        let below = match self.upper_value {
            Some(u) if self.range.include_upper => value <= u,
            Some(u) => value < u,
            None => true,
        };
        above && below
    }

    /// Numeric order differs from term order, so the whole field is
    /// scanned.
    pub(crate) fn rewrite(&self, reader: &IndexReader) -> Result<Query> {
        let range = &self.range;
        let describe = || format!("typed range query {}", range.to_query_string(""));
        let terms = expand_terms(
            reader,
            &range.field,
            "",
            range.max_terms,
            range.truncate_expansion,
            &describe,
            |text| if self.contains(text) { Visit::Take(1.0) } else { Visit::Skip },
        )?;
        Ok(Query::MultiTerm(MultiTermQuery::from_terms(
            range.field.clone(),
            terms,
            range.max_terms,
            range.truncate_expansion,
            range.boost,
        )))
    }

    pub fn to_query_string(&self, default_field: &str) -> String {
        self.range.to_query_string(default_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_range_bounds() {
        let q = RangeQuery::new("date", Some("20050101"), Some("20051231"), true, false).unwrap();
        assert!(q.contains("20050101"));
        assert!(q.contains("20051230"));
        assert!(!q.contains("20051231"));
        assert_eq!(q.to_query_string("body"), "date:[20050101 20051231}");

        let open = RangeQuery::new("date", None, Some("2005"), false, true).unwrap();
        assert!(open.contains("1999"));
        assert_eq!(open.to_query_string("date"), "<=2005");

        assert_eq!(RangeQuery::new("f", None, None, false, false).unwrap_err().kind(), ErrorKind::Query);
        assert!(RangeQuery::new("f", Some("b"), Some("a"), true, true).is_err());
        assert!(RangeQuery::new("f", None, Some("a"), true, true).is_err());
    }

    #[test]
    fn test_typed_range() {
        let q = TypedRangeQuery::new("price", Some("9"), Some("100"), true, true).unwrap();
        assert!(q.contains("10"));
        assert!(q.contains("99.5"));
        assert!(!q.contains("101"));
        assert!(!q.contains("cheap"));
        assert!(TypedRangeQuery::new("price", Some("x"), None, false, false).is_err());
    }
}
