//! Score explanations.

use std::fmt;

/// How a document's score was computed, as a tree of factors.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub value: f32,
    pub description: String,
    pub details: Vec<Explanation>,
    matched: bool,
}

impl Explanation {
    pub fn new<S: Into<String>>(value: f32, description: S) -> Self {
        Explanation {
            value,
            description: description.into(),
            details: Vec::new(),
            matched: true,
        }
    }

    /// An explanation for a document the query does not match.
    pub fn no_match<S: Into<String>>(description: S) -> Self {
        Explanation {
            value: 0.0,
            description: description.into(),
            details: Vec::new(),
            matched: false,
        }
    }

    pub fn with_detail(mut self, detail: Explanation) -> Self {
        self.details.push(detail);
        self
    }

    pub fn add_detail(&mut self, detail: Explanation) {
        self.details.push(detail);
    }

    pub fn is_match(&self) -> bool {
        self.matched
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{}{} = {}", "  ".repeat(depth), self.value, self.description)?;
        for detail in &self.details {
            detail.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_rendering() {
        let e = Explanation::new(2.0, "product of:")
            .with_detail(Explanation::new(1.0, "tf(freq=1)"))
            .with_detail(Explanation::new(2.0, "idf"));
        assert!(e.is_match());
        assert_eq!(e.to_string(), "2 = product of:\n  1 = tf(freq=1)\n  2 = idf\n");
        assert!(!Explanation::no_match("no term").is_match());
    }
}
