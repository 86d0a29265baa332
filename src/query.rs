use std::fmt;

use crate::tokenizer::Category;

/// Where a term is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A single category, selected with a `prefix:` qualifier.
    Category(Category),
    /// Every default-eligible category.
    Default,
}

/// One parsed unit of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub scope: Scope,
    pub literal: String,
}

impl Term {
    pub fn categorized(category: Category, literal: &str) -> Self {
        Self {
            scope: Scope::Category(category),
            literal: literal.to_string(),
        }
    }

    pub fn uncategorized(literal: &str) -> Self {
        Self {
            scope: Scope::Default,
            literal: literal.to_string(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::Category(category) => {
                let prefix = category.info().query_prefix.unwrap_or("");
                write!(f, "{prefix}:{}", self.literal)
            }
            Scope::Default => f.write_str(&self.literal),
        }
    }
}

/// A conjunction of terms. No terms means "match everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub terms: Vec<Term>,
}

impl Query {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{term}")?;
        }
        Ok(())
    }
}

/// Parse a raw search box string.
///
/// Never fails: anything that is not `<known prefix>:<literal>` becomes an
/// uncategorized term holding the whole word, colons included. A known
/// prefix with nothing after the colon is dropped.
///
/// # Examples
///
/// ```
/// use fleetseek::query::{Scope, parse};
/// use fleetseek::tokenizer::Category;
///
/// let query = parse("host:Host-1 aabbccddee01");
/// assert_eq!(query.terms.len(), 2);
/// assert_eq!(query.terms[0].scope, Scope::Category(Category::Host));
/// assert_eq!(query.terms[1].scope, Scope::Default);
/// ```
pub fn parse(raw: &str) -> Query {
    let terms = raw.split_whitespace().filter_map(parse_term).collect();
    Query { terms }
}

fn parse_term(word: &str) -> Option<Term> {
    if let Some((prefix, literal)) = word.split_once(':')
        && let Some(category) = Category::from_query_prefix(prefix)
    {
        if literal.is_empty() {
            return None;
        }
        return Some(Term::categorized(category, literal));
    }

    Some(Term::uncategorized(word))
}
