//! ORDER BY expressions

use std::fmt;

use crate::error::{ModelError, ModelResult};
use crate::query::types::OrderDirection;

/// Ordered list of `(column, direction)` sort terms
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ordering {
    terms: Vec<(String, OrderDirection)>,
}

impl Ordering {
    /// No ordering; the handle substitutes primary key descending
    pub fn none() -> Self {
        Self::default()
    }

    pub fn asc(column: &str) -> Self {
        Self::none().then(column, OrderDirection::Asc)
    }

    pub fn desc(column: &str) -> Self {
        Self::none().then(column, OrderDirection::Desc)
    }

    pub fn then(mut self, column: &str, direction: OrderDirection) -> Self {
        self.terms.push((column.to_string(), direction));
        self
    }

    /// Parse `"sort asc, id desc"`. A bare column sorts ascending.
    pub fn parse(order: &str) -> ModelResult<Self> {
        let mut ordering = Self::none();
        for term in order.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let parts: Vec<&str> = term.split_whitespace().collect();
            ordering = match parts.as_slice() {
                [column] => ordering.then(column, OrderDirection::Asc),
                [column, direction] => ordering.then(column, direction.parse()?),
                _ => {
                    return Err(ModelError::Query(format!(
                        "Invalid order term '{}'",
                        term
                    )))
                }
            };
        }
        Ok(ordering)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[(String, OrderDirection)] {
        &self.terms
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .terms
            .iter()
            .map(|(column, direction)| format!("{} {}", column, direction))
            .collect();
        write!(f, "{}", terms.join(", "))
    }
}

impl std::str::FromStr for Ordering {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ordering::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let ordering = Ordering::parse("sort asc, id DESC ,name").unwrap();
        assert_eq!(
            ordering.terms(),
            [
                ("sort".to_string(), OrderDirection::Asc),
                ("id".to_string(), OrderDirection::Desc),
                ("name".to_string(), OrderDirection::Asc),
            ]
        );
        assert_eq!(ordering.to_string(), "sort ASC, id DESC, name ASC");
        assert!(Ordering::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Ordering::parse("id sideways").is_err());
        assert!(Ordering::parse("id desc extra").is_err());
    }
}
