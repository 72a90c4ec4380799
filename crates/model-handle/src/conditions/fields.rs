//! Field selection expressions

use std::fmt;

/// Which columns a query returns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fields {
    /// Every column (`*`)
    #[default]
    All,
    /// Explicit columns, in selection order
    Columns(Vec<String>),
}

impl Fields {
    /// Parse a comma-separated field list. Empty input or any `*` entry
    /// selects all columns.
    pub fn parse(fields: &str) -> Self {
        let columns: Vec<String> = fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();

        if columns.is_empty() || columns.iter().any(|c| c == "*") {
            Fields::All
        } else {
            Fields::Columns(columns)
        }
    }

    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            Fields::All
        } else {
            Fields::Columns(columns)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Fields::All)
    }

    /// Selected column names; empty for `All`
    pub fn names(&self) -> &[String] {
        match self {
            Fields::All => &[],
            Fields::Columns(columns) => columns,
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        match self {
            Fields::All => true,
            Fields::Columns(columns) => columns.iter().any(|c| c == column),
        }
    }

    /// Return a selection that also includes `column` (no-op for `All`)
    pub fn including(self, column: &str) -> Self {
        match self {
            Fields::All => Fields::All,
            Fields::Columns(mut columns) => {
                if !columns.iter().any(|c| c == column) {
                    columns.push(column.to_string());
                }
                Fields::Columns(columns)
            }
        }
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fields::All => write!(f, "*"),
            Fields::Columns(columns) => write!(f, "{}", columns.join(", ")),
        }
    }
}

impl From<&str> for Fields {
    fn from(fields: &str) -> Self {
        Fields::parse(fields)
    }
}

impl From<String> for Fields {
    fn from(fields: String) -> Self {
        Fields::parse(&fields)
    }
}

impl From<&String> for Fields {
    fn from(fields: &String) -> Self {
        Fields::parse(fields)
    }
}

impl From<&Fields> for Fields {
    fn from(fields: &Fields) -> Self {
        fields.clone()
    }
}
