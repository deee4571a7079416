use crate::domain::model::Record;

/// Structured list predicate, compiled to the store's OData `$filter`
/// dialect or evaluated locally by the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq { field: String, value: String },
    SubstringOf { field: String, needle: String },
    And(Box<Filter>, Box<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<String>) -> Self {
        Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn substring_of(field: &str, needle: impl Into<String>) -> Self {
        Filter::SubstringOf {
            field: field.to_string(),
            needle: needle.into(),
        }
    }

    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (a, b) => Filter::And(Box::new(a), Box::new(b)),
        }
    }

    /// Renders the `$filter` expression; `None` means no filter at all.
    pub fn to_odata(&self) -> Option<String> {
        match self {
            Filter::All => None,
            Filter::Eq { field, value } => Some(format!("{} eq '{}'", field, quote(value))),
            Filter::SubstringOf { field, needle } => {
                Some(format!("substringof('{}', {})", quote(needle), field))
            }
            Filter::And(a, b) => match (a.to_odata(), b.to_odata()) {
                (Some(a), Some(b)) => Some(format!("({}) and ({})", a, b)),
                (a, b) => a.or(b),
            },
        }
    }

    /// Local evaluation with the same literal semantics the store applies:
    /// `eq` is exact, `substringof` is case-insensitive.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => match record.data.get(field) {
                Some(serde_json::Value::String(s)) => s == value,
                Some(serde_json::Value::Number(n)) => n.to_string() == *value,
                _ => false,
            },
            Filter::SubstringOf { field, needle } => record
                .get_str(field)
                .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            Filter::And(a, b) => a.matches(record) && b.matches(record),
        }
    }
}

fn quote(value: &str) -> String {
    value.replace('\'', "''")
}
