use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AtriumLinkError;

/// Comparison operator understood by both the table API and realtime filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    In,
    Is,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Like => "like",
            FilterOp::Ilike => "ilike",
            FilterOp::In => "in",
            FilterOp::Is => "is",
        }
    }

    /// Operators the realtime service accepts in a channel filter.
    pub fn supported_by_realtime(&self) -> bool {
        matches!(
            self,
            FilterOp::Eq | FilterOp::Neq | FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte | FilterOp::In
        )
    }
}

impl FromStr for FilterOp {
    type Err = AtriumLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(FilterOp::Eq),
            "neq" => Ok(FilterOp::Neq),
            "gt" => Ok(FilterOp::Gt),
            "gte" => Ok(FilterOp::Gte),
            "lt" => Ok(FilterOp::Lt),
            "lte" => Ok(FilterOp::Lte),
            "like" => Ok(FilterOp::Like),
            "ilike" => Ok(FilterOp::Ilike),
            "in" => Ok(FilterOp::In),
            "is" => Ok(FilterOp::Is),
            other => Err(AtriumLinkError::ValidationError(format!(
                "Unknown filter operator '{}'",
                other
            ))),
        }
    }
}

/// Single-column row filter, e.g. `author_id=eq.42`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl RowFilter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Result<Self, AtriumLinkError> {
        let column = column.into();
        validate_column(&column)?;
        Ok(Self {
            column,
            op,
            value: value.into(),
        })
    }

    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Result<Self, AtriumLinkError> {
        Self::new(column, FilterOp::Eq, value)
    }

    /// `in` filter over a list of values.
    pub fn one_of<I, S>(column: impl Into<String>, values: I) -> Result<Self, AtriumLinkError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self::new(column, FilterOp::In, format!("({})", joined))
    }

    /// Query-string pair for the table API: `("col", "eq.value")`.
    pub fn to_query_pair(&self) -> (String, String) {
        (self.column.clone(), format!("{}.{}", self.op.as_str(), self.value))
    }

    /// Filter string for a realtime channel: `col=eq.value`.
    pub fn to_realtime_filter(&self) -> Result<String, AtriumLinkError> {
        if !self.op.supported_by_realtime() {
            return Err(AtriumLinkError::ValidationError(format!(
                "Operator '{}' is not supported in realtime filters",
                self.op.as_str()
            )));
        }
        Ok(self.to_string())
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}.{}", self.column, self.op.as_str(), self.value)
    }
}

impl FromStr for RowFilter {
    type Err = AtriumLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, rest) = s.split_once('=').ok_or_else(|| {
            AtriumLinkError::ValidationError(format!(
                "Filter '{}' must look like column=op.value",
                s
            ))
        })?;
        let (op, value) = rest.split_once('.').ok_or_else(|| {
            AtriumLinkError::ValidationError(format!(
                "Filter '{}' must look like column=op.value",
                s
            ))
        })?;
        RowFilter::new(column.trim(), op.trim().parse()?, value)
    }
}

fn validate_column(column: &str) -> Result<(), AtriumLinkError> {
    if column.is_empty() {
        return Err(AtriumLinkError::ValidationError("Column name must not be empty".into()));
    }
    if !column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AtriumLinkError::ValidationError(format!(
            "Invalid column name '{}'",
            column
        )));
    }
    Ok(())
}
