use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Query parameters for a connector's `fetch_manga` search.
///
/// Keys are arbitrary; connectors decide which ones they understand.
pub type Filters = BTreeMap<String, FilterValue>;

/// A scalar or a list of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    List(Vec<FilterValue>),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl FilterValue {
    /// Parse a `key=value` style command line value.
    ///
    /// Comma separated input becomes a list; numbers and booleans are
    /// recognised, everything else stays text.
    pub fn parse_loose(raw: &str) -> Self {
        if raw.contains(',') {
            return FilterValue::List(raw.split(',').map(|part| Self::parse_scalar(part.trim())).collect());
        }
        Self::parse_scalar(raw)
    }

    fn parse_scalar(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<i64>() {
            FilterValue::Integer(value)
        } else if let Ok(value) = raw.parse::<f64>() {
            FilterValue::Number(value)
        } else if let Ok(value) = raw.parse::<bool>() {
            FilterValue::Bool(value)
        } else {
            FilterValue::Text(raw.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_filter_values() {
        let filters: Filters =
            serde_json::from_str(r#"{"genre": "action", "page": 2, "adult": false, "tags": ["a", "b"]}"#)
                .unwrap();

        assert_eq!(filters["genre"], FilterValue::Text("action".into()));
        assert_eq!(filters["page"], FilterValue::Integer(2));
        assert_eq!(filters["adult"], FilterValue::Bool(false));
        assert_eq!(filters["tags"], FilterValue::from(vec!["a", "b"]));
    }

    #[test]
    fn test_parse_loose() {
        assert_eq!(FilterValue::parse_loose("2"), FilterValue::Integer(2));
        assert_eq!(FilterValue::parse_loose("true"), FilterValue::Bool(true));
        assert_eq!(FilterValue::parse_loose("action"), FilterValue::Text("action".into()));
        assert_eq!(
            FilterValue::parse_loose("action, drama"),
            FilterValue::from(vec!["action", "drama"])
        );
    }
}
