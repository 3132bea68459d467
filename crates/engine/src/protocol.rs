//! The describe → execute → parse contract between a connector and the host.

use mlua::{Table, Value};

use crate::bridge::scalar_to_string;
use crate::error::ProtocolError;
use crate::session::SessionHeaders;

/// One capability a connector may implement.
///
/// Every operation is a pair of entry points: `<name>_request` describes the
/// HTTP call, `<name>` interprets the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LatestUpdates,
    MangaDetails,
    Chapters,
    Chapter,
    Login,
    FetchManga,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::LatestUpdates,
        Operation::MangaDetails,
        Operation::Chapters,
        Operation::Chapter,
        Operation::Login,
        Operation::FetchManga,
    ];

    pub fn request_entry_point(self) -> &'static str {
        match self {
            Operation::LatestUpdates => "get_latest_updates_request",
            Operation::MangaDetails => "get_manga_details_request",
            Operation::Chapters => "get_chapters_request",
            Operation::Chapter => "get_chapter_request",
            Operation::Login => "login_request",
            Operation::FetchManga => "fetch_manga_request",
        }
    }

    pub fn parse_entry_point(self) -> &'static str {
        match self {
            Operation::LatestUpdates => "get_latest_updates",
            Operation::MangaDetails => "get_manga_details",
            Operation::Chapters => "get_chapters",
            Operation::Chapter => "get_chapter",
            Operation::Login => "login",
            Operation::FetchManga => "fetch_manga",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.parse_entry_point())
    }
}

/// A connector-authored description of one HTTP call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: String,
    pub url: String,
    pub header: Vec<(String, String)>,
    /// Form fields; `Some` whenever the script returned a `data` table, even an empty one.
    pub data: Option<Vec<(String, String)>>,
    /// Literal request body, sent verbatim for non-multipart requests.
    pub body: Option<String>,
}

impl RequestDescriptor {
    /// Read a descriptor table returned by `entry_point`.
    ///
    /// `header` and `data` are optional; entries with non-scalar values are dropped.
    pub fn from_lua(entry_point: &str, value: Value) -> Result<Self, ProtocolError> {
        let table = match value {
            Value::Table(table) => table,
            other => {
                return Err(ProtocolError::UnexpectedValue {
                    entry_point: entry_point.to_string(),
                    expected: "a request table",
                    found: other.type_name(),
                });
            }
        };

        let method = required_string(entry_point, &table, "method")?;
        let url = required_string(entry_point, &table, "url")?;
        let header = string_pairs(&table, "header").unwrap_or_default();
        let data = string_pairs(&table, "data");
        let body = match table.raw_get::<Value>("body") {
            Ok(Value::String(body)) => Some(String::from(body.to_string_lossy())),
            _ => None,
        };

        Ok(Self {
            method,
            url,
            header,
            data,
            body,
        })
    }
}

fn required_string(
    entry_point: &str,
    table: &Table,
    field: &'static str,
) -> Result<String, ProtocolError> {
    table
        .raw_get::<Value>(field)
        .ok()
        .and_then(|value| scalar_to_string(&value))
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ProtocolError::MissingField {
            entry_point: entry_point.to_string(),
            field,
        })
}

/// Collect a `{string: scalar}` sub-table, sorted by key for stable output.
///
/// `None` when `field` is not a table.
fn string_pairs(table: &Table, field: &str) -> Option<Vec<(String, String)>> {
    let Ok(Value::Table(inner)) = table.raw_get::<Value>(field) else {
        return None;
    };

    let mut pairs: Vec<(String, String)> = inner
        .pairs::<Value, Value>()
        .filter_map(|pair| pair.ok())
        .filter_map(|(key, value)| Some((scalar_to_string(&key)?, scalar_to_string(&value)?)))
        .collect();
    pairs.sort();
    Some(pairs)
}

/// The raw response handed back to the connector for interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// Informational only; the engine never judges success by status.
    pub status: u16,
    pub header: SessionHeaders,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Lua;

    fn eval(lua: &Lua, chunk: &str) -> Value {
        lua.load(chunk).eval::<Value>().unwrap()
    }

    #[test]
    fn test_entry_point_names() {
        for op in Operation::ALL {
            assert_eq!(
                op.request_entry_point(),
                format!("{}_request", op.parse_entry_point())
            );
        }
    }

    #[test]
    fn test_full_descriptor() {
        let lua = Lua::new();
        let value = eval(
            &lua,
            r#"return {
                method = "POST",
                url = "https://example.com/login",
                header = { ["Content-Type"] = "multipart/form-data", ["X-Page"] = 2 },
                data = { username = "reader", remember = true },
            }"#,
        );

        let descriptor = RequestDescriptor::from_lua("login_request", value).unwrap();
        assert_eq!(descriptor.method, "POST");
        assert_eq!(descriptor.url, "https://example.com/login");
        assert_eq!(
            descriptor.header,
            vec![
                ("Content-Type".to_string(), "multipart/form-data".to_string()),
                ("X-Page".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(
            descriptor.data,
            Some(vec![
                ("remember".to_string(), "true".to_string()),
                ("username".to_string(), "reader".to_string()),
            ])
        );
        assert!(descriptor.body.is_none());
    }

    #[test]
    fn test_empty_data_table_is_kept() {
        let lua = Lua::new();
        let with_table = RequestDescriptor::from_lua(
            "login_request",
            eval(&lua, r#"return { method = "POST", url = "https://example.com", data = {} }"#),
        )
        .unwrap();
        assert_eq!(with_table.data, Some(vec![]));

        let without = RequestDescriptor::from_lua(
            "login_request",
            eval(&lua, r#"return { method = "POST", url = "https://example.com" }"#),
        )
        .unwrap();
        assert_eq!(without.data, None);
        assert!(without.header.is_empty());
    }

    #[test]
    fn test_non_table_is_protocol_error() {
        let lua = Lua::new();
        let err = RequestDescriptor::from_lua("get_chapter_request", eval(&lua, "return 'nope'"))
            .unwrap_err();

        assert!(matches!(
            err,
            ProtocolError::UnexpectedValue { found: "string", .. }
        ));
    }

    #[test]
    fn test_missing_url_is_protocol_error() {
        let lua = Lua::new();
        let err =
            RequestDescriptor::from_lua("get_chapter_request", eval(&lua, "return { method = 'GET' }"))
                .unwrap_err();

        assert!(matches!(err, ProtocolError::MissingField { field: "url", .. }));
    }
}
