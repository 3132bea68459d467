//! Per-connector header state.
//!
//! Used both for a connector's persisted session state and for the merged
//! header set of an outgoing request.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::ProtocolError;

/// Multi-valued headers with replace-by-key semantics on top of [`HeaderMap`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionHeaders {
    map: HeaderMap,
}

impl SessionHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_map(&self) -> &HeaderMap {
        &self.map
    }

    pub fn into_map(self) -> HeaderMap {
        self.map
    }

    /// Values for `name`, empty when the header is absent. Non UTF-8 bytes are replaced.
    pub fn values(&self, name: &str) -> Vec<String> {
        self.map
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect()
    }

    pub fn first(&self, name: &str) -> Option<String> {
        self.values(name).into_iter().next()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Replace every value of `name` with `values`. An empty list removes the header.
    pub fn replace(&mut self, name: &str, values: Vec<String>) -> Result<(), ProtocolError> {
        let (name, values) = parse_entry(name, values)?;
        self.replace_parsed(name, values);
        Ok(())
    }

    fn replace_parsed(&mut self, name: HeaderName, values: Vec<HeaderValue>) {
        let mut values = values.into_iter();
        match values.next() {
            Some(first) => {
                self.map.insert(name.clone(), first);
                for value in values {
                    self.map.append(name.clone(), value);
                }
            }
            None => {
                self.map.remove(name);
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.map.remove(name).is_some()
    }

    /// Apply a login result: each mentioned key is replaced, others are untouched.
    ///
    /// Nothing changes if any entry is not a valid header.
    pub fn apply(
        &mut self,
        replacement: impl IntoIterator<Item = (String, Vec<String>)>,
    ) -> Result<(), ProtocolError> {
        let parsed = replacement
            .into_iter()
            .map(|(name, values)| parse_entry(&name, values))
            .collect::<Result<Vec<_>, _>>()?;
        for (name, values) in parsed {
            self.replace_parsed(name, values);
        }
        Ok(())
    }

    /// Layer `other` on top of `self`, replacing keys that both contain.
    pub fn overlay(&mut self, other: &SessionHeaders) {
        for name in other.map.keys() {
            self.map.remove(name);
        }
        for (name, value) in other.map.iter() {
            self.map.append(name.clone(), value.clone());
        }
    }

    /// Distinct header names, lowercase.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(HeaderName::as_str)
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.map.keys_len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl From<HeaderMap> for SessionHeaders {
    fn from(map: HeaderMap) -> Self {
        Self { map }
    }
}

pub(crate) fn parse_name(name: &str) -> Result<HeaderName, ProtocolError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| ProtocolError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn parse_entry(
    name: &str,
    values: Vec<String>,
) -> Result<(HeaderName, Vec<HeaderValue>), ProtocolError> {
    let header = parse_name(name)?;
    let values = values
        .iter()
        .map(|value| {
            HeaderValue::from_str(value).map_err(|e| ProtocolError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((header, values))
}
