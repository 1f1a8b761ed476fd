//! Flattened form submissions.
//!
//! Forms submit nested objects as dot-joined field names (`address.city`,
//! `address.geo.lat`). [`unflatten`] rebuilds the nested JSON object the
//! schemas expect.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use super::schema::{FieldPath, Issue, ValidationError};

/// Submitted `(name, value)` pairs in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormParseError {
    #[error("expected `name=value`, found `{content}`")]
    MissingSeparator { content: String },
    #[error("field name is empty")]
    EmptyName,
    #[error("line {line}: {reason}")]
    AtLine {
        line: usize,
        reason: Box<FormParseError>,
    },
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// One value per name; later submissions win.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.fields.iter().cloned().collect()
    }

    /// Parse a single `name=value` pair. The value may itself contain `=`.
    pub fn parse_pair(raw: &str) -> Result<(String, String), FormParseError> {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| FormParseError::MissingSeparator {
                content: raw.to_string(),
            })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(FormParseError::EmptyName);
        }
        Ok((name.to_string(), value.to_string()))
    }

    /// Parse one `name=value` pair per line. Blank lines and lines starting
    /// with `#` are skipped.
    pub fn parse_lines(input: &str) -> Result<Self, FormParseError> {
        let mut form = Self::new();
        for (index, line) in input.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (name, value) =
                Self::parse_pair(trimmed).map_err(|reason| FormParseError::AtLine {
                    line: index + 1,
                    reason: Box::new(reason),
                })?;
            form.append(name, value);
        }
        Ok(form)
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Rebuild a nested object from dot-joined names.
///
/// Every value stays a string. A name that is used both as a value and as a
/// parent (`address=x` and `address.city=y`) or that has an empty segment is
/// reported as an issue at that name.
pub fn unflatten(form: &FormData) -> Result<Value, ValidationError> {
    let mut root = Map::new();
    let mut issues = Vec::new();

    for (name, value) in form.iter() {
        let segments: Vec<&str> = name.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            issues.push(Issue::new(
                FieldPath::from_dotted(name),
                "Malformed field name",
            ));
            continue;
        }
        if let Err(depth) = insert(&mut root, &segments, value, 0) {
            let conflicting = segments[..=depth].join(".");
            issues.push(Issue::new(
                FieldPath::from_dotted(&conflicting),
                "Conflicting field names",
            ));
        }
    }

    if issues.is_empty() {
        Ok(Value::Object(root))
    } else {
        Err(ValidationError::new(issues))
    }
}

/// Returns the depth of the conflicting segment on failure.
fn insert(
    map: &mut Map<String, Value>,
    segments: &[&str],
    value: &str,
    depth: usize,
) -> Result<(), usize> {
    match segments {
        [] => Ok(()),
        [last] => {
            if matches!(map.get(*last), Some(Value::Object(_))) {
                return Err(depth);
            }
            map.insert((*last).to_string(), Value::String(value.to_string()));
            Ok(())
        }
        [head, rest @ ..] => {
            let slot = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match slot {
                Value::Object(inner) => insert(inner, rest, value, depth + 1),
                _ => Err(depth),
            }
        }
    }
}
