//! Violation reporting: field paths, issues and the aggregated error.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// One step into a nested value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a value inside the validated document, rendered dot-joined
/// (`address.geo.lat`, `hobbies.1`) to match flattened form field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Split a dot-joined name into key segments. Empty segments are kept so
    /// malformed names still render as they were submitted.
    pub fn from_dotted(name: &str) -> Self {
        Self(
            name.split('.')
                .map(|segment| PathSegment::Key(segment.to_string()))
                .collect(),
        )
    }

    pub fn key(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(name.to_string()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Key(key) => f.write_str(key)?,
                PathSegment::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}

/// A single violation: where it happened and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub path: FieldPath,
    pub message: String,
}

impl Issue {
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every violation found while validating one value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {}", summarize(.issues))]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    /// Group messages by dot-joined path. Issues on the validated value itself
    /// are grouped under the empty string.
    pub fn field_errors(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for issue in &self.issues {
            grouped
                .entry(issue.path.to_string())
                .or_default()
                .push(issue.message.clone());
        }
        grouped
    }
}

fn summarize(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_paths_render_dot_joined() {
        let path = FieldPath::root().key("address").key("geo").key("lat");
        assert_eq!(path.to_string(), "address.geo.lat");

        let indexed = FieldPath::root().key("hobbies").index(1);
        assert_eq!(indexed.to_string(), "hobbies.1");
    }

    #[test]
    fn dotted_names_round_trip_through_display() {
        assert_eq!(FieldPath::from_dotted("company.name").to_string(), "company.name");
    }

    #[test]
    fn field_errors_group_by_path() {
        let error = ValidationError::new(vec![
            Issue::new(FieldPath::root().key("name"), "Name is required"),
            Issue::new(FieldPath::root().key("name"), "too short"),
            Issue::new(FieldPath::root().key("email"), "Invalid email format"),
        ]);

        let grouped = error.field_errors();
        assert_eq!(grouped["name"], vec!["Name is required", "too short"]);
        assert_eq!(grouped["email"], vec!["Invalid email format"]);
    }

    #[test]
    fn display_lists_every_issue() {
        let error = ValidationError::new(vec![
            Issue::new(FieldPath::root().key("id"), "ID must be a positive integer"),
            Issue::new(FieldPath::root(), "Expected object, received string"),
        ]);
        assert_eq!(
            error.to_string(),
            "validation failed: id: ID must be a positive integer; Expected object, received string"
        );
    }
}
