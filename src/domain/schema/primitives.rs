use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use super::{FieldPath, Issue, Schema, type_mismatch};

pub fn string() -> StringSchema {
    StringSchema::default()
}

pub fn integer() -> IntegerSchema {
    IntegerSchema::default()
}

pub fn number() -> NumberSchema {
    NumberSchema::default()
}

pub fn boolean() -> BooleanSchema {
    BooleanSchema
}

pub fn date() -> DateSchema {
    DateSchema
}

pub fn one_of(options: &'static [&'static str]) -> OneOfSchema {
    OneOfSchema { options }
}

pub fn array<S: Schema>(item: S) -> ArraySchema<S> {
    ArraySchema { item, min: None }
}

#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    min: Option<(usize, String)>,
    email: Option<String>,
}

impl StringSchema {
    /// Require at least `len` characters.
    pub fn min(mut self, len: usize, message: impl Into<String>) -> Self {
        self.min = Some((len, message.into()));
        self
    }

    /// Require an email-address shape.
    pub fn email(mut self, message: impl Into<String>) -> Self {
        self.email = Some(message.into());
        self
    }
}

impl Schema for StringSchema {
    type Output = String;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<String> {
        let Some(Value::String(text)) = value else {
            type_mismatch("string", value, path, issues);
            return None;
        };

        let before = issues.len();
        if let Some((len, message)) = &self.min
            && text.chars().count() < *len
        {
            issues.push(Issue::new(path.clone(), message.clone()));
        }
        if let Some(message) = &self.email
            && !is_email(text)
        {
            issues.push(Issue::new(path.clone(), message.clone()));
        }

        (issues.len() == before).then(|| text.clone())
    }
}

/// Local part of letters, digits and `_'+-.` ending on anything but a dot,
/// one `@`, then dotted host labels and an alphabetic top-level label.
const EMAIL_PATTERN: &str = r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$";

/// Email-address shape check. The pattern has no lookaround, so the leading
/// dot and consecutive dots are rejected separately.
pub(crate) fn is_email(candidate: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let email = EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("valid email pattern"));
    !candidate.starts_with('.') && !candidate.contains("..") && email.is_match(candidate)
}

#[derive(Debug, Clone, Default)]
pub struct IntegerSchema {
    positive: Option<String>,
    min: Option<(i64, String)>,
    max: Option<(i64, String)>,
}

impl IntegerSchema {
    pub fn positive(mut self, message: impl Into<String>) -> Self {
        self.positive = Some(message.into());
        self
    }

    pub fn min(mut self, bound: i64, message: impl Into<String>) -> Self {
        self.min = Some((bound, message.into()));
        self
    }

    pub fn max(mut self, bound: i64, message: impl Into<String>) -> Self {
        self.max = Some((bound, message.into()));
        self
    }
}

impl Schema for IntegerSchema {
    type Output = i64;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<i64> {
        let Some(Value::Number(number)) = value else {
            type_mismatch("integer", value, path, issues);
            return None;
        };
        let Some(int) = number.as_i64() else {
            let message = if number.is_u64() {
                "Number is too large"
            } else {
                "Expected integer, received float"
            };
            issues.push(Issue::new(path.clone(), message));
            return None;
        };

        let before = issues.len();
        if let Some(message) = &self.positive
            && int <= 0
        {
            issues.push(Issue::new(path.clone(), message.clone()));
        }
        if let Some((bound, message)) = &self.min
            && int < *bound
        {
            issues.push(Issue::new(path.clone(), message.clone()));
        }
        if let Some((bound, message)) = &self.max
            && int > *bound
        {
            issues.push(Issue::new(path.clone(), message.clone()));
        }

        (issues.len() == before).then_some(int)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NumberSchema {
    min: Option<(f64, String)>,
    max: Option<(f64, String)>,
}

impl NumberSchema {
    pub fn min(mut self, bound: f64, message: impl Into<String>) -> Self {
        self.min = Some((bound, message.into()));
        self
    }

    pub fn max(mut self, bound: f64, message: impl Into<String>) -> Self {
        self.max = Some((bound, message.into()));
        self
    }
}

impl Schema for NumberSchema {
    type Output = f64;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<f64> {
        let Some(number) = value.and_then(Value::as_f64) else {
            type_mismatch("number", value, path, issues);
            return None;
        };

        let before = issues.len();
        if let Some((bound, message)) = &self.min
            && number < *bound
        {
            issues.push(Issue::new(path.clone(), message.clone()));
        }
        if let Some((bound, message)) = &self.max
            && number > *bound
        {
            issues.push(Issue::new(path.clone(), message.clone()));
        }

        (issues.len() == before).then_some(number)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BooleanSchema;

impl Schema for BooleanSchema {
    type Output = bool;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<bool> {
        let flag = value.and_then(Value::as_bool);
        if flag.is_none() {
            type_mismatch("boolean", value, path, issues);
        }
        flag
    }
}

/// ISO-8601 calendar date (`2024-01-01`) or RFC 3339 timestamp, reduced to
/// its date.
#[derive(Debug, Clone, Copy)]
pub struct DateSchema;

impl Schema for DateSchema {
    type Output = Date;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<Date> {
        let Some(Value::String(text)) = value else {
            type_mismatch("string", value, path, issues);
            return None;
        };

        let parsed = Date::parse(text, format_description!("[year]-[month]-[day]"))
            .ok()
            .or_else(|| OffsetDateTime::parse(text, &Rfc3339).ok().map(|at| at.date()));
        if parsed.is_none() {
            issues.push(Issue::new(path.clone(), "Invalid date"));
        }
        parsed
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OneOfSchema {
    options: &'static [&'static str],
}

impl Schema for OneOfSchema {
    type Output = String;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<String> {
        let Some(Value::String(text)) = value else {
            type_mismatch("string", value, path, issues);
            return None;
        };
        if self.options.contains(&text.as_str()) {
            return Some(text.clone());
        }

        let expected = self
            .options
            .iter()
            .map(|option| format!("'{option}'"))
            .collect::<Vec<_>>()
            .join(" | ");
        issues.push(Issue::new(
            path.clone(),
            format!("Invalid enum value. Expected {expected}, received '{text}'"),
        ));
        None
    }
}

pub struct ArraySchema<S> {
    item: S,
    min: Option<(usize, String)>,
}

impl<S> ArraySchema<S> {
    /// Require at least `len` elements.
    pub fn min(mut self, len: usize, message: impl Into<String>) -> Self {
        self.min = Some((len, message.into()));
        self
    }
}

impl<S: Schema> Schema for ArraySchema<S> {
    type Output = Vec<S::Output>;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<Self::Output> {
        let Some(Value::Array(items)) = value else {
            type_mismatch("array", value, path, issues);
            return None;
        };

        let before = issues.len();
        let outputs: Vec<Option<S::Output>> = items
            .iter()
            .enumerate()
            .map(|(index, item)| self.item.check(Some(item), &path.index(index), issues))
            .collect();
        if let Some((len, message)) = &self.min
            && items.len() < *len
        {
            issues.push(Issue::new(path.clone(), message.clone()));
        }

        if issues.len() != before {
            return None;
        }
        outputs.into_iter().collect()
    }
}
