//! Declarative validation for untyped JSON values.
//!
//! A [`Schema`] inspects a `serde_json::Value` and produces a typed output or
//! records every violation it finds. Schemas compose: [`object`] reads named
//! fields through sub-schemas, [`array`] validates each element, and the
//! [`SchemaExt`] adapters add optionality, defaults, refinements and
//! transforms. Unknown object fields are ignored.
//!
//! Two entry points exist for callers:
//!
//! - [`SchemaExt::parse`] fails fast with a [`ValidationError`] carrying all
//!   violations (and logs them).
//! - [`SchemaExt::safe_parse`] returns a [`SafeParse`] the caller matches on,
//!   typically to render field errors next to form inputs.

mod issue;
mod object;
mod primitives;

pub use issue::{FieldPath, Issue, PathSegment, ValidationError};
pub use object::{Fields, ObjectSchema, object};
pub use primitives::{
    ArraySchema, BooleanSchema, DateSchema, IntegerSchema, NumberSchema, OneOfSchema,
    StringSchema, array, boolean, date, integer, number, one_of, string,
};

use serde_json::Value;
use tracing::warn;

/// A validation rule producing `Output` from an untyped value.
pub trait Schema {
    type Output;

    /// Validate `value` found at `path`. `None` means the field was absent.
    ///
    /// Violations are appended to `issues`; the return value is `None` if this
    /// schema or anything nested under it failed.
    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<Self::Output>;
}

/// Outcome of [`SchemaExt::safe_parse`].
#[derive(Debug, Clone, PartialEq)]
pub enum SafeParse<T> {
    Success(T),
    Failure(ValidationError),
}

impl<T> SafeParse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, ValidationError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(error) => Err(error),
        }
    }
}

/// Entry points and adapters available on every schema.
pub trait SchemaExt: Schema + Sized {
    /// Validate, failing with every violation found.
    fn parse(&self, value: &Value) -> Result<Self::Output, ValidationError> {
        self.safe_parse(value).into_result().inspect_err(|error| {
            warn!(
                issue_count = error.issues().len(),
                error = %error,
                "schema validation failed"
            );
        })
    }

    /// Validate without logging, returning a matchable outcome.
    fn safe_parse(&self, value: &Value) -> SafeParse<Self::Output> {
        let mut issues = Vec::new();
        match self.check(Some(value), &FieldPath::root(), &mut issues) {
            Some(output) if issues.is_empty() => SafeParse::Success(output),
            _ => SafeParse::Failure(ValidationError::new(issues)),
        }
    }

    /// Accept a missing or `null` value as `None`.
    fn optional(self) -> Optional<Self> {
        Optional { inner: self }
    }

    /// Substitute `value` when the field is missing or `null`.
    fn with_default(self, value: Self::Output) -> WithDefault<Self>
    where
        Self::Output: Clone,
    {
        WithDefault {
            inner: self,
            default: value,
        }
    }

    /// Map a successfully validated output. Never runs on invalid input.
    fn transform<U, F>(self, map: F) -> Transform<Self, F>
    where
        F: Fn(Self::Output) -> U,
    {
        Transform { inner: self, map }
    }

    /// Add a custom rule evaluated after the inner schema succeeded.
    fn refine<F>(self, predicate: F, message: impl Into<String>) -> Refine<Self, F>
    where
        F: Fn(&Self::Output) -> bool,
    {
        Refine {
            inner: self,
            predicate,
            message: message.into(),
        }
    }
}

impl<S: Schema> SchemaExt for S {}

impl<S: Schema + ?Sized> Schema for &S {
    type Output = S::Output;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<Self::Output> {
        (**self).check(value, path, issues)
    }
}

pub struct Optional<S> {
    inner: S,
}

impl<S: Schema> Schema for Optional<S> {
    type Output = Option<S::Output>;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<Self::Output> {
        match value {
            None | Some(Value::Null) => Some(None),
            Some(present) => self.inner.check(Some(present), path, issues).map(Some),
        }
    }
}

pub struct WithDefault<S: Schema> {
    inner: S,
    default: S::Output,
}

impl<S> Schema for WithDefault<S>
where
    S: Schema,
    S::Output: Clone,
{
    type Output = S::Output;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<Self::Output> {
        match value {
            None | Some(Value::Null) => Some(self.default.clone()),
            Some(present) => self.inner.check(Some(present), path, issues),
        }
    }
}

pub struct Transform<S, F> {
    inner: S,
    map: F,
}

impl<S, F, U> Schema for Transform<S, F>
where
    S: Schema,
    F: Fn(S::Output) -> U,
{
    type Output = U;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<Self::Output> {
        self.inner.check(value, path, issues).map(&self.map)
    }
}

pub struct Refine<S, F> {
    inner: S,
    predicate: F,
    message: String,
}

impl<S, F> Schema for Refine<S, F>
where
    S: Schema,
    F: Fn(&S::Output) -> bool,
{
    type Output = S::Output;

    fn check(
        &self,
        value: Option<&Value>,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
    ) -> Option<Self::Output> {
        let output = self.inner.check(value, path, issues)?;
        if (self.predicate)(&output) {
            Some(output)
        } else {
            issues.push(Issue::new(path.clone(), self.message.clone()));
            None
        }
    }
}

/// Name of a JSON value's type as used in "Expected X, received Y" messages.
pub(crate) fn received(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Shared handling for absent and mistyped values.
pub(crate) fn type_mismatch(
    expected: &str,
    value: Option<&Value>,
    path: &FieldPath,
    issues: &mut Vec<Issue>,
) {
    let message = match value {
        None => "Required".to_string(),
        Some(other) => format!("Expected {expected}, received {}", received(other)),
    };
    issues.push(Issue::new(path.clone(), message));
}
