use std::marker::PhantomData;

use serde_json::{Map, Value};

use super::{FieldPath, Issue, Schema, type_mismatch};

/// Build an object schema from a closure that reads named fields.
///
/// Read every field before combining them so all violations are reported:
///
/// ```ignore
/// object(|f| {
///     let lat = f.field("lat", &string());
///     let lng = f.field("lng", &string());
///     Some(Geo { lat: lat?, lng: lng? })
/// })
/// ```
pub fn object<T, F>(build: F) -> ObjectSchema<T, F>
where
    F: Fn(&mut Fields<'_>) -> Option<T>,
{
    ObjectSchema {
        build,
        _output: PhantomData,
    }
}

pub struct ObjectSchema<T, F> {
    build: F,
    _output: PhantomData<fn() -> T>,
}

impl<T, F> Schema for ObjectSchema<T, F>
where
    F: Fn(&mut Fields<'_>) -> Option<T>,
{
    type Output = T;

    fn check(&self, value: Option<&Value>, path: &FieldPath, issues: &mut Vec<Issue>) -> Option<T> {
        let Some(Value::Object(map)) = value else {
            type_mismatch("object", value, path, issues);
            return None;
        };

        let before = issues.len();
        let mut fields = Fields { map, path, issues };
        let output = (self.build)(&mut fields);
        if issues.len() == before { output } else { None }
    }
}

/// Field reader handed to [`object`] closures.
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: &'a FieldPath,
    issues: &'a mut Vec<Issue>,
}

impl Fields<'_> {
    /// Validate the field `name` with `schema`, recording violations under
    /// the nested path.
    pub fn field<S: Schema>(&mut self, name: &str, schema: &S) -> Option<S::Output> {
        let path = self.path.key(name);
        schema.check(self.map.get(name), &path, self.issues)
    }
}
