use std::collections::BTreeMap;

use roster::application::error::AppError;
use roster::config::{SchemaKind, ValidateArgs};
use roster::domain::{posts, users};
use serde::Serialize;
use serde_json::Value;

use super::{print_json, read_file};

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Report {
    Valid { valid: bool, value: Value },
    Invalid {
        valid: bool,
        errors: BTreeMap<String, Vec<String>>,
    },
}

pub fn handle(args: &ValidateArgs) -> Result<(), AppError> {
    let raw = read_file(&args.file)?;
    let document: Value = serde_json::from_str(&raw).map_err(|source| AppError::InvalidJson {
        path: args.file.display().to_string(),
        source,
    })?;

    match normalize(args.schema, &document) {
        Ok(value) => print_json(&Report::Valid { valid: true, value }),
        Err(AppError::Validation(err)) => {
            print_json(&Report::Invalid {
                valid: false,
                errors: err.field_errors(),
            })?;
            Err(err.into())
        }
        Err(other) => Err(other),
    }
}

/// Validate `document` and re-serialize the typed value, dropping unknown fields.
fn normalize(schema: SchemaKind, document: &Value) -> Result<Value, AppError> {
    match schema {
        SchemaKind::User => render(users::validate_user(document)?),
        SchemaKind::CreateUser => render(users::validate_create_user(document)?),
        SchemaKind::Users => render(users::validate_users(document)?),
        SchemaKind::Post => render(posts::validate_post(document)?),
        SchemaKind::Posts => render(posts::validate_posts(document)?),
    }
}

fn render<T: Serialize>(value: T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::unexpected(format!("failed to render validated value: {e}")))
}
