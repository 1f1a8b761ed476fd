//! Handlers for the `roster` subcommands.

pub mod users;
pub mod validate;

use std::fs;
use std::path::Path;

use serde::Serialize;

use roster::application::error::AppError;
use roster::infra::error::InfraError;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::unexpected(format!("failed to render output: {e}")))?;
    println!("{out}");
    Ok(())
}

pub fn read_file(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|err| AppError::from(InfraError::from(err)))
}
