//! Form submission handlers.
//!
//! An action rebuilds the nested payload from flattened form fields,
//! validates it and performs the write. Every outcome is returned as data:
//! either a redirect or the field errors to render next to the form.

use std::collections::BTreeMap;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::cache::{QueryClient, UserKeys};
use crate::domain::form::{FormData, unflatten};
use crate::domain::schema::SafeParse;
use crate::domain::users::{ID_MESSAGE, safe_validate_create_user};

use super::loaders::parse_user_id;
use super::repos::UsersRepo;

/// Field-error key for failures that are not tied to one input.
pub const SERVER_ERROR_KEY: &str = "_server";

const ACTION_TOTAL: &str = "roster_action_total";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Redirect {
        location: String,
    },
    Invalid {
        errors: BTreeMap<String, Vec<String>>,
        form_data: BTreeMap<String, String>,
    },
}

impl ActionOutcome {
    fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
        }
    }

    fn server_error(message: &str, form: &FormData) -> Self {
        Self::Invalid {
            errors: BTreeMap::from([(SERVER_ERROR_KEY.to_string(), vec![message.to_string()])]),
            form_data: form.to_map(),
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

#[derive(Clone)]
pub struct Actions {
    client: QueryClient,
    users: Arc<dyn UsersRepo>,
}

impl Actions {
    pub fn new(client: QueryClient, users: Arc<dyn UsersRepo>) -> Self {
        Self { client, users }
    }

    pub async fn create_user(&self, form: &FormData) -> ActionOutcome {
        let input = match validate_form(form) {
            Ok(input) => input,
            Err(invalid) => return record("create_user", invalid),
        };

        let write = self.users.create_user(&input);
        match self.client.write(write, &[UserKeys::all()]).await {
            Ok(created) => {
                info!(user_id = created.id, "user created");
                record("create_user", ActionOutcome::redirect("/users"))
            }
            Err(err) => {
                error!(error = %err, "user creation failed");
                record(
                    "create_user",
                    ActionOutcome::server_error("Failed to create user. Please try again.", form),
                )
            }
        }
    }

    pub async fn update_user(&self, param: &str, form: &FormData) -> ActionOutcome {
        let Ok(id) = parse_user_id(param) else {
            return record("update_user", invalid_id(form));
        };
        let input = match validate_form(form) {
            Ok(input) => input,
            Err(invalid) => return record("update_user", invalid),
        };

        let write = self.users.update_user(id, &input);
        match self
            .client
            .write(write, &[UserKeys::detail(id), UserKeys::lists()])
            .await
        {
            Ok(updated) => {
                info!(user_id = updated.id, "user updated");
                record("update_user", ActionOutcome::redirect(format!("/users/{id}")))
            }
            Err(err) => {
                error!(user_id = id, error = %err, "user update failed");
                record(
                    "update_user",
                    ActionOutcome::server_error("Failed to update user. Please try again.", form),
                )
            }
        }
    }

    pub async fn delete_user(&self, param: &str) -> ActionOutcome {
        let empty = FormData::new();
        let Ok(id) = parse_user_id(param) else {
            return record("delete_user", invalid_id(&empty));
        };

        match self
            .client
            .write(self.users.delete_user(id), &[UserKeys::lists()])
            .await
        {
            Ok(()) => {
                self.client.remove(&UserKeys::detail(id));
                info!(user_id = id, "user deleted");
                record("delete_user", ActionOutcome::redirect("/users"))
            }
            Err(err) => {
                error!(user_id = id, error = %err, "user deletion failed");
                record(
                    "delete_user",
                    ActionOutcome::server_error("Failed to delete user. Please try again.", &empty),
                )
            }
        }
    }
}

fn validate_form(form: &FormData) -> Result<roster_api_types::CreateUser, ActionOutcome> {
    let nested = unflatten(form).map_err(|err| ActionOutcome::Invalid {
        errors: err.field_errors(),
        form_data: form.to_map(),
    })?;

    match safe_validate_create_user(&nested) {
        SafeParse::Success(input) => Ok(input),
        SafeParse::Failure(err) => {
            warn!(issue_count = err.issues().len(), "submitted user failed validation");
            Err(ActionOutcome::Invalid {
                errors: err.field_errors(),
                form_data: form.to_map(),
            })
        }
    }
}

fn invalid_id(form: &FormData) -> ActionOutcome {
    ActionOutcome::Invalid {
        errors: BTreeMap::from([("id".to_string(), vec![ID_MESSAGE.to_string()])]),
        form_data: form.to_map(),
    }
}

fn record(action: &'static str, outcome: ActionOutcome) -> ActionOutcome {
    let result = match &outcome {
        ActionOutcome::Redirect { .. } => "redirect",
        ActionOutcome::Invalid { errors, .. } if errors.contains_key(SERVER_ERROR_KEY) => "server_error",
        ActionOutcome::Invalid { .. } => "invalid",
    };
    counter!(ACTION_TOTAL, "action" => action, "outcome" => result).increment(1);
    outcome
}
