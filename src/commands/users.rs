use std::sync::Arc;

use roster::application::actions::{ActionOutcome, Actions};
use roster::application::error::AppError;
use roster::application::loaders::Loaders;
use roster::application::repos::{PostsRepo, UsersRepo};
use roster::cache::{CacheConfig, QueryClient};
use roster::config::{FormArgs, Settings, UsersCmd};
use roster::domain::form::FormData;
use roster::infra::http::ApiClient;
use tracing::debug;

use super::{print_json, read_file};

pub async fn handle(settings: &Settings, cmd: UsersCmd) -> Result<(), AppError> {
    let api = Arc::new(ApiClient::new(&settings.api)?);
    debug!(base_url = %api.base_url(), "users service client ready");

    let client = QueryClient::new(CacheConfig::from(&settings.cache));
    let users: Arc<dyn UsersRepo> = api.clone();
    let posts: Arc<dyn PostsRepo> = api;
    let loaders = Loaders::new(client.clone(), Arc::clone(&users), posts);
    let actions = Actions::new(client, users);

    match cmd {
        UsersCmd::List => print_json(&*loaders.users().await?),
        UsersCmd::Get { id } => print_json(&*loaders.user(&id).await?),
        UsersCmd::Posts { id } => print_json(&*loaders.user_posts(&id).await?),
        UsersCmd::Create(form) => {
            let form = read_form(&form)?;
            settle("create user", actions.create_user(&form).await)
        }
        UsersCmd::Update { id, form } => {
            let form = read_form(&form)?;
            settle("update user", actions.update_user(&id, &form).await)
        }
        UsersCmd::Delete { id } => settle("delete user", actions.delete_user(&id).await),
    }
}

/// Form fields from `--form-file` first, then each `--field` in order.
pub fn read_form(args: &FormArgs) -> Result<FormData, AppError> {
    let mut form = match args.form_file.as_deref() {
        Some(path) => FormData::parse_lines(&read_file(path)?)?,
        None => FormData::new(),
    };
    for (name, value) in &args.fields {
        form.append(name.as_str(), value.as_str());
    }
    Ok(form)
}

fn settle(action: &'static str, outcome: ActionOutcome) -> Result<(), AppError> {
    print_json(&outcome)?;
    match outcome {
        ActionOutcome::Redirect { .. } => Ok(()),
        ActionOutcome::Invalid { errors, .. } => Err(AppError::Rejected {
            action,
            fields: errors.len(),
        }),
    }
}
