use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

use crate::domain::form::FormData;

/// Command-line arguments for the Roster binary.
#[derive(Debug, Parser)]
#[command(
    name = "roster",
    version,
    about = "Users directory client with validated, cached reads"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "ROSTER_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the users service base URL.
    #[arg(long = "api-base-url", value_name = "URL", global = true)]
    pub api_base_url: Option<String>,

    /// Override the per-request timeout.
    #[arg(long = "api-timeout-seconds", value_name = "SECONDS", global = true)]
    pub api_timeout_seconds: Option<u64>,

    /// Override how many times failed reads are retried.
    #[arg(long = "api-retry-attempts", value_name = "COUNT", global = true)]
    pub api_retry_attempts: Option<u32>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Read and modify users.
    #[command(subcommand)]
    Users(UsersCmd),
    /// Check a JSON document against one of the record schemas.
    Validate(ValidateArgs),
}

#[derive(Debug, Subcommand, Clone)]
pub enum UsersCmd {
    /// List every user.
    List,
    /// Show one user.
    Get { id: String },
    /// List the posts written by a user.
    Posts { id: String },
    /// Create a user from form fields.
    Create(FormArgs),
    /// Replace a user with the submitted form fields.
    Update {
        id: String,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Delete a user.
    Delete { id: String },
}

#[derive(Debug, Args, Default, Clone)]
pub struct FormArgs {
    /// Form field as NAME=VALUE. Nested fields use dots, e.g. `address.city=Bangkok`.
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = FormData::parse_pair)]
    pub fields: Vec<(String, String)>,

    /// Read NAME=VALUE lines from a file; `--field` values are applied after it.
    #[arg(long = "form-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub form_file: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ValidateArgs {
    /// Schema to validate against.
    #[arg(long, value_enum)]
    pub schema: SchemaKind,

    /// JSON document to validate.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaKind {
    User,
    CreateUser,
    Users,
    Post,
    Posts,
}
