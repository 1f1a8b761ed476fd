//! Roster: a validated, cached client for the demo users REST service.
//!
//! - [`domain`]: schema validator, user and post schemas, form reconstruction.
//! - [`cache`]: hierarchical query keys and the query client.
//! - [`infra`]: HTTP client, telemetry bootstrap.
//! - [`application`]: cached reads, route loaders, form actions, mutations.
//! - [`config`]: layered settings and command-line arguments.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
