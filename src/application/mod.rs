//! Application services: cached reads, route loaders, form actions and mutations.

pub mod actions;
pub mod error;
pub mod loaders;
pub mod mutations;
pub mod queries;
pub mod repos;

#[cfg(test)]
pub(crate) mod test_support;
