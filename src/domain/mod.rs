//! Domain layer: validation rules for records crossing the network and form
//! boundaries.

pub mod form;
pub mod posts;
pub mod schema;
pub mod users;
