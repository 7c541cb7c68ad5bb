//! JSON API handlers, grouped by resource.

pub mod availability;
pub mod messages;
pub mod preferences;
pub mod trips;
pub mod triggers;
pub mod users;
pub mod votes;
