//! TEAM_450: User memory access.

pub mod paged;
pub mod user;
