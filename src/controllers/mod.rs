pub mod base;
pub mod poi;
pub mod trip;
pub mod user;

pub use base::{Count, Delete, Insert, ListOwned, Load, Paginate, Show, Update};
