pub mod manager;
pub mod models;
pub mod page;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use page::{PageQuery, PageRequest};
pub use repository::{Projection, Repository, Resource, Scope};
