pub mod crash_log;
pub mod error;
pub mod project;
pub mod user;

use serde::Serialize;

pub use error::ServiceError;

/// One page of a listing together with the size of the whole listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub total: u64,
    pub items: Vec<T>,
}
