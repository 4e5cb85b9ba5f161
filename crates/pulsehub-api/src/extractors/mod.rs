//! Query and path helpers shared by handlers.

pub mod pagination;
pub mod path;

pub use pagination::PaginationParams;
