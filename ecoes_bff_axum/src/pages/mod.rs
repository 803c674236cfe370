//! HTML pages, registered from a single route table

mod handlers;
mod routes;

pub use routes::{PAGE_ROUTES, PageRoute, PageView};

pub(crate) use routes::router;
