//! ecoes-bff-axum - axum integration of the ecoes backend-for-frontend
//!
//! Mount [`app_router`] to get the pages, the auth endpoints and the generic
//! backend proxy, all sharing one [`AppState`].

mod auth;
mod context;
mod error;
mod middleware;
mod pages;
mod proxy;
mod router;
mod session;
mod state;


pub use context::request_context;
pub use error::{AppError, ErrorFormat, ErrorResponse, not_found};
pub use middleware::{backend_precheck, require_roles};
pub use pages::{PAGE_ROUTES, PageRoute, PageView};
pub use router::{app_router, app_router_no_trace, cors_layer};
pub use session::{AuthRedirect, CurrentSession};
pub use state::AppState;

// Re-export the core types handlers work with
pub use ecoes_bff::{ApiClient, ConfigError, Role, Settings};
