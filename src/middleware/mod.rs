pub mod auth;
pub mod cors;

pub use auth::{admin_only_middleware, auth_middleware, staff_only_middleware, AuthenticatedUser};
pub use cors::{cors_middleware, cors_middleware_with_origins};
