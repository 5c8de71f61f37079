pub mod auth;
pub mod rate_limit;

pub use auth::{require_admin, require_auth, resolve_actor, Claims};
pub use rate_limit::rate_limit_middleware;
