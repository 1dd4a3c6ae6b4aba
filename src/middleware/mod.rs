//! Request middleware: bearer-token authentication and per-route rate
//! limiting.

mod jwt_middleware;
mod rate_limit;

pub use jwt_middleware::JwtMiddleware;
pub use rate_limit::{RateLimit, RateLimiter};
