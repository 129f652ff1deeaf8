pub mod app;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod rate_limiter;

pub use app::build_router;
pub use config::ThrottleConfig;
pub use errors::ThrottleError;
pub use middleware::{rate_limited, RateLimitLayer, RateLimited};
pub use rate_limiter::{Guarded, RateLimiter};
