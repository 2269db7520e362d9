pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::AuthUser;
pub use rate_limit::{Quota, RateLimiter};
pub use request_id::{make_span_with_request_id, request_id_middleware, RequestId};
