// Global request rate limit backed by governor's direct (unkeyed) limiter.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

pub type ApiRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub fn build(per_minute: u32) -> Arc<ApiRateLimiter> {
    let quota = NonZeroU32::new(per_minute.max(1)).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_minute(quota)))
}

pub async fn rate_limiter_middleware(
    State(limiter): State<Arc<ApiRateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if limiter.check().is_err() {
        warn!("Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_enforces_quota() {
        let limiter = build(2);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
