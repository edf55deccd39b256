pub mod cors;
pub mod rate_limiter;
