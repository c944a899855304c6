//! Custom middleware for cross-cutting concerns.
//!
//! Both are plain async functions wrapped with `actix_web::middleware::from_fn`.

pub mod metrics;
pub mod request_id;

pub use metrics::*;
pub use request_id::*;
