//! Observability module - request IDs on every request and response.

mod request_id;

pub use request_id::{RequestId, RequestIdMiddleware};
