//! Burrow Network Layer
//!
//! Provides resilient networking for recursive research:
//! - Rotating proxy pool scored by success history
//! - Randomized request headers
//! - Retry with exponential backoff and jitter
//! - Search resolution with a fallback circuit breaker
//! - Page text extraction

pub mod proxy;
pub mod headers;
pub mod fetch;
pub mod transport;
pub mod search;
pub mod extract;

pub use proxy::*;
pub use headers::*;
pub use fetch::*;
pub use transport::*;
pub use search::*;
pub use extract::*;
