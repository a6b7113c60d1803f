//! Retry of fallible async operations with a fixed delay between attempts.
//!
//! ```rust,ignore
//! let executor = RetryExecutor::new(RetryPolicy::from_retry_count(3)).with_host(host);
//! let release = executor.execute("GetRelease", || resolver.resolve()).await?;
//! ```

mod executor;
mod policy;

pub use executor::{retry_operation, Operation, RetryExecutor};
pub use policy::{RetryPolicy, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY};
