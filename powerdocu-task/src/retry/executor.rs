//! Sequential retry of fallible async operations.

use super::RetryPolicy;
use crate::host::{LogLevel, NoOpHost, TaskHost};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// One named unit of fallible async work.
///
/// The callable is invoked once per attempt; making repeated invocations
/// safe is the caller's job.
pub struct Operation<F> {
    name: String,
    callable: F,
}

impl<F> Operation<F> {
    /// Creates a new operation.
    pub fn new(name: impl Into<String>, callable: F) -> Self {
        Self {
            name: name.into(),
            callable,
        }
    }

    /// Returns the diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for Operation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").field("name", &self.name).finish()
    }
}

/// Runs operations under a [`RetryPolicy`].
///
/// Attempts never overlap: attempt N+1 starts only once attempt N has
/// settled and the policy delay has elapsed. When every attempt fails the
/// error of the last one is returned as is; earlier errors are only logged.
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    host: Arc<dyn TaskHost>,
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryExecutor {
    /// Creates an executor that reports to no host.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            host: Arc::new(NoOpHost),
        }
    }

    /// Sets the host receiving retry diagnostics.
    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn TaskHost>) -> Self {
        self.host = host;
        self
    }

    /// Returns the policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs an [`Operation`].
    pub async fn run<T, E, F, Fut>(&self, operation: Operation<F>) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let Operation { name, callable } = operation;
        self.execute(&name, callable).await
    }

    /// Invokes `operation` until it succeeds or the policy's attempts are
    /// used up.
    pub async fn execute<T, E, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(operation = operation_name, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let remaining = max_attempts - attempt;
                    if remaining == 0 {
                        tracing::error!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %error,
                            "Operation failed"
                        );
                        self.host.log(
                            LogLevel::Error,
                            &format!("Operation {operation_name} failed: {error}"),
                        );
                        return Err(error);
                    }

                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        remaining,
                        delay_ms = u64::try_from(self.policy.delay().as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Retrying operation"
                    );
                    self.host.log(
                        LogLevel::Warning,
                        &format!(
                            "Retrying operation {operation_name} after attempt {attempt} failed ({remaining} retries left): {error}"
                        ),
                    );

                    if !self.policy.delay().is_zero() {
                        tokio::time::sleep(self.policy.delay()).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Runs `operation` with `retry_count` additional attempts after the first
/// failure and the default fixed delay between attempts.
pub async fn retry_operation<T, E, F, Fut>(
    operation_name: &str,
    operation: F,
    retry_count: u32,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    RetryExecutor::new(RetryPolicy::from_retry_count(retry_count))
        .execute(operation_name, operation)
        .await
}
