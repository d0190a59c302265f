//! Bounded retry for external calls.
//!
//! External operations here (object-storage puts) are retried a fixed
//! number of times with no backoff: the failures worth retrying are flaky
//! network hiccups, and the operator is watching the terminal.

/// How many times an operation may be attempted in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// One try plus one retry.
    pub const ONCE: RetryPolicy = RetryPolicy { max_attempts: 2 };

    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::ONCE
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt number. `on_failure` is called after
/// every failed attempt that will be retried, with the attempt number and
/// the error. The last error is returned unchanged.
pub fn retry<T, E, F, R>(policy: RetryPolicy, mut op: F, mut on_failure: R) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    R: FnMut(u32, &E),
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max => {
                on_failure(attempt, &e);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
