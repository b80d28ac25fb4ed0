//! Retry with classified failures and exponential backoff
//!
//! Every page fetch runs through [`RetryPolicy::run`]. Failures are sorted
//! into retryable and permanent ones by the [`Classify`] trait; retryable
//! failures are retried after `base * 2^attempt` plus 10-30% jitter, while
//! permanent ones return at once. Running out of attempts yields a
//! [`RetryOutcome::Failure`] value so the caller can skip the item and keep
//! going.

mod classify;
mod policy;

pub use classify::{error_for_status, error_for_transport, Classify, ErrorClass};
pub use policy::{RetryContext, RetryOutcome, RetryPolicy, JITTER_MAX, JITTER_MIN};
