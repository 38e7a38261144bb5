//! Per-strategy attempt loop.
//!
//! # Responsibilities
//! - Run one strategy up to its attempt budget
//! - Space attempts with jittered exponential backoff
//! - Synthesize fresh credentials between attempts when configured
//!
//! # Design Decisions
//! - Retry decisions come from the classified result, not raw status codes
//! - Definitive upstream answers stop the loop immediately
//! - Template faults abort without a retry; they cannot heal on their own

use tracing::debug;

use crate::config::RetryConfig;
use crate::credentials::CredentialSynthesizer;
use crate::executor::{AttemptResult, Executor, ExecutorError};
use crate::observability::metrics;
use crate::strategy::{RenderContext, Strategy};

use super::backoff::calculate_backoff;

/// Drive one strategy until it yields a non-retryable result or the attempt
/// budget runs out. Returns the last attempt's result either way.
pub async fn run_with_retries(
    executor: &Executor,
    synthesizer: &CredentialSynthesizer,
    strategy: &Strategy,
    identifier: &str,
    policy: &RetryConfig,
) -> Result<AttemptResult, ExecutorError> {
    let budget = policy.max_attempts.max(1);
    let mut credentials = synthesizer.synthesize();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let ctx = RenderContext::new(identifier, &credentials, synthesizer.seeds());
        let result = executor.execute(strategy, &ctx).await?;
        metrics::record_attempt(strategy.name(), result.label());

        if !result.retryable() || attempt >= budget {
            return Ok(result);
        }

        let delay = calculate_backoff(
            attempt,
            policy.base_delay_ms,
            policy.max_delay_ms,
            policy.jitter_ms,
        );
        debug!(
            strategy = strategy.name(),
            attempt,
            result = result.label(),
            delay_ms = delay.as_millis() as u64,
            "attempt failed, backing off"
        );
        tokio::time::sleep(delay).await;

        if policy.refresh_credentials {
            credentials = synthesizer.synthesize();
        }
    }
}
