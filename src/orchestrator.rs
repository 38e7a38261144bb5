//! Strategy iteration and outcome aggregation.
//!
//! # Responsibilities
//! - Gate every call on identifier validation before any network attempt
//! - Walk the strategy catalog in order, one retry loop per strategy
//! - Return the first terminal outcome; aggregate diagnostics otherwise
//!
//! # Design Decisions
//! - Strategies run sequentially: an early success short-circuits later
//!   attempts, and concurrent attempts would fight the same upstream limits
//! - A malformed strategy template is skipped, not fatal; its siblings may
//!   still succeed, and the fault is reported in the exhaustion diagnostics
//! - Logs carry the redacted identifier only

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::config::{RelayConfig, RetryConfig};
use crate::credentials::CredentialSynthesizer;
use crate::executor::{AttemptResult, Executor, HttpTransport};
use crate::identifier::Identifier;
use crate::observability::metrics;
use crate::outcome::{Outcome, StrategyDiagnostic};
use crate::resilience::retries::run_with_retries;
use crate::strategy::{StrategyCatalog, TemplateError};

/// Drives one `resolve()` call end to end. Cheap to rebuild, which is how
/// configuration reloads take effect.
pub struct Orchestrator {
    catalog: StrategyCatalog,
    synthesizer: CredentialSynthesizer,
    executor: Executor,
    retries: RetryConfig,
}

impl Orchestrator {
    /// Build the full pipeline from configuration. Fails only on strategy
    /// templates that reference unknown placeholders.
    pub fn from_config(
        config: &RelayConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            catalog: StrategyCatalog::from_config(config)?,
            synthesizer: CredentialSynthesizer::new(config.credentials.clone()),
            executor: Executor::new(
                transport,
                config.upstream.markers.clone(),
                Duration::from_secs(config.upstream.attempt_timeout_secs),
            ),
            retries: config.retries.clone(),
        })
    }

    /// Names of the active strategies, in priority order.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.catalog.strategies().iter().map(|s| s.name()).collect()
    }

    /// Resolve one caller-supplied identifier to a final outcome. Never
    /// fails: every fault maps into the outcome taxonomy.
    pub async fn resolve(&self, raw: &str) -> Outcome {
        let started = Instant::now();
        let outcome = self.resolve_inner(raw).await;
        metrics::record_resolve(outcome.label(), started);
        outcome
    }

    async fn resolve_inner(&self, raw: &str) -> Outcome {
        let identifier = match Identifier::parse(raw) {
            Ok(identifier) => identifier,
            Err(err) => {
                debug!(error = %err, "rejected identifier");
                return Outcome::ValidationError {
                    message: err.to_string(),
                };
            }
        };

        let mut diagnostics = Vec::with_capacity(self.catalog.len());
        let mut last_status = None;
        let mut reached_network = false;

        for strategy in self.catalog.strategies() {
            let result = match run_with_retries(
                &self.executor,
                &self.synthesizer,
                strategy,
                identifier.as_str(),
                &self.retries,
            )
            .await
            {
                Ok(result) => result,
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "strategy unusable");
                    diagnostics.push(StrategyDiagnostic {
                        strategy: strategy.name().to_string(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            reached_network = true;

            let outcome = classify(&result, &identifier);
            if outcome.is_terminal() {
                info!(
                    identifier = identifier.redacted(),
                    strategy = strategy.name(),
                    outcome = outcome.label(),
                    "resolved"
                );
                return outcome;
            }

            if let AttemptResult::TransientFailure {
                status: Some(status),
                ..
            } = &result
            {
                last_status = Some(*status);
            }
            diagnostics.push(StrategyDiagnostic {
                strategy: strategy.name().to_string(),
                reason: result.describe(),
            });
            debug!(
                strategy = strategy.name(),
                result = result.label(),
                "strategy exhausted, advancing"
            );
        }

        if !reached_network {
            warn!(
                identifier = identifier.redacted(),
                "no strategy produced a request"
            );
            return Outcome::InternalError {
                message: "no usable request strategy".to_string(),
            };
        }

        warn!(
            identifier = identifier.redacted(),
            strategies = diagnostics.len(),
            "all strategies exhausted"
        );
        Outcome::UpstreamError {
            status: last_status,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{RawResponse, TransportFailure, TransportRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and always answers with the same canned response.
    struct Counting {
        calls: AtomicUsize,
        status: u16,
        body: String,
    }

    impl Counting {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                status,
                body: body.to_string(),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for Counting {
        async fn send(&self, _: TransportRequest) -> Result<RawResponse, TransportFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawResponse {
                status: self.status,
                headers: Vec::new(),
                body: self.body.clone(),
            })
        }
    }

    fn fast_config() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.retries.base_delay_ms = 1;
        config.retries.max_delay_ms = 2;
        config.retries.jitter_ms = 0;
        config
    }

    #[tokio::test]
    async fn invalid_identifier_never_reaches_the_network() {
        let transport = Counting::new(200, "");
        let orchestrator =
            Orchestrator::from_config(&fast_config(), transport.clone()).unwrap();

        for raw in ["", "   ", "not a valid identifier!"] {
            let outcome = orchestrator.resolve(raw).await;
            assert!(matches!(outcome, Outcome::ValidationError { .. }), "input {raw:?}");
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_strategy_success_short_circuits() {
        let transport = Counting::new(200, r#"{"status": "ok", "message": "Email sent"}"#);
        let orchestrator =
            Orchestrator::from_config(&fast_config(), transport.clone()).unwrap();

        let outcome = orchestrator.resolve("someuser").await;
        assert_eq!(outcome.label(), "success");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_every_strategy_in_order() {
        let transport = Counting::new(503, "upstream down");
        let config = fast_config();
        let orchestrator = Orchestrator::from_config(&config, transport.clone()).unwrap();

        let outcome = orchestrator.resolve("someuser").await;
        match outcome {
            Outcome::UpstreamError {
                status,
                diagnostics,
            } => {
                assert_eq!(status, Some(503));
                let names: Vec<&str> =
                    diagnostics.iter().map(|d| d.strategy.as_str()).collect();
                assert_eq!(names, vec!["web-ajax", "mobile-lookup", "legacy-form"]);
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
        // Three strategies, three attempts each.
        assert_eq!(transport.calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn unrenderable_strategies_aggregate_to_internal_error() {
        let transport = Counting::new(200, "");
        let mut config = fast_config();
        // Passes placeholder checks but renders an unparseable URL.
        config.upstream.base_url = "not a base url".to_string();
        let orchestrator = Orchestrator::from_config(&config, transport.clone()).unwrap();

        let outcome = orchestrator.resolve("someuser").await;
        assert!(matches!(outcome, Outcome::InternalError { .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
