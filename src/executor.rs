//! One-shot request execution against the upstream recovery service.
//!
//! # Responsibilities
//! - Render a strategy's templates into a concrete HTTP request
//! - Issue exactly one call through the transport seam with a bounded deadline
//! - Classify the raw response into an `AttemptResult` via the configured
//!   marker predicates
//!
//! # Design Decisions
//! - The transport is a trait object so the core never depends on a
//!   particular HTTP library's API shape and tests can substitute a
//!   recording mock
//! - Marker strings are configuration: upstream error text is brittle and
//!   operators must be able to tighten the predicates without a rebuild
//! - Predicates run in a fixed priority order; the first match wins
//! - No retries here; that is the retry controller's job

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::MarkerConfig;
use crate::resilience::timeouts::Deadline;
use crate::strategy::{HttpMethod, RenderContext, Strategy, TemplateError};

/// A rendered upstream request, independent of any transport library.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Deadline the transport must enforce on the whole exchange.
    pub timeout: Duration,
}

/// Raw upstream response before classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    /// `Retry-After` seconds, when the upstream sent one.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
            .and_then(|(_, value)| value.trim().parse().ok())
    }
}

/// Transport-level failures: the request never produced an HTTP response.
#[derive(Debug, Clone, Error)]
pub enum TransportFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// The outbound HTTP capability the executor needs. One call, one response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportFailure>;
}

/// Production transport backed by a shared reqwest client.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportFailure> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout
    } else if err.is_connect() {
        TransportFailure::Connect(err.to_string())
    } else {
        TransportFailure::Other(err.to_string())
    }
}

/// Faults that prevent an attempt from being issued at all. Transport and
/// upstream failures are not errors here; they classify into `AttemptResult`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The strategy's templates could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Why a definitive failure is definitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Upstream confirmed no matching account.
    NotFound,
    /// Upstream demands interactive verification.
    ChallengeRequired,
}

/// What flavor of transient failure this was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    RateLimited,
    ClientError,
    ServerError,
}

/// How the transport failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

/// Outcome of one executor call. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptResult {
    /// Upstream acknowledged the recovery request.
    Success { message: String },

    /// Upstream gave a confirmed answer; retrying cannot change it.
    DefinitiveFailure { kind: FailureKind, message: String },

    /// Presumed recoverable by retrying the same strategy.
    TransientFailure {
        kind: TransientKind,
        status: Option<u16>,
        retry_after_secs: Option<u64>,
        message: String,
    },

    /// The request never produced an HTTP response.
    TransportError {
        kind: TransportErrorKind,
        message: String,
    },
}

impl AttemptResult {
    /// Whether the retry controller may try this strategy again.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            AttemptResult::TransientFailure { .. } | AttemptResult::TransportError { .. }
        )
    }

    /// Stable tag for logs and per-attempt metrics.
    pub fn label(&self) -> &'static str {
        match self {
            AttemptResult::Success { .. } => "success",
            AttemptResult::DefinitiveFailure {
                kind: FailureKind::NotFound,
                ..
            } => "not_found",
            AttemptResult::DefinitiveFailure {
                kind: FailureKind::ChallengeRequired,
                ..
            } => "challenge_required",
            AttemptResult::TransientFailure {
                kind: TransientKind::RateLimited,
                ..
            } => "rate_limited",
            AttemptResult::TransientFailure {
                kind: TransientKind::ClientError,
                ..
            } => "client_error",
            AttemptResult::TransientFailure {
                kind: TransientKind::ServerError,
                ..
            } => "server_error",
            AttemptResult::TransportError {
                kind: TransportErrorKind::Timeout,
                ..
            } => "timeout",
            AttemptResult::TransportError { .. } => "transport_error",
        }
    }

    /// Human-readable reason, used for per-strategy diagnostics.
    pub fn describe(&self) -> String {
        match self {
            AttemptResult::Success { message } => message.clone(),
            AttemptResult::DefinitiveFailure { message, .. } => message.clone(),
            AttemptResult::TransientFailure {
                status, message, ..
            } => match status {
                Some(status) => format!("{message} (HTTP {status})"),
                None => message.clone(),
            },
            AttemptResult::TransportError { message, .. } => message.clone(),
        }
    }
}

/// Issues one rendered strategy request and classifies what came back.
pub struct Executor {
    transport: Arc<dyn HttpTransport>,
    markers: MarkerConfig,
    deadline: Deadline,
}

impl Executor {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        markers: MarkerConfig,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            markers,
            deadline: Deadline::new(attempt_timeout),
        }
    }

    /// Render the strategy against one attempt's context, send it, classify
    /// the response. Template faults surface as errors; they are
    /// configuration bugs, not upstream conditions.
    pub async fn execute(
        &self,
        strategy: &Strategy,
        ctx: &RenderContext<'_>,
    ) -> Result<AttemptResult, ExecutorError> {
        let url = strategy.render_url(ctx)?;
        let mut headers = strategy.render_headers(ctx)?;
        let body = strategy.render_body(ctx)?;
        if let Some(content_type) = strategy.content_type() {
            headers.push(("Content-Type".to_string(), content_type.to_string()));
        }

        let request = TransportRequest {
            method: strategy.method(),
            url,
            headers,
            body,
            timeout: self.deadline.limit(),
        };

        // The deadline also bounds transports that ignore request.timeout.
        let sent = match self.deadline.bound(self.transport.send(request)).await {
            Ok(sent) => sent,
            Err(_) => Err(TransportFailure::Timeout),
        };

        Ok(match sent {
            Ok(response) => self.classify_response(response),
            Err(failure) => transport_result(failure),
        })
    }

    /// The ordered predicate table. First match wins.
    fn classify_response(&self, response: RawResponse) -> AttemptResult {
        let status = response.status;
        let retry_after_secs = response.retry_after_secs();
        let parsed: Option<serde_json::Value> = serde_json::from_str(&response.body).ok();
        let message = extract_message(parsed.as_ref(), status);
        let lower = message.to_lowercase();

        let has_marker =
            |markers: &[String]| markers.iter().any(|marker| lower.contains(marker.as_str()));

        if (200..300).contains(&status) {
            let ok = parsed
                .as_ref()
                .and_then(|body| body.get("status"))
                .and_then(|value| value.as_str())
                .map(|value| self.markers.ok.iter().any(|marker| marker == value))
                .unwrap_or(false);
            if ok {
                return AttemptResult::Success { message };
            }
        }

        if status == 429 || has_marker(&self.markers.rate_limited) {
            return AttemptResult::TransientFailure {
                kind: TransientKind::RateLimited,
                status: Some(status),
                retry_after_secs,
                message,
            };
        }

        if status == 403 || has_marker(&self.markers.challenge) {
            return AttemptResult::DefinitiveFailure {
                kind: FailureKind::ChallengeRequired,
                message,
            };
        }

        if (400..500).contains(&status) && has_marker(&self.markers.not_found) {
            return AttemptResult::DefinitiveFailure {
                kind: FailureKind::NotFound,
                message,
            };
        }

        if status >= 500 {
            return AttemptResult::TransientFailure {
                kind: TransientKind::ServerError,
                status: Some(status),
                retry_after_secs,
                message,
            };
        }

        // Remaining 4xx, unparseable bodies, and 2xx without the ok marker:
        // upstream error text is too brittle to pin down, so stay retryable.
        AttemptResult::TransientFailure {
            kind: TransientKind::ClientError,
            status: Some(status),
            retry_after_secs,
            message,
        }
    }
}

fn transport_result(failure: TransportFailure) -> AttemptResult {
    let kind = match failure {
        TransportFailure::Timeout => TransportErrorKind::Timeout,
        TransportFailure::Connect(_) => TransportErrorKind::Connect,
        TransportFailure::Other(_) => TransportErrorKind::Other,
    };
    AttemptResult::TransportError {
        kind,
        message: failure.to_string(),
    }
}

/// Pull a human-readable message out of the body: `message`, then `errors`
/// (string or array), then `error_title`, then the status line.
fn extract_message(parsed: Option<&serde_json::Value>, status: u16) -> String {
    if let Some(body) = parsed {
        if let Some(message) = body.get("message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
        if let Some(errors) = body.get("errors") {
            if let Some(text) = errors.as_str() {
                return text.to_string();
            }
            if let Some(list) = errors.as_array() {
                let joined: Vec<&str> = list.iter().filter_map(|v| v.as_str()).collect();
                if !joined.is_empty() {
                    return joined.join(", ");
                }
            }
        }
        if let Some(title) = body.get("error_title").and_then(|v| v.as_str()) {
            return title.to_string();
        }
    }
    format!("upstream returned HTTP {status}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::credentials::{CredentialConfig, CredentialSynthesizer};
    use crate::strategy::StrategyCatalog;
    use std::sync::Mutex;

    fn executor_with(transport: Arc<dyn HttpTransport>) -> Executor {
        Executor::new(
            transport,
            MarkerConfig::default(),
            Duration::from_millis(100),
        )
    }

    fn bare_executor() -> Executor {
        struct Unreachable;
        #[async_trait]
        impl HttpTransport for Unreachable {
            async fn send(&self, _: TransportRequest) -> Result<RawResponse, TransportFailure> {
                unreachable!("classification tests never send")
            }
        }
        executor_with(Arc::new(Unreachable))
    }

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn ok_marker_on_2xx_is_success() {
        let result = bare_executor().classify_response(response(
            200,
            r#"{"status": "ok", "message": "Email sent"}"#,
        ));
        assert_eq!(
            result,
            AttemptResult::Success {
                message: "Email sent".to_string()
            }
        );
    }

    #[test]
    fn status_429_is_rate_limited_with_retry_after() {
        let mut resp = response(429, r#"{"message": "Please wait"}"#);
        resp.headers
            .push(("Retry-After".to_string(), "120".to_string()));
        let result = bare_executor().classify_response(resp);
        assert_eq!(
            result,
            AttemptResult::TransientFailure {
                kind: TransientKind::RateLimited,
                status: Some(429),
                retry_after_secs: Some(120),
                message: "Please wait".to_string(),
            }
        );
    }

    #[test]
    fn rate_marker_beats_status_class() {
        // A 400 whose text mentions throttling is throttling, not a
        // client error.
        let result = bare_executor()
            .classify_response(response(400, r#"{"message": "rate limit exceeded"}"#));
        assert!(matches!(
            result,
            AttemptResult::TransientFailure {
                kind: TransientKind::RateLimited,
                ..
            }
        ));
    }

    #[test]
    fn status_403_is_challenge_required() {
        let result =
            bare_executor().classify_response(response(403, r#"{"message": "Forbidden"}"#));
        assert!(matches!(
            result,
            AttemptResult::DefinitiveFailure {
                kind: FailureKind::ChallengeRequired,
                ..
            }
        ));
    }

    #[test]
    fn challenge_marker_in_2xx_body() {
        let result = bare_executor().classify_response(response(
            200,
            r#"{"status": "fail", "message": "checkpoint_required"}"#,
        ));
        assert!(matches!(
            result,
            AttemptResult::DefinitiveFailure {
                kind: FailureKind::ChallengeRequired,
                ..
            }
        ));
    }

    #[test]
    fn not_found_marker_needs_4xx() {
        let exec = bare_executor();
        let body = r#"{"message": "No account found"}"#;

        let on_400 = exec.classify_response(response(400, body));
        assert!(matches!(
            on_400,
            AttemptResult::DefinitiveFailure {
                kind: FailureKind::NotFound,
                ..
            }
        ));

        // The same text on a 2xx stays retryable: without the ok marker the
        // response shape is unknown.
        let on_200 = exec.classify_response(response(200, body));
        assert!(matches!(
            on_200,
            AttemptResult::TransientFailure {
                kind: TransientKind::ClientError,
                ..
            }
        ));
    }

    #[test]
    fn unparseable_4xx_is_transient_client_error() {
        let result = bare_executor().classify_response(response(400, "<html>error</html>"));
        assert_eq!(
            result,
            AttemptResult::TransientFailure {
                kind: TransientKind::ClientError,
                status: Some(400),
                retry_after_secs: None,
                message: "upstream returned HTTP 400".to_string(),
            }
        );
    }

    #[test]
    fn status_5xx_is_transient_server_error() {
        let result = bare_executor().classify_response(response(502, "Bad Gateway"));
        assert!(matches!(
            result,
            AttemptResult::TransientFailure {
                kind: TransientKind::ServerError,
                status: Some(502),
                ..
            }
        ));
    }

    #[test]
    fn message_extraction_falls_back_through_fields() {
        assert_eq!(
            extract_message(
                Some(&serde_json::json!({"errors": ["first", "second"]})),
                400
            ),
            "first, second"
        );
        assert_eq!(
            extract_message(Some(&serde_json::json!({"error_title": "Try later"})), 400),
            "Try later"
        );
        assert_eq!(extract_message(None, 503), "upstream returned HTTP 503");
    }

    /// Records what the transport was asked to send.
    struct Recording {
        requests: Mutex<Vec<TransportRequest>>,
    }

    #[async_trait]
    impl HttpTransport for Recording {
        async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportFailure> {
            self.requests
                .lock()
                .expect("recording transport mutex poisoned")
                .push(request);
            Ok(RawResponse {
                status: 200,
                headers: Vec::new(),
                body: r#"{"status": "ok", "message": "sent"}"#.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn execute_renders_and_sends_one_request() {
        let recording = Arc::new(Recording {
            requests: Mutex::new(Vec::new()),
        });
        let executor = executor_with(recording.clone());

        let config = RelayConfig::default();
        let catalog = StrategyCatalog::from_config(&config).unwrap();
        let synthesizer = CredentialSynthesizer::new(CredentialConfig::default());
        let credentials = synthesizer.synthesize();
        let ctx = RenderContext::new("someuser", &credentials, synthesizer.seeds());

        let result = executor
            .execute(&catalog.strategies()[0], &ctx)
            .await
            .unwrap();
        assert!(matches!(result, AttemptResult::Success { .. }));

        let requests = recording.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert!(request.url.ends_with("/account_recovery/ajax/"));
        assert!(request.body.as_deref().unwrap().contains("someuser"));
        let csrf = request
            .headers
            .iter()
            .find(|(name, _)| name == "X-CSRFToken")
            .map(|(_, value)| value.as_str())
            .unwrap();
        assert_eq!(csrf, credentials.csrf_token);
        assert!(request
            .headers
            .contains(&("Content-Type".to_string(), "application/x-www-form-urlencoded".to_string())));
    }

    #[tokio::test]
    async fn slow_transport_hits_the_deadline() {
        struct Stalls;
        #[async_trait]
        impl HttpTransport for Stalls {
            async fn send(&self, _: TransportRequest) -> Result<RawResponse, TransportFailure> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(RawResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: String::new(),
                })
            }
        }

        let executor = Executor::new(
            Arc::new(Stalls),
            MarkerConfig::default(),
            Duration::from_millis(20),
        );
        let config = RelayConfig::default();
        let catalog = StrategyCatalog::from_config(&config).unwrap();
        let synthesizer = CredentialSynthesizer::new(CredentialConfig::default());
        let credentials = synthesizer.synthesize();
        let ctx = RenderContext::new("someuser", &credentials, synthesizer.seeds());

        let result = executor
            .execute(&catalog.strategies()[0], &ctx)
            .await
            .unwrap();
        assert!(matches!(
            result,
            AttemptResult::TransportError {
                kind: TransportErrorKind::Timeout,
                ..
            }
        ));
    }
}
