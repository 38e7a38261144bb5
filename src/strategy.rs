//! Request strategy catalog and template rendering.
//!
//! # Responsibilities
//! - Hold the ordered list of candidate request strategies
//! - Render URL/header/body templates against one attempt's identifier,
//!   credentials, and configured seed values
//! - Reject templates that reference unknown placeholders at build time
//!
//! # Design Decisions
//! - Strategies are immutable and self-contained; running any subset in any
//!   order needs no cross-strategy state
//! - Catalog order is priority order, taken straight from configuration
//! - Placeholder tokens are `{lower_snake}` words, so literal braces in a
//!   JSON body template pass through untouched

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::RelayConfig;
use crate::credentials::SessionCredentials;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([a-z][a-z0-9_]*)\}").unwrap();
}

/// Placeholder names every template may reference, independent of the
/// configured seed table.
const BUILTIN_PLACEHOLDERS: [&str; 6] = [
    "identifier",
    "csrf_token",
    "session_id",
    "ajax_id",
    "claim_token",
    "device_id",
];

/// Template faults. These are configuration bugs, not upstream conditions,
/// and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A template references a placeholder that is neither a built-in field
    /// nor a configured seed.
    #[error("strategy `{strategy}` references unknown placeholder `{placeholder}`")]
    UnknownPlaceholder { strategy: String, placeholder: String },

    /// The rendered URL failed to parse.
    #[error("strategy `{strategy}` rendered an invalid url: {detail}")]
    InvalidUrl { strategy: String, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Body encoding, which also fixes the Content-Type and the escaping applied
/// to substituted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Form,
    Json,
}

impl BodyKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            BodyKind::Form => "application/x-www-form-urlencoded",
            BodyKind::Json => "application/json",
        }
    }
}

/// Escaping applied to a substituted value, chosen by where the template
/// sits: URLs and form bodies percent-encode, JSON bodies escape for a
/// string literal, headers substitute verbatim.
#[derive(Debug, Clone, Copy)]
enum EscapeMode {
    None,
    UrlComponent,
    JsonString,
}

/// One concrete way of attempting the upstream request.
#[derive(Debug, Clone)]
pub struct Strategy {
    name: String,
    method: HttpMethod,
    url_template: String,
    headers: Vec<(String, String)>,
    body_template: Option<String>,
    body_kind: BodyKind,
}

impl Strategy {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Content-Type implied by the body template, if there is one.
    pub fn content_type(&self) -> Option<&'static str> {
        self.body_template.as_ref().map(|_| self.body_kind.content_type())
    }

    pub fn render_url(&self, ctx: &RenderContext<'_>) -> Result<String, TemplateError> {
        let rendered = render(&self.name, &self.url_template, ctx, EscapeMode::UrlComponent)?;
        if let Err(err) = Url::parse(&rendered) {
            return Err(TemplateError::InvalidUrl {
                strategy: self.name.clone(),
                detail: err.to_string(),
            });
        }
        Ok(rendered)
    }

    pub fn render_headers(&self, ctx: &RenderContext<'_>) -> Result<Vec<(String, String)>, TemplateError> {
        self.headers
            .iter()
            .map(|(name, template)| {
                render(&self.name, template, ctx, EscapeMode::None)
                    .map(|value| (name.clone(), value))
            })
            .collect()
    }

    pub fn render_body(&self, ctx: &RenderContext<'_>) -> Result<Option<String>, TemplateError> {
        let escape = match self.body_kind {
            BodyKind::Form => EscapeMode::UrlComponent,
            BodyKind::Json => EscapeMode::JsonString,
        };
        self.body_template
            .as_ref()
            .map(|template| render(&self.name, template, ctx, escape))
            .transpose()
    }
}

/// Ordered, validated strategy list.
#[derive(Debug, Clone)]
pub struct StrategyCatalog {
    strategies: Vec<Strategy>,
}

impl StrategyCatalog {
    /// Build the catalog from configuration. Resolves each path template
    /// against the upstream base URL and rejects unknown placeholders up
    /// front, so render failures at request time are limited to URL parse
    /// errors on hostile identifier input.
    pub fn from_config(config: &RelayConfig) -> Result<Self, TemplateError> {
        let base = config.upstream.base_url.trim_end_matches('/');
        let mut strategies = Vec::with_capacity(config.strategies.len());

        for entry in &config.strategies {
            let url_template = format!("{}/{}", base, entry.path.trim_start_matches('/'));

            let strategy = Strategy {
                name: entry.name.clone(),
                method: entry.method,
                url_template,
                headers: entry
                    .headers
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                body_template: entry.body.clone(),
                body_kind: entry.body_kind,
            };
            check_placeholders(&strategy, &config.credentials.seeds)?;
            strategies.push(strategy);
        }

        Ok(Self { strategies })
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// The values one attempt substitutes into templates.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    identifier: &'a str,
    credentials: &'a SessionCredentials,
    seeds: &'a HashMap<String, String>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        identifier: &'a str,
        credentials: &'a SessionCredentials,
        seeds: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            identifier,
            credentials,
            seeds,
        }
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "identifier" => Some(self.identifier),
            "csrf_token" => Some(&self.credentials.csrf_token),
            "session_id" => Some(&self.credentials.session_id),
            "ajax_id" => Some(&self.credentials.ajax_id),
            "claim_token" => Some(&self.credentials.claim_token),
            "device_id" => Some(&self.credentials.device_id),
            _ => self.seeds.get(name).map(String::as_str),
        }
    }
}

fn render(
    strategy: &str,
    template: &str,
    ctx: &RenderContext<'_>,
    escape: EscapeMode,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let value = ctx
            .lookup(name)
            .ok_or_else(|| TemplateError::UnknownPlaceholder {
                strategy: strategy.to_string(),
                placeholder: name.to_string(),
            })?;

        out.push_str(&template[last..whole.0]);
        out.push_str(&escape_value(value, escape));
        last = whole.1;
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn escape_value(value: &str, mode: EscapeMode) -> String {
    match mode {
        EscapeMode::None => value.to_string(),
        EscapeMode::UrlComponent => {
            url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
        }
        EscapeMode::JsonString => {
            // serde_json cannot fail on a plain &str; the slice drops the
            // surrounding quotes of the produced literal.
            let quoted = serde_json::to_string(value).unwrap_or_default();
            quoted
                .get(1..quoted.len().saturating_sub(1))
                .unwrap_or_default()
                .to_string()
        }
    }
}

fn check_placeholders(
    strategy: &Strategy,
    seeds: &HashMap<String, String>,
) -> Result<(), TemplateError> {
    let mut templates: Vec<&str> = vec![&strategy.url_template];
    templates.extend(strategy.headers.iter().map(|(_, v)| v.as_str()));
    if let Some(body) = &strategy.body_template {
        templates.push(body);
    }

    for template in templates {
        for caps in PLACEHOLDER.captures_iter(template) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let known =
                BUILTIN_PLACEHOLDERS.contains(&name) || seeds.contains_key(name);
            if !known {
                return Err(TemplateError::UnknownPlaceholder {
                    strategy: strategy.name.clone(),
                    placeholder: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialConfig, CredentialSynthesizer};

    fn sample_credentials() -> SessionCredentials {
        CredentialSynthesizer::new(CredentialConfig::default()).synthesize()
    }

    #[test]
    fn default_catalog_keeps_config_order() {
        let config = RelayConfig::default();
        let catalog = StrategyCatalog::from_config(&config).unwrap();
        let names: Vec<&str> = catalog.strategies().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["web-ajax", "mobile-lookup", "legacy-form"]);
    }

    #[test]
    fn render_substitutes_identifier_and_credentials() {
        let config = RelayConfig::default();
        let catalog = StrategyCatalog::from_config(&config).unwrap();
        let creds = sample_credentials();
        let ctx = RenderContext::new("someuser", &creds, &config.credentials.seeds);

        // web-ajax carries the identifier in its form body.
        let strategy = &catalog.strategies()[0];
        let body = strategy.render_body(&ctx).unwrap().unwrap();
        assert!(body.contains("someuser"));

        let headers = strategy.render_headers(&ctx).unwrap();
        let csrf = headers
            .iter()
            .find(|(name, _)| name == "X-CSRFToken")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert_eq!(csrf, creds.csrf_token);

        // mobile-lookup carries it in the query string.
        let url = catalog.strategies()[1].render_url(&ctx).unwrap();
        assert!(url.contains("someuser"));
    }

    #[test]
    fn url_substitution_percent_encodes() {
        let config = RelayConfig::default();
        let catalog = StrategyCatalog::from_config(&config).unwrap();
        let creds = sample_credentials();
        let ctx = RenderContext::new("user@example.com", &creds, &config.credentials.seeds);

        let url = catalog.strategies()[1].render_url(&ctx).unwrap();
        assert!(url.contains("user%40example.com"));
        assert!(!url.contains("user@example.com"));
    }

    #[test]
    fn json_body_escapes_for_string_literal() {
        let mut config = RelayConfig::default();
        config.strategies = vec![crate::config::StrategyConfig {
            name: "json-probe".to_string(),
            method: HttpMethod::Post,
            path: "/lookup/".to_string(),
            headers: Default::default(),
            body: Some(r#"{"q": "{identifier}"}"#.to_string()),
            body_kind: BodyKind::Json,
        }];
        let catalog = StrategyCatalog::from_config(&config).unwrap();
        let creds = sample_credentials();
        let ctx = RenderContext::new(r#"we"ird"#, &creds, &config.credentials.seeds);

        let body = catalog.strategies()[0].render_body(&ctx).unwrap().unwrap();
        assert_eq!(body, r#"{"q": "we\"ird"}"#);
        assert!(serde_json::from_str::<serde_json::Value>(&body).is_ok());
    }

    #[test]
    fn unknown_placeholder_is_rejected_at_build() {
        let mut config = RelayConfig::default();
        config.strategies[0].path = "/recover/?u={identifier}&k={mystery_seed}".to_string();
        let err = StrategyCatalog::from_config(&config).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownPlaceholder {
                strategy: "web-ajax".to_string(),
                placeholder: "mystery_seed".to_string(),
            }
        );
    }

    #[test]
    fn seed_placeholders_resolve_from_config() {
        let mut config = RelayConfig::default();
        config
            .credentials
            .seeds
            .insert("app_id".to_string(), "93661974".to_string());
        config.strategies[0]
            .headers
            .insert("X-App-ID".to_string(), "{app_id}".to_string());

        let catalog = StrategyCatalog::from_config(&config).unwrap();
        let creds = sample_credentials();
        let ctx = RenderContext::new("someuser", &creds, &config.credentials.seeds);
        let headers = catalog.strategies()[0].render_headers(&ctx).unwrap();
        assert!(headers.contains(&("X-App-ID".to_string(), "93661974".to_string())));
    }

    #[test]
    fn content_type_follows_body_kind() {
        let config = RelayConfig::default();
        let catalog = StrategyCatalog::from_config(&config).unwrap();
        // web-ajax posts a form body; mobile-lookup is a bare GET.
        assert_eq!(
            catalog.strategies()[0].content_type(),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(catalog.strategies()[1].content_type(), None);
    }
}
