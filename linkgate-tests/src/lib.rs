//! Test utilities and helpers for Linkgate testing
//!
//! Shared fixtures for the integration tests: canned links, rules, and
//! contexts, plus a recording webhook transport.

use linkgate_api::{ContextBuilder, LinkBuilder, RuleBuilder};
use linkgate_core::webhook::{WebhookJob, WebhookTransport};
use linkgate_core::{
    ActionSpec, DeviceClass, EvaluationContext, Link, Rule,
};
use parking_lot::Mutex;
use std::sync::Once;

/// A fixed "now" used across tests: 2023-11-14T22:13:20Z.
pub const NOW_MS: i64 = 1_700_000_000_000;

static INIT_TRACING: Once = Once::new();

/// Install a test subscriber once per process (respects RUST_LOG).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// An enabled link with a fresh counter.
pub fn test_link() -> Link {
    LinkBuilder::new(1, "abc123", "https://example.com/home").build()
}

/// Context for a US desktop visitor with nothing suspicious resolved.
pub fn us_desktop(access_count: u64) -> EvaluationContext {
    ContextBuilder::new(NOW_MS)
        .country("US")
        .device(DeviceClass::Desktop)
        .ip("203.0.113.10")
        .access_count(access_count)
        .build()
}

/// A zero-condition catch-all redirect rule.
pub fn catch_all_redirect(id: u64, priority: i32, url_template: &str) -> Rule {
    RuleBuilder::new(id, 1)
        .priority(priority)
        .redirect_to(url_template)
        .build()
        .expect("valid rule")
}

/// A country-gated block rule.
pub fn country_block(id: u64, priority: i32, countries: &[&str], reason: &str) -> Rule {
    RuleBuilder::new(id, 1)
        .priority(priority)
        .when_country_in(countries.iter().copied())
        .block(Some(reason), None)
        .build()
        .expect("valid rule")
}

/// A raw redirect action spec for else-branches.
pub fn redirect_spec(url_template: &str) -> ActionSpec {
    ActionSpec::Redirect {
        url_template: url_template.to_string(),
    }
}

/// Webhook transport that records every delivered job.
#[derive(Default)]
pub struct RecordingTransport {
    delivered: Mutex<Vec<WebhookJob>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<WebhookJob> {
        self.delivered.lock().clone()
    }
}

impl WebhookTransport for RecordingTransport {
    fn deliver(&self, job: &WebhookJob) -> Result<(), String> {
        self.delivered.lock().push(job.clone());
        Ok(())
    }
}
