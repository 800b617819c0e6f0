/// Bounded-time, fail-open orchestration of rule evaluation.
///
/// Wraps the pure engine with a wall-clock budget, converts faults into
/// the default redirect (availability over policy: a broken rule must
/// never take the link offline), and translates the chosen outcome into
/// its side effects and the response directive handed back to the
/// redirect handler.
use crate::action::ActionOutcome;
use crate::config::EngineConfig;
use crate::engine::{self, Evaluation};
use crate::error::Error;
use crate::rule::Rule;
use crate::store::{AccessRecord, AccessStore};
use crate::types::{EvaluationContext, Link};
use crate::webhook::{
    validate_webhook_url, NullTransport, WebhookDispatcher, WebhookJob, WebhookTransport,
};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, error, warn};

/// What the redirect handler should do with the visitor.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Redirect {
        url: String,
    },
    Block {
        reason: Option<String>,
        message: Option<String>,
    },
    /// Send the visitor to the password-entry surface. Carries the short
    /// code and hint only, never the stored hash.
    PasswordPrompt {
        short_code: String,
        hint: Option<String>,
    },
}

/// Which side effects were applied for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SideEffects {
    pub access_logged: bool,
    pub counter_incremented: bool,
    pub webhook_queued: bool,
}

/// Result of one orchestrated access evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestrationResult {
    pub allowed: bool,
    pub directive: Directive,
    pub side_effects: SideEffects,
    /// True when a timeout or evaluation fault was converted into the
    /// default redirect.
    pub fail_open: bool,
}

/// Orchestrates evaluation, side effects, and webhook handoff over a
/// caller-supplied store.
pub struct AccessOrchestrator {
    pub(crate) store: Arc<dyn AccessStore>,
    dispatcher: WebhookDispatcher,
    pub(crate) config: EngineConfig,
}

impl AccessOrchestrator {
    /// Orchestrator with no real webhook transport wired (jobs are
    /// logged and dropped by `NullTransport`).
    pub fn new(store: Arc<dyn AccessStore>, config: EngineConfig) -> Self {
        Self::with_transport(store, config, Arc::new(NullTransport))
    }

    pub fn with_transport(
        store: Arc<dyn AccessStore>,
        config: EngineConfig,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        let dispatcher = WebhookDispatcher::start(config.webhook_queue_capacity, transport);
        Self {
            store,
            dispatcher,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one access request and apply its side effects.
    ///
    /// The engine pass runs under the configured time budget; on timeout
    /// or panic the fail-open default redirect is used instead and the
    /// fault is logged as a critical operational event. The fail-open
    /// redirect counts as a processed (allowed) request, so its normal
    /// redirect side effects still apply.
    pub async fn evaluate_access(
        &self,
        link: &Link,
        rules: &[Rule],
        ctx: &EvaluationContext,
    ) -> OrchestrationResult {
        let (evaluation, fail_open) = {
            let link_owned = link.clone();
            let rules_owned = rules.to_vec();
            let ctx_owned = ctx.clone();
            match self
                .run_bounded(link, move || {
                    engine::evaluate(&rules_owned, &link_owned, &ctx_owned)
                })
                .await
            {
                Ok(evaluation) => (evaluation, false),
                Err(e) => {
                    error!(
                        link_id = link.id,
                        code = e.code(),
                        "evaluation fault, failing open to default redirect"
                    );
                    (Evaluation::default_redirect(link), true)
                }
            }
        };

        let (directive, side_effects) = self.apply_side_effects(link, ctx, &evaluation);
        OrchestrationResult {
            allowed: evaluation.allowed,
            directive,
            side_effects,
            fail_open,
        }
    }

    /// Run a closure on the blocking pool under the evaluation budget.
    ///
    /// On timeout the in-flight task is abandoned; if it completes later
    /// its result is never read. A panic inside the closure surfaces as
    /// `EvaluationPanic`.
    pub(crate) async fn run_bounded<F>(
        &self,
        link: &Link,
        f: F,
    ) -> crate::error::Result<Evaluation>
    where
        F: FnOnce() -> Evaluation + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        match timeout(self.config.eval_budget, task).await {
            Ok(Ok(evaluation)) => Ok(evaluation),
            Ok(Err(join_err)) if join_err.is_panic() => {
                debug!(link_id = link.id, "evaluation task panicked");
                Err(Error::EvaluationPanic)
            }
            Ok(Err(join_err)) => Err(Error::Internal(format!(
                "evaluation task failed: {}",
                join_err
            ))),
            Err(_) => Err(Error::EvaluationTimeout),
        }
    }

    /// Apply the side-effect contract for the chosen outcome and shape
    /// the response directive.
    ///
    /// - redirect / notify: one atomic access-record append + counter
    ///   increment, then redirect
    /// - block: counter increment only (no visitor data retained for
    ///   rejected attempts)
    /// - password gate: nothing until verification succeeds
    fn apply_side_effects(
        &self,
        link: &Link,
        ctx: &EvaluationContext,
        evaluation: &Evaluation,
    ) -> (Directive, SideEffects) {
        let mut effects = SideEffects::default();

        let directive = match &evaluation.outcome {
            ActionOutcome::Redirect { url } => {
                self.record_visit(link, ctx, &mut effects);
                Directive::Redirect { url: url.clone() }
            }
            ActionOutcome::Notify {
                webhook_url,
                message,
                url,
            } => {
                self.record_visit(link, ctx, &mut effects);
                effects.webhook_queued = self.queue_webhook(link, webhook_url, message.clone());
                Directive::Redirect { url: url.clone() }
            }
            ActionOutcome::Block { reason, message } => {
                match self.store.record_blocked(link.id) {
                    Ok(count) => {
                        effects.counter_incremented = true;
                        debug!(link_id = link.id, count, "blocked request counted");
                    }
                    Err(e) => {
                        error!(link_id = link.id, error = %e, "failed to count blocked request");
                    }
                }
                Directive::Block {
                    reason: reason.clone(),
                    message: message.clone(),
                }
            }
            ActionOutcome::PasswordGate { hint, .. } => Directive::PasswordPrompt {
                short_code: link.short_code.clone(),
                hint: hint.clone(),
            },
        };

        (directive, effects)
    }

    fn record_visit(&self, link: &Link, ctx: &EvaluationContext, effects: &mut SideEffects) {
        match self
            .store
            .record_visit(link.id, AccessRecord::from_context(ctx))
        {
            Ok(count) => {
                effects.access_logged = true;
                effects.counter_incremented = true;
                debug!(link_id = link.id, count, "visit recorded");
            }
            Err(e) => {
                // The visitor still gets their redirect; losing a record
                // must not take the link offline.
                error!(link_id = link.id, error = %e, "failed to record visit");
            }
        }
    }

    /// Validate and queue a webhook. Any rejection or queue failure is
    /// logged and swallowed; the redirect is already decided.
    fn queue_webhook(&self, link: &Link, webhook_url: &str, message: Option<String>) -> bool {
        let url = match validate_webhook_url(webhook_url, &self.config.blocked_webhook_ports) {
            Ok(url) => url,
            Err(e) => {
                warn!(link_id = link.id, error = %e, "webhook URL rejected");
                return false;
            }
        };
        let job = WebhookJob {
            link_id: link.id,
            url: url.to_string(),
            message,
        };
        match self.dispatcher.submit(job) {
            Ok(()) => true,
            Err(e) => {
                warn!(link_id = link.id, error = %e, "webhook submission dropped");
                false
            }
        }
    }
}
