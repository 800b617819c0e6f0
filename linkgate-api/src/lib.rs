use linkgate_core::orchestrator::AccessOrchestrator;
use linkgate_core::store::MemoryAccessStore;
use linkgate_core::validation::validate_rule;
use linkgate_core::webhook::WebhookTransport;
use std::sync::Arc;

pub use linkgate_core::{
    hash_secret, AccessRecord, AccessStore, ActionOutcome, ActionSpec, Condition, CountOp, Denied,
    DeviceClass, Directive, EngineConfig, EqOp, Error as LinkgateError, EvaluationContext, Link,
    LinkId, MatchMode, MemoryAccessStore as InMemoryStore, OrchestrationResult, Rule, RuleId,
    SetOp, SideEffects, TimeOp,
};

/// Handle to the link access policy engine.
///
/// Owns the orchestrator (time budget, fail-open, side-effect dispatch,
/// webhook handoff) over a caller-supplied access store. The two entry
/// points mirror what the redirect handler needs: evaluate an inbound
/// request, and verify a password-gate secret later.
pub struct PolicyEngine {
    orchestrator: AccessOrchestrator,
}

impl PolicyEngine {
    /// Engine over a caller-supplied store with the default config.
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn AccessStore>, config: EngineConfig) -> Self {
        Self {
            orchestrator: AccessOrchestrator::new(store, config),
        }
    }

    /// Engine with a real webhook transport wired in.
    pub fn with_transport(
        store: Arc<dyn AccessStore>,
        config: EngineConfig,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        Self {
            orchestrator: AccessOrchestrator::with_transport(store, config, transport),
        }
    }

    /// Engine over the bundled in-memory store. Handy for tests and
    /// embedders without a database.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryAccessStore::new()))
    }

    /// Evaluate one access request: run the link's rules against the
    /// visitor context, apply the outcome's side effects, and return
    /// the response directive.
    pub async fn evaluate_access(
        &self,
        link: &Link,
        rules: &[Rule],
        ctx: &EvaluationContext,
    ) -> OrchestrationResult {
        self.orchestrator.evaluate_access(link, rules, ctx).await
    }

    /// Verify a password-gate secret and, on success, perform the side
    /// effects the initial pass withheld. All failures return the same
    /// generic denial.
    pub async fn verify_gated_access(
        &self,
        link: &Link,
        rules: &[Rule],
        secret: &str,
        ctx: &EvaluationContext,
    ) -> Result<String, Denied> {
        self.orchestrator
            .verify_gated_access(link, rules, secret, ctx)
            .await
    }
}

/// Helper to build links
pub struct LinkBuilder {
    link: Link,
}

impl LinkBuilder {
    pub fn new(id: LinkId, short_code: impl Into<String>, long_url: impl Into<String>) -> Self {
        Self {
            link: Link::new(id, short_code, long_url),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.link.enabled = false;
        self
    }

    pub fn visit_count(mut self, count: u64) -> Self {
        self.link.visit_count = count;
        self
    }

    pub fn build(self) -> Link {
        self.link
    }
}

/// Helper to build rules; `build()` runs the authoring validator.
pub struct RuleBuilder {
    id: RuleId,
    link_id: LinkId,
    priority: i32,
    enabled: bool,
    match_mode: MatchMode,
    conditions: Vec<Condition>,
    action: Option<ActionSpec>,
    else_action: Option<ActionSpec>,
}

impl RuleBuilder {
    pub fn new(id: RuleId, link_id: LinkId) -> Self {
        Self {
            id,
            link_id,
            priority: 0,
            enabled: true,
            match_mode: MatchMode::All,
            conditions: Vec::new(),
            action: None,
            else_action: None,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Require at least one condition to match instead of all of them.
    pub fn match_any(mut self) -> Self {
        self.match_mode = MatchMode::Any;
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn when_country_in<I, S>(self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let countries = codes.into_iter().map(Into::into).collect();
        self.when(Condition::Country {
            op: SetOp::In,
            countries,
        })
    }

    pub fn when_country_not_in<I, S>(self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let countries = codes.into_iter().map(Into::into).collect();
        self.when(Condition::Country {
            op: SetOp::NotIn,
            countries,
        })
    }

    pub fn when_device_is(self, device: DeviceClass) -> Self {
        self.when(Condition::Device {
            op: EqOp::Equals,
            device,
        })
    }

    pub fn when_ip_is(self, ip: impl Into<String>) -> Self {
        self.when(Condition::Ip {
            op: EqOp::Equals,
            ip: ip.into(),
        })
    }

    pub fn when_bot(self, expected: bool) -> Self {
        self.when(Condition::IsBot { expected })
    }

    pub fn when_vpn(self, expected: bool) -> Self {
        self.when(Condition::IsVpn { expected })
    }

    pub fn when_before(self, at_ms: i64) -> Self {
        self.when(Condition::Date {
            op: TimeOp::Before,
            at_ms,
        })
    }

    pub fn when_after(self, at_ms: i64) -> Self {
        self.when(Condition::Date {
            op: TimeOp::After,
            at_ms,
        })
    }

    pub fn when_count_over(self, value: u64) -> Self {
        self.when(Condition::AccessCount {
            op: CountOp::GreaterThan,
            value,
        })
    }

    pub fn when_count_under(self, value: u64) -> Self {
        self.when(Condition::AccessCount {
            op: CountOp::LessThan,
            value,
        })
    }

    pub fn redirect_to(mut self, url_template: impl Into<String>) -> Self {
        self.action = Some(ActionSpec::Redirect {
            url_template: url_template.into(),
        });
        self
    }

    pub fn block(mut self, reason: Option<&str>, message: Option<&str>) -> Self {
        self.action = Some(ActionSpec::Block {
            reason: reason.map(str::to_string),
            message: message.map(str::to_string),
        });
        self
    }

    /// Gate behind a password; the plaintext is hashed here and never
    /// stored.
    pub fn gate_with_secret(mut self, secret: &str) -> Self {
        self.action = Some(ActionSpec::PasswordGate {
            password_hash: hash_secret(secret),
            hint: None,
        });
        self
    }

    pub fn gate_hint(mut self, hint: impl Into<String>) -> Self {
        if let Some(ActionSpec::PasswordGate { hint: h, .. }) = &mut self.action {
            *h = Some(hint.into());
        }
        self
    }

    pub fn notify(mut self, webhook_url: impl Into<String>, message: Option<&str>) -> Self {
        self.action = Some(ActionSpec::Notify {
            webhook_url: webhook_url.into(),
            message: message.map(str::to_string),
        });
        self
    }

    pub fn or_else(mut self, else_action: ActionSpec) -> Self {
        self.else_action = Some(else_action);
        self
    }

    pub fn or_else_redirect(self, url_template: impl Into<String>) -> Self {
        self.or_else(ActionSpec::Redirect {
            url_template: url_template.into(),
        })
    }

    pub fn build(self) -> Result<Rule, LinkgateError> {
        let action = self
            .action
            .ok_or_else(|| LinkgateError::InvalidRule("rule has no action".to_string()))?;
        let rule = Rule {
            id: self.id,
            link_id: self.link_id,
            priority: self.priority,
            enabled: self.enabled,
            match_mode: self.match_mode,
            conditions: self.conditions,
            action,
            else_action: self.else_action,
        };
        validate_rule(&rule, &EngineConfig::default())?;
        Ok(rule)
    }
}

/// Helper to build evaluation contexts
pub struct ContextBuilder {
    ctx: EvaluationContext,
}

impl ContextBuilder {
    pub fn new(now_ms: i64) -> Self {
        Self {
            ctx: EvaluationContext::at(now_ms),
        }
    }

    pub fn country(mut self, code: impl Into<String>) -> Self {
        self.ctx.country = Some(code.into());
        self
    }

    pub fn device(mut self, device: DeviceClass) -> Self {
        self.ctx.device = Some(device);
        self
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ctx.ip = Some(ip.into());
        self
    }

    pub fn bot(mut self, is_bot: bool) -> Self {
        self.ctx.is_bot = is_bot;
        self
    }

    pub fn vpn(mut self, is_vpn: bool) -> Self {
        self.ctx.is_vpn = is_vpn;
        self
    }

    pub fn access_count(mut self, count: u64) -> Self {
        self.ctx.access_count = count;
        self
    }

    pub fn build(self) -> EvaluationContext {
        self.ctx
    }
}
