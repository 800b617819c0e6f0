/// Priority-ordered rule evaluation for one link.
///
/// Deterministic given (rules, link, context): no I/O, no clock reads,
/// no storage access. The orchestrator wraps this with the time budget
/// and performs the side effects the chosen outcome calls for.
use crate::action::{ActionOutcome, ActionSpec};
use crate::rule::Rule;
use crate::types::{EvaluationContext, Link, RuleId};
use tracing::debug;

/// Result of one engine pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub allowed: bool,
    pub outcome: ActionOutcome,
    /// Rule that produced the outcome, `None` for the implicit default.
    pub matched_rule: Option<RuleId>,
    /// True when the outcome came from a remembered else-action.
    pub via_else: bool,
}

impl Evaluation {
    /// The implicit default: allow, redirect to the link's destination.
    pub fn default_redirect(link: &Link) -> Self {
        Self {
            allowed: true,
            outcome: ActionOutcome::Redirect {
                url: link.long_url.clone(),
            },
            matched_rule: None,
            via_else: false,
        }
    }
}

/// Evaluate a link's rules against a visitor context.
///
/// Enabled rules are stable-sorted by ascending priority (ties keep
/// stored order) and scanned once. The first firing rule's primary
/// action wins. An else-action is a candidate, not an immediate return:
/// the first non-firing rule that declares one is remembered, and it
/// applies only if no rule ever fires. With no rules, no firing rule,
/// and no else-action anywhere, the implicit default redirect applies.
pub fn evaluate(rules: &[Rule], link: &Link, ctx: &EvaluationContext) -> Evaluation {
    let mut ordered: Vec<&Rule> = rules.iter().filter(|r| r.enabled).collect();
    ordered.sort_by_key(|r| r.priority);

    let mut else_candidate: Option<(RuleId, &ActionSpec)> = None;

    for rule in &ordered {
        if rule.fires(ctx) {
            let outcome = rule.action.materialize(link);
            debug!(
                link_id = link.id,
                rule_id = rule.id,
                priority = rule.priority,
                allowed = outcome.is_allowed(),
                "rule fired"
            );
            return Evaluation {
                allowed: outcome.is_allowed(),
                outcome,
                matched_rule: Some(rule.id),
                via_else: false,
            };
        }
        if else_candidate.is_none() {
            if let Some(spec) = &rule.else_action {
                else_candidate = Some((rule.id, spec));
            }
        }
    }

    if let Some((rule_id, spec)) = else_candidate {
        let outcome = spec.materialize(link);
        debug!(
            link_id = link.id,
            rule_id,
            allowed = outcome.is_allowed(),
            "else-action applied"
        );
        return Evaluation {
            allowed: outcome.is_allowed(),
            outcome,
            matched_rule: Some(rule_id),
            via_else: true,
        };
    }

    debug!(link_id = link.id, "no rule fired, default redirect");
    Evaluation::default_redirect(link)
}
