/// Rule and condition model for link access policies.
///
/// Conditions are a closed sum type: one variant per context field, each
/// carrying only the operators legal for that field. An illegal
/// field/operator pairing is unrepresentable in memory and rejected at
/// deserialization time, so evaluation never has to branch on a
/// surprise string combination.
use crate::action::ActionSpec;
use crate::types::{DeviceClass, EvaluationContext, LinkId, MatchMode, RuleId};
use serde::{Deserialize, Serialize};

/// Set membership operators (country field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOp {
    In,
    NotIn,
}

/// Equality operators (device and ip fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqOp {
    Equals,
    NotEquals,
}

/// Timestamp comparison operators (date field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOp {
    Before,
    After,
    Equals,
}

/// Counter comparison operators (access_count field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountOp {
    Equals,
    GreaterThan,
    LessThan,
}

/// One field/operator/value test within a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum Condition {
    /// Visitor country against a set of two-letter codes.
    Country { op: SetOp, countries: Vec<String> },
    /// Visitor device class.
    Device { op: EqOp, device: DeviceClass },
    /// Exact request IP string.
    Ip { op: EqOp, ip: String },
    IsBot { expected: bool },
    IsVpn { expected: bool },
    /// Request timestamp against a fixed instant (epoch milliseconds).
    Date { op: TimeOp, at_ms: i64 },
    /// Link counter snapshot taken at context-build time.
    AccessCount { op: CountOp, value: u64 },
}

/// `date equals` compares at minute granularity; exact-millisecond
/// equality would never fire for human-authored rules.
const MINUTE_MS: i64 = 60_000;

impl Condition {
    /// Evaluate this condition against a visitor context.
    ///
    /// Pure and total: never panics, never errors. A missing context
    /// attribute (unresolved country/device/ip) fails the condition to
    /// `false` - conditions fail closed, the enclosing rule simply does
    /// not fire.
    pub fn matches(&self, ctx: &EvaluationContext) -> bool {
        match self {
            Condition::Country { op, countries } => match &ctx.country {
                Some(code) => {
                    let found = countries.iter().any(|c| c.eq_ignore_ascii_case(code));
                    match op {
                        SetOp::In => found,
                        SetOp::NotIn => !found,
                    }
                }
                None => false,
            },
            Condition::Device { op, device } => match ctx.device {
                Some(actual) => match op {
                    EqOp::Equals => actual == *device,
                    EqOp::NotEquals => actual != *device,
                },
                None => false,
            },
            Condition::Ip { op, ip } => match &ctx.ip {
                Some(actual) => match op {
                    EqOp::Equals => actual == ip,
                    EqOp::NotEquals => actual != ip,
                },
                None => false,
            },
            Condition::IsBot { expected } => ctx.is_bot == *expected,
            Condition::IsVpn { expected } => ctx.is_vpn == *expected,
            Condition::Date { op, at_ms } => match op {
                TimeOp::Before => ctx.now_ms < *at_ms,
                TimeOp::After => ctx.now_ms > *at_ms,
                TimeOp::Equals => ctx.now_ms / MINUTE_MS == *at_ms / MINUTE_MS,
            },
            Condition::AccessCount { op, value } => match op {
                CountOp::Equals => ctx.access_count == *value,
                CountOp::GreaterThan => ctx.access_count > *value,
                CountOp::LessThan => ctx.access_count < *value,
            },
        }
    }
}

/// A prioritized, conditionally-triggered policy attached to a link.
///
/// Lower `priority` evaluates first; ties break by stored (creation)
/// order. Read-only and immutable for the duration of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub link_id: LinkId,
    pub priority: i32,
    pub enabled: bool,
    pub match_mode: MatchMode,
    pub conditions: Vec<Condition>,
    pub action: ActionSpec,
    pub else_action: Option<ActionSpec>,
}

impl Rule {
    /// Does this rule fire against the given context?
    ///
    /// An empty condition list fires vacuously - that is how a
    /// zero-condition rule acts as an unconditional catch-all. The
    /// ALL/ANY reducer is only consulted for non-empty lists.
    pub fn fires(&self, ctx: &EvaluationContext) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        match self.match_mode {
            MatchMode::All => self.conditions.iter().all(|c| c.matches(ctx)),
            MatchMode::Any => self.conditions.iter().any(|c| c.matches(ctx)),
        }
    }
}
