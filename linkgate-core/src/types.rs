use serde::{Deserialize, Serialize};

/// Link identifier assigned by the management layer.
pub type LinkId = u64;

/// Rule identifier assigned by the management layer.
pub type RuleId = u64;

/// A shortened link, read-only to the policy core.
///
/// `visit_count` is the authoritative count of processed requests: it
/// only ever increases, and a request counts once it is either allowed
/// through or explicitly blocked. Requests parked at a password gate do
/// not count until verification succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub short_code: String,
    pub long_url: String,
    pub enabled: bool,
    pub visit_count: u64,
}

impl Link {
    pub fn new(id: LinkId, short_code: impl Into<String>, long_url: impl Into<String>) -> Self {
        Self {
            id,
            short_code: short_code.into(),
            long_url: long_url.into(),
            enabled: true,
            visit_count: 0,
        }
    }
}

/// Visitor device class as resolved by the upstream device classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

/// How a rule combines its conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Every condition must match (AND).
    All,
    /// At least one condition must match (OR).
    Any,
}

/// Per-request snapshot of visitor attributes, assembled by external
/// collaborators (geolocation, VPN/bot detection, device classification)
/// before evaluation starts. Never persisted, never mutated by the core.
///
/// `access_count` is the link's counter value read at context-build
/// time; conditions compare against this snapshot, never a live re-read,
/// so a rule cannot observe its own increment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Two-letter country code, if geolocation resolved one.
    pub country: Option<String>,
    /// Device class, if the classifier resolved one.
    pub device: Option<DeviceClass>,
    /// Request IP as seen by the edge.
    pub ip: Option<String>,
    pub is_bot: bool,
    pub is_vpn: bool,
    /// Request timestamp, milliseconds since the Unix epoch.
    pub now_ms: i64,
    /// Link counter snapshot taken when the context was built.
    pub access_count: u64,
}

impl EvaluationContext {
    /// A context with nothing resolved, timestamped at `now_ms`.
    pub fn at(now_ms: i64) -> Self {
        Self {
            country: None,
            device: None,
            ip: None,
            is_bot: false,
            is_vpn: false,
            now_ms,
            access_count: 0,
        }
    }
}
