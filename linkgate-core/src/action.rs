/// Action specifications and their materialized outcomes.
///
/// `ActionSpec` is the stored, declarative form of what a rule does when
/// it fires. `ActionOutcome` is the request-specific form after template
/// substitution. The split keeps materialization side-effect-free and
/// independently testable; the orchestrator owns everything that touches
/// storage or the network.
use crate::types::Link;
use serde::{Deserialize, Serialize};

/// Stored form of a rule's action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionSpec {
    /// Send the visitor to a URL resolved from a template. The literal
    /// tokens `{{longUrl}}` and `{{shortUrl}}` expand to the link's
    /// destination and short code; anything else in braces passes
    /// through untouched.
    Redirect { url_template: String },
    /// Refuse the request with an optional machine-readable reason code
    /// and an optional human-readable message.
    Block {
        reason: Option<String>,
        message: Option<String>,
    },
    /// Park the request behind a password prompt. Carries the secret's
    /// hash, never the plaintext.
    PasswordGate {
        password_hash: String,
        hint: Option<String>,
    },
    /// Let the visitor through to the link's destination and notify a
    /// webhook. The URL is carried through unvalidated here; the
    /// orchestrator runs the safety filter before dispatch.
    Notify {
        webhook_url: String,
        message: Option<String>,
    },
}

/// Materialized, per-request form of an action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Redirect {
        url: String,
    },
    Block {
        reason: Option<String>,
        message: Option<String>,
    },
    PasswordGate {
        password_hash: String,
        hint: Option<String>,
    },
    Notify {
        webhook_url: String,
        message: Option<String>,
        /// Where the visitor is sent (the link's destination).
        url: String,
    },
}

impl ActionOutcome {
    /// Only `Block` refuses the visitor.
    pub fn is_allowed(&self) -> bool {
        !matches!(self, ActionOutcome::Block { .. })
    }
}

impl ActionSpec {
    /// Resolve this spec into a concrete outcome for one request.
    ///
    /// Pure: no I/O, no clock, no storage.
    pub fn materialize(&self, link: &Link) -> ActionOutcome {
        match self {
            ActionSpec::Redirect { url_template } => ActionOutcome::Redirect {
                url: substitute(url_template, link),
            },
            ActionSpec::Block { reason, message } => ActionOutcome::Block {
                reason: reason.clone(),
                message: message.clone(),
            },
            ActionSpec::PasswordGate {
                password_hash,
                hint,
            } => ActionOutcome::PasswordGate {
                password_hash: password_hash.clone(),
                hint: hint.clone(),
            },
            ActionSpec::Notify {
                webhook_url,
                message,
            } => ActionOutcome::Notify {
                webhook_url: webhook_url.clone(),
                message: message.clone(),
                url: link.long_url.clone(),
            },
        }
    }
}

/// Expand `{{longUrl}}` and `{{shortUrl}}` in a single left-to-right
/// pass. Substituted text is never rescanned, so a destination URL that
/// happens to contain a token is not expanded again. Unrecognized
/// `{{...}}` sequences (and stray braces) pass through literally.
fn substitute(template: &str, link: &Link) -> String {
    let mut out = String::with_capacity(template.len() + link.long_url.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        if let Some(stripped) = after.strip_prefix("{{longUrl}}") {
            out.push_str(&link.long_url);
            rest = stripped;
        } else if let Some(stripped) = after.strip_prefix("{{shortUrl}}") {
            out.push_str(&link.short_code);
            rest = stripped;
        } else {
            out.push_str("{{");
            rest = &after[2..];
        }
    }
    out.push_str(rest);
    out
}
