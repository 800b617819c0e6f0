/// Authoring-time validation for rules and actions.
///
/// The management layer calls this before persisting a rule. The
/// evaluation path never depends on it having run: conditions that
/// slipped past validation still just fail to match, they never abort
/// an evaluation.
use crate::action::ActionSpec;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::rule::{Condition, Rule};
use crate::webhook::validate_webhook_url;

const MAX_BLOCK_MESSAGE_CHARS: usize = 500;
const MAX_BLOCK_REASON_CHARS: usize = 50;

/// Validate a rule against the authoring constraints.
pub fn validate_rule(rule: &Rule, config: &EngineConfig) -> Result<()> {
    if rule.conditions.len() > config.max_conditions_per_rule {
        return Err(Error::InvalidRule(format!(
            "rule {} has {} conditions, maximum is {}",
            rule.id,
            rule.conditions.len(),
            config.max_conditions_per_rule
        )));
    }

    for condition in &rule.conditions {
        validate_condition(condition)?;
    }

    validate_action(&rule.action, config)?;
    if let Some(else_action) = &rule.else_action {
        validate_action(else_action, config)?;
    }

    Ok(())
}

fn validate_condition(condition: &Condition) -> Result<()> {
    if let Condition::Country { countries, .. } = condition {
        if countries.is_empty() {
            return Err(Error::InvalidRule(
                "country condition has an empty country set".to_string(),
            ));
        }
        for code in countries {
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(Error::InvalidRule(format!(
                    "'{}' is not a two-letter country code",
                    code
                )));
            }
        }
    }
    Ok(())
}

fn validate_action(spec: &ActionSpec, config: &EngineConfig) -> Result<()> {
    match spec {
        ActionSpec::Redirect { url_template } => {
            if url_template.trim().is_empty() {
                return Err(Error::InvalidRule(
                    "redirect action has an empty URL template".to_string(),
                ));
            }
        }
        ActionSpec::Block { reason, message } => {
            if let Some(reason) = reason {
                if reason.chars().count() > MAX_BLOCK_REASON_CHARS {
                    return Err(Error::InvalidRule(format!(
                        "block reason exceeds {} characters",
                        MAX_BLOCK_REASON_CHARS
                    )));
                }
                if !reason
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
                {
                    return Err(Error::InvalidRule(format!(
                        "block reason '{}' must be UPPER_SNAKE_CASE",
                        reason
                    )));
                }
            }
            if let Some(message) = message {
                if message.chars().count() > MAX_BLOCK_MESSAGE_CHARS {
                    return Err(Error::InvalidRule(format!(
                        "block message exceeds {} characters",
                        MAX_BLOCK_MESSAGE_CHARS
                    )));
                }
            }
        }
        ActionSpec::PasswordGate { password_hash, .. } => {
            if password_hash.len() != 64
                || !password_hash
                    .chars()
                    .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
            {
                return Err(Error::InvalidRule(
                    "password hash must be 64 lowercase hex characters".to_string(),
                ));
            }
        }
        ActionSpec::Notify { webhook_url, .. } => {
            // The same filter dispatch applies later; reject at
            // authoring time so the owner finds out immediately.
            validate_webhook_url(webhook_url, &config.blocked_webhook_ports)?;
        }
    }
    Ok(())
}
