/// Deferred password-gate verification.
///
/// The initial pass over a gated link withholds its side effects and
/// sends the visitor to a password prompt. When the secret comes back,
/// this handler re-runs the engine with the caller's freshly built
/// context to recover the gate that applies right now - not whichever
/// gate the attacker would prefer - checks the secret against that
/// gate's hash, and only then performs the withheld access record and
/// counter increment.
///
/// Every failure (missing/disabled link, gate no longer applies, wrong
/// secret, evaluation fault) collapses into the one generic `Denied`
/// value so callers cannot tell the cases apart.
use crate::action::ActionOutcome;
use crate::engine;
use crate::error::Denied;
use crate::orchestrator::AccessOrchestrator;
use crate::rule::Rule;
use crate::secret::verify_secret;
use crate::store::AccessRecord;
use crate::types::{EvaluationContext, Link};
use tracing::{debug, error, info};

impl AccessOrchestrator {
    /// Verify a submitted secret against the gate currently governing
    /// this link, and on success apply the side effects the initial
    /// pass withheld. Returns the destination URL.
    pub async fn verify_gated_access(
        &self,
        link: &Link,
        rules: &[Rule],
        secret: &str,
        ctx: &EvaluationContext,
    ) -> Result<String, Denied> {
        if !link.enabled {
            debug!(link_id = link.id, "verification denied: link disabled");
            return Err(Denied);
        }

        let evaluation = {
            let link_owned = link.clone();
            let rules_owned = rules.to_vec();
            let ctx_owned = ctx.clone();
            self.run_bounded(link, move || {
                engine::evaluate(&rules_owned, &link_owned, &ctx_owned)
            })
            .await
            .map_err(|e| {
                // Unlike the redirect path, a fault here must not fail
                // open: failing open would bypass the password.
                debug!(link_id = link.id, code = e.code(), "verification denied: evaluation fault");
                Denied
            })?
        };

        let password_hash = match &evaluation.outcome {
            ActionOutcome::PasswordGate { password_hash, .. } => password_hash,
            _ => {
                debug!(
                    link_id = link.id,
                    "verification denied: link is not password-gated for this context"
                );
                return Err(Denied);
            }
        };

        if !verify_secret(secret, password_hash) {
            debug!(link_id = link.id, "verification denied: secret mismatch");
            return Err(Denied);
        }

        // The withheld side effects happen exactly once, here.
        match self
            .store
            .record_visit(link.id, AccessRecord::from_context(ctx))
        {
            Ok(count) => {
                info!(link_id = link.id, count, "gated access verified");
            }
            Err(e) => {
                // Verification succeeded; losing the record must not
                // lock the visitor out.
                error!(link_id = link.id, error = %e, "failed to record verified visit");
            }
        }

        Ok(link.long_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionSpec;
    use crate::config::EngineConfig;
    use crate::rule::{Condition, SetOp};
    use crate::secret::hash_secret;
    use crate::store::MemoryAccessStore;
    use crate::types::MatchMode;
    use std::sync::Arc;

    fn link() -> Link {
        Link::new(1, "abc123", "https://example.com/secret-page")
    }

    fn ctx() -> EvaluationContext {
        let mut c = EvaluationContext::at(1_700_000_000_000);
        c.country = Some("US".to_string());
        c
    }

    fn gate_rule(id: u64, priority: i32, conditions: Vec<Condition>, secret: &str) -> Rule {
        Rule {
            id,
            link_id: 1,
            priority,
            enabled: true,
            match_mode: MatchMode::All,
            conditions,
            action: ActionSpec::PasswordGate {
                password_hash: hash_secret(secret),
                hint: None,
            },
            else_action: None,
        }
    }

    fn orchestrator() -> (AccessOrchestrator, Arc<MemoryAccessStore>) {
        let store = Arc::new(MemoryAccessStore::new());
        let orchestrator =
            AccessOrchestrator::new(Arc::clone(&store) as _, EngineConfig::default());
        (orchestrator, store)
    }

    #[tokio::test]
    async fn test_correct_secret_redirects_and_counts_once() {
        let (orchestrator, store) = orchestrator();
        let rules = [gate_rule(10, 1, vec![], "open sesame")];

        // Failed attempt first: nothing recorded
        let denied = orchestrator
            .verify_gated_access(&link(), &rules, "wrong", &ctx())
            .await;
        assert_eq!(denied, Err(Denied));
        assert_eq!(store.visit_count(1), 0);

        let url = orchestrator
            .verify_gated_access(&link(), &rules, "open sesame", &ctx())
            .await
            .unwrap();
        assert_eq!(url, "https://example.com/secret-page");
        assert_eq!(store.visit_count(1), 1);
        assert_eq!(store.records(1).len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_link_denied() {
        let (orchestrator, _store) = orchestrator();
        let mut l = link();
        l.enabled = false;
        let rules = [gate_rule(10, 1, vec![], "pw")];
        let result = orchestrator
            .verify_gated_access(&l, &rules, "pw", &ctx())
            .await;
        assert_eq!(result, Err(Denied));
    }

    #[tokio::test]
    async fn test_ungated_link_denied() {
        let (orchestrator, store) = orchestrator();
        let result = orchestrator
            .verify_gated_access(&link(), &[], "anything", &ctx())
            .await;
        assert_eq!(result, Err(Denied));
        assert_eq!(store.visit_count(1), 0);
    }

    #[tokio::test]
    async fn test_recovers_the_gate_that_applies_now() {
        // Two gates with different secrets: a US-only gate at priority 1
        // and a catch-all gate at priority 2. A US visitor must satisfy
        // the US gate; its secret is the only one accepted.
        let (orchestrator, _store) = orchestrator();
        let us_gate = gate_rule(
            10,
            1,
            vec![Condition::Country {
                op: SetOp::In,
                countries: vec!["US".into()],
            }],
            "us-secret",
        );
        let fallback_gate = gate_rule(20, 2, vec![], "fallback-secret");
        let rules = [us_gate, fallback_gate];

        assert!(orchestrator
            .verify_gated_access(&link(), &rules, "fallback-secret", &ctx())
            .await
            .is_err());
        assert!(orchestrator
            .verify_gated_access(&link(), &rules, "us-secret", &ctx())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_denials_are_indistinguishable() {
        let (orchestrator, _store) = orchestrator();
        let rules = [gate_rule(10, 1, vec![], "pw")];
        let mut disabled = link();
        disabled.enabled = false;

        let wrong_secret = orchestrator
            .verify_gated_access(&link(), &rules, "nope", &ctx())
            .await
            .unwrap_err();
        let not_gated = orchestrator
            .verify_gated_access(&link(), &[], "pw", &ctx())
            .await
            .unwrap_err();
        let link_disabled = orchestrator
            .verify_gated_access(&disabled, &rules, "pw", &ctx())
            .await
            .unwrap_err();

        assert_eq!(wrong_secret.to_string(), not_gated.to_string());
        assert_eq!(not_gated.to_string(), link_disabled.to_string());
    }
}
