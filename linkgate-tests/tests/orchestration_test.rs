//! Orchestrator-level behavior: side-effect contract per outcome,
//! webhook handoff and safety, and the fail-open guarantee surfaced
//! through the public API.

use linkgate_api::{Directive, EngineConfig, InMemoryStore, PolicyEngine, RuleBuilder};
use linkgate_test_utils::{
    catch_all_redirect, init_tracing, test_link, us_desktop, RecordingTransport, NOW_MS,
};
use std::sync::Arc;
use std::time::Duration;

fn engine_with_store() -> (PolicyEngine, Arc<InMemoryStore>) {
    init_tracing();
    let store = Arc::new(InMemoryStore::new());
    let engine = PolicyEngine::new(Arc::clone(&store) as _);
    (engine, store)
}

#[tokio::test]
async fn redirect_writes_record_and_counter_together() {
    let (engine, store) = engine_with_store();
    let link = test_link();

    let result = engine.evaluate_access(&link, &[], &us_desktop(0)).await;
    assert!(result.allowed);
    assert!(result.side_effects.access_logged);
    assert!(result.side_effects.counter_incremented);
    assert_eq!(store.visit_count(link.id), 1);

    let records = store.records(link.id);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].country.as_deref(), Some("US"));
    assert_eq!(records[0].at_ms, NOW_MS);
}

#[tokio::test]
async fn block_counts_but_never_logs_visitor_data() {
    let (engine, store) = engine_with_store();
    let link = test_link();
    let rules = vec![RuleBuilder::new(1, link.id)
        .when_count_over(1000)
        .block(Some("LIMIT"), Some("This link hit its visit limit"))
        .build()
        .unwrap()];

    let result = engine
        .evaluate_access(&link, &rules, &us_desktop(1500))
        .await;
    assert!(!result.allowed);
    assert_eq!(
        result.directive,
        Directive::Block {
            reason: Some("LIMIT".into()),
            message: Some("This link hit its visit limit".into()),
        }
    );
    assert!(result.side_effects.counter_incremented);
    assert!(!result.side_effects.access_logged);
    assert_eq!(store.visit_count(link.id), 1);
    assert!(store.records(link.id).is_empty());
}

#[tokio::test]
async fn password_gate_applies_no_side_effects() {
    let (engine, store) = engine_with_store();
    let link = test_link();
    let rules = vec![RuleBuilder::new(1, link.id)
        .gate_with_secret("letmein")
        .gate_hint("team password")
        .build()
        .unwrap()];

    let result = engine.evaluate_access(&link, &rules, &us_desktop(0)).await;
    assert_eq!(
        result.directive,
        Directive::PasswordPrompt {
            short_code: "abc123".into(),
            hint: Some("team password".into()),
        }
    );
    assert!(!result.side_effects.counter_incremented);
    assert!(!result.side_effects.access_logged);
    assert_eq!(store.visit_count(link.id), 0);
}

#[tokio::test]
async fn notify_redirects_and_delivers_webhook_off_path() {
    init_tracing();
    let store = Arc::new(InMemoryStore::new());
    let transport = Arc::new(RecordingTransport::new());
    let engine = PolicyEngine::with_transport(
        Arc::clone(&store) as _,
        EngineConfig::default(),
        Arc::clone(&transport) as _,
    );

    let link = test_link();
    let rules = vec![RuleBuilder::new(1, link.id)
        .notify("https://hooks.example.com/visits", Some("someone came by"))
        .build()
        .unwrap()];

    let result = engine.evaluate_access(&link, &rules, &us_desktop(0)).await;
    assert_eq!(
        result.directive,
        Directive::Redirect {
            url: "https://example.com/home".to_string()
        }
    );
    assert!(result.side_effects.webhook_queued);
    assert_eq!(store.visit_count(link.id), 1);

    // Dispatch is detached; give the worker a moment
    for _ in 0..50 {
        if !transport.delivered().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let delivered = transport.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].link_id, link.id);
    assert_eq!(delivered[0].message.as_deref(), Some("someone came by"));
}

#[tokio::test]
async fn unsafe_webhook_url_is_dropped_without_breaking_redirect() {
    let (engine, store) = engine_with_store();
    let link = test_link();

    for bad_url in [
        "http://hooks.example.com/x",
        "https://127.0.0.1/x",
        "https://169.254.169.254/latest/meta-data/",
        "https://localhost/x",
        "https://hooks.example.com:6379/x",
    ] {
        // The authoring validator would refuse these, so build the spec
        // directly the way a stale stored rule would look.
        let rules = vec![linkgate_core::Rule {
            id: 1,
            link_id: link.id,
            priority: 1,
            enabled: true,
            match_mode: linkgate_api::MatchMode::All,
            conditions: vec![],
            action: linkgate_core::ActionSpec::Notify {
                webhook_url: bad_url.to_string(),
                message: None,
            },
            else_action: None,
        }];

        let result = engine.evaluate_access(&link, &rules, &us_desktop(0)).await;
        assert!(result.allowed, "url {} must not break the redirect", bad_url);
        assert!(!result.side_effects.webhook_queued);
        assert_eq!(
            result.directive,
            Directive::Redirect {
                url: "https://example.com/home".to_string()
            }
        );
    }
    assert_eq!(store.visit_count(link.id), 5);
}

#[tokio::test]
async fn exhausted_budget_never_surfaces_an_error() {
    // With an absurdly small budget the engine pass may or may not beat
    // the clock, but the caller sees a redirect either way.
    init_tracing();
    let store = Arc::new(InMemoryStore::new());
    let engine = PolicyEngine::with_config(
        Arc::clone(&store) as _,
        EngineConfig::default().with_eval_budget(Duration::from_nanos(1)),
    );
    let link = test_link();
    let rules = vec![catch_all_redirect(1, 1, "https://example.com/home")];

    for _ in 0..20 {
        let result = engine.evaluate_access(&link, &rules, &us_desktop(0)).await;
        assert!(result.allowed);
        assert_eq!(
            result.directive,
            Directive::Redirect {
                url: "https://example.com/home".to_string()
            }
        );
        assert!(result.side_effects.counter_incremented);
    }
}

#[tokio::test]
async fn disabled_rules_do_not_fire_through_the_api() {
    let (engine, _store) = engine_with_store();
    let link = test_link();
    let rules = vec![
        RuleBuilder::new(1, link.id)
            .priority(1)
            .disabled()
            .block(Some("OFF"), None)
            .build()
            .unwrap(),
        catch_all_redirect(2, 2, "https://open.example.com"),
    ];
    let result = engine.evaluate_access(&link, &rules, &us_desktop(0)).await;
    assert!(result.allowed);
    assert_eq!(
        result.directive,
        Directive::Redirect {
            url: "https://open.example.com".to_string()
        }
    );
}
