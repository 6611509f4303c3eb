//! End-to-end generation scenarios against the in-memory store.

use futures::StreamExt;
use genui_engine::{ComponentCatalog, ComponentRole};
use genui_orchestrator::{
    warning, DesignModel, ErrorCode, FailingModel, FailurePoint, GenerationConfig,
    GenerationEvent, GenerationRequest, OfflineModel, Orchestrator, OrchestratorError,
    ScriptStep, ScriptedModel, Stage, StaticContext, TokenUsage,
};
use genui_storage::{InMemoryThreadStore, ThreadStore};
use genui_types::{apply_patches, Patch, Spec};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

const PRICING_PROMPT: &str = "Create a pricing card with CTA";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    orchestrator: Arc<Orchestrator>,
    store: Arc<InMemoryThreadStore>,
    thread_id: String,
}

async fn harness(model: Arc<dyn DesignModel>) -> Harness {
    harness_with(
        model,
        Arc::new(InMemoryThreadStore::new()),
        ComponentCatalog::standard(),
        GenerationConfig::default(),
    )
    .await
}

async fn harness_with(
    model: Arc<dyn DesignModel>,
    store: Arc<InMemoryThreadStore>,
    catalog: ComponentCatalog,
    config: GenerationConfig,
) -> Harness {
    let thread = store.create_thread("demo").await.unwrap();
    let orchestrator = Orchestrator::new(
        model,
        Arc::new(StaticContext::new("ctx-1")),
        store.clone(),
        Arc::new(catalog),
        config,
    )
    .unwrap();
    Harness {
        orchestrator: Arc::new(orchestrator),
        store,
        thread_id: thread.thread_id,
    }
}

impl Harness {
    async fn generate(&self, request: GenerationRequest) -> Vec<GenerationEvent> {
        let events: Vec<GenerationEvent> = self
            .orchestrator
            .clone()
            .generate(request)
            .collect()
            .await;
        assert_single_terminal(&events);
        events
    }

    async fn prompt(&self, prompt: &str) -> Vec<GenerationEvent> {
        self.generate(GenerationRequest::new(self.thread_id.clone(), prompt))
            .await
    }

    async fn active_spec(&self) -> Option<Spec> {
        self.store
            .get_version(&self.thread_id, None)
            .await
            .unwrap()
            .map(|version| version.spec)
    }
}

fn assert_single_terminal(events: &[GenerationEvent]) {
    let terminals = events.iter().filter(|event| event.is_terminal()).count();
    assert_eq!(terminals, 1, "events: {:?}", events);
    assert!(events.last().is_some_and(GenerationEvent::is_terminal));
}

fn warning_codes(events: &[GenerationEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            GenerationEvent::Warning { code, .. } => Some(code.clone()),
            _ => None,
        })
        .collect()
}

fn patches(events: &[GenerationEvent]) -> Vec<Patch> {
    events
        .iter()
        .filter_map(|event| match event {
            GenerationEvent::Patch { patch } => Some(patch.clone()),
            _ => None,
        })
        .collect()
}

fn attempts_seen(events: &[GenerationEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|event| match event {
            GenerationEvent::Status {
                stage: Stage::Attempt,
                attempt,
            } => *attempt,
            _ => None,
        })
        .collect()
}

fn error_code(events: &[GenerationEvent]) -> Option<ErrorCode> {
    match events.last() {
        Some(GenerationEvent::Error { code, .. }) => Some(*code),
        _ => None,
    }
}

fn pricing_tree(title: &str) -> Value {
    json!({
        "type": "Card",
        "children": [
            {"type": "CardHeader", "children": [{"type": "CardTitle", "props": {"text": title}}]},
            {"type": "CardContent", "children": ["$29 / month"]},
            {"type": "CardFooter", "children": [{"type": "Button", "props": {"label": "Subscribe"}}]}
        ]
    })
}

fn reply(tree: &Value) -> String {
    format!("Sure, here is the card:\n```json\n{}\n```\nEnjoy!", tree)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pricing_card_is_accepted_on_first_attempt() {
    let text = reply(&pricing_tree("Pro"));
    let (head, tail) = text.split_at(text.len() / 2);
    let model = Arc::new(ScriptedModel::new(vec![vec![
        ScriptStep::Text(head.to_string()),
        ScriptStep::Text(tail.to_string()),
        ScriptStep::Usage(TokenUsage::new(12, 40)),
    ]]));
    let h = harness(model.clone()).await;

    let events = h.prompt(PRICING_PROMPT).await;

    assert_eq!(events[0], GenerationEvent::status(Stage::ThreadLookup));
    assert!(warning_codes(&events).is_empty(), "{:?}", events);
    assert_eq!(attempts_seen(&events), vec![1]);
    assert!(events
        .iter()
        .any(|event| matches!(event, GenerationEvent::Usage(usage) if usage.total_tokens == 52)));

    let GenerationEvent::Done {
        version_id,
        spec_hash,
    } = events.last().unwrap().clone()
    else {
        panic!("expected done, got {:?}", events.last());
    };

    let active = h.active_spec().await.unwrap();
    assert_eq!(active.content_hash().unwrap(), spec_hash);
    assert_eq!(active.len(), 7);
    assert_eq!(
        apply_patches(&Spec::empty(), &patches(&events)).unwrap(),
        active
    );

    let logs = h.store.logs(&h.thread_id).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].version_id, version_id);
    assert_eq!(logs[0].attempts, 1);
    assert!(!logs[0].fallback_used);
    assert_eq!(logs[0].patch_count as usize, patches(&events).len());
    assert_eq!((logs[0].prompt_tokens, logs[0].completion_tokens), (12, 40));
    assert_eq!(model.requests().len(), 1);
}

#[tokio::test]
async fn attempts_are_bounded_then_fallback_applies() {
    let model = Arc::new(ScriptedModel::replying("I would rather talk about the weather."));
    let h = harness(model.clone()).await;

    let events = h.prompt(PRICING_PROMPT).await;

    assert_eq!(attempts_seen(&events), vec![1, 2, 3]);
    assert_eq!(
        warning_codes(&events),
        vec![
            warning::NO_VALID_OUTPUT,
            warning::NO_VALID_OUTPUT,
            warning::NO_VALID_OUTPUT,
            warning::FALLBACK_APPLIED,
        ]
    );
    assert!(matches!(events.last(), Some(GenerationEvent::Done { .. })));

    let requests = model.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].attempt.issues.is_empty());
    assert_eq!(requests[1].attempt.issues[0].code, warning::NO_VALID_OUTPUT);
    assert_eq!(requests[2].attempt.attempt, 3);
    assert_eq!(requests[2].attempt.max_attempts, 3);

    let active = h.active_spec().await.unwrap();
    assert_eq!(active.root, "fallback-card");
    assert!(active.get("fallback-action").is_some());
    let log = &h.store.logs(&h.thread_id).unwrap()[0];
    assert!(log.fallback_used);
    assert_eq!(log.attempts, 3);
    assert_eq!(log.warning_count, 4);
}

#[tokio::test]
async fn schema_valid_but_constrained_out_candidates_hit_the_attempt_bound() {
    let minimal = json!({"type": "Text", "props": {"text": "hi"}});
    let model = Arc::new(ScriptedModel::replying(reply(&minimal)));
    let h = harness(model.clone()).await;

    let events = h.prompt(PRICING_PROMPT).await;

    assert_eq!(model.requests().len(), 3);
    assert_eq!(attempts_seen(&events), vec![1, 2, 3]);
    let codes = warning_codes(&events);
    assert_eq!(codes.last().map(String::as_str), Some(warning::FALLBACK_APPLIED));
    assert!(codes.iter().all(|code| code != "UNKNOWN_TYPE"));
    assert!(codes.contains(&"MISSING_REQUIRED_TYPE".to_string()));
    assert!(matches!(events.last(), Some(GenerationEvent::Done { .. })));
}

#[tokio::test]
async fn pricing_card_from_offline_model_has_card_structure() {
    let catalog = Arc::new(ComponentCatalog::standard());
    let h = harness(Arc::new(OfflineModel::new(catalog.clone()).unwrap())).await;

    let events = h.prompt(PRICING_PROMPT).await;

    assert!(matches!(events[0], GenerationEvent::Status { .. }));
    assert!(!patches(&events).is_empty());
    assert!(matches!(events.last(), Some(GenerationEvent::Done { .. })));

    let types = h.active_spec().await.unwrap().reachable_types();
    assert!(types.iter().any(|t| catalog.is_container(t)));
    assert!(types.iter().any(|t| catalog.is_header(t)));
    assert!(types.iter().any(|t| catalog.is_body(t)));
}

#[tokio::test]
async fn rejected_candidate_feeds_issues_into_next_attempt() {
    let mut bad = pricing_tree("Pro");
    bad["children"][1]["children"] = json!([{"type": "Carousel"}]);
    let model = Arc::new(ScriptedModel::new(vec![
        vec![ScriptStep::Text(reply(&bad))],
        vec![ScriptStep::Text(reply(&pricing_tree("Pro")))],
    ]));
    let h = harness(model.clone()).await;

    let events = h.prompt(PRICING_PROMPT).await;

    assert_eq!(attempts_seen(&events), vec![1, 2]);
    assert!(warning_codes(&events).contains(&"UNKNOWN_TYPE".to_string()));
    assert!(!warning_codes(&events).contains(&warning::FALLBACK_APPLIED.to_string()));
    let requests = model.requests();
    assert!(requests[1]
        .attempt
        .issues
        .iter()
        .any(|issue| issue.code == "UNKNOWN_TYPE" && issue.message.contains("Carousel")));
    assert_eq!(h.store.logs(&h.thread_id).unwrap()[0].attempts, 2);
}

#[tokio::test]
async fn constraint_violations_are_retried() {
    let bare = json!({"type": "Card", "children": ["just text"]});
    let model = Arc::new(ScriptedModel::new(vec![
        vec![ScriptStep::Text(reply(&bare))],
        vec![ScriptStep::Text(reply(&pricing_tree("Pro")))],
    ]));
    let h = harness(model.clone()).await;

    let events = h.prompt(PRICING_PROMPT).await;

    let codes = warning_codes(&events);
    assert!(codes.contains(&"MISSING_REQUIRED_TYPE".to_string()));
    assert!(codes.contains(&"INCOMPLETE_CONTAINER".to_string()));
    assert!(codes.contains(&"MISSING_INTERACTIVE_CONTROL".to_string()));
    assert!(matches!(events.last(), Some(GenerationEvent::Done { .. })));
    assert!(h.active_spec().await.unwrap().get("root").is_some());
}

#[tokio::test]
async fn first_acceptable_object_in_a_stream_wins() {
    let text = format!(
        "{}\n{}\n{}",
        json!({"type": "Nope"}),
        reply(&pricing_tree("First")),
        reply(&pricing_tree("Second"))
    );
    let h = harness(Arc::new(ScriptedModel::replying(text))).await;

    h.prompt(PRICING_PROMPT).await;

    let active = h.active_spec().await.unwrap();
    assert_eq!(active.get("root__cardheader_0__cardtitle_0").unwrap().props["text"], "First");
}

#[tokio::test]
async fn malformed_json_is_reported() {
    let model = Arc::new(ScriptedModel::new(vec![
        vec![ScriptStep::Text("{\"type\": \"Card\", oops}".to_string())],
        vec![ScriptStep::Text(reply(&pricing_tree("Pro")))],
    ]));
    let h = harness(model.clone()).await;

    let events = h.prompt(PRICING_PROMPT).await;

    assert_eq!(warning_codes(&events), vec![warning::INVALID_JSON]);
    assert_eq!(model.requests()[1].attempt.issues[0].code, warning::INVALID_JSON);
}

#[tokio::test]
async fn output_after_the_accepted_candidate_is_ignored_but_usage_is_kept() {
    let model = Arc::new(ScriptedModel::new(vec![vec![
        ScriptStep::Text(format!(
            "{} {{oops}} {}",
            reply(&pricing_tree("Pro")),
            json!({"type": "Nope"})
        )),
        ScriptStep::Text("and another {\"type\": \"Card\"}".to_string()),
        ScriptStep::Usage(TokenUsage::new(5, 7)),
        ScriptStep::Fail("connection reset".to_string()),
    ]]));
    let h = harness(model.clone()).await;

    let events = h.prompt(PRICING_PROMPT).await;

    assert!(warning_codes(&events).is_empty(), "{:?}", events);
    assert!(events
        .iter()
        .any(|event| matches!(event, GenerationEvent::Usage(usage) if usage.total_tokens == 12)));
    assert!(matches!(events.last(), Some(GenerationEvent::Done { .. })));
    assert_eq!(
        h.active_spec().await.unwrap().get("root__cardheader_0__cardtitle_0").unwrap().props["text"],
        "Pro"
    );

    let log = &h.store.logs(&h.thread_id).unwrap()[0];
    assert_eq!(log.warning_count, 0);
    assert_eq!((log.prompt_tokens, log.completion_tokens), (5, 7));
    assert_eq!(model.requests().len(), 1);
}

#[tokio::test]
async fn warnings_follow_the_order_objects_appear_in() {
    let model = Arc::new(ScriptedModel::new(vec![
        vec![ScriptStep::Text(format!("{} {{oops}}", json!({"type": "Nope"})))],
        vec![ScriptStep::Text(reply(&pricing_tree("Pro")))],
    ]));
    let h = harness(model.clone()).await;

    let events = h.prompt(PRICING_PROMPT).await;

    let codes = warning_codes(&events);
    let unknown = codes.iter().position(|code| code == "UNKNOWN_TYPE").unwrap();
    let invalid = codes.iter().position(|code| code == warning::INVALID_JSON).unwrap();
    assert!(unknown < invalid, "{:?}", codes);
    assert_eq!(
        model.requests()[1].attempt.issues.last().map(|issue| issue.code.as_str()),
        Some(warning::INVALID_JSON)
    );
}

#[tokio::test]
async fn stream_failure_stops_retrying() {
    let model = Arc::new(ScriptedModel::new(vec![vec![
        ScriptStep::Text("{\"type\": \"Ca".to_string()),
        ScriptStep::Fail("connection reset".to_string()),
    ]]));
    let h = harness(model.clone()).await;

    let events = h.prompt(PRICING_PROMPT).await;

    assert_eq!(model.requests().len(), 1);
    assert_eq!(
        warning_codes(&events),
        vec![warning::STREAM_ERROR, warning::FALLBACK_APPLIED]
    );
    assert!(matches!(events.last(), Some(GenerationEvent::Done { .. })));
}

#[tokio::test]
async fn refused_stream_falls_back() {
    let h = harness(Arc::new(FailingModel::new(FailurePoint::OpenStream))).await;
    let events = h.prompt(PRICING_PROMPT).await;
    assert_eq!(attempts_seen(&events), vec![1]);
    assert_eq!(
        warning_codes(&events),
        vec![warning::STREAM_ERROR, warning::FALLBACK_APPLIED]
    );
}

#[tokio::test]
async fn unknown_thread_is_terminal_and_recorded() {
    let h = harness(Arc::new(ScriptedModel::replying(""))).await;
    let events = h
        .generate(GenerationRequest::new("missing", PRICING_PROMPT))
        .await;

    assert_eq!(events.len(), 2);
    assert_eq!(error_code(&events), Some(ErrorCode::ThreadNotFound));
    let failures = h.store.list_failures("missing").await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].code, "THREAD_NOT_FOUND");
}

#[tokio::test]
async fn stale_base_version_is_rejected() {
    let h = harness(Arc::new(ScriptedModel::replying(reply(&pricing_tree("Pro"))))).await;
    h.prompt(PRICING_PROMPT).await;
    let before = h.active_spec().await;

    let events = h
        .generate(GenerationRequest::new(h.thread_id.clone(), "make it blue").with_base_version("v-unknown"))
        .await;

    assert_eq!(error_code(&events), Some(ErrorCode::BaseVersionConflict));
    assert!(patches(&events).is_empty());
    assert_eq!(h.active_spec().await, before);
    assert_eq!(h.store.logs(&h.thread_id).unwrap().len(), 1);
}

#[tokio::test]
async fn version_from_another_thread_is_a_conflict() {
    let h = harness(Arc::new(ScriptedModel::replying(reply(&pricing_tree("Pro"))))).await;
    h.prompt(PRICING_PROMPT).await;
    let foreign = h
        .store
        .get_version(&h.thread_id, None)
        .await
        .unwrap()
        .unwrap()
        .version_id;

    let other = h.store.create_thread("other").await.unwrap();
    let events = h
        .generate(GenerationRequest::new(other.thread_id, PRICING_PROMPT).with_base_version(foreign))
        .await;
    assert_eq!(error_code(&events), Some(ErrorCode::BaseVersionConflict));
}

#[tokio::test]
async fn model_errors_and_panics_become_generation_exceptions() {
    for point in [FailurePoint::Extract, FailurePoint::Panic] {
        let h = harness(Arc::new(FailingModel::new(point))).await;
        let events = h.prompt(PRICING_PROMPT).await;

        assert_eq!(error_code(&events), Some(ErrorCode::GenerationException));
        assert!(h.active_spec().await.is_none());
        let failures = h.store.list_failures(&h.thread_id).await.unwrap();
        assert_eq!(failures.len(), 1, "{:?}", point);
        assert_eq!(failures[0].code, "GENERATION_EXCEPTION");
        if point == FailurePoint::Panic {
            assert!(failures[0].message.contains("model backend crashed"));
        }
    }
}

#[tokio::test]
async fn context_failure_is_a_generation_exception() {
    let store = Arc::new(InMemoryThreadStore::new());
    let thread = store.create_thread("demo").await.unwrap();
    let catalog = Arc::new(ComponentCatalog::standard());
    let orchestrator = Arc::new(
        Orchestrator::new(
            Arc::new(ScriptedModel::replying("")),
            Arc::new(StaticContext::unavailable()),
            store.clone(),
            catalog,
            GenerationConfig::default(),
        )
        .unwrap(),
    );

    let events: Vec<GenerationEvent> = orchestrator
        .generate(GenerationRequest::new(thread.thread_id, PRICING_PROMPT))
        .collect()
        .await;
    assert_single_terminal(&events);
    assert_eq!(error_code(&events), Some(ErrorCode::GenerationException));
}

#[tokio::test]
async fn disabled_fallback_ends_without_a_candidate() {
    let config = GenerationConfig {
        fallback_enabled: false,
        max_attempts: 2,
        ..GenerationConfig::default()
    };
    let h = harness_with(
        Arc::new(ScriptedModel::replying("nothing useful")),
        Arc::new(InMemoryThreadStore::new()),
        ComponentCatalog::standard(),
        config,
    )
    .await;

    let events = h.prompt(PRICING_PROMPT).await;

    assert_eq!(attempts_seen(&events), vec![1, 2]);
    assert_eq!(error_code(&events), Some(ErrorCode::NoValidCandidate));
    assert!(h.active_spec().await.is_none());
}

#[tokio::test]
async fn fallback_over_the_element_limit_is_fatal() {
    // Eight elements fit the interactive fallback with one token; two
    // quoted tokens push it to nine.
    let config = GenerationConfig {
        max_elements: 8,
        ..GenerationConfig::default()
    };
    let h = harness_with(
        Arc::new(ScriptedModel::replying("nothing useful")),
        Arc::new(InMemoryThreadStore::new()),
        ComponentCatalog::standard(),
        config,
    )
    .await;

    let events = h
        .prompt("Create a pricing card with \"Basic\" and \"Pro\" tiers and a CTA")
        .await;

    assert_eq!(error_code(&events), Some(ErrorCode::FallbackInvalid));
    assert!(patches(&events).is_empty());
    assert!(h.active_spec().await.is_none());
    assert_eq!(
        h.store.list_failures(&h.thread_id).await.unwrap()[0].code,
        "FALLBACK_INVALID"
    );
}

#[tokio::test]
async fn follow_up_edits_patch_the_active_version_and_keep_state() {
    let store = Arc::new(InMemoryThreadStore::new());
    let mut first = pricing_tree("Pro");
    first["state"] = json!({"plan": "pro"});
    let h = harness_with(
        Arc::new(ScriptedModel::replying(reply(&first))),
        store.clone(),
        ComponentCatalog::standard(),
        GenerationConfig::default(),
    )
    .await;
    h.prompt(PRICING_PROMPT).await;
    let parent = h.store.get_version(&h.thread_id, None).await.unwrap().unwrap();

    let second = Orchestrator::new(
        Arc::new(ScriptedModel::replying(reply(&pricing_tree("Team")))),
        Arc::new(StaticContext::new("ctx-1")),
        store.clone(),
        Arc::new(ComponentCatalog::standard()),
        GenerationConfig::default(),
    )
    .unwrap();
    let events: Vec<GenerationEvent> = Arc::new(second)
        .generate(GenerationRequest::new(h.thread_id.clone(), "Rename the plan to \"Team\"").with_base_version(parent.version_id.clone()))
        .collect()
        .await;
    assert_single_terminal(&events);

    let diff = patches(&events);
    assert_eq!(diff.len(), 1, "{:?}", diff);
    assert_eq!(diff[0].path, "/elements/root__cardheader_0__cardtitle_0/props/text");

    let active = store.get_version(&h.thread_id, None).await.unwrap().unwrap();
    assert_eq!(active.parent_version_id, Some(parent.version_id));
    assert_eq!(active.spec.state_value(), json!({"plan": "pro"}));
    assert_eq!(apply_patches(&parent.spec, &diff).unwrap(), active.spec);
}

#[tokio::test]
async fn edits_of_an_older_version_link_to_that_version() {
    let h = harness(Arc::new(ScriptedModel::replying(reply(&pricing_tree("Pro"))))).await;
    h.prompt(PRICING_PROMPT).await;
    let first = h.store.get_version(&h.thread_id, None).await.unwrap().unwrap();
    h.prompt("Make it bolder").await;
    let second = h.store.get_version(&h.thread_id, None).await.unwrap().unwrap();
    assert_eq!(second.parent_version_id, Some(first.version_id.clone()));

    let events = h
        .generate(
            GenerationRequest::new(h.thread_id.clone(), "Go back and tweak the first one")
                .with_base_version(first.version_id.clone()),
        )
        .await;
    assert!(matches!(events.last(), Some(GenerationEvent::Done { .. })));

    let third = h.store.get_version(&h.thread_id, None).await.unwrap().unwrap();
    assert_ne!(third.version_id, second.version_id);
    assert_eq!(third.parent_version_id, Some(first.version_id));
}

#[tokio::test]
async fn dropped_receiver_persists_nothing() {
    let h = harness(Arc::new(ScriptedModel::replying(reply(&pricing_tree("Pro"))))).await;
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    h.orchestrator
        .run(GenerationRequest::new(h.thread_id.clone(), PRICING_PROMPT), &tx)
        .await;

    assert!(h.active_spec().await.is_none());
    assert!(h.store.list_failures(&h.thread_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn offline_model_produces_an_accepted_design() {
    let catalog = Arc::new(ComponentCatalog::standard());
    let model = Arc::new(OfflineModel::new(catalog).unwrap().with_chunk_chars(9));
    let h = harness(model).await;

    let events = h
        .prompt("A profile card with an avatar, a \"Follow\" button and a link")
        .await;

    assert!(warning_codes(&events).is_empty(), "{:?}", events);
    assert!(matches!(events.last(), Some(GenerationEvent::Done { .. })));
    let active = h.active_spec().await.unwrap();
    assert_eq!(active.root, "card");
}

#[test]
fn setup_rejects_zero_attempts_and_unknown_text_type() {
    let build = |config: GenerationConfig| {
        Orchestrator::new(
            Arc::new(ScriptedModel::replying("")),
            Arc::new(StaticContext::new("ctx")),
            Arc::new(InMemoryThreadStore::new()),
            Arc::new(ComponentCatalog::standard()),
            config,
        )
    };
    assert!(build(GenerationConfig {
        max_attempts: 0,
        ..GenerationConfig::default()
    })
    .is_err());
    assert!(build(GenerationConfig {
        text_node_type: "Paragraph".to_string(),
        ..GenerationConfig::default()
    })
    .is_err());
    assert!(build(GenerationConfig::default()).is_ok());
}

#[test]
fn setup_rejects_a_catalog_the_fallback_cannot_use() {
    let catalog = || {
        Arc::new(
            ComponentCatalog::new("Text")
                .with_type("Card", ComponentRole::Container)
                .with_type("CardHeader", ComponentRole::Header)
                .with_type("CardContent", ComponentRole::Body)
                .with_type("Button", ComponentRole::Control),
        )
    };
    let build = |config: GenerationConfig| {
        Orchestrator::new(
            Arc::new(ScriptedModel::replying("")),
            Arc::new(StaticContext::new("ctx")),
            Arc::new(InMemoryThreadStore::new()),
            catalog(),
            config,
        )
    };

    match build(GenerationConfig::default()) {
        Err(OrchestratorError::Setup(message)) => assert!(message.contains("CardTitle"), "{}", message),
        Err(other) => panic!("expected a setup error, got {}", other),
        Ok(_) => panic!("expected a setup error"),
    }
    assert!(build(GenerationConfig {
        fallback_enabled: false,
        ..GenerationConfig::default()
    })
    .is_ok());
}
