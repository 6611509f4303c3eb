//! The generation loop.
//!
//! One run walks: thread lookup, base version check, component
//! extraction, context fetch, up to `max_attempts` streamed attempts, an
//! optional fallback, and persistence. The canonical spec only changes by
//! applying the patches that were emitted to the caller.

use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use genui_engine::{
    build_fallback, diff_specs, normalize, prompt_title, ComponentCatalog, ConstraintBuilder,
    ConstraintSet, Extracted, IssueCode, NormalizeOptions, ObjectExtractor, ValidationIssue,
    ValidationReport, Validator,
};
use genui_storage::{FailureRecord, PersistGeneration, PersistedGeneration, ThreadStore};
use genui_types::{apply_patches, Spec};
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::context::{ComponentContext, ContextProvider};
use crate::error::{ErrorCode, OrchestratorError, OrchestratorResult};
use crate::events::{warning, GenerationEvent, Stage};
use crate::model::{AttemptContext, AttemptIssue, DesignChunk, DesignModel, DesignRequest, TokenUsage};

/// Input to one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub thread_id: String,
    pub prompt: String,
    /// Version the caller edited from. `None` uses the active version.
    pub base_version_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(thread_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            prompt: prompt.into(),
            base_version_id: None,
        }
    }

    pub fn with_base_version(mut self, version_id: impl Into<String>) -> Self {
        self.base_version_id = Some(version_id.into());
        self
    }
}

/// Sends non-terminal events and counts what it sent. `finish` consumes
/// it, so a run can emit at most one terminal event.
struct Emitter<'a> {
    tx: &'a mpsc::Sender<GenerationEvent>,
    warnings: u32,
    patches: u32,
}

impl<'a> Emitter<'a> {
    fn new(tx: &'a mpsc::Sender<GenerationEvent>) -> Self {
        Self {
            tx,
            warnings: 0,
            patches: 0,
        }
    }

    async fn send(&mut self, event: GenerationEvent) -> OrchestratorResult<()> {
        match &event {
            GenerationEvent::Warning { .. } => self.warnings += 1,
            GenerationEvent::Patch { .. } => self.patches += 1,
            _ => {}
        }
        self.tx
            .send(event)
            .await
            .map_err(|_| OrchestratorError::Cancelled)
    }

    async fn warn(
        &mut self,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> OrchestratorResult<()> {
        self.send(GenerationEvent::warning(code, message)).await
    }

    async fn finish(self, event: GenerationEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("event receiver dropped before terminal event");
        }
    }
}

/// Result of the attempt loop.
struct Search {
    accepted: Option<Spec>,
    attempts: u32,
    usage: TokenUsage,
}

/// State shared by the stages of one run.
struct RunContext<'r> {
    request: &'r GenerationRequest,
    base: Spec,
    prior: Option<Spec>,
    first_generation: bool,
    constraints: ConstraintSet,
    context: ComponentContext,
}

/// Drives generations against a model, a context source and a store.
pub struct Orchestrator {
    model: Arc<dyn DesignModel>,
    context: Arc<dyn ContextProvider>,
    store: Arc<dyn ThreadStore>,
    catalog: Arc<ComponentCatalog>,
    constraints: ConstraintBuilder,
    validator: Validator,
    normalize_options: NormalizeOptions,
    config: GenerationConfig,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn DesignModel>,
        context: Arc<dyn ContextProvider>,
        store: Arc<dyn ThreadStore>,
        catalog: Arc<ComponentCatalog>,
        config: GenerationConfig,
    ) -> OrchestratorResult<Self> {
        if config.max_attempts == 0 {
            return Err(OrchestratorError::Setup(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if config.enforce_allow_list && !catalog.is_known(&config.text_node_type) {
            return Err(OrchestratorError::Setup(format!(
                "text node type {} is not in the catalog",
                config.text_node_type
            )));
        }
        let constraints = ConstraintBuilder::new(catalog.clone())
            .map_err(|err| OrchestratorError::Setup(err.to_string()))?;
        let validator = Validator::new(config.validator_options(&catalog));
        if config.fallback_enabled {
            // The fullest fallback shape: footer, button and one token.
            let sample = ConstraintSet {
                require_interactive: true,
                required_tokens: vec!["Sample".to_string()],
                ..ConstraintSet::default()
            };
            let report = validator.validate(&build_fallback("Sample layout", &sample, &catalog));
            if !report.valid {
                return Err(OrchestratorError::Setup(format!(
                    "fallback spec is invalid for this catalog: {}",
                    describe(&report)
                )));
            }
        }
        let normalize_options = config.normalize_options();
        Ok(Self {
            model,
            context,
            store,
            catalog,
            constraints,
            validator,
            normalize_options,
            config,
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<ComponentCatalog> {
        &self.catalog
    }

    /// Start a generation and return its event stream. Dropping the stream
    /// cancels the run at its next emit, before anything is persisted.
    pub fn generate(self: Arc<Self>, request: GenerationRequest) -> BoxStream<'static, GenerationEvent> {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        tokio::spawn(async move { self.run(request, &tx).await });
        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed()
    }

    /// Run one generation to completion, sending events into `tx`.
    pub async fn run(&self, request: GenerationRequest, tx: &mpsc::Sender<GenerationEvent>) {
        info!(thread_id = %request.thread_id, "Generation started");
        let mut emitter = Emitter::new(tx);
        let outcome = AssertUnwindSafe(self.drive(&request, &mut emitter))
            .catch_unwind()
            .await;

        let terminal = match outcome {
            Ok(Ok(persisted)) => {
                info!(
                    thread_id = %request.thread_id,
                    version_id = %persisted.version.version_id,
                    attempts = persisted.log.attempts,
                    fallback = persisted.log.fallback_used,
                    "Generation persisted"
                );
                GenerationEvent::Done {
                    version_id: persisted.version.version_id,
                    spec_hash: persisted.version.spec_hash,
                }
            }
            Ok(Err(OrchestratorError::Cancelled)) => {
                info!(thread_id = %request.thread_id, "Generation cancelled by caller");
                return;
            }
            Ok(Err(err)) => self.fail(&request, err.code(), err.to_string()).await,
            Err(panic) => {
                let message = format!("generation panicked: {}", panic_message(panic.as_ref()));
                self.fail(&request, ErrorCode::GenerationException, message)
                    .await
            }
        };
        emitter.finish(terminal).await;
    }

    async fn fail(
        &self,
        request: &GenerationRequest,
        code: ErrorCode,
        message: String,
    ) -> GenerationEvent {
        warn!(thread_id = %request.thread_id, code = %code, error = %message, "Generation failed");
        let record = FailureRecord::new(
            request.thread_id.as_str(),
            code.as_str(),
            message.as_str(),
            request.prompt.as_str(),
        );
        if let Err(err) = self.store.record_failure(record).await {
            warn!(thread_id = %request.thread_id, error = %err, "Failed to record generation failure");
        }
        GenerationEvent::Error { code, message }
    }

    async fn drive(
        &self,
        request: &GenerationRequest,
        emitter: &mut Emitter<'_>,
    ) -> OrchestratorResult<PersistedGeneration> {
        emitter.send(GenerationEvent::status(Stage::ThreadLookup)).await?;
        let bundle = self
            .store
            .get_bundle(&request.thread_id)
            .await?
            .ok_or_else(|| OrchestratorError::ThreadNotFound(request.thread_id.clone()))?;

        emitter
            .send(GenerationEvent::status(Stage::BaseVersionCheck))
            .await?;
        let base_version = match request.base_version_id.as_deref() {
            Some(version_id) => Some(
                self.store
                    .get_version(&request.thread_id, Some(version_id))
                    .await?
                    .ok_or_else(|| OrchestratorError::BaseVersionConflict(version_id.to_string()))?,
            ),
            None => bundle.active_version,
        };
        let (base, parent_version_id) = match base_version {
            Some(version) => (version.spec, Some(version.version_id)),
            None => (Spec::default(), None),
        };
        let first_generation = bundle.versions.is_empty();
        let prior = (!base.is_empty()).then(|| base.clone());

        emitter
            .send(GenerationEvent::status(Stage::ExtractComponents))
            .await?;
        let extraction = self
            .model
            .extract_components(&request.prompt, prior.as_ref())
            .await?;
        let constraints = self
            .constraints
            .build(&request.prompt, &extraction.components);
        debug!(
            components = ?extraction.components,
            required = ?constraints.required_types,
            min_nodes = constraints.min_nodes,
            "Derived constraints"
        );

        emitter.send(GenerationEvent::status(Stage::FetchContext)).await?;
        let components: Vec<String> = constraints.required_types.iter().cloned().collect();
        let context = self.context.fetch_context(&components).await?;

        let run = RunContext {
            request,
            base,
            prior,
            first_generation,
            constraints,
            context,
        };
        let mut canonical = run.base.clone();
        let search = self.search(&run, emitter).await?;

        let fallback_used = match search.accepted {
            Some(spec) => {
                self.apply(&mut canonical, &spec, emitter).await?;
                false
            }
            None => {
                self.apply_fallback(&run, &mut canonical, search.attempts, emitter)
                    .await?;
                true
            }
        };

        emitter.send(GenerationEvent::status(Stage::Persist)).await?;
        let spec_hash = canonical.content_hash()?;
        let assistant_message = if fallback_used {
            format!(
                "Applied a fallback layout for \"{}\".",
                prompt_title(&request.prompt)
            )
        } else {
            format!(
                "Generated {} element(s) in {} attempt(s).",
                canonical.len(),
                search.attempts
            )
        };
        let persisted = self
            .store
            .persist_generation(PersistGeneration {
                thread_id: request.thread_id.clone(),
                parent_version_id,
                prompt: request.prompt.clone(),
                spec: canonical,
                spec_hash,
                assistant_message,
                attempts: search.attempts,
                warning_count: emitter.warnings,
                patch_count: emitter.patches,
                fallback_used,
                prompt_tokens: search.usage.prompt_tokens,
                completion_tokens: search.usage.completion_tokens,
            })
            .await?;
        Ok(persisted)
    }

    /// Stream attempts until one candidate is accepted, the attempts run
    /// out, or a stream fails.
    async fn search(
        &self,
        run: &RunContext<'_>,
        emitter: &mut Emitter<'_>,
    ) -> OrchestratorResult<Search> {
        let max_attempts = self.config.max_attempts;
        let mut search = Search {
            accepted: None,
            attempts: 0,
            usage: TokenUsage::default(),
        };
        let mut feedback: Vec<AttemptIssue> = Vec::new();

        for attempt in 1..=max_attempts {
            search.attempts = attempt;
            emitter
                .send(GenerationEvent::Status {
                    stage: Stage::Attempt,
                    attempt: Some(attempt),
                })
                .await?;

            let design = DesignRequest {
                prompt: run.request.prompt.clone(),
                prior_spec: run.prior.clone(),
                context: run.context.clone(),
                attempt: AttemptContext {
                    attempt,
                    max_attempts,
                    issues: std::mem::take(&mut feedback),
                },
            };
            let mut chunks = match self.model.stream_design(design).await {
                Ok(chunks) => chunks,
                Err(err) => {
                    warn!(attempt, error = %err, "Design stream failed to open");
                    emitter.warn(warning::STREAM_ERROR, err.to_string()).await?;
                    break;
                }
            };

            let mut extractor = ObjectExtractor::new();
            let mut issues: Vec<AttemptIssue> = Vec::new();
            let mut saw_object = false;
            let mut stream_failed = false;

            // After acceptance only usage is read; later text is discarded.
            while let Some(chunk) = chunks.next().await {
                let text = match chunk {
                    Ok(DesignChunk::Usage(usage)) => {
                        search.usage.prompt_tokens += usage.prompt_tokens;
                        search.usage.completion_tokens += usage.completion_tokens;
                        search.usage.total_tokens += usage.total_tokens;
                        emitter.send(GenerationEvent::Usage(usage)).await?;
                        continue;
                    }
                    Ok(DesignChunk::Text(_)) if search.accepted.is_some() => continue,
                    Ok(DesignChunk::Text(text)) => text,
                    Err(err) if search.accepted.is_some() => {
                        warn!(attempt, error = %err, "Design stream failed after acceptance");
                        break;
                    }
                    Err(err) => {
                        warn!(attempt, error = %err, "Design stream failed");
                        emitter.warn(warning::STREAM_ERROR, err.to_string()).await?;
                        stream_failed = true;
                        break;
                    }
                };

                for item in extractor.push(&text).items {
                    let object = match item {
                        Extracted::Object(object) => object,
                        Extracted::Malformed(malformed) => {
                            let issue = AttemptIssue::new(warning::INVALID_JSON, malformed.error);
                            emitter.warn(&issue.code, &issue.message).await?;
                            issues.push(issue);
                            continue;
                        }
                    };
                    saw_object = true;
                    match self.evaluate(&object, run) {
                        Ok(spec) => {
                            info!(attempt, elements = spec.len(), "Candidate accepted");
                            search.accepted = Some(spec);
                            break;
                        }
                        Err(rejected) => {
                            warn!(attempt, issues = rejected.len(), "Candidate rejected");
                            for issue in &rejected {
                                emitter.warn(&issue.code, &issue.message).await?;
                            }
                            issues.extend(rejected);
                        }
                    }
                }
            }

            if search.accepted.is_some() || stream_failed {
                break;
            }
            if !saw_object && issues.is_empty() {
                let issue = AttemptIssue::new(
                    warning::NO_VALID_OUTPUT,
                    "stream ended without a complete JSON object",
                );
                emitter.warn(&issue.code, &issue.message).await?;
                issues.push(issue);
            }
            feedback = issues;
        }
        Ok(search)
    }

    /// Turn one extracted object into an acceptable spec, or the reasons
    /// it is not one.
    fn evaluate(&self, object: &Value, run: &RunContext<'_>) -> Result<Spec, Vec<AttemptIssue>> {
        let mut candidate = normalize(object, &self.normalize_options).map_err(|err| {
            vec![AttemptIssue::new(IssueCode::SchemaError.as_str(), err.to_string())]
        })?;
        if candidate.state.is_none() {
            candidate.state = run.base.state.clone();
        }

        let mut issues: Vec<AttemptIssue> = self
            .validator
            .validate(&candidate)
            .issues
            .into_iter()
            .map(attempt_issue)
            .collect();
        issues.extend(
            run.constraints
                .check(&candidate, &self.catalog)
                .into_iter()
                .map(|violation| AttemptIssue::new(violation.code.as_str(), violation.message)),
        );
        if issues.is_empty() && run.first_generation && candidate == run.base {
            issues.push(AttemptIssue::new(
                warning::NO_STRUCTURAL_CHANGE,
                "candidate leaves the empty spec unchanged",
            ));
        }

        if issues.is_empty() {
            Ok(candidate)
        } else {
            Err(issues)
        }
    }

    async fn apply_fallback(
        &self,
        run: &RunContext<'_>,
        canonical: &mut Spec,
        attempts: u32,
        emitter: &mut Emitter<'_>,
    ) -> OrchestratorResult<()> {
        if !self.config.fallback_enabled {
            return Err(OrchestratorError::NoValidCandidate);
        }
        emitter.send(GenerationEvent::status(Stage::Fallback)).await?;

        let mut fallback = build_fallback(&run.request.prompt, &run.constraints, &self.catalog);
        fallback.state = run.base.state.clone();
        let report = self.validator.validate(&fallback);
        if !report.valid {
            return Err(OrchestratorError::FallbackInvalid(describe(&report)));
        }

        warn!(thread_id = %run.request.thread_id, attempts, "Applying fallback spec");
        emitter
            .warn(
                warning::FALLBACK_APPLIED,
                format!("no acceptable spec after {} attempt(s); applied fallback", attempts),
            )
            .await?;
        self.apply(canonical, &fallback, emitter).await
    }

    /// Diff `canonical` to `target`, emit the patches and apply them.
    async fn apply(
        &self,
        canonical: &mut Spec,
        target: &Spec,
        emitter: &mut Emitter<'_>,
    ) -> OrchestratorResult<()> {
        let patches = diff_specs(canonical, target)?;
        let next = apply_patches(canonical, &patches)?;
        if next != *target {
            return Err(OrchestratorError::Diverged);
        }
        for patch in patches {
            emitter.send(GenerationEvent::Patch { patch }).await?;
        }
        *canonical = next;
        Ok(())
    }
}

fn describe(report: &ValidationReport) -> String {
    report
        .issues
        .iter()
        .map(|issue| format!("{}: {}", issue.code, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn attempt_issue(issue: ValidationIssue) -> AttemptIssue {
    let message = match issue.element_id {
        Some(id) => format!("[{}] {}", id, issue.message),
        None => issue.message,
    };
    AttemptIssue::new(issue.code.as_str(), message)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
