//! Orchestrator (§4.17): owns the pipeline DAG, the one concurrent
//! fan-out/join (Situation Analyzer alongside the sequential
//! preprocessing chain), progress reporting, and the single validator
//! retry. Mutable pipeline state lives only for the lifetime of one
//! request; every stage is a function from state to new state.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tone_config::PipelineConfig;
use tone_core::llm_types::TokenUsage;
use tone_core::progress::{
    FactEvent, LabelEvent, MonthlyCostEstimate, Phase, ProgressEvent, ProgressSink, SegmentEvent,
    SituationAnalysisEvent, SpanEvent, StatsEvent, TemplateSelectedEvent, UsageEvent,
};
use tone_core::request::RewriteRequest;
use tone_core::segment::{LabelStats, Tier};
use tone_core::traits::LLMClient;

use tone_text::enforcer;
use tone_text::identity_booster;
use tone_text::locked_span;
use tone_text::normalize::normalize;
use tone_text::prompt_builder;
use tone_text::redactor;
use tone_text::segmenter;
use tone_text::template_selector;

use crate::error::PipelineError;
use crate::stages::{context_gate, generate, identity_boost, segment_refine, situation_analyze, structure_label, validate};

/// Dollars per million tokens; matches §6's `cost = prompt*0.15 + completion*0.60 per million`.
const PROMPT_COST_PER_MILLION: f64 = 0.15;
const COMPLETION_COST_PER_MILLION: f64 = 0.60;
const MONTHLY_MULTIPLIERS: (f64, f64, f64) = (1500.0, 6000.0, 20000.0);

pub struct Orchestrator {
    llm: Arc<dyn LLMClient>,
    config: PipelineConfig,
}

#[derive(Default)]
struct RunUsage {
    analysis_prompt_tokens: u32,
    analysis_completion_tokens: u32,
    final_prompt_tokens: u32,
    final_completion_tokens: u32,
}

impl RunUsage {
    fn add_analysis(&mut self, usage: TokenUsage) {
        self.analysis_prompt_tokens += usage.prompt_tokens;
        self.analysis_completion_tokens += usage.completion_tokens;
    }

    fn add_final(&mut self, usage: TokenUsage) {
        self.final_prompt_tokens += usage.prompt_tokens;
        self.final_completion_tokens += usage.completion_tokens;
    }
}

fn emit_phase_started(sink: &dyn ProgressSink, phase: Phase) {
    sink.emit(ProgressEvent::PhaseStarted { phase });
}

fn emit_phase_completed(sink: &dyn ProgressSink, phase: Phase, started: Instant) {
    sink.emit(ProgressEvent::PhaseCompleted {
        phase,
        elapsed_ms: started.elapsed().as_millis() as u64,
    });
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LLMClient>, config: PipelineConfig) -> Self {
        Self { llm, config }
    }

    /// Runs one rewrite request to completion, honoring the wall-clock
    /// budget and the cancellation token (§5). On cancellation or
    /// wall-clock expiry neither `done` nor `error` is emitted — the
    /// caller already disconnected.
    pub async fn run(
        &self,
        request: RewriteRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<(), PipelineError> {
        let budget = std::time::Duration::from_secs(self.config.wall_clock_seconds);
        match tokio::time::timeout(budget, self.run_inner(request, sink.clone(), cancel.clone())).await {
            Ok(result) => result,
            Err(_) => {
                warn!("pipeline run exceeded wall-clock budget, aborting silently");
                Err(PipelineError::WallClockExceeded)
            }
        }
    }

    async fn run_inner(
        &self,
        request: RewriteRequest,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<(), PipelineError> {
        let run_started = Instant::now();
        let mut usage = RunUsage::default();
        let mut retry_count = 0u32;

        // --- Normalize ---
        let phase_started = Instant::now();
        emit_phase_started(&*sink, Phase::Normalizing);
        let normalized_text = normalize(&request.text);
        emit_phase_completed(&*sink, Phase::Normalizing, phase_started);

        if normalized_text.is_empty() {
            return self.finish_empty(request, sink.as_ref(), run_started);
        }

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // --- Extract + mask ---
        let phase_started = Instant::now();
        emit_phase_started(&*sink, Phase::Extracting);
        let mut locked_spans = locked_span::extract(&normalized_text);
        let mut masked_text = locked_span::mask(&normalized_text, &locked_spans);
        sink.emit(ProgressEvent::Spans { spans: spans_to_events(&locked_spans) });
        sink.emit(ProgressEvent::MaskedText { text: masked_text.clone() });
        emit_phase_completed(&*sink, Phase::Extracting, phase_started);

        // --- Spawn Situation Analyzer concurrently (§5, §9) ---
        let situation_fires = situation_analyze::should_fire(
            &masked_text,
            self.config.gating.situation_analysis_min_text_length,
            self.config.gating.situation_analysis_min_transition_words,
        );
        let situation_analysis_fired = situation_fires;
        let situation_handle = if situation_fires {
            let llm = self.llm.clone();
            let model_config = self.config.models.situation_analyzer.clone();
            let masked_for_task = masked_text.clone();
            let cancel_for_task = cancel.clone();
            Some(tokio::spawn(async move {
                situation_analyze::analyze(llm.as_ref(), &model_config, &masked_for_task, cancel_for_task).await
            }))
        } else {
            None
        };

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // --- Identity-Lock Booster (gated) ---
        let identity_booster_will_fire = identity_booster::should_fire(
            request.identity_boost,
            request.persona,
            locked_spans.len(),
            normalized_text.chars().count(),
            self.config.gating.identity_booster_min_text_length,
            self.config.gating.identity_booster_max_locked_spans,
        );
        let phase_started = Instant::now();
        let identity_phase = if identity_booster_will_fire { Phase::IdentityBoosting } else { Phase::IdentitySkipped };
        emit_phase_started(&*sink, identity_phase);
        let boost_result = identity_boost::boost(
            self.llm.as_ref(),
            &self.config.models.identity_booster,
            request.identity_boost,
            request.persona,
            &normalized_text,
            &masked_text,
            locked_spans.clone(),
            self.config.gating.identity_booster_min_text_length,
            self.config.gating.identity_booster_max_locked_spans,
            cancel.clone(),
        )
        .await;
        let identity_booster_fired = boost_result.all_spans.len() != locked_spans.len();
        locked_spans = boost_result.all_spans;
        masked_text = boost_result.remasked_text;
        usage.add_analysis(boost_result.usage);
        emit_phase_completed(&*sink, identity_phase, phase_started);

        // --- Segment ---
        let phase_started = Instant::now();
        emit_phase_started(&*sink, Phase::Segmenting);
        let mut segments = segmenter::segment(&masked_text);
        sink.emit(ProgressEvent::Segments { segments: segments_to_events(&segments) });
        emit_phase_completed(&*sink, Phase::Segmenting, phase_started);

        let segment_refine_will_fire =
            segment_refine::should_fire(&segments, self.config.gating.segment_refine_trigger_chars);
        let phase_started = Instant::now();
        let refine_phase = if segment_refine_will_fire { Phase::SegmentRefining } else { Phase::SegmentRefiningSkipped };
        emit_phase_started(&*sink, refine_phase);
        if segment_refine_will_fire {
            let (refined, refine_usage) = segment_refine::refine(
                self.llm.as_ref(),
                &self.config.models.segment_refiner,
                segments,
                self.config.gating.segment_refine_trigger_chars,
                cancel.clone(),
            )
            .await;
            segments = refined;
            usage.add_analysis(refine_usage);
        }
        emit_phase_completed(&*sink, refine_phase, phase_started);

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // --- Structure Labeler (fatal on failure) ---
        let phase_started = Instant::now();
        emit_phase_started(&*sink, Phase::Labeling);
        let label_result = structure_label::label(
            self.llm.as_ref(),
            &self.config.models.structure_labeler,
            &masked_text,
            &segments,
            self.config.label_coverage_threshold,
            cancel.clone(),
        )
        .await?;
        usage.add_analysis(label_result.usage);
        let labeled = label_result.labeled;
        sink.emit(ProgressEvent::Labels { labels: labels_to_events(&labeled) });
        emit_phase_completed(&*sink, Phase::Labeling, phase_started);

        // --- Red-Label Enforcer ---
        let labeled = enforcer::enforce(labeled);

        let stats = LabelStats::from_labeled(&labeled);

        // --- Template Selector ---
        let phase_started = Instant::now();
        emit_phase_started(&*sink, Phase::TemplateSelecting);
        let mut selected_template = template_selector::select(&request.contexts, request.persona, &masked_text, &stats);
        emit_phase_completed(&*sink, Phase::TemplateSelecting, phase_started);

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // --- Context Gating (gated) ---
        let context_gating_fired = context_gate::should_fire(&request.contexts);
        let phase_started = Instant::now();
        let gating_phase = if context_gating_fired { Phase::ContextGating } else { Phase::ContextGatingSkipped };
        emit_phase_started(&*sink, gating_phase);
        if context_gating_fired {
            let gate_result = context_gate::gate(
                self.llm.as_ref(),
                &self.config.models.context_gating,
                &masked_text,
                request.persona,
                &stats,
                selected_template,
                self.config.gating.context_gating_override_confidence_threshold,
                cancel.clone(),
            )
            .await;
            selected_template = gate_result.template;
            usage.add_analysis(gate_result.usage);
        }
        sink.emit(ProgressEvent::TemplateSelected { template: template_to_event(&selected_template) });
        emit_phase_completed(&*sink, gating_phase, phase_started);

        // --- Redact ---
        let phase_started = Instant::now();
        emit_phase_started(&*sink, Phase::Redacting);
        let redaction = redactor::redact(labeled);
        let redacted_originals: Vec<String> = redaction.redaction_map.values().cloned().collect();
        let yellow_segments: Vec<_> = redaction.segments.iter().filter(|s| s.tier() == Tier::Yellow).cloned().collect();
        emit_phase_completed(&*sink, Phase::Redacting, phase_started);

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // --- Join Situation Analyzer ---
        let phase_started = Instant::now();
        let situation_phase = if situation_fires { Phase::SituationAnalyzing } else { Phase::SituationSkipped };
        emit_phase_started(&*sink, situation_phase);
        let situation = match situation_handle {
            Some(handle) => handle.await.unwrap_or_default(),
            None => Default::default(),
        };
        usage.analysis_prompt_tokens += situation.prompt_tokens;
        usage.analysis_completion_tokens += situation.completion_tokens;
        let facts = situation_analyze::filter_red_overlap(situation.facts, &masked_text, &redaction.segments);
        sink.emit(ProgressEvent::SituationAnalysis {
            analysis: SituationAnalysisEvent {
                facts: facts.iter().map(|f| FactEvent { content: f.content.clone(), source: f.source.clone() }).collect(),
                intent: situation.intent.clone(),
            },
        });
        emit_phase_completed(&*sink, situation_phase, phase_started);

        // --- Build final prompt ---
        let envelope = prompt_builder::build(
            &request,
            selected_template.clone(),
            redaction.segments,
            facts,
            &locked_spans,
            redaction.redaction_map,
        );
        let user_message = prompt_builder::to_user_message(&envelope);

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // --- Stream + validate, with a single retry on failure ---
        let mut generation_model = self.config.models.final_generation.clone();
        let mut report;
        let mut generated;

        loop {
            let phase_started = Instant::now();
            emit_phase_started(&*sink, Phase::Generating);
            generated = generate::generate(
                self.llm.as_ref(),
                &generation_model,
                envelope.system_prompt.clone(),
                user_message.clone(),
                &locked_spans,
                sink.as_ref(),
                cancel.clone(),
            )
            .await?;
            usage.add_final(generated.usage);
            emit_phase_completed(&*sink, Phase::Generating, phase_started);

            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let phase_started = Instant::now();
            emit_phase_started(&*sink, Phase::Validating);
            let validation_input = validate::ValidationInput {
                unmasked_text: &generated.unmasked_text,
                raw_content: &generated.raw_content,
                normalized_text: &normalized_text,
                locked_spans: &locked_spans,
                redacted_originals: &redacted_originals,
                yellow_segments: &yellow_segments,
                template: &selected_template,
                persona: request.persona,
                must_include: &envelope.must_include,
            };
            report = validate::validate(&validation_input);
            sink.emit(ProgressEvent::ValidationIssues { issues: report.issues.clone() });
            emit_phase_completed(&*sink, Phase::Validating, phase_started);

            if !validate::needs_retry(&report) || retry_count >= self.config.retry_count {
                break;
            }

            retry_count += 1;
            report.retried = true;
            sink.emit(ProgressEvent::Retrying { reason: "validation_failed".to_string() });
            generation_model.temperature = self.config.retry_temperature;
        }

        let phase_started = Instant::now();
        emit_phase_started(&*sink, Phase::Complete);
        emit_phase_completed(&*sink, Phase::Complete, phase_started);

        let total_ms = run_started.elapsed().as_millis() as u64;
        sink.emit(ProgressEvent::Stats {
            stats: StatsEvent {
                segment_count: segments.len(),
                green_count: stats.green_count,
                yellow_count: stats.yellow_count,
                red_count: stats.red_count,
                locked_span_count: locked_spans.len(),
                retry_count,
                identity_booster_fired,
                situation_analysis_fired,
                context_gating_fired,
                latency_ms: total_ms,
            },
        });
        sink.emit(ProgressEvent::Usage { usage: usage_event(&usage) });
        sink.emit(ProgressEvent::Done {
            request_id: request.request_id,
            text: generated.unmasked_text.clone(),
            total_ms,
        });

        info!(request_id = %request.request_id, retry_count, total_ms, "rewrite complete");
        Ok(())
    }

    /// §8 boundary behavior: an empty (or whitespace-only) input never
    /// reaches the Structure Labeler or final generation model. `done` is
    /// the empty string, every count is zero, and no usage is recorded.
    fn finish_empty(&self, request: RewriteRequest, sink: &dyn ProgressSink, run_started: Instant) -> Result<(), PipelineError> {
        let total_ms = run_started.elapsed().as_millis() as u64;
        sink.emit(ProgressEvent::Stats {
            stats: StatsEvent {
                segment_count: 0,
                green_count: 0,
                yellow_count: 0,
                red_count: 0,
                locked_span_count: 0,
                retry_count: 0,
                identity_booster_fired: false,
                situation_analysis_fired: false,
                context_gating_fired: false,
                latency_ms: total_ms,
            },
        });
        sink.emit(ProgressEvent::Usage { usage: usage_event(&RunUsage::default()) });
        sink.emit(ProgressEvent::Done {
            request_id: request.request_id,
            text: String::new(),
            total_ms,
        });
        Ok(())
    }
}

fn usage_event(usage: &RunUsage) -> UsageEvent {
    let prompt_tokens = usage.analysis_prompt_tokens + usage.final_prompt_tokens;
    let completion_tokens = usage.analysis_completion_tokens + usage.final_completion_tokens;
    let total_cost_usd = prompt_tokens as f64 / 1_000_000.0 * PROMPT_COST_PER_MILLION
        + completion_tokens as f64 / 1_000_000.0 * COMPLETION_COST_PER_MILLION;
    UsageEvent {
        analysis_prompt_tokens: usage.analysis_prompt_tokens,
        analysis_completion_tokens: usage.analysis_completion_tokens,
        final_prompt_tokens: usage.final_prompt_tokens,
        final_completion_tokens: usage.final_completion_tokens,
        total_cost_usd,
        monthly: MonthlyCostEstimate {
            mvp: total_cost_usd * MONTHLY_MULTIPLIERS.0,
            growth: total_cost_usd * MONTHLY_MULTIPLIERS.1,
            mature: total_cost_usd * MONTHLY_MULTIPLIERS.2,
        },
    }
}

fn spans_to_events(spans: &[tone_core::span::LockedSpan]) -> Vec<SpanEvent> {
    spans
        .iter()
        .map(|s| SpanEvent {
            placeholder: s.placeholder.clone(),
            original: s.original_text.clone(),
            span_type: format!("{:?}", s.span_type),
        })
        .collect()
}

fn segments_to_events(segments: &[tone_core::segment::Segment]) -> Vec<SegmentEvent> {
    segments
        .iter()
        .map(|s| SegmentEvent { id: s.id.clone(), text: s.text.clone(), start: s.start, end: s.end })
        .collect()
}

fn labels_to_events(labeled: &[tone_core::segment::LabeledSegment]) -> Vec<LabelEvent> {
    labeled
        .iter()
        .map(|s| LabelEvent {
            segment_id: s.segment.id.clone(),
            tier: format!("{:?}", s.tier()),
            label: format!("{:?}", s.label),
            text: s.segment.text.clone(),
        })
        .collect()
}

fn template_to_event(template: &tone_core::template::SelectedTemplate) -> TemplateSelectedEvent {
    TemplateSelectedEvent {
        id: template.id.clone(),
        name: template.name.clone(),
        sections: template.effective_sections.iter().map(|s| s.key.as_str().to_string()).collect(),
    }
}
