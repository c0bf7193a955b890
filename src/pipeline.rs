use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::charts::{ChartStyle, ChartSynthesizer};
use crate::config::GenerationConfig;
use crate::emitter::{DocumentEmitter, EmitPayload};
use crate::error::{ReportError, Result};
use crate::models::{
    ChartImageResult, ChartKind, Client, PreviewResult, ProjectionResult, ReportKind,
    ReportMetadata, ReportOptions, ReportProgress, ReportRequest, ReportResult, ReportStage,
    Scenario,
};
use crate::progress::ProgressBroker;
use crate::stores::{ClientStore, MetadataStore, ProjectionEngine, ScenarioStore};
use crate::templates::{engine, TemplateLibrary};
use crate::variables::build_variables;

/// Invoked synchronously at every stage transition of one report.
pub type ProgressCallback = Box<dyn Fn(&ReportProgress) + Send + Sync>;

/// Drives one report generation end-to-end: fetch → project → charts →
/// template → emit → metadata, with staged progress and a bounded retry
/// loop around the whole attempt. Holds no per-request state; the caller's
/// composition root builds one pipeline per process and shares it.
pub struct ReportPipeline {
    scenario_store: Arc<dyn ScenarioStore>,
    client_store: Arc<dyn ClientStore>,
    projection_engine: Arc<dyn ProjectionEngine>,
    metadata_store: Arc<dyn MetadataStore>,
    charts: ChartSynthesizer,
    templates: TemplateLibrary,
    emitter: DocumentEmitter,
    broker: Arc<ProgressBroker>,
    config: GenerationConfig,
}

impl ReportPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scenario_store: Arc<dyn ScenarioStore>,
        client_store: Arc<dyn ClientStore>,
        projection_engine: Arc<dyn ProjectionEngine>,
        metadata_store: Arc<dyn MetadataStore>,
        emitter: DocumentEmitter,
        broker: Arc<ProgressBroker>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            scenario_store,
            client_store,
            projection_engine,
            metadata_store,
            charts: ChartSynthesizer::new(),
            templates: TemplateLibrary::new(),
            emitter,
            broker,
            config,
        }
    }

    /// Request-shaped entry point.
    pub async fn generate(
        &self,
        request: ReportRequest,
        on_progress: Option<ProgressCallback>,
    ) -> ReportResult {
        self.generate_complete_report(
            request.scenario_id,
            request.report_kind,
            request.options,
            on_progress,
        )
        .await
    }

    /// Primary entry point. Always returns a `ReportResult`; failures are
    /// encoded in it rather than raised, so callers never lose the error
    /// taxonomy to a transport panic.
    #[instrument(skip(self, options, on_progress), fields(
        scenario_id = %scenario_id,
        kind = report_kind.as_str(),
    ))]
    pub async fn generate_complete_report(
        &self,
        scenario_id: Uuid,
        report_kind: ReportKind,
        options: ReportOptions,
        on_progress: Option<ProgressCallback>,
    ) -> ReportResult {
        // Unique per invocation so storage paths never collide; not a
        // deduplication key.
        let report_id = format!(
            "{}-{}-{}",
            scenario_id,
            report_kind.as_str(),
            Utc::now().timestamp_millis()
        );

        let max_attempts = self.config.max_retries + 1;
        let mut last_error: Option<ReportError> = None;

        for attempt in 1..=max_attempts {
            match self
                .run_attempt(&report_id, scenario_id, report_kind, &options, on_progress.as_ref())
                .await
            {
                Ok(result) => {
                    info!(report_id = %report_id, attempt, "report generated");
                    return result;
                }
                Err(e) if !e.is_recoverable() => {
                    error!(report_id = %report_id, kind = e.kind(), error = %e, "non-recoverable failure");
                    self.publish_terminal_error(&report_id, &e, on_progress.as_ref());
                    return ReportResult::failure(e.to_string());
                }
                Err(e) => {
                    warn!(
                        report_id = %report_id,
                        attempt,
                        kind = e.kind(),
                        error = %e,
                        "attempt failed"
                    );
                    last_error = Some(e);
                    if attempt < max_attempts {
                        let delay = self.config.retry_base_delay_ms * 2u64.pow(attempt - 1);
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                }
            }
        }

        let exhausted = ReportError::RetriesExhausted {
            attempts: max_attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        };
        error!(report_id = %report_id, error = %exhausted, "giving up");
        self.publish_terminal_error(&report_id, &exhausted, on_progress.as_ref());
        ReportResult::failure(exhausted.to_string())
    }

    /// One full attempt. Progress restarts from zero here on every retry.
    async fn run_attempt(
        &self,
        report_id: &str,
        scenario_id: Uuid,
        report_kind: ReportKind,
        options: &ReportOptions,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<ReportResult> {
        let started = Instant::now();
        let publish = |stage: ReportStage, percent: u8, message: &str| {
            self.emit_progress(report_id, stage, percent, message, started, on_progress);
        };

        publish(ReportStage::Initializing, 0, "Starting report generation");

        publish(ReportStage::GatheringData, 10, "Loading scenario and client records");
        let scenario = self
            .scenario_store
            .get_scenario(scenario_id)
            .await?
            .ok_or(ReportError::ScenarioNotFound(scenario_id))?;
        let client = self
            .client_store
            .get_client_by_id(scenario.client_id)
            .await?
            .ok_or(ReportError::ClientNotFound(scenario.client_id))?;
        let projection = self.projection_engine.project(&scenario).await?;

        let charts = if options.include_charts {
            publish(ReportStage::GeneratingCharts, 30, "Generating charts");
            let style = ChartStyle::from_options(options);
            self.charts.synthesize_many(
                &options.chart_kinds,
                &projection.years,
                &scenario,
                &style,
                |done, total| {
                    let percent = 30 + (40 * done / total.max(1)) as u8;
                    publish(
                        ReportStage::GeneratingCharts,
                        percent,
                        &format!("Generated {done} of {total} charts"),
                    );
                },
            )
        } else {
            Vec::new()
        };

        publish(ReportStage::CreatingDocument, 70, "Populating document template");
        let generated_at = Utc::now();
        let variables = build_variables(
            &client,
            &scenario,
            &projection,
            options,
            &charts,
            report_kind,
            generated_at,
        );
        let template = self.templates.select_template(report_kind, options);
        let markup = engine::populate(&template, &variables);

        publish(ReportStage::Finalizing, 85, "Persisting report artifacts");
        let charts = self
            .emitter
            .persist_charts(client.id, report_kind, generated_at, charts)
            .await;
        let payload = EmitPayload {
            report_kind,
            markup,
            client: &client,
            scenario: &scenario,
            projection: &projection,
            charts: &charts,
            locale: &options.locale,
            generated_at,
        };
        let emitted = self.emitter.emit(options.output_format, &payload).await?;

        let metadata = self
            .persist_metadata(&scenario, &client, report_kind, options, emitted.document.file_size)
            .await;

        publish(ReportStage::Complete, 100, "Report generation complete");

        let chart_urls = charts.iter().filter_map(|c| c.url.clone()).collect();
        Ok(ReportResult::success(
            emitted.document,
            emitted.download_url,
            chart_urls,
            metadata,
        ))
    }

    /// Metadata persistence is best-effort: a failed insert is logged and
    /// swallowed so a history row never costs a finished report.
    async fn persist_metadata(
        &self,
        scenario: &Scenario,
        client: &Client,
        report_kind: ReportKind,
        options: &ReportOptions,
        file_size: i64,
    ) -> Option<ReportMetadata> {
        let now = Utc::now();
        let metadata = ReportMetadata {
            id: Uuid::new_v4(),
            scenario_id: scenario.id,
            client_id: client.id,
            report_kind,
            version: 1,
            created_at: now,
            updated_at: now,
            created_by: client
                .advisor_name
                .clone()
                .unwrap_or_else(|| "system".to_string()),
            file_size,
            language: options.locale.clone(),
            accessibility_flag: options.accessibility.high_contrast
                || options.accessibility.screen_reader,
        };
        match self.metadata_store.insert(&metadata).await {
            Ok(()) => Some(metadata),
            Err(e) => {
                warn!(error = %e, "metadata write failed; report still succeeds");
                None
            }
        }
    }

    fn emit_progress(
        &self,
        report_id: &str,
        stage: ReportStage,
        percent: u8,
        message: &str,
        started: Instant,
        on_progress: Option<&ProgressCallback>,
    ) {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let estimated_ms_remaining = if percent > 0 && percent < 100 {
            Some(elapsed_ms * u64::from(100 - percent) / u64::from(percent))
        } else {
            None
        };
        let progress = ReportProgress {
            report_id: report_id.to_string(),
            stage,
            percent_complete: percent,
            message: message.to_string(),
            estimated_ms_remaining,
        };
        if let Some(callback) = on_progress {
            callback(&progress);
        }
        self.broker.publish(&progress);
    }

    fn publish_terminal_error(
        &self,
        report_id: &str,
        error: &ReportError,
        on_progress: Option<&ProgressCallback>,
    ) {
        let progress = ReportProgress {
            report_id: report_id.to_string(),
            stage: ReportStage::Error,
            percent_complete: 100,
            message: error.to_string(),
            estimated_ms_remaining: None,
        };
        if let Some(callback) = on_progress {
            callback(&progress);
        }
        self.broker.publish(&progress);
    }

    /// Same pipeline minus persistence. Chart failures degrade to labeled
    /// placeholder images so a partial scenario still previews; a single
    /// attempt, since nothing here is worth a retry budget.
    #[instrument(skip(self, options), fields(scenario_id = %scenario_id))]
    pub async fn generate_report_preview(
        &self,
        scenario_id: Uuid,
        report_kind: ReportKind,
        options: ReportOptions,
    ) -> PreviewResult {
        match self.render_preview(scenario_id, report_kind, &options).await {
            Ok(html) => PreviewResult::success(html),
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "preview failed");
                PreviewResult::error(e.to_string())
            }
        }
    }

    async fn render_preview(
        &self,
        scenario_id: Uuid,
        report_kind: ReportKind,
        options: &ReportOptions,
    ) -> Result<String> {
        let scenario = self
            .scenario_store
            .get_scenario(scenario_id)
            .await?
            .ok_or(ReportError::ScenarioNotFound(scenario_id))?;
        let client = self
            .client_store
            .get_client_by_id(scenario.client_id)
            .await?
            .ok_or(ReportError::ClientNotFound(scenario.client_id))?;
        let projection = self.projection_engine.project(&scenario).await?;

        let charts = if options.include_charts {
            let style = ChartStyle::from_options(options);
            options
                .chart_kinds
                .iter()
                .map(|kind| self.preview_chart(&projection, &scenario, *kind, &style))
                .collect()
        } else {
            Vec::new()
        };

        let variables = build_variables(
            &client,
            &scenario,
            &projection,
            options,
            &charts,
            report_kind,
            Utc::now(),
        );
        let template = self.templates.select_template(report_kind, options);
        Ok(engine::populate(&template, &variables))
    }

    fn preview_chart(
        &self,
        projection: &ProjectionResult,
        scenario: &Scenario,
        kind: ChartKind,
        style: &ChartStyle,
    ) -> ChartImageResult {
        self.charts
            .synthesize(&projection.years, scenario, kind, style)
            .unwrap_or_else(|e| {
                warn!(kind = kind.as_str(), error = %e, "preview chart degraded to placeholder");
                self.charts.placeholder(kind, style)
            })
    }

    /// Completed-report history for a client, newest first.
    pub async fn get_report_history(&self, client_id: Uuid) -> Result<Vec<ReportMetadata>> {
        self.metadata_store.list_for_client(client_id).await
    }

    /// Observe a report's progress from anywhere in the process. Dropping
    /// the receiver unsubscribes.
    pub fn subscribe_to_report_progress(
        &self,
        report_id: &str,
    ) -> broadcast::Receiver<ReportProgress> {
        self.broker.subscribe(report_id)
    }
}
