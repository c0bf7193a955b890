// advisory-report-service/tests/report_pipeline.rs
//
// End-to-end pipeline tests over in-memory collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use advisory_report_service::config::GenerationConfig;
use advisory_report_service::emitter::DocumentEmitter;
use advisory_report_service::error::{ReportError, Result};
use advisory_report_service::models::{
    AssetAllocation, ChartKind, Client, MarketAssumptions, OutputFormat, ProjectionResult,
    ProjectionSummary, ProjectionYearRecord, ReportKind, ReportMetadata, ReportOptions,
    ReportProgress, ReportRequest, ReportStage, Scenario,
};
use advisory_report_service::pipeline::{ProgressCallback, ReportPipeline};
use advisory_report_service::progress::ProgressBroker;
use advisory_report_service::stores::{
    ClientStore, MetadataStore, ObjectStore, PageLayout, PdfEncoder, ProjectionEngine,
    ScenarioStore, SlideDeckData, SlideDeckEncoder, SpreadsheetEncoder, WorkbookData,
};

// ------------------------------------------------------------
// Fixtures
// ------------------------------------------------------------

fn test_client(id: Uuid) -> Client {
    Client {
        id,
        first_name: "Margaret".to_string(),
        last_name: "Holt".to_string(),
        email: Some("m.holt@example.com".to_string()),
        advisor_name: Some("J. Whitfield".to_string()),
        firm_name: Some("Harbourside Wealth".to_string()),
    }
}

fn test_scenario(id: Uuid, client_id: Uuid) -> Scenario {
    Scenario {
        id,
        client_id,
        name: "Base case".to_string(),
        scenario_type: "retirement".to_string(),
        current_age: 45,
        retirement_age: 65,
        life_expectancy: 90,
        state_pension_age: 68,
        projection_years: 10,
        current_savings: 40_000.0,
        pension_value: 250_000.0,
        investment_value: 120_000.0,
        annual_income: 80_000.0,
        annual_expenses: 55_000.0,
        assumptions: MarketAssumptions {
            inflation_rate: 0.025,
            pension_growth_rate: 0.05,
            investment_growth_rate: 0.045,
            cash_growth_rate: 0.015,
        },
        allocation: AssetAllocation {
            equities: 55.0,
            bonds: 25.0,
            cash: 10.0,
            alternatives: 5.0,
        },
        risk_profile: Default::default(),
        mortgage: None,
        capital_events: vec![],
        currency_override: None,
    }
}

/// Ten years of monotonically increasing asset totals.
fn test_projection() -> ProjectionResult {
    ProjectionResult {
        summary: ProjectionSummary {
            final_portfolio_value: 812_450.0,
            final_real_value: 640_200.0,
            total_contributions: 180_000.0,
            total_withdrawals: 0.0,
            average_annual_return: 0.048,
            sustainability_rating: 8.0,
            goal_achieved: true,
            fund_survives: true,
            key_insights: vec!["Portfolio grows every year of the projection".to_string()],
            risk_metrics: Default::default(),
        },
        years: (0..10)
            .map(|i| {
                let growth = 1.0 + i as f64 * 0.07;
                ProjectionYearRecord {
                    year: i,
                    age: 45 + i as u8,
                    income: 80_000.0,
                    expenses: 55_000.0,
                    pension_value: 250_000.0 * growth,
                    investment_value: 120_000.0 * growth,
                    cash_value: 40_000.0,
                    asset_total: 410_000.0 * growth,
                    nominal_value: 410_000.0 * growth,
                    real_value: 380_000.0 * growth,
                    surplus: 25_000.0,
                }
            })
            .collect(),
    }
}

// ------------------------------------------------------------
// In-memory collaborators
// ------------------------------------------------------------

#[derive(Default)]
struct FixedScenarioStore {
    scenario: Option<Scenario>,
    calls: AtomicU32,
}

#[async_trait]
impl ScenarioStore for FixedScenarioStore {
    async fn get_scenario(&self, _id: Uuid) -> Result<Option<Scenario>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scenario.clone())
    }
}

#[derive(Default)]
struct FixedClientStore {
    client: Option<Client>,
}

#[async_trait]
impl ClientStore for FixedClientStore {
    async fn get_client_by_id(&self, _id: Uuid) -> Result<Option<Client>> {
        Ok(self.client.clone())
    }
}

struct StubProjectionEngine;

#[async_trait]
impl ProjectionEngine for StubProjectionEngine {
    async fn project(&self, _scenario: &Scenario) -> Result<ProjectionResult> {
        Ok(test_projection())
    }
}

#[derive(Default)]
struct FailingProjectionEngine {
    calls: AtomicU32,
}

#[async_trait]
impl ProjectionEngine for FailingProjectionEngine {
    async fn project(&self, _scenario: &Scenario) -> Result<ProjectionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ReportError::Projection("engine unavailable".to_string()))
    }
}

#[derive(Default)]
struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl InMemoryObjectStore {
    fn stored_paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    fn object(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), (bytes.to_vec(), content_type.to_string()));
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String> {
        Ok(format!(
            "https://signed.example.com/{path}?expires={}",
            ttl.as_secs()
        ))
    }
}

#[derive(Default)]
struct InMemoryMetadataStore {
    rows: Mutex<Vec<ReportMetadata>>,
    fail_inserts: bool,
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn insert(&self, metadata: &ReportMetadata) -> Result<()> {
        if self.fail_inserts {
            return Err(ReportError::Metadata("metadata db offline".to_string()));
        }
        self.rows.lock().unwrap().push(metadata.clone());
        Ok(())
    }

    async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<ReportMetadata>> {
        let mut rows: Vec<ReportMetadata> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.client_id == client_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

struct StubPdfEncoder;

#[async_trait]
impl PdfEncoder for StubPdfEncoder {
    async fn encode(&self, html: &str, _layout: &PageLayout) -> Result<Vec<u8>> {
        Ok(format!("%PDF-stub {} bytes", html.len()).into_bytes())
    }
}

#[derive(Default)]
struct RecordingSpreadsheetEncoder {
    last_workbook: Mutex<Option<WorkbookData>>,
}

#[async_trait]
impl SpreadsheetEncoder for RecordingSpreadsheetEncoder {
    async fn encode(&self, workbook: &WorkbookData) -> Result<Vec<u8>> {
        *self.last_workbook.lock().unwrap() = Some(workbook.clone());
        Ok(b"xlsx-stub".to_vec())
    }
}

struct StubSlideDeckEncoder;

#[async_trait]
impl SlideDeckEncoder for StubSlideDeckEncoder {
    async fn encode(&self, deck: &SlideDeckData) -> Result<Vec<u8>> {
        Ok(format!("pptx-stub {} slides", deck.slides.len()).into_bytes())
    }
}

// ------------------------------------------------------------
// Harness
// ------------------------------------------------------------

struct Harness {
    pipeline: ReportPipeline,
    broker: Arc<ProgressBroker>,
    object_store: Arc<InMemoryObjectStore>,
    metadata_store: Arc<InMemoryMetadataStore>,
    spreadsheet_encoder: Arc<RecordingSpreadsheetEncoder>,
    scenario_store: Arc<FixedScenarioStore>,
    scenario_id: Uuid,
    client_id: Uuid,
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

fn harness_with(
    projection_engine: Arc<dyn ProjectionEngine>,
    scenario_present: bool,
    fail_metadata: bool,
) -> Harness {
    init_tracing();
    let scenario_id = Uuid::new_v4();
    let client_id = Uuid::new_v4();

    let scenario_store = Arc::new(FixedScenarioStore {
        scenario: scenario_present.then(|| test_scenario(scenario_id, client_id)),
        calls: AtomicU32::new(0),
    });
    let client_store = Arc::new(FixedClientStore {
        client: Some(test_client(client_id)),
    });
    let object_store = Arc::new(InMemoryObjectStore::default());
    let metadata_store = Arc::new(InMemoryMetadataStore {
        rows: Mutex::new(vec![]),
        fail_inserts: fail_metadata,
    });
    let spreadsheet_encoder = Arc::new(RecordingSpreadsheetEncoder::default());
    let broker = Arc::new(ProgressBroker::new());

    let emitter = DocumentEmitter::new(
        object_store.clone(),
        Arc::new(StubPdfEncoder),
        spreadsheet_encoder.clone(),
        Arc::new(StubSlideDeckEncoder),
        "generated_documents".to_string(),
        Duration::from_secs(3600),
    );

    let pipeline = ReportPipeline::new(
        scenario_store.clone(),
        client_store,
        projection_engine,
        metadata_store.clone(),
        emitter,
        broker.clone(),
        GenerationConfig {
            max_retries: 3,
            // Keep retry waits negligible in tests.
            retry_base_delay_ms: 1,
        },
    );

    Harness {
        pipeline,
        broker,
        object_store,
        metadata_store,
        spreadsheet_encoder,
        scenario_store,
        scenario_id,
        client_id,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(StubProjectionEngine), true, false)
}

fn html_options() -> ReportOptions {
    ReportOptions {
        chart_kinds: vec![ChartKind::Portfolio],
        output_format: OutputFormat::Html,
        ..Default::default()
    }
}

// ------------------------------------------------------------
// Tests
// ------------------------------------------------------------

#[tokio::test]
async fn cashflow_html_report_end_to_end() {
    let h = harness();
    let result = h
        .pipeline
        .generate_complete_report(h.scenario_id, ReportKind::Cashflow, html_options(), None)
        .await;

    assert!(result.success, "error: {:?}", result.error);
    let url = result.download_url.expect("success carries a download URL");
    assert!(!url.is_empty());
    let document = result.document.expect("success carries a document ref");
    assert!(document.path.starts_with(&format!("generated_documents/{}/", h.client_id)));
    assert!(document.file_name.ends_with(".html"));

    let (bytes, content_type) = h.object_store.object(&document.path).expect("artifact stored");
    assert_eq!(content_type, "text/html; charset=utf-8");
    let markup = String::from_utf8(bytes).unwrap();
    assert!(markup.contains("Margaret Holt"));
    assert!(markup.contains("£812,450"));
    assert!(markup.contains("data:image/svg+xml;base64,"));
    assert!(!markup.contains("{{"), "unresolved template syntax leaked");

    // One chart was requested; its standalone artifact is persisted too.
    assert_eq!(result.chart_urls.len(), 1);
    assert!(result.metadata.is_some());
}

#[tokio::test]
async fn always_failing_generator_is_attempted_exactly_retry_budget_plus_one() {
    let engine = Arc::new(FailingProjectionEngine::default());
    let h = harness_with(engine.clone(), true, false);

    let result = h
        .pipeline
        .generate_complete_report(h.scenario_id, ReportKind::Cashflow, html_options(), None)
        .await;

    assert!(!result.success);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 4, "1 + MAX_RETRIES attempts");
    let error = result.error.expect("failure carries an error");
    assert!(error.contains("engine unavailable"), "error: {error}");
    assert!(result.download_url.is_none());
    assert!(result.document.is_none());
}

#[tokio::test]
async fn missing_scenario_fails_without_retrying() {
    let h = harness_with(Arc::new(StubProjectionEngine), false, false);

    let result = h
        .pipeline
        .generate_complete_report(h.scenario_id, ReportKind::Cashflow, html_options(), None)
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("not found"));
    assert_eq!(
        h.scenario_store.calls.load(Ordering::SeqCst),
        1,
        "not-found must not enter the retry loop"
    );
}

#[tokio::test]
async fn progress_is_monotonic_and_mirrored_on_the_broadcast_bus() {
    let h = harness();

    let local: Arc<Mutex<Vec<ReportProgress>>> = Arc::new(Mutex::new(vec![]));
    let sink = local.clone();
    let callback: ProgressCallback = Box::new(move |p| {
        sink.lock().unwrap().push(p.clone());
    });

    let result = h
        .pipeline
        .generate_complete_report(
            h.scenario_id,
            ReportKind::Cashflow,
            html_options(),
            Some(callback),
        )
        .await;
    assert!(result.success);

    let events = local.lock().unwrap().clone();
    assert!(events.len() >= 5);
    assert_eq!(events[0].stage, ReportStage::Initializing);
    assert_eq!(events[0].percent_complete, 0);
    let last = events.last().unwrap();
    assert_eq!(last.stage, ReportStage::Complete);
    assert_eq!(last.percent_complete, 100);

    for pair in events.windows(2) {
        assert!(
            pair[1].percent_complete >= pair[0].percent_complete,
            "progress went backwards: {} -> {}",
            pair[0].percent_complete,
            pair[1].percent_complete
        );
    }

    let stages: Vec<ReportStage> = events.iter().map(|e| e.stage).collect();
    assert!(stages.contains(&ReportStage::GatheringData));
    assert!(stages.contains(&ReportStage::GeneratingCharts));
    assert!(stages.contains(&ReportStage::CreatingDocument));
    assert!(stages.contains(&ReportStage::Finalizing));
}

#[tokio::test]
async fn subscribers_observe_the_same_progress_stream() {
    let h = harness();

    // The report id embeds a timestamp, so subscribe via the callback's
    // first event and replay the rest from the bus.
    let first_id: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let bus_events: Arc<Mutex<Vec<ReportProgress>>> = Arc::new(Mutex::new(vec![]));

    let broker = h.broker.clone();
    let id_sink = first_id.clone();
    let bus_sink = bus_events.clone();
    let callback: ProgressCallback = Box::new(move |p| {
        let mut guard = id_sink.lock().unwrap();
        if guard.is_none() {
            *guard = Some(p.report_id.clone());
            let mut rx = broker.subscribe(&p.report_id);
            let sink = bus_sink.clone();
            tokio::spawn(async move {
                while let Ok(event) = rx.recv().await {
                    sink.lock().unwrap().push(event);
                }
            });
        }
    });

    let result = h
        .pipeline
        .generate_complete_report(
            h.scenario_id,
            ReportKind::Review,
            html_options(),
            Some(callback),
        )
        .await;
    assert!(result.success);

    // Give the subscriber task a moment to drain the channel.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let events = bus_events.lock().unwrap();
    assert!(!events.is_empty(), "bus subscriber saw no events");
    assert_eq!(events.last().unwrap().stage, ReportStage::Complete);
    let expected_id = first_id.lock().unwrap().clone().unwrap();
    assert!(events.iter().all(|e| e.report_id == expected_id));
}

#[tokio::test]
async fn metadata_write_failure_does_not_fail_the_report() {
    let h = harness_with(Arc::new(StubProjectionEngine), true, true);

    let result = h
        .pipeline
        .generate_complete_report(h.scenario_id, ReportKind::Cashflow, html_options(), None)
        .await;

    assert!(result.success);
    assert!(result.download_url.is_some());
    assert!(result.metadata.is_none(), "best-effort metadata is absent on failure");
}

#[tokio::test]
async fn report_history_lists_completed_reports_newest_first() {
    let h = harness();

    for kind in [ReportKind::Cashflow, ReportKind::Review] {
        let result = h
            .pipeline
            .generate_complete_report(h.scenario_id, kind, html_options(), None)
            .await;
        assert!(result.success);
    }

    let history = h.pipeline.get_report_history(h.client_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].created_at >= history[1].created_at);
    assert!(history.iter().all(|m| m.client_id == h.client_id));
    assert_eq!(history.iter().filter(|m| m.version == 1).count(), 2);
}

#[tokio::test]
async fn preview_renders_markup_without_persisting_anything() {
    let h = harness();

    let preview = h
        .pipeline
        .generate_report_preview(h.scenario_id, ReportKind::Suitability, html_options())
        .await;

    assert!(preview.success, "error: {:?}", preview.error);
    let html = preview.html_content.unwrap();
    assert!(html.contains("Margaret Holt"));
    assert!(html.contains("Recommendation"));

    assert!(h.object_store.stored_paths().is_empty(), "preview must not upload");
    assert!(h.metadata_store.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn preview_of_missing_scenario_reports_the_error() {
    let h = harness_with(Arc::new(StubProjectionEngine), false, false);

    let preview = h
        .pipeline
        .generate_report_preview(h.scenario_id, ReportKind::Cashflow, html_options())
        .await;

    assert!(!preview.success);
    assert!(preview.html_content.is_none());
    assert!(preview.error.unwrap().contains("not found"));
}

#[tokio::test]
async fn excel_output_bypasses_markup_and_carries_structured_rows() {
    let h = harness();
    let options = ReportOptions {
        output_format: OutputFormat::Excel,
        include_charts: false,
        ..Default::default()
    };

    let result = h
        .pipeline
        .generate_complete_report(h.scenario_id, ReportKind::Cashflow, options, None)
        .await;
    assert!(result.success);

    let document = result.document.unwrap();
    assert!(document.file_name.ends_with(".xlsx"));
    let (_, content_type) = h.object_store.object(&document.path).unwrap();
    assert!(content_type.contains("spreadsheetml"));

    let workbook = h
        .spreadsheet_encoder
        .last_workbook
        .lock()
        .unwrap()
        .clone()
        .expect("spreadsheet encoder received the workbook");
    assert_eq!(workbook.sheets.len(), 2);
    assert_eq!(workbook.sheets[1].name, "Projection");
    // Ten projection years, one row each.
    assert_eq!(workbook.sheets[1].rows.len(), 10);
}

#[tokio::test]
async fn slidedeck_output_is_persisted_with_presentation_content_type() {
    let h = harness();
    let options = ReportOptions {
        output_format: OutputFormat::Slidedeck,
        chart_kinds: vec![ChartKind::Portfolio, ChartKind::RiskAnalysis],
        ..Default::default()
    };

    let result = h
        .pipeline
        .generate_complete_report(h.scenario_id, ReportKind::Review, options, None)
        .await;
    assert!(result.success);

    let document = result.document.unwrap();
    assert!(document.file_name.ends_with(".pptx"));
    let (bytes, content_type) = h.object_store.object(&document.path).unwrap();
    assert!(content_type.contains("presentationml"));
    // Title, headline, insights, plus one slide per chart.
    assert_eq!(String::from_utf8(bytes).unwrap(), "pptx-stub 5 slides");
}

#[tokio::test]
async fn report_ids_embed_scenario_and_kind() {
    let h = harness();

    let seen: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let callback: ProgressCallback = Box::new(move |p| {
        sink.lock()
            .unwrap()
            .get_or_insert_with(|| p.report_id.clone());
    });

    let result = h
        .pipeline
        .generate_complete_report(
            h.scenario_id,
            ReportKind::Suitability,
            html_options(),
            Some(callback),
        )
        .await;
    assert!(result.success);

    let report_id = seen.lock().unwrap().clone().unwrap();
    assert!(report_id.starts_with(&format!("{}-suitability-", h.scenario_id)));
}

#[tokio::test]
async fn request_shaped_entry_point_matches_the_expanded_one() {
    let h = harness();
    let request = ReportRequest {
        scenario_id: h.scenario_id,
        report_kind: ReportKind::Cashflow,
        options: html_options(),
    };

    let result = h.pipeline.generate(request, None).await;
    assert!(result.success);
    assert!(result.download_url.is_some());
}

#[tokio::test]
async fn repeated_generation_lands_on_distinct_storage_paths() {
    let h = harness();
    let first = h
        .pipeline
        .generate_complete_report(h.scenario_id, ReportKind::Cashflow, html_options(), None)
        .await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = h
        .pipeline
        .generate_complete_report(h.scenario_id, ReportKind::Cashflow, html_options(), None)
        .await;

    let first_path = first.document.unwrap().path;
    let second_path = second.document.unwrap().path;
    assert_ne!(first_path, second_path);
}
