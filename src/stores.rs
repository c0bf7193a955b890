// advisory-report-service/src/stores.rs
//
// Async seams to the platform services this pipeline orchestrates. The
// pipeline owns none of them; implementations are injected by the
// composition root (production adapters live in storage.rs and
// persistence.rs, test fakes in tests/).

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Client, ProjectionResult, ReportMetadata, Scenario};

#[async_trait]
pub trait ScenarioStore: Send + Sync {
    async fn get_scenario(&self, id: Uuid) -> Result<Option<Scenario>>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn get_client_by_id(&self, id: Uuid) -> Result<Option<Client>>;
}

/// Black-box numerical projection engine: scenario in, year series out.
#[async_trait]
pub trait ProjectionEngine: Send + Sync {
    async fn project(&self, scenario: &Scenario) -> Result<ProjectionResult>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()>;

    /// Time-limited read URL for a previously uploaded object.
    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String>;
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn insert(&self, metadata: &ReportMetadata) -> Result<()>;

    /// History listing, newest first.
    async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<ReportMetadata>>;
}

/// Page geometry handed to the PDF encoder. The pipeline always requests
/// A4 portrait with a header/footer band.
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub page_size: &'static str,
    pub landscape: bool,
    pub header: String,
    pub footer: String,
}

/// External HTML → PDF encoder.
#[async_trait]
pub trait PdfEncoder: Send + Sync {
    async fn encode(&self, html: &str, layout: &PageLayout) -> Result<Vec<u8>>;
}

/// One sheet of tabular data for the spreadsheet encoder.
#[derive(Debug, Clone)]
pub struct WorksheetData {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct WorkbookData {
    pub title: String,
    pub sheets: Vec<WorksheetData>,
}

/// External structured-data → spreadsheet encoder. Bypasses markup
/// entirely; the emitter hands it the underlying numbers.
#[async_trait]
pub trait SpreadsheetEncoder: Send + Sync {
    async fn encode(&self, workbook: &WorkbookData) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct SlideContent {
    pub title: String,
    pub bullets: Vec<String>,
    /// Inline SVG data-URI, when the slide carries a chart.
    pub image_data_uri: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SlideDeckData {
    pub title: String,
    pub slides: Vec<SlideContent>,
}

/// Slide-deck encoder. Runs behind a separate network endpoint because its
/// runtime requirements are incompatible with this process.
#[async_trait]
pub trait SlideDeckEncoder: Send + Sync {
    async fn encode(&self, deck: &SlideDeckData) -> Result<Vec<u8>>;
}
