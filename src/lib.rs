// advisory-report-service/src/lib.rs

//! Report generation pipeline for the advisory platform.
//!
//! Turns a financial scenario plus user-chosen options into a rendered,
//! multi-format document: fetch records, synthesize SVG charts, build the
//! placeholder map, populate the selected template, emit the artifact and
//! record its metadata, all behind a progress-broadcasting, retrying
//! orchestrator.
//!
//! The composition root wires one [`pipeline::ReportPipeline`] per process
//! from injected collaborators:
//!
//! ```ignore
//! let broker = Arc::new(ProgressBroker::new());
//! let emitter = DocumentEmitter::new(
//!     object_store, pdf_encoder, spreadsheet_encoder, slide_encoder,
//!     config.storage.document_prefix.clone(),
//!     Duration::from_secs(config.storage.signed_url_ttl_secs),
//! );
//! let pipeline = ReportPipeline::new(
//!     scenario_store, client_store, projection_engine, metadata_store,
//!     emitter, broker.clone(), config.generation.clone(),
//! );
//! let result = pipeline
//!     .generate_complete_report(scenario_id, ReportKind::Cashflow, options, None)
//!     .await;
//! ```

pub mod charts;
pub mod config;
pub mod emitter;
pub mod error;
pub mod models;
pub mod persistence;
pub mod pipeline;
pub mod progress;
pub mod storage;
pub mod stores;
pub mod templates;
pub mod variables;

pub use config::ReportServiceConfig;
pub use error::{ReportError, Result};
pub use models::{
    ChartKind, OutputFormat, PreviewResult, ReportKind, ReportMetadata, ReportOptions,
    ReportProgress, ReportRequest, ReportResult, ReportStage,
};
pub use pipeline::{ProgressCallback, ReportPipeline};
pub use progress::ProgressBroker;
